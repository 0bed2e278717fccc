//! Staging of user-selected inputs into an application-owned directory.

mod importer;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use importer::StagingArea;

/// A raw input handed to the importer.
#[derive(Debug, Clone)]
pub enum SourceFile {
    /// A file, or a folder expanded recursively.
    Path(PathBuf),
    /// In-memory content such as a drag-and-drop payload.
    Bytes {
        name: String,
        data: Vec<u8>,
        mime_type: Option<String>,
    },
}

impl SourceFile {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        SourceFile::Path(path.into())
    }

    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        SourceFile::Bytes {
            name: name.into(),
            data: data.into(),
            mime_type: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileItemStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// Local manifest entry for one staged file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    /// Random identifier, unrelated to engine file ids.
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub status: FileItemStatus,
    pub progress: f64,
    pub staged_path: PathBuf,
}

/// Result of staging a batch.
#[derive(Debug, Clone, Default)]
pub struct StagedBatch {
    pub files: Vec<FileItem>,
    /// One message per input that could not be staged.
    pub errors: Vec<String>,
}

impl StagedBatch {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
