use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobId;

pub type FileId = i64;

/// Per-file processing status reported by the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Any status this client does not know about yet.
    #[serde(other)]
    Unknown,
}

/// One input file's processing outcome within a job.
///
/// Engine-owned: the client only reads these records. Duplicate flags in
/// particular are set by the engine's detection and displayed as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedFile {
    pub id: FileId,
    pub job_id: JobId,
    pub original_path: String,
    pub filename: String,
    pub file_size: u64,
    pub mime_type: String,
    pub status: FileStatus,
    pub chunks_count: u64,
    pub has_embeddings: bool,
    pub is_duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<FileId>,
    /// Opaque engine metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}
