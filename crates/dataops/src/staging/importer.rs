use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info_span, Instrument};
use uuid::Uuid;
use walkdir::WalkDir;

use super::{FileItem, FileItemStatus, SourceFile, StagedBatch};
use crate::config::StagingConfig;
use crate::error::StagingError;
use crate::sanitize::{file_label, path_tag};

const UNKNOWN_MIME: &str = "unknown";

/// The application-private directory that staged copies live in.
#[derive(Debug, Clone)]
pub struct StagingArea {
    directory: PathBuf,
}

/// One file to stage after folder expansion.
enum Pending {
    Copy(PathBuf),
    Write {
        name: String,
        data: Vec<u8>,
        mime_type: Option<String>,
    },
}

impl StagingArea {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Uses the configured directory, falling back to [`Self::default_directory`].
    pub fn from_config(config: &StagingConfig) -> Result<Self, StagingError> {
        match &config.directory {
            Some(directory) => Ok(Self::new(directory)),
            None => Ok(Self::new(Self::default_directory()?)),
        }
    }

    /// `<platform data dir>/dataops/uploads`.
    pub fn default_directory() -> Result<PathBuf, StagingError> {
        dirs::data_dir()
            .map(|dir| dir.join("dataops").join("uploads"))
            .ok_or(StagingError::NoDataDirectory)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Copies every input into the staging directory.
    ///
    /// The directory is created first; if that fails nothing is copied. A file
    /// that fails to stage is logged and reported in [`StagedBatch::errors`]
    /// without affecting its siblings.
    pub async fn stage(&self, sources: Vec<SourceFile>) -> Result<StagedBatch, StagingError> {
        let span = info_span!(
            "stage",
            directory = %path_tag(&self.directory),
            sources = sources.len()
        );
        self.stage_inner(sources).instrument(span).await
    }

    async fn stage_inner(&self, sources: Vec<SourceFile>) -> Result<StagedBatch, StagingError> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| StagingError::CreateDirectory {
                path: self.directory.clone(),
                source: e,
            })?;

        let mut batch = StagedBatch::default();
        let pending = expand_sources(sources, &mut batch.errors).await;

        for item in pending {
            match self.stage_one(item).await {
                Ok(file) => batch.files.push(file),
                Err(message) => {
                    tracing::warn!(error = %message, "Failed to stage file");
                    batch.errors.push(message);
                }
            }
        }

        tracing::info!(
            staged = batch.files.len(),
            failed = batch.errors.len(),
            "Staging finished"
        );
        Ok(batch)
    }

    async fn stage_one(&self, item: Pending) -> Result<FileItem, String> {
        match item {
            Pending::Copy(source) => {
                let name = final_component(&source)
                    .ok_or_else(|| format!("Invalid file path: {}", source.display()))?;
                let destination = self.directory.join(&name);

                let size = if is_same_file(&source, &destination).await {
                    fs::metadata(&destination)
                        .await
                        .map(|meta| meta.len())
                        .map_err(|e| format!("Failed to read {}: {}", name, e))?
                } else {
                    fs::copy(&source, &destination)
                        .await
                        .map_err(|e| format!("Failed to copy {}: {}", name, e))?
                };

                Ok(file_item(name, size, None, destination))
            }
            Pending::Write {
                name,
                data,
                mime_type,
            } => {
                let name = final_component(Path::new(&name))
                    .ok_or_else(|| format!("Invalid file name: {}", name))?;
                let destination = self.directory.join(&name);

                fs::write(&destination, &data)
                    .await
                    .map_err(|e| format!("Failed to write {}: {}", name, e))?;

                Ok(file_item(name, data.len() as u64, mime_type, destination))
            }
        }
    }
}

/// Expands folders into their files (sorted by path); files and byte inputs pass through.
async fn expand_sources(sources: Vec<SourceFile>, errors: &mut Vec<String>) -> Vec<Pending> {
    let mut pending = Vec::new();

    for source in sources {
        match source {
            SourceFile::Bytes {
                name,
                data,
                mime_type,
            } => pending.push(Pending::Write {
                name,
                data,
                mime_type,
            }),
            SourceFile::Path(path) => match fs::metadata(&path).await {
                Ok(meta) if meta.is_dir() => {
                    for entry in WalkDir::new(&path).sort_by_file_name() {
                        match entry {
                            Ok(entry) if entry.file_type().is_file() => {
                                pending.push(Pending::Copy(entry.into_path()));
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::warn!(error = %e, "Skipping unreadable folder entry");
                                errors.push(format!("Failed to read folder entry: {}", e));
                            }
                        }
                    }
                }
                Ok(_) => pending.push(Pending::Copy(path)),
                Err(e) => {
                    let message = format!("Failed to read {}: {}", file_label(&path), e);
                    tracing::warn!(error = %message, "Skipping input");
                    errors.push(message);
                }
            },
        }
    }

    pending
}

fn final_component(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

async fn is_same_file(source: &Path, destination: &Path) -> bool {
    match (
        fs::canonicalize(source).await,
        fs::canonicalize(destination).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn file_item(name: String, size: u64, mime_type: Option<String>, staged_path: PathBuf) -> FileItem {
    let mime_type = mime_type.unwrap_or_else(|| {
        mime_guess::from_path(&name)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| UNKNOWN_MIME.to_string())
    });

    FileItem {
        id: Uuid::new_v4().to_string(),
        name,
        size,
        mime_type,
        status: FileItemStatus::Pending,
        progress: 0.0,
        staged_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_stage_files_and_bytes() {
        let source_dir = TempDir::new().unwrap();
        let staging_dir = TempDir::new().unwrap();
        let source = source_dir.path().join("notes.txt");
        std::fs::write(&source, "hello").unwrap();

        let area = StagingArea::new(staging_dir.path().join("uploads"));
        let batch = area
            .stage(vec![
                SourceFile::path(&source),
                SourceFile::bytes("drop.bin", vec![1u8, 2, 3]),
            ])
            .await
            .unwrap();

        assert!(batch.errors.is_empty());
        assert_eq!(batch.files.len(), 2);

        let notes = &batch.files[0];
        assert_eq!(notes.name, "notes.txt");
        assert_eq!(notes.size, 5);
        assert_eq!(notes.mime_type, "text/plain");
        assert_eq!(notes.status, FileItemStatus::Pending);
        assert_eq!(notes.progress, 0.0);
        assert_eq!(std::fs::read(&notes.staged_path).unwrap(), b"hello");

        let drop = &batch.files[1];
        assert_eq!(drop.size, 3);
        assert_ne!(drop.id, notes.id);
    }

    #[tokio::test]
    async fn test_unknown_mime_fallback() {
        let staging_dir = TempDir::new().unwrap();
        let area = StagingArea::new(staging_dir.path());
        let batch = area
            .stage(vec![SourceFile::bytes("README", "text")])
            .await
            .unwrap();
        assert_eq!(batch.files[0].mime_type, "unknown");
    }

    #[tokio::test]
    async fn test_supplied_mime_wins() {
        let staging_dir = TempDir::new().unwrap();
        let area = StagingArea::new(staging_dir.path());
        let batch = area
            .stage(vec![SourceFile::Bytes {
                name: "clip".to_string(),
                data: b"{}".to_vec(),
                mime_type: Some("application/json".to_string()),
            }])
            .await
            .unwrap();
        assert_eq!(batch.files[0].mime_type, "application/json");
    }

    #[tokio::test]
    async fn test_name_cannot_escape_directory() {
        let staging_dir = TempDir::new().unwrap();
        let area = StagingArea::new(staging_dir.path().join("uploads"));
        let batch = area
            .stage(vec![SourceFile::bytes("../../escape.txt", "x")])
            .await
            .unwrap();

        assert_eq!(batch.files[0].name, "escape.txt");
        assert_eq!(
            batch.files[0].staged_path,
            staging_dir.path().join("uploads").join("escape.txt")
        );
        assert!(!staging_dir.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_file_does_not_abort_siblings() {
        let source_dir = TempDir::new().unwrap();
        let staging_dir = TempDir::new().unwrap();
        let good = source_dir.path().join("good.txt");
        std::fs::write(&good, "ok").unwrap();

        let area = StagingArea::new(staging_dir.path());
        let batch = area
            .stage(vec![
                SourceFile::path(source_dir.path().join("missing.txt")),
                SourceFile::path(&good),
            ])
            .await
            .unwrap();

        assert_eq!(batch.files.len(), 1);
        assert_eq!(batch.files[0].name, "good.txt");
        assert_eq!(batch.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_folder_expansion_sorted() {
        let source_dir = TempDir::new().unwrap();
        let nested = source_dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(source_dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(source_dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(nested.join("c.md"), "c").unwrap();

        let staging_dir = TempDir::new().unwrap();
        let area = StagingArea::new(staging_dir.path());
        let batch = area
            .stage(vec![SourceFile::path(source_dir.path())])
            .await
            .unwrap();

        let names: Vec<&str> = batch.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.md"]);
    }

    #[tokio::test]
    async fn test_uncreatable_directory_aborts_batch() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let area = StagingArea::new(blocker.join("uploads"));
        let err = area
            .stage(vec![SourceFile::bytes("a.txt", "a")])
            .await
            .unwrap_err();
        assert!(matches!(err, StagingError::CreateDirectory { .. }));
    }

    #[tokio::test]
    async fn test_restaging_staged_file_keeps_content() {
        let staging_dir = TempDir::new().unwrap();
        let area = StagingArea::new(staging_dir.path());
        let first = area
            .stage(vec![SourceFile::bytes("a.txt", "content")])
            .await
            .unwrap();

        let again = area
            .stage(vec![SourceFile::path(&first.files[0].staged_path)])
            .await
            .unwrap();
        assert_eq!(again.files[0].size, 7);
        assert_eq!(
            std::fs::read_to_string(&again.files[0].staged_path).unwrap(),
            "content"
        );
    }

    #[test]
    fn test_from_config_override() {
        let config = StagingConfig {
            directory: Some(PathBuf::from("/srv/dataops/uploads")),
        };
        let area = StagingArea::from_config(&config).unwrap();
        assert_eq!(area.directory(), Path::new("/srv/dataops/uploads"));
    }
}
