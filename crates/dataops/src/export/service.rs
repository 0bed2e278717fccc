use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info_span, Instrument};

use super::ExportFormat;
use crate::error::{ExportError, Result};
use crate::models::JobId;
use crate::registry::JobRegistry;
use crate::sanitize::file_label;

/// What the save dialog is asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub title: String,
    pub default_file_name: String,
    pub filter_name: String,
    pub extensions: Vec<String>,
}

impl SaveRequest {
    pub fn for_job(job_id: JobId, format: ExportFormat) -> Self {
        Self {
            title: "Export Processed Data".to_string(),
            default_file_name: format!("processed_data_{}.{}", job_id, format.extension()),
            filter_name: format.filter_name().to_string(),
            extensions: vec![format.extension().to_string()],
        }
    }
}

/// Host-provided "save as" prompt. `None` means the user cancelled.
pub trait SaveDialog: Send + Sync {
    fn choose_path(&self, request: &SaveRequest) -> Option<PathBuf>;
}

/// A dialog that always answers with the same path. Useful for headless runs.
#[derive(Debug, Clone)]
pub struct FixedPath(pub PathBuf);

impl SaveDialog for FixedPath {
    fn choose_path(&self, _request: &SaveRequest) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: PathBuf, bytes: usize },
    /// The dialog was dismissed; nothing was written.
    Cancelled,
}

/// Materializes an export artifact and writes it where the user chooses.
pub struct ExportService {
    registry: Arc<JobRegistry>,
}

impl ExportService {
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self { registry }
    }

    /// Fetches the artifact first, then asks for a destination.
    ///
    /// A rejected export never opens the dialog. Job and file state are not
    /// touched either way.
    pub async fn export(
        &self,
        job_id: JobId,
        format: ExportFormat,
        dialog: &dyn SaveDialog,
    ) -> Result<ExportOutcome> {
        let span = info_span!("export", job_id, format = %format);
        self.run(job_id, format, dialog).instrument(span).await
    }

    async fn run(
        &self,
        job_id: JobId,
        format: ExportFormat,
        dialog: &dyn SaveDialog,
    ) -> Result<ExportOutcome> {
        let artifact = self
            .registry
            .export_processed_data(job_id, format)
            .await?;

        let request = SaveRequest::for_job(job_id, format);
        let Some(path) = dialog.choose_path(&request) else {
            tracing::info!("Export cancelled at save dialog");
            return Ok(ExportOutcome::Cancelled);
        };

        let bytes = self.write_artifact(&path, &artifact).await?;
        tracing::info!(path = %file_label(&path), bytes, "Export written");
        Ok(ExportOutcome::Written { path, bytes })
    }

    async fn write_artifact(&self, path: &Path, artifact: &str) -> Result<usize> {
        if let Err(source) = tokio::fs::write(path, artifact.as_bytes()).await {
            let err = ExportError::WriteFile {
                path: path.to_path_buf(),
                source,
            };
            self.registry.record_error(err.to_string());
            return Err(err.into());
        }
        Ok(artifact.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::error::DataOpsError;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records the request and returns a preset answer.
    struct RecordingDialog {
        answer: Option<PathBuf>,
        requests: Mutex<Vec<SaveRequest>>,
    }

    impl RecordingDialog {
        fn answering(answer: Option<PathBuf>) -> Self {
            Self {
                answer,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl SaveDialog for RecordingDialog {
        fn choose_path(&self, request: &SaveRequest) -> Option<PathBuf> {
            self.requests.lock().unwrap().push(request.clone());
            self.answer.clone()
        }
    }

    fn service() -> (Arc<JobRegistry>, ExportService) {
        let registry = Arc::new(JobRegistry::new(Arc::new(MemoryEngine::new())));
        (registry.clone(), ExportService::new(registry))
    }

    #[test]
    fn test_save_request_names() {
        let request = SaveRequest::for_job(42, ExportFormat::Lines);
        assert_eq!(request.default_file_name, "processed_data_42.jsonl");
        assert_eq!(request.extensions, vec!["jsonl".to_string()]);

        let request = SaveRequest::for_job(7, ExportFormat::Markdown);
        assert_eq!(request.default_file_name, "processed_data_7.md");
    }

    #[tokio::test]
    async fn test_cancelled_dialog_writes_nothing() {
        let (registry, service) = service();
        let job = registry.create_job("run").await.unwrap();

        let dialog = RecordingDialog::answering(None);
        let outcome = service
            .export(job.id, ExportFormat::Table, &dialog)
            .await
            .unwrap();

        assert_eq!(outcome, ExportOutcome::Cancelled);
        assert_eq!(dialog.requests.lock().unwrap().len(), 1);
        assert!(registry.error().is_none());
    }

    #[tokio::test]
    async fn test_write_failure_sets_error() {
        let (registry, service) = service();
        let job = registry.create_job("run").await.unwrap();

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("out.csv");
        let err = service
            .export(job.id, ExportFormat::Table, &FixedPath(target.clone()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DataOpsError::Export(ExportError::WriteFile { .. })
        ));
        assert!(registry.error().unwrap().contains("Failed to write export"));
        assert!(!target.exists());
    }
}
