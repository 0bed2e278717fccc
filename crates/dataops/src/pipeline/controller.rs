use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::watch;
use tracing::{info_span, Instrument};

use super::error::WorkflowError;
use super::state::{FileView, PipelineState};
use super::step::{StepId, StepStatus};
use super::summary::ResultsSummary;
use crate::config::Config;
use crate::error::{DataOpsError, Result, StagingError, ValidationError};
use crate::export::{ExportFormat, ExportOutcome, ExportService, SaveDialog};
use crate::models::{FileId, ProcessedFile};
use crate::registry::JobRegistry;
use crate::staging::{SourceFile, StagedBatch, StagingArea};

const DEFAULT_JOB_NAME_PREFIX: &str = "Data Processing";

/// Drives one run through upload → review → clean → process → results.
///
/// Operations take `&mut self`, so steps are strictly sequential for a given
/// controller. A failed step halts the run until [`reset`](Self::reset).
pub struct PipelineController {
    registry: Arc<JobRegistry>,
    staging: StagingArea,
    exporter: ExportService,
    job_name_prefix: String,
    default_export_format: ExportFormat,
    state: PipelineState,
    updates: watch::Sender<PipelineState>,
}

impl PipelineController {
    pub fn new(registry: Arc<JobRegistry>, staging: StagingArea) -> Self {
        let state = PipelineState::initial();
        let (updates, _) = watch::channel(state.clone());

        Self {
            exporter: ExportService::new(Arc::clone(&registry)),
            registry,
            staging,
            job_name_prefix: DEFAULT_JOB_NAME_PREFIX.to_string(),
            default_export_format: ExportFormat::default(),
            state,
            updates,
        }
    }

    pub fn from_config(
        registry: Arc<JobRegistry>,
        config: &Config,
    ) -> std::result::Result<Self, StagingError> {
        let staging = StagingArea::from_config(&config.staging)?;
        Ok(Self::new(registry, staging)
            .with_job_name_prefix(&config.processing.job_name_prefix)
            .with_default_export_format(config.export.default_format))
    }

    pub fn with_job_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.job_name_prefix = prefix.into();
        self
    }

    /// Format used by [`export_default`](Self::export_default).
    pub fn with_default_export_format(mut self, format: ExportFormat) -> Self {
        self.default_export_format = format;
        self
    }

    pub fn default_export_format(&self) -> ExportFormat {
        self.default_export_format
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Snapshots of the state after every change.
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.updates.subscribe()
    }

    fn publish(&self) {
        self.updates.send_replace(self.state.clone());
    }

    fn guard(
        &self,
        action: &'static str,
        allowed: &[StepId],
    ) -> std::result::Result<(), WorkflowError> {
        if let Some(step) = self.state.halted_at() {
            return Err(WorkflowError::Halted { step });
        }
        if !allowed.contains(&self.state.current) {
            return Err(WorkflowError::StepNotReady {
                action,
                step: self.state.current,
            });
        }
        Ok(())
    }

    /// Marks `step` as failed and hands the error back.
    fn fail(&mut self, step: StepId, err: DataOpsError) -> DataOpsError {
        tracing::warn!(step = %step, error = %err, "Pipeline step failed");
        self.state.set_step(step, StepStatus::Error, 0.0);
        self.publish();
        err
    }

    fn advance(&mut self, from: StepId, to: StepId, to_progress: f64) {
        self.state.set_step(from, StepStatus::Completed, 100.0);
        self.state.set_step(to, StepStatus::Active, to_progress);
        self.state.current = to;
        self.publish();
    }

    pub fn can_import(&self) -> bool {
        self.guard("import files", &[StepId::Upload, StepId::Review])
            .is_ok()
    }

    pub fn can_start_cleaning(&self) -> bool {
        self.guard("start cleaning", &[StepId::Review]).is_ok() && !self.state.files.is_empty()
    }

    pub fn can_export(&self) -> bool {
        self.guard("export", &[StepId::Results]).is_ok() && self.state.job.is_some()
    }

    // ─── Upload / review ────────────────────────────────────────────────────

    /// Stages inputs and moves to review once at least one file is staged.
    ///
    /// Importing again during review appends to the manifest.
    pub async fn import(&mut self, sources: Vec<SourceFile>) -> Result<StagedBatch> {
        self.guard("import files", &[StepId::Upload, StepId::Review])?;
        if sources.is_empty() {
            return Err(ValidationError::NoFilesSelected.into());
        }

        let staged = self.staging.stage(sources).await;
        let batch = match staged {
            Ok(batch) => batch,
            Err(e) => {
                self.registry.record_error(e.to_string());
                let step = self.state.current;
                return Err(self.fail(step, e.into()));
            }
        };

        self.state.files.extend(batch.files.iter().cloned());
        if self.state.current == StepId::Upload && !batch.is_empty() {
            self.advance(StepId::Upload, StepId::Review, 0.0);
        } else {
            self.publish();
        }

        Ok(batch)
    }

    /// Drops one staged entry from the manifest. Returns whether it was present.
    pub fn remove_file(&mut self, id: &str) -> Result<bool> {
        self.guard("remove a file", &[StepId::Upload, StepId::Review])?;

        let before = self.state.files.len();
        self.state.files.retain(|file| file.id != id);
        let removed = self.state.files.len() != before;
        if removed {
            self.publish();
        }
        Ok(removed)
    }

    // ─── Clean / process / results ──────────────────────────────────────────

    /// Creates a job for the staged files, waits for the engine to process
    /// them and loads the results.
    pub async fn start_cleaning(&mut self) -> Result<()> {
        self.guard("start cleaning", &[StepId::Review])?;
        if self.state.files.is_empty() {
            return Err(ValidationError::NoFilesSelected.into());
        }

        let span = info_span!("pipeline_run", files = self.state.files.len());
        self.run_job().instrument(span).await
    }

    async fn run_job(&mut self) -> Result<()> {
        self.advance(StepId::Review, StepId::Clean, 0.0);

        let name = format!(
            "{} - {}",
            self.job_name_prefix,
            Local::now().format("%-m/%-d/%Y, %-I:%M:%S %p")
        );

        let created = self
            .registry
            .create_job(&name)
            .instrument(info_span!("create_job"))
            .await;
        let job = match created {
            Ok(job) => job,
            Err(e) => return Err(self.fail(StepId::Clean, e)),
        };
        self.state.job = Some(job.clone());
        self.publish();

        let paths: Vec<PathBuf> = self
            .state
            .files
            .iter()
            .map(|file| file.staged_path.clone())
            .collect();
        let processing = self
            .registry
            .process_files(job.id, &paths)
            .instrument(info_span!("process_files", job_id = job.id))
            .await;
        if let Err(e) = processing {
            return Err(self.fail(StepId::Clean, e));
        }

        self.advance(StepId::Clean, StepId::Process, 0.0);

        let loaded = self
            .registry
            .get_processed_files(job.id)
            .instrument(info_span!("load_results", job_id = job.id))
            .await;
        let processed = match loaded {
            Ok(files) => files,
            Err(e) => return Err(self.fail(StepId::Process, e)),
        };
        self.state.processed_files = processed;

        let reread = self.registry.get_job(job.id).await;
        match reread {
            Ok(latest) => self.state.job = Some(latest),
            Err(e) => {
                tracing::warn!(job_id = job.id, error = %e, "Could not re-read job after processing");
            }
        }

        self.advance(StepId::Process, StepId::Results, 100.0);

        let summary = self.results_summary();
        tracing::info!(
            job_id = job.id,
            files = summary.files,
            chunks = summary.total_chunks,
            duplicates = summary.duplicates,
            errors = summary.error_count,
            "Pipeline run finished"
        );
        Ok(())
    }

    /// Opens a processed file with its chunks.
    ///
    /// A failed chunk load sets the shared error but leaves the steps alone.
    pub async fn view_file(&mut self, file_id: FileId) -> Result<&FileView> {
        self.guard("view a file", &[StepId::Results])?;

        let file = self
            .state
            .processed_files
            .iter()
            .find(|file| file.id == file_id)
            .cloned()
            .ok_or(WorkflowError::UnknownFile(file_id))?;

        let chunks = self.registry.get_data_chunks(file_id).await?;
        self.state.viewing = Some(FileView { file, chunks });
        self.publish();

        self.state
            .viewing
            .as_ref()
            .ok_or_else(|| WorkflowError::UnknownFile(file_id).into())
    }

    pub fn close_file_view(&mut self) {
        if self.state.viewing.take().is_some() {
            self.publish();
        }
    }

    /// The file a duplicate points at, when it is among the loaded results.
    pub fn canonical_file(&self, file: &ProcessedFile) -> Option<&ProcessedFile> {
        let target = file.duplicate_of?;
        self.state
            .processed_files
            .iter()
            .find(|candidate| candidate.id == target)
    }

    pub fn results_summary(&self) -> ResultsSummary {
        ResultsSummary::from_results(self.state.job.as_ref(), &self.state.processed_files)
    }

    pub async fn export(
        &self,
        format: ExportFormat,
        dialog: &dyn SaveDialog,
    ) -> Result<ExportOutcome> {
        self.guard("export", &[StepId::Results])?;
        let job_id = self
            .state
            .job
            .as_ref()
            .map(|job| job.id)
            .ok_or(WorkflowError::NoActiveJob)?;

        self.exporter.export(job_id, format, dialog).await
    }

    /// Exports in the configured default format.
    pub async fn export_default(&self, dialog: &dyn SaveDialog) -> Result<ExportOutcome> {
        self.export(self.default_export_format, dialog).await
    }

    /// Returns to the initial configuration from any state.
    pub fn reset(&mut self) {
        self.state = PipelineState::initial();
        self.publish();
        tracing::info!("Pipeline reset");
    }
}
