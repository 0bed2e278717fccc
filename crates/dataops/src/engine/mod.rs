//! Transport to the external processing engine.
//!
//! [`Engine`] is the typed command surface. [`InvokeEngine`] adapts an untyped
//! host bridge ([`Invoker`]) to it; [`MemoryEngine`] runs the same contract in
//! process.

mod command;
mod invoke;
mod memory;

use std::path::PathBuf;

use async_trait::async_trait;

pub use command::EngineCommand;
pub use invoke::{InvokeEngine, Invoker};
pub use memory::MemoryEngine;

use crate::error::EngineError;
use crate::export::ExportFormat;
use crate::models::{DataChunk, FileId, Job, JobId, JobUpdate, ProcessedFile, ProcessingStats};

/// Every operation is an independent round trip; implementations hold no
/// client-side state beyond what the engine itself reports.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn create_job(&self, name: &str) -> Result<Job, EngineError>;

    async fn get_job(&self, id: JobId) -> Result<Job, EngineError>;

    /// Lists jobs, newest first.
    async fn list_jobs(&self, limit: Option<u32>) -> Result<Vec<Job>, EngineError>;

    async fn update_job(&self, id: JobId, update: &JobUpdate) -> Result<Job, EngineError>;

    async fn delete_job(&self, id: JobId) -> Result<(), EngineError>;

    async fn start_job(&self, id: JobId) -> Result<(), EngineError>;

    /// Requests cancellation and returns the job as the engine now reports it.
    async fn cancel_job(&self, id: JobId) -> Result<Job, EngineError>;

    /// Processes the staged files. Resolves only when the engine is done; there
    /// is no partial-progress signal.
    async fn process_files(&self, job_id: JobId, paths: &[PathBuf]) -> Result<(), EngineError>;

    /// Files of a job in insertion order.
    async fn processed_files(&self, job_id: JobId) -> Result<Vec<ProcessedFile>, EngineError>;

    async fn data_chunks(&self, file_id: FileId) -> Result<Vec<DataChunk>, EngineError>;

    async fn stats(&self) -> Result<ProcessingStats, EngineError>;

    /// Materializes the complete export artifact for a job.
    async fn export(&self, job_id: JobId, format: ExportFormat) -> Result<String, EngineError>;
}
