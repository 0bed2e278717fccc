use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::{Engine, EngineCommand};
use crate::error::EngineError;
use crate::export::ExportFormat;
use crate::models::{DataChunk, FileId, Job, JobId, JobUpdate, ProcessedFile, ProcessingStats};

/// Untyped command bridge provided by the host shell.
///
/// Arguments are a JSON object with camelCase keys. A rejection carries the
/// engine's error message.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value, String>;
}

/// [`Engine`] over an [`Invoker`], decoding responses into typed records.
pub struct InvokeEngine<I> {
    invoker: I,
}

impl<I: Invoker> InvokeEngine<I> {
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    async fn call<T: DeserializeOwned>(
        &self,
        command: EngineCommand,
        args: Value,
    ) -> Result<T, EngineError> {
        tracing::debug!(command = %command, "Invoking engine command");

        let value = self
            .invoker
            .invoke(command.name(), args)
            .await
            .map_err(|message| EngineError::Rejected { command, message })?;

        serde_json::from_value(value).map_err(|source| EngineError::Decode { command, source })
    }
}

#[async_trait]
impl<I: Invoker> Engine for InvokeEngine<I> {
    async fn create_job(&self, name: &str) -> Result<Job, EngineError> {
        self.call(EngineCommand::CreateJob, json!({ "name": name }))
            .await
    }

    async fn get_job(&self, id: JobId) -> Result<Job, EngineError> {
        self.call(EngineCommand::GetJob, json!({ "id": id })).await
    }

    async fn list_jobs(&self, limit: Option<u32>) -> Result<Vec<Job>, EngineError> {
        self.call(EngineCommand::ListJobs, json!({ "limit": limit }))
            .await
    }

    async fn update_job(&self, id: JobId, update: &JobUpdate) -> Result<Job, EngineError> {
        // The command takes the update's fields alongside the id.
        let mut args = json!(update);
        if let Value::Object(fields) = &mut args {
            fields.insert("id".to_string(), json!(id));
        }
        self.call(EngineCommand::UpdateJob, args).await
    }

    async fn delete_job(&self, id: JobId) -> Result<(), EngineError> {
        self.call(EngineCommand::DeleteJob, json!({ "id": id })).await
    }

    async fn start_job(&self, id: JobId) -> Result<(), EngineError> {
        self.call(EngineCommand::StartJob, json!({ "id": id })).await
    }

    async fn cancel_job(&self, id: JobId) -> Result<Job, EngineError> {
        self.call(EngineCommand::CancelJob, json!({ "id": id })).await
    }

    async fn process_files(&self, job_id: JobId, paths: &[PathBuf]) -> Result<(), EngineError> {
        let file_paths: Vec<String> = paths
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        self.call(
            EngineCommand::ProcessFiles,
            json!({ "jobId": job_id, "filePaths": file_paths }),
        )
        .await
    }

    async fn processed_files(&self, job_id: JobId) -> Result<Vec<ProcessedFile>, EngineError> {
        self.call(EngineCommand::GetProcessedFiles, json!({ "jobId": job_id }))
            .await
    }

    async fn data_chunks(&self, file_id: FileId) -> Result<Vec<DataChunk>, EngineError> {
        self.call(EngineCommand::GetDataChunks, json!({ "fileId": file_id }))
            .await
    }

    async fn stats(&self) -> Result<ProcessingStats, EngineError> {
        self.call(EngineCommand::GetStats, json!({})).await
    }

    async fn export(&self, job_id: JobId, format: ExportFormat) -> Result<String, EngineError> {
        self.call(
            EngineCommand::ExportProcessedData,
            json!({ "jobId": job_id, "format": format.wire_name() }),
        )
        .await
    }
}
