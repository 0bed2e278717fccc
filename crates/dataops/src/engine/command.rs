use serde::{Deserialize, Serialize};

/// Commands understood by the processing engine, named as they go over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineCommand {
    #[serde(rename = "create_data_processing_job")]
    CreateJob,
    #[serde(rename = "get_data_processing_job")]
    GetJob,
    #[serde(rename = "get_all_data_processing_jobs")]
    ListJobs,
    #[serde(rename = "update_data_processing_job")]
    UpdateJob,
    #[serde(rename = "delete_ingestion_job")]
    DeleteJob,
    #[serde(rename = "start_ingestion_job")]
    StartJob,
    #[serde(rename = "cancel_ingestion_job")]
    CancelJob,
    #[serde(rename = "process_files_for_job")]
    ProcessFiles,
    GetProcessedFiles,
    GetDataChunks,
    #[serde(rename = "get_processing_stats")]
    GetStats,
    ExportProcessedData,
}

impl EngineCommand {
    pub const ALL: [EngineCommand; 12] = [
        EngineCommand::CreateJob,
        EngineCommand::GetJob,
        EngineCommand::ListJobs,
        EngineCommand::UpdateJob,
        EngineCommand::DeleteJob,
        EngineCommand::StartJob,
        EngineCommand::CancelJob,
        EngineCommand::ProcessFiles,
        EngineCommand::GetProcessedFiles,
        EngineCommand::GetDataChunks,
        EngineCommand::GetStats,
        EngineCommand::ExportProcessedData,
    ];

    /// The wire name passed to the invoker.
    pub fn name(&self) -> &'static str {
        match self {
            EngineCommand::CreateJob => "create_data_processing_job",
            EngineCommand::GetJob => "get_data_processing_job",
            EngineCommand::ListJobs => "get_all_data_processing_jobs",
            EngineCommand::UpdateJob => "update_data_processing_job",
            EngineCommand::DeleteJob => "delete_ingestion_job",
            EngineCommand::StartJob => "start_ingestion_job",
            EngineCommand::CancelJob => "cancel_ingestion_job",
            EngineCommand::ProcessFiles => "process_files_for_job",
            EngineCommand::GetProcessedFiles => "get_processed_files",
            EngineCommand::GetDataChunks => "get_data_chunks",
            EngineCommand::GetStats => "get_processing_stats",
            EngineCommand::ExportProcessedData => "export_processed_data",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.name() == name)
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
