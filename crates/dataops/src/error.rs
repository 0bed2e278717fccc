use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineCommand;
use crate::pipeline::WorkflowError;

#[derive(Error, Debug)]
pub enum DataOpsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Failed to create staging directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No staging directory configured and no platform data directory available")]
    NoDataDirectory,
}

/// Failure of a single engine round trip.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine answered the command with an error message.
    #[error("{command} rejected: {message}")]
    Rejected {
        command: EngineCommand,
        message: String,
    },

    /// The engine answered, but the payload did not match the expected shape.
    #[error("{command} returned an unexpected payload: {source}")]
    Decode {
        command: EngineCommand,
        #[source]
        source: serde_json::Error,
    },

    /// Client-side deadline for a long-running command elapsed.
    #[error("{command} did not complete within {seconds}s")]
    TimedOut { command: EngineCommand, seconds: u64 },
}

impl EngineError {
    /// The command whose round trip failed.
    pub fn command(&self) -> EngineCommand {
        match self {
            EngineError::Rejected { command, .. }
            | EngineError::Decode { command, .. }
            | EngineError::TimedOut { command, .. } => *command,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export to '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
}

/// Input rejected locally, before any engine round trip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No files selected")]
    NoFilesSelected,

    #[error("Job name must not be empty")]
    EmptyJobName,
}

pub type Result<T> = std::result::Result<T, DataOpsError>;
