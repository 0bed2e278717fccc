pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod poller;
pub mod registry;
pub mod sanitize;
pub mod staging;

pub use config::{load_config, load_config_from_str, Config};
pub use dashboard::IngestionDashboard;
pub use engine::{Engine, EngineCommand, InvokeEngine, Invoker, MemoryEngine};
pub use error::{
    ConfigError, DataOpsError, EngineError, ExportError, Result, StagingError, ValidationError,
};
pub use export::{ExportFormat, ExportOutcome, ExportService, FixedPath, SaveDialog};
pub use logging::init_logging;
pub use models::{DataChunk, Job, JobId, JobStatus, JobUpdate, ProcessedFile, ProcessingStats};
pub use pipeline::{PipelineController, PipelineState, StepId, StepStatus, WorkflowError};
pub use poller::{PollerHandle, ProgressPoller};
pub use registry::{JobRegistry, RegistryEvent};
pub use staging::{FileItem, SourceFile, StagedBatch, StagingArea};
