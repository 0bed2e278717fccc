//! The five-step ingestion workflow.

mod controller;
mod error;
mod state;
mod step;
mod summary;

pub use controller::PipelineController;
pub use error::WorkflowError;
pub use state::{FileView, PipelineState};
pub use step::{Step, StepId, StepStatus};
pub use summary::ResultsSummary;
