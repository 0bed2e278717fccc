use thiserror::Error;

use super::step::StepId;
use crate::models::FileId;

/// An action that the pipeline's current step does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Cannot {action} during the {step} step")]
    StepNotReady { action: &'static str, step: StepId },

    #[error("The {step} step failed; reset the pipeline to continue")]
    Halted { step: StepId },

    #[error("No active job")]
    NoActiveJob,

    #[error("File {0} is not part of the current results")]
    UnknownFile(FileId),
}
