use super::step::{Step, StepId, StepStatus};
use crate::models::{DataChunk, Job, ProcessedFile};
use crate::staging::FileItem;

/// A processed file opened for inspection, with its chunks in order.
#[derive(Debug, Clone, PartialEq)]
pub struct FileView {
    pub file: ProcessedFile,
    pub chunks: Vec<DataChunk>,
}

/// Everything a pipeline view renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub current: StepId,
    pub steps: Vec<Step>,
    /// Staged manifest.
    pub files: Vec<FileItem>,
    pub job: Option<Job>,
    pub processed_files: Vec<ProcessedFile>,
    pub viewing: Option<FileView>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::initial()
    }
}

impl PipelineState {
    /// Upload active, everything else pending, nothing staged.
    pub fn initial() -> Self {
        let mut steps: Vec<Step> = StepId::ALL.iter().map(|id| Step::pending(*id)).collect();
        steps[StepId::Upload.index()].status = StepStatus::Active;

        Self {
            current: StepId::Upload,
            steps,
            files: Vec::new(),
            job: None,
            processed_files: Vec::new(),
            viewing: None,
        }
    }

    pub fn step(&self, id: StepId) -> &Step {
        &self.steps[id.index()]
    }

    pub(crate) fn set_step(&mut self, id: StepId, status: StepStatus, progress: f64) {
        let step = &mut self.steps[id.index()];
        step.status = status;
        step.progress = progress;
    }

    /// The step that failed, if any.
    pub fn halted_at(&self) -> Option<StepId> {
        self.steps
            .iter()
            .find(|step| step.status == StepStatus::Error)
            .map(|step| step.id)
    }

    pub fn is_initial(&self) -> bool {
        *self == Self::initial()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_configuration() {
        let state = PipelineState::initial();
        assert_eq!(state.current, StepId::Upload);
        assert_eq!(state.step(StepId::Upload).status, StepStatus::Active);
        for id in &StepId::ALL[1..] {
            assert_eq!(state.step(*id).status, StepStatus::Pending);
            assert_eq!(state.step(*id).progress, 0.0);
        }
        assert!(state.halted_at().is_none());
        assert!(state.is_initial());
    }

    #[test]
    fn test_halted_at() {
        let mut state = PipelineState::initial();
        state.set_step(StepId::Clean, StepStatus::Error, 0.0);
        assert_eq!(state.halted_at(), Some(StepId::Clean));
        assert!(!state.is_initial());
    }
}
