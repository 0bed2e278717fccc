use serde::{Deserialize, Serialize};

/// The five pipeline steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepId {
    Upload,
    Review,
    Clean,
    Process,
    Results,
}

impl StepId {
    pub const ALL: [StepId; 5] = [
        StepId::Upload,
        StepId::Review,
        StepId::Clean,
        StepId::Process,
        StepId::Results,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::Upload => "upload",
            StepId::Review => "review",
            StepId::Clean => "clean",
            StepId::Process => "process",
            StepId::Results => "results",
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Active,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub status: StepStatus,
    /// 0–100.
    pub progress: f64,
}

impl Step {
    pub fn pending(id: StepId) -> Self {
        Self {
            id,
            status: StepStatus::Pending,
            progress: 0.0,
        }
    }
}
