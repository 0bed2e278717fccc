//! Processing jobs as reported by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::invariants::{self, Violation};

pub type JobId = i64;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Completed, failed and cancelled jobs never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One import/processing run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    /// Aggregate progress, 0–100.
    pub progress: f64,
    pub total_files: u64,
    pub processed_files: u64,
    pub error_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Job {
    /// A completed run in which some files could not be processed.
    pub fn has_partial_failure(&self) -> bool {
        self.status == JobStatus::Completed && self.error_count > 0
    }

    pub fn violations(&self) -> Vec<Violation> {
        invariants::check_job(self)
    }

    /// Invariants broken by moving from this observation to `next`.
    pub fn transition_violations(&self, next: &Job) -> Vec<Violation> {
        invariants::check_job_transition(self, next)
    }
}

/// Partial update for `update_data_processing_job`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_files: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobUpdate {
    pub fn is_empty(&self) -> bool {
        *self == JobUpdate::default()
    }

    /// Applies the present fields to `job`.
    pub fn apply_to(&self, job: &mut Job) {
        if let Some(name) = &self.name {
            job.name = name.clone();
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(progress) = self.progress {
            job.progress = progress;
        }
        if let Some(total) = self.total_files {
            job.total_files = total;
        }
        if let Some(processed) = self.processed_files {
            job.processed_files = processed;
        }
        if let Some(errors) = self.error_count {
            job.error_count = errors;
        }
        if let Some(started) = self.started_at {
            job.started_at = Some(started);
        }
        if let Some(completed) = self.completed_at {
            job.completed_at = Some(completed);
        }
        if let Some(message) = &self.error_message {
            job.error_message = Some(message.clone());
        }
    }
}
