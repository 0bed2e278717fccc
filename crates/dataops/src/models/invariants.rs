//! Pure invariant checks over engine-owned records.
//!
//! The client never repairs engine data; callers log what these return.

use thiserror::Error;

use super::chunk::DataChunk;
use super::file::{FileId, ProcessedFile};
use super::job::{Job, JobId, JobStatus};

/// A broken invariant observed in engine data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("job {job_id}: progress {progress} outside 0..=100")]
    ProgressOutOfRange { job_id: JobId, progress: f64 },

    #[error("job {job_id}: processed_files {processed} exceeds total_files {total}")]
    ProcessedExceedsTotal {
        job_id: JobId,
        processed: u64,
        total: u64,
    },

    #[error("job {job_id}: status changed from {from} to {to} after becoming terminal")]
    TerminalStatusChanged {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("job {job_id}: progress moved back from {from} to {to} while running")]
    ProgressRegressed { job_id: JobId, from: f64, to: f64 },

    #[error("file {file_id}: is_duplicate={is_duplicate} but duplicate_of={duplicate_of:?}")]
    DuplicateFlagMismatch {
        file_id: FileId,
        is_duplicate: bool,
        duplicate_of: Option<FileId>,
    },

    #[error("file {file_id}: duplicate_of points at file {target}, which is itself a duplicate")]
    DuplicateOfDuplicate { file_id: FileId, target: FileId },

    #[error("file {file_id}: expected chunk_index {expected}, found {found}")]
    ChunkSequenceGap {
        file_id: FileId,
        expected: u32,
        found: u32,
    },
}

/// Checks the bounds every observed job must satisfy.
pub fn check_job(job: &Job) -> Vec<Violation> {
    let mut violations = Vec::new();

    if !(0.0..=100.0).contains(&job.progress) {
        violations.push(Violation::ProgressOutOfRange {
            job_id: job.id,
            progress: job.progress,
        });
    }
    if job.processed_files > job.total_files {
        violations.push(Violation::ProcessedExceedsTotal {
            job_id: job.id,
            processed: job.processed_files,
            total: job.total_files,
        });
    }

    violations
}

/// Checks that `next` is a legal successor observation of `prev`.
///
/// Only two moves are illegal: leaving a terminal status, and progress going
/// down while the job stays running. Anything else the engine reports,
/// including running back to pending, is fine.
pub fn check_job_transition(prev: &Job, next: &Job) -> Vec<Violation> {
    let mut violations = Vec::new();

    if prev.status.is_terminal() {
        if next.status != prev.status {
            violations.push(Violation::TerminalStatusChanged {
                job_id: prev.id,
                from: prev.status,
                to: next.status,
            });
        }
        return violations;
    }

    if prev.status == JobStatus::Running
        && next.status == JobStatus::Running
        && next.progress < prev.progress
    {
        violations.push(Violation::ProgressRegressed {
            job_id: prev.id,
            from: prev.progress,
            to: next.progress,
        });
    }

    violations
}

/// Checks `is_duplicate ⇔ duplicate_of` and that no duplicate points at another duplicate.
///
/// Targets outside `files` are not checked; they may belong to another job.
pub fn check_duplicate_links(files: &[ProcessedFile]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for file in files {
        if file.is_duplicate != file.duplicate_of.is_some() {
            violations.push(Violation::DuplicateFlagMismatch {
                file_id: file.id,
                is_duplicate: file.is_duplicate,
                duplicate_of: file.duplicate_of,
            });
        }

        if let Some(target) = file.duplicate_of {
            let target_is_duplicate = files
                .iter()
                .any(|candidate| candidate.id == target && candidate.is_duplicate);
            if target_is_duplicate {
                violations.push(Violation::DuplicateOfDuplicate {
                    file_id: file.id,
                    target,
                });
            }
        }
    }

    violations
}

/// Checks that chunk indices run `0, 1, 2, …` in the given order.
///
/// Stops at the first mismatch since every later index would be off too.
pub fn check_chunk_sequence(file_id: FileId, chunks: &[DataChunk]) -> Vec<Violation> {
    for (position, chunk) in chunks.iter().enumerate() {
        let expected = position as u32;
        if chunk.chunk_index != expected {
            return vec![Violation::ChunkSequenceGap {
                file_id,
                expected,
                found: chunk.chunk_index,
            }];
        }
    }
    Vec::new()
}
