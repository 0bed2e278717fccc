use serde::Serialize;

use crate::models::{Job, ProcessedFile};

/// Totals shown on the results step.
///
/// Counts are the engine's; duplicates are reported separately rather than
/// subtracted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultsSummary {
    pub files: usize,
    pub total_chunks: u64,
    pub files_with_embeddings: usize,
    pub duplicates: usize,
    pub error_count: u64,
    /// The job completed but some files failed.
    pub partial_failure: bool,
}

impl ResultsSummary {
    pub fn from_results(job: Option<&Job>, files: &[ProcessedFile]) -> Self {
        Self {
            files: files.len(),
            total_chunks: files.iter().map(|file| file.chunks_count).sum(),
            files_with_embeddings: files.iter().filter(|file| file.has_embeddings).count(),
            duplicates: files.iter().filter(|file| file.is_duplicate).count(),
            error_count: job.map(|job| job.error_count).unwrap_or(0),
            partial_failure: job.map(Job::has_partial_failure).unwrap_or(false),
        }
    }
}
