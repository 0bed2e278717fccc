use serde::{Deserialize, Serialize};

/// Aggregate counts across all jobs.
///
/// Every field defaults to zero, so both the older ingestion-stats shape and
/// the processing-stats shape decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProcessingStats {
    pub total_jobs: u64,
    pub pending_jobs: u64,
    pub running_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub cancelled_jobs: u64,
    pub total_files_processed: u64,
    pub total_chunks_created: u64,
    pub total_embeddings_generated: u64,
    pub total_duplicates_found: u64,
    pub total_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_to_zero() {
        let stats: ProcessingStats =
            serde_json::from_str(r#"{"total_jobs": 4, "completed_jobs": 3}"#).unwrap();
        assert_eq!(stats.total_jobs, 4);
        assert_eq!(stats.completed_jobs, 3);
        assert_eq!(stats.cancelled_jobs, 0);
        assert_eq!(stats.total_errors, 0);
    }
}
