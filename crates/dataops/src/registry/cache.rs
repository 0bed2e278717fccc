//! The registry's cached view of engine state.
//!
//! Only engine responses ever land here. Single-job reads and mutations are
//! stored exactly as the engine returned them. Every call takes a ticket when
//! it is issued, so a listing issued before a later single-job read can be
//! recognised when it lands out of order.

use std::collections::{HashMap, HashSet};

use crate::models::{Job, JobId, ProcessingStats, Violation};

#[derive(Debug, Default)]
pub(crate) struct CacheState {
    /// Jobs in listing order (newest first).
    pub jobs: Vec<Job>,
    pub stats: Option<ProcessingStats>,
    pub selected: Option<JobId>,
    pub error: Option<String>,
    pub in_flight: usize,
    /// Deleted ids; responses issued before the delete must not resurrect them.
    deleted: HashSet<JobId>,
    next_ticket: u64,
    /// Ticket of the latest single-job call that returned each job.
    read_at: HashMap<JobId, u64>,
}

pub(crate) fn log_violations(violations: &[Violation]) {
    for violation in violations {
        tracing::warn!(violation = %violation, "Engine data violates invariant");
    }
}

impl CacheState {
    /// Hands out the ordering ticket for a call about to be issued.
    pub fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Stores a single-job response as the engine returned it.
    ///
    /// Returns `None` when the job was deleted through this registry.
    pub fn observe_job(&mut self, job: Job, ticket: u64) -> Option<Job> {
        if self.deleted.contains(&job.id) {
            tracing::debug!(job_id = job.id, "Ignoring read of deleted job");
            return None;
        }
        log_violations(&job.violations());

        let stamp = self.read_at.entry(job.id).or_insert(ticket);
        *stamp = (*stamp).max(ticket);

        match self.jobs.iter_mut().find(|cached| cached.id == job.id) {
            Some(cached) => {
                log_violations(&cached.transition_violations(&job));
                *cached = job.clone();
            }
            None => self.jobs.insert(0, job.clone()),
        }
        Some(job)
    }

    /// Replaces the job list with a listing issued under `ticket`.
    ///
    /// A listing entry gives way to the cached record only when that record
    /// came from a single-job call issued after the listing and the entry
    /// would break a transition invariant against it. Jobs first read after
    /// the listing was issued are kept even though it does not mention them.
    pub fn replace_jobs(&mut self, listing: Vec<Job>, ticket: u64) {
        let mut next = Vec::with_capacity(listing.len());

        for job in listing {
            if self.deleted.contains(&job.id) {
                continue;
            }
            log_violations(&job.violations());

            let entry = match self.jobs.iter().find(|cached| cached.id == job.id) {
                Some(cached) => {
                    let violations = cached.transition_violations(&job);
                    if self.read_after(job.id, ticket) && !violations.is_empty() {
                        tracing::debug!(job_id = job.id, "Keeping newer read over stale listing entry");
                        cached.clone()
                    } else {
                        log_violations(&violations);
                        job
                    }
                }
                None => job,
            };
            next.push(entry);
        }

        let unlisted: Vec<Job> = self
            .jobs
            .iter()
            .filter(|cached| !next.iter().any(|job| job.id == cached.id))
            .filter(|cached| self.read_after(cached.id, ticket))
            .cloned()
            .collect();
        next.splice(0..0, unlisted);

        self.read_at.retain(|id, _| next.iter().any(|job| job.id == *id));
        self.jobs = next;
    }

    fn read_after(&self, id: JobId, ticket: u64) -> bool {
        self.read_at.get(&id).map_or(false, |&read| read > ticket)
    }

    pub fn remove_job(&mut self, id: JobId) {
        self.jobs.retain(|job| job.id != id);
        self.read_at.remove(&id);
        self.deleted.insert(id);
        if self.selected == Some(id) {
            self.selected = None;
        }
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use chrono::Utc;

    fn job(id: JobId, status: JobStatus, progress: f64) -> Job {
        Job {
            id,
            name: format!("job {}", id),
            status,
            progress,
            total_files: 2,
            processed_files: 0,
            error_count: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    fn observe(cache: &mut CacheState, job: Job) -> Option<Job> {
        let ticket = cache.issue_ticket();
        cache.observe_job(job, ticket)
    }

    #[test]
    fn test_new_jobs_go_first() {
        let mut cache = CacheState::default();
        observe(&mut cache, job(1, JobStatus::Pending, 0.0));
        observe(&mut cache, job(2, JobStatus::Pending, 0.0));
        let ids: Vec<JobId> = cache.jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_single_reads_are_stored_as_returned() {
        let mut cache = CacheState::default();
        observe(&mut cache, job(1, JobStatus::Running, 50.0));

        let stored = observe(&mut cache, job(1, JobStatus::Pending, 0.0)).unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(cache.job(1).unwrap().status, JobStatus::Pending);

        observe(&mut cache, job(1, JobStatus::Running, 10.0));
        assert_eq!(cache.job(1).unwrap().progress, 10.0);
    }

    #[test]
    fn test_listing_older_than_read_does_not_regress() {
        let mut cache = CacheState::default();
        let listing_ticket = cache.issue_ticket();
        observe(&mut cache, job(1, JobStatus::Cancelled, 30.0));
        observe(&mut cache, job(2, JobStatus::Running, 80.0));

        cache.replace_jobs(
            vec![
                job(2, JobStatus::Running, 50.0),
                job(1, JobStatus::Running, 40.0),
            ],
            listing_ticket,
        );

        assert_eq!(cache.job(1).unwrap().status, JobStatus::Cancelled);
        assert_eq!(cache.job(2).unwrap().progress, 80.0);
    }

    #[test]
    fn test_listing_newer_than_read_wins() {
        let mut cache = CacheState::default();
        observe(&mut cache, job(1, JobStatus::Running, 80.0));

        let ticket = cache.issue_ticket();
        cache.replace_jobs(vec![job(1, JobStatus::Running, 50.0)], ticket);
        assert_eq!(cache.job(1).unwrap().progress, 50.0);
    }

    #[test]
    fn test_older_listing_without_violation_is_taken() {
        let mut cache = CacheState::default();
        let listing_ticket = cache.issue_ticket();
        observe(&mut cache, job(1, JobStatus::Running, 30.0));

        cache.replace_jobs(vec![job(1, JobStatus::Pending, 0.0)], listing_ticket);
        assert_eq!(cache.job(1).unwrap().status, JobStatus::Pending);
    }

    #[test]
    fn test_overlapping_listings() {
        let mut cache = CacheState::default();
        let first = cache.issue_ticket();
        let second = cache.issue_ticket();

        cache.replace_jobs(vec![job(1, JobStatus::Running, 60.0)], second);
        cache.replace_jobs(vec![job(1, JobStatus::Running, 20.0)], first);
        // Listings never hold back other listings.
        assert_eq!(cache.job(1).unwrap().progress, 20.0);
    }

    #[test]
    fn test_job_created_after_listing_is_kept() {
        let mut cache = CacheState::default();
        let listing_ticket = cache.issue_ticket();
        observe(&mut cache, job(2, JobStatus::Pending, 0.0));

        cache.replace_jobs(vec![job(1, JobStatus::Pending, 0.0)], listing_ticket);
        let ids: Vec<JobId> = cache.jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn test_listing_drops_jobs_it_no_longer_reports() {
        let mut cache = CacheState::default();
        observe(&mut cache, job(1, JobStatus::Pending, 0.0));
        let ticket = cache.issue_ticket();
        cache.replace_jobs(vec![job(2, JobStatus::Pending, 0.0)], ticket);
        assert!(cache.job(1).is_none());
        assert!(cache.job(2).is_some());
    }

    #[test]
    fn test_deleted_job_is_not_resurrected() {
        let mut cache = CacheState::default();
        observe(&mut cache, job(1, JobStatus::Running, 10.0));
        cache.selected = Some(1);

        cache.remove_job(1);
        assert!(cache.selected.is_none());

        assert!(observe(&mut cache, job(1, JobStatus::Running, 20.0)).is_none());
        let ticket = cache.issue_ticket();
        cache.replace_jobs(vec![job(1, JobStatus::Running, 20.0)], ticket);
        assert!(cache.jobs.is_empty());
    }
}
