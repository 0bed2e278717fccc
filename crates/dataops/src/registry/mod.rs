//! Job registry: a client-side cache over engine round trips.
//!
//! Every operation is one independent call to the [`Engine`]. Failures set the
//! single shared error message (latest wins) and are returned to the caller;
//! the next successful operation clears it. The cache only ever holds engine
//! responses, except that deletes drop the record immediately.

mod cache;
mod events;

pub use events::{RegistryBroadcaster, RegistryEvent};

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::broadcast;

use cache::{log_violations, CacheState};

use crate::config::Config;
use crate::engine::{Engine, EngineCommand};
use crate::error::{EngineError, Result, ValidationError};
use crate::export::ExportFormat;
use crate::models::invariants;
use crate::models::{
    order_chunks, DataChunk, FileId, Job, JobId, JobUpdate, ProcessedFile, ProcessingStats,
};

pub struct JobRegistry {
    engine: Arc<dyn Engine>,
    cache: RwLock<CacheState>,
    events: RegistryBroadcaster,
    process_timeout: Option<Duration>,
    job_limit: Option<u32>,
}

/// Decrements the in-flight count when a tracked call ends, even if the
/// caller's future is dropped mid-call.
struct InFlight<'a> {
    registry: &'a JobRegistry,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut cache = self.registry.write();
        cache.in_flight = cache.in_flight.saturating_sub(1);
    }
}

impl JobRegistry {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            cache: RwLock::new(CacheState::default()),
            events: RegistryBroadcaster::default(),
            process_timeout: None,
            job_limit: None,
        }
    }

    /// Builds a registry with the processing timeout and listing limit from `config`.
    pub fn from_config(engine: Arc<dyn Engine>, config: &Config) -> Self {
        Self::new(engine)
            .with_process_timeout(config.processing.timeout_secs.map(Duration::from_secs))
            .with_job_limit(config.polling.job_limit)
    }

    /// Client-side deadline for `process_files`. `None` waits indefinitely.
    pub fn with_process_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.process_timeout = timeout;
        self
    }

    /// Limit passed to the engine when refreshing the job list.
    pub fn with_job_limit(mut self, limit: Option<u32>) -> Self {
        self.job_limit = limit;
        self
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        match self.cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Job registry cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Job registry cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Runs one engine round trip with loading and error bookkeeping.
    async fn track<T, F>(&self, call: F) -> std::result::Result<T, EngineError>
    where
        F: Future<Output = std::result::Result<T, EngineError>>,
    {
        self.write().in_flight += 1;
        let _in_flight = InFlight { registry: self };

        match call.await {
            Ok(value) => {
                self.write().error = None;
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(command = %e.command(), "Engine call failed");
                self.record_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Sets the shared error message.
    pub(crate) fn record_error(&self, message: String) {
        tracing::warn!(error = %message, "Data operation failed");
        self.write().error = Some(message.clone());
        self.events.send(RegistryEvent::Error(message));
    }

    fn ticket(&self) -> u64 {
        self.write().issue_ticket()
    }

    /// Caches a single-job response issued under `ticket` and returns it.
    fn observe(&self, job: Job, ticket: u64) -> Job {
        let stored = self.write().observe_job(job.clone(), ticket);
        if let Some(stored) = stored {
            self.events.send(RegistryEvent::JobUpdated(stored));
        }
        job
    }

    // ─── Operations ─────────────────────────────────────────────────────────

    pub async fn create_job(&self, name: &str) -> Result<Job> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyJobName.into());
        }

        let ticket = self.ticket();
        let job = self.track(self.engine.create_job(name)).await?;
        tracing::info!(job_id = job.id, name = %job.name, "Created processing job");
        Ok(self.observe(job, ticket))
    }

    pub async fn get_job(&self, id: JobId) -> Result<Job> {
        let ticket = self.ticket();
        let job = self.track(self.engine.get_job(id)).await?;
        Ok(self.observe(job, ticket))
    }

    /// Reads the job list and replaces the cached one with it.
    pub async fn get_all_jobs(&self, limit: Option<u32>) -> Result<Vec<Job>> {
        let ticket = self.ticket();
        let listing = self.track(self.engine.list_jobs(limit)).await?;

        let jobs = {
            let mut cache = self.write();
            cache.replace_jobs(listing, ticket);
            cache.jobs.clone()
        };
        self.events.send(RegistryEvent::JobsRefreshed { count: jobs.len() });
        Ok(jobs)
    }

    pub async fn refresh_jobs(&self) -> Result<Vec<Job>> {
        self.get_all_jobs(self.job_limit).await
    }

    /// Applies `update` and returns the job as the engine now reports it.
    pub async fn update_job(&self, id: JobId, update: &JobUpdate) -> Result<Job> {
        let ticket = self.ticket();
        let job = self.track(self.engine.update_job(id, update)).await?;
        Ok(self.observe(job, ticket))
    }

    pub async fn delete_job(&self, id: JobId) -> Result<()> {
        self.track(self.engine.delete_job(id)).await?;
        self.write().remove_job(id);
        self.events.send(RegistryEvent::JobRemoved(id));
        tracing::info!(job_id = id, "Deleted processing job");
        Ok(())
    }

    /// Starts a job and re-reads it so the cache shows the engine's view.
    pub async fn start_job(&self, id: JobId) -> Result<Job> {
        self.track(self.engine.start_job(id)).await?;
        self.get_job(id).await
    }

    /// Requests cancellation. The cache reflects whatever status the engine reports.
    pub async fn cancel_job(&self, id: JobId) -> Result<Job> {
        let ticket = self.ticket();
        let job = self.track(self.engine.cancel_job(id)).await?;
        tracing::info!(job_id = id, status = %job.status, "Requested job cancellation");
        Ok(self.observe(job, ticket))
    }

    /// Hands staged files to the engine and waits for it to finish.
    pub async fn process_files(&self, job_id: JobId, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Err(ValidationError::NoFilesSelected.into());
        }

        let engine = &self.engine;
        let timeout = self.process_timeout;
        self.track(async move {
            let call = engine.process_files(job_id, paths);
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(EngineError::TimedOut {
                        command: EngineCommand::ProcessFiles,
                        seconds: limit.as_secs(),
                    }),
                },
                None => call.await,
            }
        })
        .await?;

        tracing::info!(job_id, files = paths.len(), "Engine finished processing files");
        Ok(())
    }

    pub async fn get_processed_files(&self, job_id: JobId) -> Result<Vec<ProcessedFile>> {
        let files = self.track(self.engine.processed_files(job_id)).await?;
        log_violations(&invariants::check_duplicate_links(&files));
        Ok(files)
    }

    /// Chunks of one file in `chunk_index` order.
    pub async fn get_data_chunks(&self, file_id: FileId) -> Result<Vec<DataChunk>> {
        let mut chunks = self.track(self.engine.data_chunks(file_id)).await?;
        order_chunks(&mut chunks);
        log_violations(&invariants::check_chunk_sequence(file_id, &chunks));
        Ok(chunks)
    }

    pub async fn get_stats(&self) -> Result<ProcessingStats> {
        let stats = self.track(self.engine.stats()).await?;
        self.write().stats = Some(stats.clone());
        self.events.send(RegistryEvent::StatsRefreshed(stats.clone()));
        Ok(stats)
    }

    pub async fn refresh_stats(&self) -> Result<ProcessingStats> {
        self.get_stats().await
    }

    pub async fn export_processed_data(&self, job_id: JobId, format: ExportFormat) -> Result<String> {
        Ok(self.track(self.engine.export(job_id, format)).await?)
    }

    // ─── Cached view ────────────────────────────────────────────────────────

    pub fn jobs(&self) -> Vec<Job> {
        self.read().jobs.clone()
    }

    pub fn cached_job(&self, id: JobId) -> Option<Job> {
        self.read().job(id).cloned()
    }

    pub fn stats(&self) -> Option<ProcessingStats> {
        self.read().stats.clone()
    }

    pub fn select_job(&self, id: Option<JobId>) {
        self.write().selected = id;
    }

    pub fn selected_job(&self) -> Option<Job> {
        let cache = self.read();
        cache.selected.and_then(|id| cache.job(id).cloned())
    }

    pub fn error(&self) -> Option<String> {
        self.read().error.clone()
    }

    pub fn clear_error(&self) {
        self.write().error = None;
    }

    /// True while any engine call is outstanding.
    pub fn is_loading(&self) -> bool {
        self.read().in_flight > 0
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }
}
