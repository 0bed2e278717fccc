//! View model for the ingestion dashboard.
//!
//! While mounted with auto-refresh on, it owns a [`PollerHandle`]; unmounting
//! or turning auto-refresh off disposes of it.

use std::sync::Arc;
use std::time::Duration;

use crate::config::PollingConfig;
use crate::error::Result;
use crate::models::{Job, JobId, ProcessingStats};
use crate::poller::{PollerHandle, ProgressPoller};
use crate::registry::JobRegistry;

pub struct IngestionDashboard {
    registry: Arc<JobRegistry>,
    poller: ProgressPoller,
    handle: Option<PollerHandle>,
    auto_refresh: bool,
    mounted: bool,
}

impl IngestionDashboard {
    pub fn new(registry: Arc<JobRegistry>, interval: Duration) -> Self {
        Self {
            poller: ProgressPoller::new(Arc::clone(&registry), interval),
            registry,
            handle: None,
            auto_refresh: true,
            mounted: false,
        }
    }

    pub fn from_config(registry: Arc<JobRegistry>, config: &PollingConfig) -> Self {
        let mut dashboard = Self::new(registry, config.interval());
        dashboard.auto_refresh = config.auto_refresh;
        dashboard
    }

    /// Loads jobs and stats once, then starts polling if auto-refresh is on.
    ///
    /// A failed initial load is recorded in the registry's error and does not
    /// prevent polling from starting.
    pub async fn mount(&mut self) {
        self.mounted = true;
        self.refresh().await;
        self.sync_poller();
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
        self.sync_poller();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn set_auto_refresh(&mut self, enabled: bool) {
        self.auto_refresh = enabled;
        self.sync_poller();
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn is_polling(&self) -> bool {
        self.handle.as_ref().is_some_and(PollerHandle::is_running)
    }

    fn sync_poller(&mut self) {
        let wanted = self.mounted && self.auto_refresh;
        match (&self.handle, wanted) {
            (None, true) => self.handle = Some(self.poller.start()),
            (Some(_), false) => {
                if let Some(mut handle) = self.handle.take() {
                    handle.stop();
                }
            }
            _ => {}
        }
    }

    /// Re-reads jobs and stats. Failures land in the registry's shared error.
    pub async fn refresh(&self) {
        let (jobs, stats) = tokio::join!(self.registry.refresh_jobs(), self.registry.refresh_stats());
        if let Err(e) = jobs {
            tracing::debug!(error = %e, "Dashboard job refresh failed");
        }
        if let Err(e) = stats {
            tracing::debug!(error = %e, "Dashboard stats refresh failed");
        }
    }

    pub async fn start_job(&self, id: JobId) -> Result<Job> {
        let job = self.registry.start_job(id).await?;
        self.refresh_jobs_after_action().await;
        Ok(job)
    }

    pub async fn cancel_job(&self, id: JobId) -> Result<Job> {
        let job = self.registry.cancel_job(id).await?;
        self.refresh_jobs_after_action().await;
        Ok(job)
    }

    pub async fn delete_job(&self, id: JobId) -> Result<()> {
        self.registry.delete_job(id).await?;
        self.refresh_jobs_after_action().await;
        Ok(())
    }

    async fn refresh_jobs_after_action(&self) {
        if let Err(e) = self.registry.refresh_jobs().await {
            tracing::debug!(error = %e, "Job refresh after action failed");
        }
    }

    pub fn select(&self, id: Option<JobId>) {
        self.registry.select_job(id);
    }

    pub fn selected_job(&self) -> Option<Job> {
        self.registry.selected_job()
    }

    pub fn jobs(&self) -> Vec<Job> {
        self.registry.jobs()
    }

    pub fn stats(&self) -> Option<ProcessingStats> {
        self.registry.stats()
    }

    pub fn error(&self) -> Option<String> {
        self.registry.error()
    }

    pub fn is_loading(&self) -> bool {
        self.registry.is_loading()
    }
}

impl Drop for IngestionDashboard {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineCommand, MemoryEngine};

    fn dashboard() -> (Arc<MemoryEngine>, Arc<JobRegistry>, IngestionDashboard) {
        let engine = Arc::new(MemoryEngine::new());
        let registry = Arc::new(JobRegistry::new(engine.clone()));
        let dashboard = IngestionDashboard::new(Arc::clone(&registry), Duration::from_secs(2));
        (engine, registry, dashboard)
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_refreshes_then_polls() {
        let (engine, _, mut dashboard) = dashboard();
        dashboard.mount().await;
        assert_eq!(engine.call_count(EngineCommand::ListJobs), 1);
        assert_eq!(engine.call_count(EngineCommand::GetStats), 1);
        assert!(dashboard.is_polling());
        assert!(dashboard.stats().is_some());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(engine.call_count(EngineCommand::ListJobs), 2);

        dashboard.unmount();
        assert!(!dashboard.is_polling());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(engine.call_count(EngineCommand::ListJobs), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_refresh_toggle() {
        let (engine, _, mut dashboard) = dashboard();
        dashboard.set_auto_refresh(false);
        dashboard.mount().await;
        assert!(!dashboard.is_polling());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(engine.call_count(EngineCommand::ListJobs), 1);

        dashboard.set_auto_refresh(true);
        assert!(dashboard.is_polling());
    }

    #[tokio::test]
    async fn test_actions_refresh_job_list() {
        let (engine, registry, dashboard) = dashboard();
        let job = registry.create_job("run").await.unwrap();

        dashboard.start_job(job.id).await.unwrap();
        dashboard.cancel_job(job.id).await.unwrap();
        dashboard.delete_job(job.id).await.unwrap();

        assert_eq!(engine.call_count(EngineCommand::ListJobs), 3);
        assert!(dashboard.jobs().is_empty());
    }

    #[tokio::test]
    async fn test_failed_action_skips_refresh() {
        let (engine, _, dashboard) = dashboard();
        assert!(dashboard.cancel_job(404).await.is_err());
        assert_eq!(engine.call_count(EngineCommand::ListJobs), 0);
        assert!(dashboard.error().unwrap().contains("Job not found: 404"));
    }
}
