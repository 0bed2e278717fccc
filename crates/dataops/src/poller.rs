//! Fixed-interval refresh of the job list and aggregate stats.
//!
//! Polling, not push: every tick spawns its own refresh, so a slow engine can
//! see overlapping polls. A listing that lands after a newer single-job read
//! cannot move that job backwards in the registry's cache.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::registry::JobRegistry;

pub struct ProgressPoller {
    registry: Arc<JobRegistry>,
    interval: Duration,
}

impl ProgressPoller {
    pub fn new(registry: Arc<JobRegistry>, interval: Duration) -> Self {
        Self { registry, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts the loop on the current tokio runtime.
    ///
    /// The first poll happens one interval after start; callers wanting an
    /// immediate read refresh the registry themselves.
    pub fn start(&self) -> PollerHandle {
        let registry = Arc::clone(&self.registry);
        let interval = self.interval;
        let shutdown = Arc::new(AtomicBool::new(false));
        let polls = Arc::new(AtomicU64::new(0));
        let (trigger, mut trigger_rx) = broadcast::channel::<()>(16);

        let task = {
            let shutdown = Arc::clone(&shutdown);
            let polls = Arc::clone(&polls);

            tokio::spawn(async move {
                let mut timer = tokio::time::interval(interval);
                timer.tick().await; // skip immediate first tick

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    tokio::select! {
                        _ = timer.tick() => {},
                        Ok(()) = trigger_rx.recv() => {
                            tracing::debug!("Manual refresh triggered");
                        },
                    }

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    polls.fetch_add(1, Ordering::AcqRel);
                    let registry = Arc::clone(&registry);
                    tokio::spawn(async move {
                        let (jobs, stats) =
                            tokio::join!(registry.refresh_jobs(), registry.refresh_stats());
                        if let Err(e) = jobs {
                            tracing::debug!(error = %e, "Job refresh failed");
                        }
                        if let Err(e) = stats {
                            tracing::debug!(error = %e, "Stats refresh failed");
                        }
                    });
                }
            })
        };

        tracing::debug!(interval_ms = interval.as_millis() as u64, "Progress poller started");

        PollerHandle {
            shutdown,
            trigger,
            polls,
            task: Some(task),
        }
    }
}

/// Owns a running poll loop. Dropping the handle stops it.
pub struct PollerHandle {
    shutdown: Arc<AtomicBool>,
    trigger: broadcast::Sender<()>,
    polls: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stops the loop. Refreshes already issued run to completion.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Progress poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Requests a poll now without waiting for the next tick.
    pub fn trigger(&self) {
        let _ = self.trigger.send(());
    }

    /// Number of polls issued so far.
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Acquire)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
