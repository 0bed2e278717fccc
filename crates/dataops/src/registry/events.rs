//! Change notifications published by the job registry.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::models::{Job, JobId, ProcessingStats};

/// A change to the registry's cached view.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryEvent {
    /// The job list was re-read; carries the number of cached jobs.
    JobsRefreshed { count: usize },
    /// A single job was created or re-read.
    JobUpdated(Job),
    JobRemoved(JobId),
    StatsRefreshed(ProcessingStats),
    /// The shared error message was set.
    Error(String),
}

/// Fan-out of registry events to any number of views.
#[derive(Clone)]
pub struct RegistryBroadcaster {
    sender: Arc<broadcast::Sender<RegistryEvent>>,
}

impl RegistryBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: RegistryEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }
}

impl Default for RegistryBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
