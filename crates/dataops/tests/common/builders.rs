//! Builders for engine records and scripted engine transports.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use dataops::{Invoker, Job, JobId, JobStatus};

/// Builder for `Job` records as the engine would report them.
pub struct JobBuilder {
    job: Job,
}

impl JobBuilder {
    pub fn new(id: JobId) -> Self {
        Self {
            job: Job {
                id,
                name: format!("Data Processing - job {}", id),
                status: JobStatus::Pending,
                progress: 0.0,
                total_files: 0,
                processed_files: 0,
                error_count: 0,
                created_at: Utc.with_ymd_and_hms(2025, 1, 2, 10, 0, 0).unwrap(),
                started_at: None,
                completed_at: None,
                error_message: None,
            },
        }
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.job.status = status;
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.job.progress = progress;
        self
    }

    pub fn files(mut self, total: u64, processed: u64) -> Self {
        self.job.total_files = total;
        self.job.processed_files = processed;
        self
    }

    pub fn errors(mut self, count: u64) -> Self {
        self.job.error_count = count;
        self
    }

    pub fn build(self) -> Job {
        self.job
    }

    pub fn json(self) -> Value {
        serde_json::to_value(self.job).expect("Job serializes")
    }
}

/// Invoker that replays queued responses per command name.
///
/// The last queued response for a command repeats once the queue drains.
/// Commands with nothing queued answer `null`. A per-command latency holds
/// the answer back, so calls can be made to land out of order.
#[derive(Default)]
pub struct QueuedInvoker {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, String>>>>,
    latency: Mutex<HashMap<String, Duration>>,
    seen: Mutex<Vec<String>>,
}

impl QueuedInvoker {
    pub fn push(&self, command: &str, response: Result<Value, String>) {
        self.responses
            .lock()
            .unwrap()
            .entry(command.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_latency(&self, command: &str, latency: Duration) {
        self.latency
            .lock()
            .unwrap()
            .insert(command.to_string(), latency);
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Invoker for QueuedInvoker {
    async fn invoke(&self, command: &str, _args: Value) -> Result<Value, String> {
        self.seen.lock().unwrap().push(command.to_string());

        let latency = self.latency.lock().unwrap().get(command).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut responses = self.responses.lock().unwrap();
        let Some(queue) = responses.get_mut(command) else {
            return Ok(Value::Null);
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or(Ok(Value::Null))
        } else {
            queue.front().cloned().unwrap_or(Ok(Value::Null))
        }
    }
}
