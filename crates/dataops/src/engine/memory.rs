//! In-process engine with deterministic behaviour.
//!
//! Splits file content into word chunks, marks byte-identical content as a
//! duplicate of the first file that carried it, and tracks job lifecycle the
//! way the desktop backend does. Knobs for failure injection and manual
//! progress make it the mock transport for tests.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use super::{Engine, EngineCommand};
use crate::error::EngineError;
use crate::export::ExportFormat;
use crate::models::{
    DataChunk, FileId, FileStatus, Job, JobId, JobStatus, JobUpdate, ProcessedFile,
    ProcessingStats,
};

const DEFAULT_CHUNK_WORDS: usize = 500;
const DEFAULT_CHUNK_OVERLAP: usize = 100;

struct MemoryState {
    next_job_id: JobId,
    next_file_id: FileId,
    next_chunk_id: i64,
    jobs: BTreeMap<JobId, Job>,
    files: Vec<ProcessedFile>,
    chunks: Vec<DataChunk>,
    /// Content hash to the canonical (first) file that carried it.
    content_index: HashMap<u64, FileId>,
    /// Text of each canonical file, kept to re-chunk a promoted duplicate.
    texts: HashMap<FileId, String>,
    failures: HashMap<EngineCommand, String>,
    calls: Vec<EngineCommand>,
    processing_delay: Option<Duration>,
    complete_on_process: bool,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            next_job_id: 1,
            next_file_id: 1,
            next_chunk_id: 1,
            jobs: BTreeMap::new(),
            files: Vec::new(),
            chunks: Vec::new(),
            content_index: HashMap::new(),
            texts: HashMap::new(),
            failures: HashMap::new(),
            calls: Vec::new(),
            processing_delay: None,
            complete_on_process: true,
        }
    }
}

/// In-memory [`Engine`].
pub struct MemoryEngine {
    state: Mutex<MemoryState>,
    chunk_words: usize,
    chunk_overlap: usize,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            chunk_words: DEFAULT_CHUNK_WORDS,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    /// Sets the chunk size in words and the overlap between neighbours.
    ///
    /// The overlap is clamped below the chunk size.
    pub fn with_chunking(mut self, words: usize, overlap: usize) -> Self {
        self.chunk_words = words.max(1);
        self.chunk_overlap = overlap.min(self.chunk_words - 1);
        self
    }

    /// Leaves jobs running after `process_files` instead of completing them.
    pub fn with_manual_completion(self) -> Self {
        self.state().complete_on_process = false;
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Memory engine lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Makes every call of `command` reject with `message` until cleared.
    pub fn fail_on(&self, command: EngineCommand, message: impl Into<String>) {
        self.state().failures.insert(command, message.into());
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Delays `process_files` before any work happens.
    pub fn set_processing_delay(&self, delay: Option<Duration>) {
        self.state().processing_delay = delay;
    }

    /// Commands received so far, in order.
    pub fn calls(&self) -> Vec<EngineCommand> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, command: EngineCommand) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|seen| **seen == command)
            .count()
    }

    /// Moves a running job's progress, as the backend would while working.
    ///
    /// Ignored for jobs that are not running.
    pub fn advance(&self, job_id: JobId, progress: f64) {
        let mut state = self.state();
        if let Some(job) = state.jobs.get_mut(&job_id) {
            if job.status == JobStatus::Running {
                job.progress = progress.clamp(0.0, 100.0);
                job.processed_files =
                    ((job.total_files as f64) * job.progress / 100.0).floor() as u64;
            }
        }
    }

    /// Completes a running job.
    pub fn complete(&self, job_id: JobId) {
        let mut state = self.state();
        if let Some(job) = state.jobs.get_mut(&job_id) {
            if job.status == JobStatus::Running {
                finish(job);
            }
        }
    }

    /// Snapshot of a job without recording a call.
    pub fn peek_job(&self, job_id: JobId) -> Option<Job> {
        self.state().jobs.get(&job_id).cloned()
    }

    /// Records the call and applies any injected failure.
    fn enter(&self, command: EngineCommand) -> Result<MutexGuard<'_, MemoryState>, EngineError> {
        let mut state = self.state();
        state.calls.push(command);
        match state.failures.get(&command) {
            Some(message) => Err(EngineError::Rejected {
                command,
                message: message.clone(),
            }),
            None => Ok(state),
        }
    }

    fn chunk_text(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let step = self.chunk_words - self.chunk_overlap;
        let mut pieces = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.chunk_words).min(words.len());
            pieces.push(words[start..end].join(" "));
            if end == words.len() {
                break;
            }
            start += step;
        }

        pieces
    }

    /// Chunks `text` into `file_id`'s chunks and returns how many were stored.
    fn store_chunks(&self, state: &mut MemoryState, file_id: FileId, text: &str) -> u64 {
        let mut stored = 0u64;
        for (index, content) in self.chunk_text(text).into_iter().enumerate() {
            let chunk_id = state.next_chunk_id;
            state.next_chunk_id += 1;
            state.chunks.push(DataChunk {
                id: chunk_id,
                file_id,
                chunk_index: index as u32,
                token_count: content.split_whitespace().count() as u32,
                has_embedding: true,
                content,
                created_at: Utc::now(),
            });
            stored += 1;
        }
        stored
    }

    /// Makes the oldest surviving duplicate of a deleted canonical file the
    /// new canonical, re-chunking its content and repointing the others.
    fn promote_duplicate(&self, state: &mut MemoryState, canonical: FileId) {
        let text = state.texts.remove(&canonical);
        let survivors: Vec<FileId> = state
            .files
            .iter()
            .filter(|file| file.duplicate_of == Some(canonical))
            .map(|file| file.id)
            .collect();
        let Some((&heir, rest)) = survivors.split_first() else {
            return;
        };

        let chunks_count = match &text {
            Some(text) => self.store_chunks(state, heir, text),
            None => 0,
        };
        for file in state.files.iter_mut() {
            if file.id == heir {
                file.is_duplicate = false;
                file.duplicate_of = None;
                file.chunks_count = chunks_count;
                file.has_embeddings = chunks_count > 0;
            } else if rest.contains(&file.id) {
                file.duplicate_of = Some(heir);
            }
        }
        for target in state.content_index.values_mut() {
            if *target == canonical {
                *target = heir;
            }
        }
        if let Some(text) = text {
            state.texts.insert(heir, text);
        }
        tracing::debug!(canonical, heir, "Promoted duplicate to canonical file");
    }
}

fn not_found(command: EngineCommand, what: &str, id: i64) -> EngineError {
    EngineError::Rejected {
        command,
        message: format!("{} not found: {}", what, id),
    }
}

fn finish(job: &mut Job) {
    job.progress = 100.0;
    job.processed_files = job.total_files;
    job.completed_at = Some(Utc::now());
    if job.total_files > 0 && job.error_count >= job.total_files {
        job.status = JobStatus::Failed;
        job.error_message = Some("No files could be processed".to_string());
    } else {
        job.status = JobStatus::Completed;
    }
}

fn content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn create_job(&self, name: &str) -> Result<Job, EngineError> {
        let mut state = self.enter(EngineCommand::CreateJob)?;
        let id = state.next_job_id;
        state.next_job_id += 1;

        let job = Job {
            id,
            name: name.to_string(),
            status: JobStatus::Pending,
            progress: 0.0,
            total_files: 0,
            processed_files: 0,
            error_count: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        };
        state.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: JobId) -> Result<Job, EngineError> {
        let state = self.enter(EngineCommand::GetJob)?;
        state
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(EngineCommand::GetJob, "Job", id))
    }

    async fn list_jobs(&self, limit: Option<u32>) -> Result<Vec<Job>, EngineError> {
        let state = self.enter(EngineCommand::ListJobs)?;
        let newest_first = state.jobs.values().rev().cloned();
        Ok(match limit {
            Some(limit) => newest_first.take(limit as usize).collect(),
            None => newest_first.collect(),
        })
    }

    async fn update_job(&self, id: JobId, update: &JobUpdate) -> Result<Job, EngineError> {
        let mut state = self.enter(EngineCommand::UpdateJob)?;
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| not_found(EngineCommand::UpdateJob, "Job", id))?;
        update.apply_to(job);
        Ok(job.clone())
    }

    async fn delete_job(&self, id: JobId) -> Result<(), EngineError> {
        let mut state = self.enter(EngineCommand::DeleteJob)?;
        if state.jobs.remove(&id).is_none() {
            return Err(not_found(EngineCommand::DeleteJob, "Job", id));
        }

        let removed: Vec<FileId> = state
            .files
            .iter()
            .filter(|file| file.job_id == id)
            .map(|file| file.id)
            .collect();
        state.files.retain(|file| file.job_id != id);
        state.chunks.retain(|chunk| !removed.contains(&chunk.file_id));
        for &file_id in &removed {
            self.promote_duplicate(&mut state, file_id);
        }
        state
            .content_index
            .retain(|_, canonical| !removed.contains(canonical));
        Ok(())
    }

    async fn start_job(&self, id: JobId) -> Result<(), EngineError> {
        let mut state = self.enter(EngineCommand::StartJob)?;
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| not_found(EngineCommand::StartJob, "Job", id))?;

        if job.status.is_terminal() {
            return Err(EngineError::Rejected {
                command: EngineCommand::StartJob,
                message: format!("Job {} is already {}", id, job.status),
            });
        }
        if job.status == JobStatus::Pending {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn cancel_job(&self, id: JobId) -> Result<Job, EngineError> {
        let mut state = self.enter(EngineCommand::CancelJob)?;
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| not_found(EngineCommand::CancelJob, "Job", id))?;

        if !job.status.is_terminal() {
            job.status = JobStatus::Cancelled;
            job.completed_at = Some(Utc::now());
        }
        Ok(job.clone())
    }

    async fn process_files(&self, job_id: JobId, paths: &[PathBuf]) -> Result<(), EngineError> {
        let delay = {
            let state = self.enter(EngineCommand::ProcessFiles)?;
            if !state.jobs.contains_key(&job_id) {
                return Err(not_found(EngineCommand::ProcessFiles, "Job", job_id));
            }
            state.processing_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut contents = Vec::with_capacity(paths.len());
        for path in paths {
            let read = tokio::fs::read(path).await;
            if let Err(e) = &read {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read staged file");
            }
            contents.push((path, read.ok()));
        }

        let mut state = self.state();
        let complete_on_process = state.complete_on_process;
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| not_found(EngineCommand::ProcessFiles, "Job", job_id))?;
        if job.status.is_terminal() {
            return Err(EngineError::Rejected {
                command: EngineCommand::ProcessFiles,
                message: format!("Job {} is already {}", job_id, job.status),
            });
        }
        job.status = JobStatus::Running;
        job.started_at.get_or_insert_with(Utc::now);
        job.total_files += paths.len() as u64;

        let mut errors = 0u64;
        for (path, bytes) in contents {
            let Some(bytes) = bytes else {
                errors += 1;
                continue;
            };

            let file_id = state.next_file_id;
            state.next_file_id += 1;

            let hash = content_hash(&bytes);
            let duplicate_of = state.content_index.get(&hash).copied();
            if duplicate_of.is_none() {
                state.content_index.insert(hash, file_id);
            }

            let mut chunks_count = 0u64;
            if duplicate_of.is_none() {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                chunks_count = self.store_chunks(&mut state, file_id, &text);
                state.texts.insert(file_id, text);
            }

            let now = Utc::now();
            state.files.push(ProcessedFile {
                id: file_id,
                job_id,
                original_path: path.to_string_lossy().into_owned(),
                filename: file_name(path),
                file_size: bytes.len() as u64,
                mime_type: mime_guess::from_path(path)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string(),
                status: FileStatus::Completed,
                chunks_count,
                has_embeddings: chunks_count > 0,
                is_duplicate: duplicate_of.is_some(),
                duplicate_of,
                metadata: Some(json!({ "source_path": path.to_string_lossy() })),
                created_at: now,
                processed_at: Some(now),
            });
        }

        let Some(job) = state.jobs.get_mut(&job_id) else {
            return Err(not_found(EngineCommand::ProcessFiles, "Job", job_id));
        };
        job.error_count += errors;
        if complete_on_process {
            finish(job);
        } else {
            job.processed_files = (paths.len() as u64).min(job.total_files);
            job.progress = if job.total_files == 0 {
                0.0
            } else {
                job.processed_files as f64 * 100.0 / job.total_files as f64
            }
            .min(99.0);
        }
        Ok(())
    }

    async fn processed_files(&self, job_id: JobId) -> Result<Vec<ProcessedFile>, EngineError> {
        let state = self.enter(EngineCommand::GetProcessedFiles)?;
        Ok(state
            .files
            .iter()
            .filter(|file| file.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn data_chunks(&self, file_id: FileId) -> Result<Vec<DataChunk>, EngineError> {
        let state = self.enter(EngineCommand::GetDataChunks)?;
        let mut chunks: Vec<DataChunk> = state
            .chunks
            .iter()
            .filter(|chunk| chunk.file_id == file_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|chunk| chunk.chunk_index);
        Ok(chunks)
    }

    async fn stats(&self) -> Result<ProcessingStats, EngineError> {
        let state = self.enter(EngineCommand::GetStats)?;
        let count = |status: JobStatus| {
            state
                .jobs
                .values()
                .filter(|job| job.status == status)
                .count() as u64
        };

        Ok(ProcessingStats {
            total_jobs: state.jobs.len() as u64,
            pending_jobs: count(JobStatus::Pending),
            running_jobs: count(JobStatus::Running),
            completed_jobs: count(JobStatus::Completed),
            failed_jobs: count(JobStatus::Failed),
            cancelled_jobs: count(JobStatus::Cancelled),
            total_files_processed: state.files.len() as u64,
            total_chunks_created: state.chunks.len() as u64,
            total_embeddings_generated: state
                .chunks
                .iter()
                .filter(|chunk| chunk.has_embedding)
                .count() as u64,
            total_duplicates_found: state.files.iter().filter(|file| file.is_duplicate).count()
                as u64,
            total_errors: state.jobs.values().map(|job| job.error_count).sum(),
        })
    }

    async fn export(&self, job_id: JobId, format: ExportFormat) -> Result<String, EngineError> {
        let state = self.enter(EngineCommand::ExportProcessedData)?;
        if !state.jobs.contains_key(&job_id) {
            return Err(not_found(EngineCommand::ExportProcessedData, "Job", job_id));
        }

        let files: Vec<&ProcessedFile> = state
            .files
            .iter()
            .filter(|file| file.job_id == job_id)
            .collect();

        let artifact = match format {
            ExportFormat::Lines => {
                let mut out = String::new();
                for file in &files {
                    let mut chunks: Vec<&DataChunk> = state
                        .chunks
                        .iter()
                        .filter(|chunk| chunk.file_id == file.id)
                        .collect();
                    chunks.sort_by_key(|chunk| chunk.chunk_index);
                    for chunk in chunks {
                        let line = json!({
                            "id": chunk.id,
                            "text": chunk.content,
                            "metadata": {
                                "file_id": chunk.file_id,
                                "chunk_index": chunk.chunk_index,
                                "created_at": chunk.created_at.to_rfc3339(),
                            }
                        });
                        out.push_str(&line.to_string());
                        out.push('\n');
                    }
                }
                out
            }
            ExportFormat::Table => {
                let mut out = String::from(
                    "id,filename,file_size,mime_type,status,chunks_count,has_embeddings,created_at\n",
                );
                for file in &files {
                    out.push_str(&format!(
                        "{},{},{},{},{},{},{},{}\n",
                        file.id,
                        file.filename,
                        file.file_size,
                        file.mime_type,
                        status_label(file.status),
                        file.chunks_count,
                        file.has_embeddings,
                        file.created_at.to_rfc3339()
                    ));
                }
                out
            }
            ExportFormat::Markdown => {
                let mut out = String::from("# Processed Files\n\n");
                for file in &files {
                    out.push_str(&format!("## {}\n\n", file.filename));
                    out.push_str(&format!("- **Size**: {} bytes\n", file.file_size));
                    out.push_str(&format!("- **Type**: {}\n", file.mime_type));
                    out.push_str(&format!("- **Status**: {}\n", status_label(file.status)));
                    out.push_str(&format!("- **Chunks**: {}\n", file.chunks_count));
                    out.push_str(&format!("- **Has Embeddings**: {}\n", file.has_embeddings));
                    out.push_str(&format!(
                        "- **Created**: {}\n\n",
                        file.created_at.to_rfc3339()
                    ));
                }
                out
            }
        };

        Ok(artifact)
    }
}

fn status_label(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Pending => "pending",
        FileStatus::Processing => "processing",
        FileStatus::Completed => "completed",
        FileStatus::Failed => "failed",
        FileStatus::Unknown => "unknown",
    }
}
