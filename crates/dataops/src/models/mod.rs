//! Job, file and chunk records shared with the processing engine.

pub mod chunk;
pub mod file;
pub mod invariants;
pub mod job;
pub mod stats;

pub use chunk::{order_chunks, ChunkId, DataChunk};
pub use file::{FileId, FileStatus, ProcessedFile};
pub use invariants::Violation;
pub use job::{Job, JobId, JobStatus, JobUpdate};
pub use stats::ProcessingStats;
