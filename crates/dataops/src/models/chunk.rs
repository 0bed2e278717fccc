use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::file::FileId;

pub type ChunkId = i64;

/// One content segment of a processed file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataChunk {
    pub id: ChunkId,
    pub file_id: FileId,
    /// Zero-based position within the file.
    pub chunk_index: u32,
    pub content: String,
    pub token_count: u32,
    pub has_embedding: bool,
    pub created_at: DateTime<Utc>,
}

/// Sorts chunks into reading order.
pub fn order_chunks(chunks: &mut [DataChunk]) {
    chunks.sort_by_key(|chunk| chunk.chunk_index);
}
