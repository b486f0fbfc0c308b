//! Record types returned by the knowledge store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored text chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    /// Where the chunk came from, usually a document filename.
    pub source: String,
    pub content: String,
    /// Free-form JSON metadata attached at ingest time.
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A chunk returned from a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub chunk: ChunkRecord,
    /// L2 distance from the query (lower = more similar).
    pub distance: f32,
}

/// Summary statistics for a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_chunks: usize,
    pub total_sources: usize,
    /// Rows in the vector table; equals `total_chunks` in a healthy store.
    pub total_embeddings: usize,
    /// sqlite-vec version reported by the loaded extension.
    pub vector_version: String,
    pub dimensions: usize,
    pub embedding_model: Option<String>,
    pub schema_version: i32,
}
