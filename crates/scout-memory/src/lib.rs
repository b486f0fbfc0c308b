//! Knowledge storage for Scout.
//!
//! Documents are split into chunks, embedded, and stored in SQLite with a
//! sqlite-vec index over the embeddings. Retrieval is nearest-neighbour
//! search by L2 distance.
//!
//! ```text
//! ┌───────────────┐   add_chunks   ┌──────────────────────────────┐
//! │ DocumentReader│ ─────────────▶ │ writer (Mutex<Connection>)   │
//! └───────────────┘                │  chunks + chunk_embeddings   │
//!                                  └──────────────────────────────┘
//! ┌───────────────┐    search      ┌──────────────────────────────┐
//! │ KnowledgeBase │ ────────────▶ │ reader pool (WAL snapshots)  │
//! └───────────────┘                └──────────────────────────────┘
//! ```

pub mod error;
pub mod store;
pub mod types;
pub mod vector;

pub use error::{MemoryError, Result};
pub use store::{DEFAULT_READER_POOL, KnowledgeStore};
pub use types::{ChunkMatch, ChunkRecord, StoreStats};
pub use vector::DEFAULT_EMBEDDING_DIMS;
