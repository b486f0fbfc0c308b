//! Vector storage and similarity search using sqlite-vec.
//!
//! Chunk embeddings live in a `vec0` virtual table keyed by chunk id.
//! Distances are L2, so lower means more similar.

use std::sync::Once;

use rusqlite::{Connection, params};
use tracing::{debug, info};
use zerocopy::IntoBytes;

use crate::error::Result;

/// Default embedding dimensions (MiniLM-L6-v2 produces 384-dim vectors).
pub const DEFAULT_EMBEDDING_DIMS: usize = 384;

static VEC_INIT: Once = Once::new();

/// Register sqlite-vec as an auto extension.
///
/// Applies to every connection opened afterwards, so it must run before the
/// store opens its writer and readers.
pub fn init_vector_extension() {
    VEC_INIT.call_once(|| {
        use rusqlite::ffi::sqlite3_auto_extension;
        use sqlite_vec::sqlite3_vec_init;

        unsafe {
            #[allow(clippy::missing_transmute_annotations)]
            sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())));
        }
    });
}

/// Version string reported by the loaded extension.
pub fn check_vector_extension(conn: &Connection) -> Result<String> {
    let version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
    Ok(version)
}

/// Create the chunk embeddings table.
pub fn create_vector_table(conn: &Connection, dims: usize) -> Result<()> {
    let sql = format!(
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS chunk_embeddings USING vec0(
            chunk_id TEXT PRIMARY KEY,
            embedding float[{dims}]
        )
        "#
    );

    conn.execute_batch(&sql)?;
    debug!(dims, "chunk_embeddings table ready");
    Ok(())
}

/// Drop and recreate the embeddings table, discarding every vector.
pub fn reset_vector_table(conn: &Connection, dims: usize) -> Result<()> {
    conn.execute_batch("DROP TABLE IF EXISTS chunk_embeddings")?;
    create_vector_table(conn, dims)?;
    info!(dims, "Reset chunk_embeddings table");
    Ok(())
}

/// Store an embedding for a chunk.
pub fn store_embedding(conn: &Connection, chunk_id: &str, embedding: &[f32]) -> Result<()> {
    conn.execute(
        "INSERT INTO chunk_embeddings (chunk_id, embedding) VALUES (?1, ?2)",
        params![chunk_id, embedding.as_bytes()],
    )?;
    Ok(())
}

/// Delete the embedding for a chunk.
pub fn delete_embedding(conn: &Connection, chunk_id: &str) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM chunk_embeddings WHERE chunk_id = ?1",
        params![chunk_id],
    )?;
    Ok(rows > 0)
}

/// Result of a similarity search.
#[derive(Debug, Clone)]
pub struct SimilarityResult {
    pub chunk_id: String,
    /// Distance from the query vector (lower = more similar).
    pub distance: f32,
}

/// Top-`limit` chunk ids nearest to the query, ordered by distance ascending.
pub fn search_similar(
    conn: &Connection,
    query_embedding: &[f32],
    limit: usize,
) -> Result<Vec<SimilarityResult>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT chunk_id, distance
        FROM chunk_embeddings
        WHERE embedding MATCH ?1
        ORDER BY distance
        LIMIT ?2
        "#,
    )?;

    let rows = stmt.query_map(params![query_embedding.as_bytes(), limit as i64], |row| {
        Ok(SimilarityResult {
            chunk_id: row.get(0)?,
            distance: row.get(1)?,
        })
    })?;

    let results = rows.collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(found = results.len(), limit, "Vector search complete");
    Ok(results)
}

/// Count stored embeddings.
pub fn count_embeddings(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunk_embeddings", [], |row| {
        row.get(0)
    })?;
    Ok(count as usize)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
