//! Knowledge store backed by SQLite and sqlite-vec.
//!
//! One writer connection sits behind a mutex so inserts never interleave.
//! File-backed stores also keep a small pool of reader connections; WAL
//! journaling lets those search while a write is in flight. In-memory stores
//! cannot share a database across connections, so reads go through the writer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::error::{MemoryError, Result};
use crate::types::{ChunkMatch, ChunkRecord, StoreStats};
use crate::vector;

/// Current schema version.
const SCHEMA_VERSION: i32 = 1;

/// Reader connections opened for a file-backed store.
pub const DEFAULT_READER_POOL: usize = 4;

const META_DIMENSIONS: &str = "embedding.dimensions";
const META_MODEL: &str = "embedding.model";

// ─────────────────────────────────────────────────────────────────────────────
// Knowledge Store
// ─────────────────────────────────────────────────────────────────────────────

/// Chunk storage with vector similarity search.
pub struct KnowledgeStore {
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    next_reader: AtomicUsize,
    dims: usize,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("path", &self.path)
            .field("dims", &self.dims)
            .field("readers", &self.readers.len())
            .finish_non_exhaustive()
    }
}

impl KnowledgeStore {
    /// Open or create a store at `path` for embeddings of `dims` dimensions.
    ///
    /// Fails with [`MemoryError::DimensionMismatch`] if the file was created
    /// for a different embedding size.
    pub fn open(path: impl AsRef<Path>, dims: usize, embedding_model: &str) -> Result<Self> {
        Self::open_with_readers(path, dims, embedding_model, DEFAULT_READER_POOL)
    }

    /// Open a file-backed store with an explicit reader pool size.
    pub fn open_with_readers(
        path: impl AsRef<Path>,
        dims: usize,
        embedding_model: &str,
        readers: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        vector::init_vector_extension();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|_| {
                MemoryError::Database(rusqlite::Error::InvalidPath(path.to_path_buf()))
            })?;
        }

        let writer = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        writer.pragma_update(None, "journal_mode", "WAL")?;
        writer.pragma_update(None, "synchronous", "NORMAL")?;
        writer.busy_timeout(std::time::Duration::from_secs(5))?;
        initialize(&writer, dims, embedding_model)?;

        let readers = (0..readers)
            .map(|_| -> Result<Mutex<Connection>> {
                let conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                conn.busy_timeout(std::time::Duration::from_secs(5))?;
                Ok(Mutex::new(conn))
            })
            .collect::<Result<Vec<_>>>()?;

        info!(path = %path.display(), dims, readers = readers.len(), "Knowledge store opened");

        Ok(Self {
            writer: Mutex::new(writer),
            readers,
            next_reader: AtomicUsize::new(0),
            dims,
            path: Some(path.to_path_buf()),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory(dims: usize, embedding_model: &str) -> Result<Self> {
        vector::init_vector_extension();
        let conn = Connection::open_in_memory()?;
        initialize(&conn, dims, embedding_model)?;

        debug!(dims, "In-memory knowledge store created");
        Ok(Self {
            writer: Mutex::new(conn),
            readers: Vec::new(),
            next_reader: AtomicUsize::new(0),
            dims,
            path: None,
        })
    }

    /// Embedding dimensions this store accepts.
    pub fn dimensions(&self) -> usize {
        self.dims
    }

    /// Database file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn reader(&self) -> MutexGuard<'_, Connection> {
        if self.readers.is_empty() {
            return self.writer.lock();
        }
        let i = self.next_reader.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        self.readers[i].lock()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Store chunks of one source with their embeddings.
    ///
    /// Every chunk gets `metadata` plus its `chunk_index`. All rows land in a
    /// single transaction. Returns the number of chunks stored.
    pub fn add_chunks(
        &self,
        source: &str,
        chunks: &[String],
        embeddings: &[Vec<f32>],
        metadata: &serde_json::Value,
    ) -> Result<usize> {
        self.write_chunks(source, chunks, embeddings, metadata, false)
    }

    /// Replace every chunk of `source` with the given chunks in one transaction.
    ///
    /// Re-reading a document goes through here so its chunks are not duplicated.
    pub fn replace_source(
        &self,
        source: &str,
        chunks: &[String],
        embeddings: &[Vec<f32>],
        metadata: &serde_json::Value,
    ) -> Result<usize> {
        self.write_chunks(source, chunks, embeddings, metadata, true)
    }

    fn write_chunks(
        &self,
        source: &str,
        chunks: &[String],
        embeddings: &[Vec<f32>],
        metadata: &serde_json::Value,
        replace: bool,
    ) -> Result<usize> {
        if chunks.len() != embeddings.len() {
            return Err(MemoryError::InvalidData(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dims) {
            return Err(MemoryError::InvalidData(format!(
                "embedding has {} dimensions, store expects {}",
                bad.len(),
                self.dims
            )));
        }
        if chunks.is_empty() && !replace {
            return Ok(0);
        }

        let mut conn = self.writer.lock();
        let tx = conn.transaction()?;

        let removed = if replace {
            delete_source(&tx, source)?
        } else {
            0
        };

        let now = Utc::now().to_rfc3339();
        for (index, (content, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            let id = uuid::Uuid::new_v4().to_string();
            let chunk_metadata = with_chunk_index(metadata, index);
            tx.execute(
                "INSERT INTO chunks (id, source, content, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    source,
                    content,
                    serde_json::to_string(&chunk_metadata)?,
                    now
                ],
            )?;
            vector::store_embedding(&tx, &id, embedding)?;
        }

        tx.commit()?;
        info!(source, chunks = chunks.len(), replaced = removed, "Stored chunks");
        Ok(chunks.len())
    }

    /// Remove every chunk of a source. Returns the number removed.
    pub fn remove_source(&self, source: &str) -> Result<usize> {
        let mut conn = self.writer.lock();
        let tx = conn.transaction()?;
        let removed = delete_source(&tx, source)?;
        tx.commit()?;

        debug!(source, removed, "Removed source");
        Ok(removed)
    }

    /// Delete every chunk and embedding.
    pub fn clear(&self) -> Result<usize> {
        let conn = self.writer.lock();
        let removed: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        conn.execute_batch("DELETE FROM chunks")?;
        vector::reset_vector_table(&conn, self.dims)?;

        warn!(removed, "Knowledge store cleared");
        Ok(removed as usize)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// The `k` chunks nearest to `query_embedding`, closest first.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<ChunkMatch>> {
        if query_embedding.len() != self.dims {
            return Err(MemoryError::DimensionMismatch {
                expected: self.dims,
                actual: query_embedding.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.reader();
        let hits = vector::search_similar(&conn, query_embedding, k)?;

        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            match find_chunk(&conn, &hit.chunk_id)? {
                Some(chunk) => matches.push(ChunkMatch {
                    chunk,
                    distance: hit.distance,
                }),
                None => warn!(chunk_id = %hit.chunk_id, "Embedding without chunk row"),
            }
        }
        Ok(matches)
    }

    /// Distinct sources in insertion order.
    pub fn sources(&self) -> Result<Vec<String>> {
        let conn = self.reader();
        let mut stmt = conn.prepare(
            "SELECT source FROM chunks GROUP BY source ORDER BY MIN(created_at), MIN(rowid)",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Number of stored chunks.
    pub fn count(&self) -> Result<usize> {
        let conn = self.reader();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Summary statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.reader();
        let total_chunks: i64 =
            conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        let total_sources: i64 = conn.query_row(
            "SELECT COUNT(DISTINCT source) FROM chunks",
            [],
            |row| row.get(0),
        )?;
        let embedding_model = get_meta(&conn, META_MODEL)?;
        let schema_version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        let total_embeddings = vector::count_embeddings(&conn)?;
        let vector_version = vector::check_vector_extension(&conn)?;

        Ok(StoreStats {
            total_chunks: total_chunks as usize,
            total_sources: total_sources as usize,
            total_embeddings,
            vector_version,
            dimensions: self.dims,
            embedding_model,
            schema_version,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Schema
// ─────────────────────────────────────────────────────────────────────────────

fn initialize(conn: &Connection, dims: usize, embedding_model: &str) -> Result<()> {
    let current_version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if current_version < SCHEMA_VERSION {
        info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrating knowledge store schema"
        );
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                source TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    if let Some(stored) = get_meta(conn, META_DIMENSIONS)? {
        let stored: usize = stored
            .parse()
            .map_err(|_| MemoryError::InvalidData(format!("bad stored dimensions '{}'", stored)))?;
        if stored != dims {
            return Err(MemoryError::DimensionMismatch {
                expected: stored,
                actual: dims,
            });
        }
    }

    if let Some(model) = get_meta(conn, META_MODEL)?
        && model != embedding_model
    {
        warn!(
            stored = %model,
            configured = %embedding_model,
            "Embedding model changed; existing chunks were embedded with a different model"
        );
    }

    vector::create_vector_table(conn, dims)?;
    set_meta(conn, META_DIMENSIONS, &dims.to_string())?;
    set_meta(conn, META_MODEL, embedding_model)?;
    Ok(())
}

fn delete_source(conn: &Connection, source: &str) -> Result<usize> {
    let ids: Vec<String> = {
        let mut stmt = conn.prepare("SELECT id FROM chunks WHERE source = ?1")?;
        let rows = stmt.query_map(params![source], |row| row.get(0))?;
        rows.collect::<std::result::Result<_, _>>()?
    };
    for id in &ids {
        vector::delete_embedding(conn, id)?;
    }
    conn.execute("DELETE FROM chunks WHERE source = ?1", params![source])?;
    Ok(ids.len())
}

fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?)
}

fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

fn with_chunk_index(metadata: &serde_json::Value, index: usize) -> serde_json::Value {
    let mut object = match metadata {
        serde_json::Value::Object(map) => map.clone(),
        serde_json::Value::Null => serde_json::Map::new(),
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    };
    object.insert("chunk_index".to_string(), serde_json::json!(index));
    serde_json::Value::Object(object)
}

fn find_chunk(conn: &Connection, id: &str) -> Result<Option<ChunkRecord>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, source, content, metadata, created_at FROM chunks WHERE id = ?1",
    )?;
    Ok(stmt.query_row(params![id], row_to_chunk).optional()?)
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkRecord> {
    let metadata: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(ChunkRecord {
        id: row.get(0)?,
        source: row.get(1)?,
        content: row.get(2)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
