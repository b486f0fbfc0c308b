//! Knowledge base: an embedder in front of the chunk store.
//!
//! Store calls are synchronous SQLite work, so they run on the blocking pool.
//! The store serializes writers itself; any number of sessions may search
//! concurrently.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use scout_llm::SharedEmbedder;
use scout_memory::KnowledgeStore;

use crate::error::{AgentError, Result};

/// Default number of passages returned per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Content shown per passage when formatting results.
const PREVIEW_CHARS: usize = 500;

/// A passage returned from the knowledge base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrieved {
    pub text: String,
    pub source: String,
    pub metadata: serde_json::Value,
    /// L2 distance, lower is more similar.
    pub score: f32,
}

/// Embedding-backed passage store.
#[derive(Clone)]
pub struct KnowledgeBase {
    embedder: SharedEmbedder,
    store: Arc<KnowledgeStore>,
    top_k: usize,
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("embedder", &self.embedder.name())
            .field("store", &self.store)
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl KnowledgeBase {
    /// Fails if the embedder and store disagree on vector size.
    pub fn new(embedder: SharedEmbedder, store: Arc<KnowledgeStore>) -> Result<Self> {
        if embedder.dimensions() != store.dimensions() {
            return Err(AgentError::config(format!(
                "embedder '{}' produces {} dimensions but the store expects {}",
                embedder.name(),
                embedder.dimensions(),
                store.dimensions()
            )));
        }
        Ok(Self {
            embedder,
            store,
            top_k: DEFAULT_TOP_K,
        })
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    /// The `k` passages nearest to `query`, closest first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Retrieved>> {
        let embedding = self.embedder.embed(query).await?;
        let store = Arc::clone(&self.store);
        let matches = tokio::task::spawn_blocking(move || store.search(&embedding, k))
            .await
            .map_err(|e| AgentError::internal(format!("knowledge search task failed: {}", e)))??;

        debug!(query, k, found = matches.len(), "Knowledge base searched");
        Ok(matches
            .into_iter()
            .map(|m| Retrieved {
                text: m.chunk.content,
                source: m.chunk.source,
                metadata: m.chunk.metadata,
                score: m.distance,
            })
            .collect())
    }

    /// Embed and store the chunks of `source`, replacing any it had before.
    pub async fn add(
        &self,
        source: &str,
        chunks: &[String],
        metadata: &serde_json::Value,
    ) -> Result<usize> {
        let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let store = Arc::clone(&self.store);
        let source_owned = source.to_string();
        let chunks = chunks.to_vec();
        let metadata = metadata.clone();
        let stored = tokio::task::spawn_blocking(move || {
            store.replace_source(&source_owned, &chunks, &embeddings, &metadata)
        })
        .await
        .map_err(|e| AgentError::internal(format!("knowledge write task failed: {}", e)))??;

        info!(source, chunks = stored, "Added to knowledge base");
        Ok(stored)
    }
}

/// Passages as shown to the summarizer.
pub fn format_retrieved(results: &[Retrieved]) -> String {
    results
        .iter()
        .map(|r| {
            let preview: String = r.text.chars().take(PREVIEW_CHARS).collect();
            format!(
                "Source: {}\nRelevance Score: {:.4}\nContent: {}...\n",
                r.source, r.score, preview
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use scout_llm::MockEmbedder;
    use serde_json::json;

    fn knowledge_base() -> KnowledgeBase {
        let store = Arc::new(KnowledgeStore::open_in_memory(16, "mock").unwrap());
        KnowledgeBase::new(Arc::new(MockEmbedder::new(16)), store).unwrap()
    }

    fn chunks(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_then_search_finds_exact_passage() {
        let kb = knowledge_base();
        kb.add(
            "rust.md",
            &chunks(&["Ownership rules", "Borrow checker", "Lifetimes"]),
            &json!({"filename": "rust.md"}),
        )
        .await
        .unwrap();

        let results = kb.search("Borrow checker", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "Borrow checker");
        assert_eq!(results[0].source, "rust.md");
        assert!(results[0].score <= results[1].score);
        assert_eq!(results[0].metadata["chunk_index"], 1);
    }

    #[tokio::test]
    async fn test_add_replaces_previous_chunks() {
        let kb = knowledge_base();
        kb.add("a.md", &chunks(&["one", "two"]), &json!({})).await.unwrap();
        kb.add("a.md", &chunks(&["three"]), &json!({})).await.unwrap();

        assert_eq!(kb.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let kb = knowledge_base().with_top_k(3);
        assert_eq!(kb.top_k(), 3);
        assert!(kb.search("anything", kb.top_k()).await.unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let store = Arc::new(KnowledgeStore::open_in_memory(8, "mock").unwrap());
        let err = KnowledgeBase::new(Arc::new(MockEmbedder::new(16)), store).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_format_retrieved() {
        let results = vec![
            Retrieved {
                text: "x".repeat(600),
                source: "long.md".to_string(),
                metadata: json!({}),
                score: 0.123456,
            },
            Retrieved {
                text: "short".to_string(),
                source: "short.txt".to_string(),
                metadata: json!({}),
                score: 1.0,
            },
        ];
        let formatted = format_retrieved(&results);
        assert!(formatted.starts_with("Source: long.md\nRelevance Score: 0.1235\nContent: "));
        assert!(formatted.contains(&format!("{}...\n\n\nSource: short.txt", "x".repeat(500))));
        assert!(formatted.ends_with("Content: short...\n"));
    }
}
