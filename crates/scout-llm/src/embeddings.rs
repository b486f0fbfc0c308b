//! Embeddings support for the knowledge base.
//!
//! This module provides the [`Embedder`] trait and implementations for
//! generating vector embeddings from text chunks and queries.
//!
//! # Implementations
//!
//! - [`MockEmbedder`]: Returns deterministic embeddings for testing
//! - [`OpenAiEmbedder`]: Uses an OpenAI-compatible `/embeddings` endpoint,
//!   which covers both OpenAI and a local Ollama daemon

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LlmError, Result};

/// Default embedding dimensions (all-MiniLM-L6-v2 class models).
pub const DEFAULT_DIMENSIONS: usize = 384;

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for generating text embeddings.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts in a batch.
    ///
    /// Default implementation calls `embed` for each text sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Get the dimensionality of embeddings produced by this embedder.
    fn dimensions(&self) -> usize;

    /// Get the name of this embedder.
    fn name(&self) -> &str;
}

/// A shared embedder that can be used across threads.
pub type SharedEmbedder = Arc<dyn Embedder>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// A mock embedder for testing purposes.
///
/// Generates deterministic, unit-length embeddings based on text content.
/// Identical texts map to identical vectors, so exact-match retrieval works
/// without any model.
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Create a new mock embedder with the specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut state = djb2(text);
        let mut embedding: Vec<f32> = (0..self.dimensions)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                ((state >> 16) as u16 as f32 / 32768.0) - 1.0
            })
            .collect();

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn djb2(s: &str) -> u64 {
    s.bytes()
        .fold(5381u64, |h, b| h.wrapping_mul(33).wrapping_add(b as u64))
}

// ─────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible Embedder
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedderConfig {
    /// API key. `None` for local services such as Ollama.
    pub api_key: Option<String>,
    /// Base URL for the API.
    pub base_url: String,
    /// Model to use for embeddings.
    pub model: String,
    /// Output dimensions. Used to size the vector index.
    pub dimensions: usize,
    /// Request timeout.
    pub timeout: Duration,
}

impl OpenAiEmbedderConfig {
    /// OpenAI's hosted embeddings.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            timeout: Duration::from_secs(60),
        }
    }

    /// A local Ollama daemon.
    pub fn ollama() -> Self {
        Self {
            api_key: None,
            base_url: crate::openai::DEFAULT_OLLAMA_BASE.to_string(),
            model: "all-minilm".to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            timeout: Duration::from_secs(120),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the expected output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// OpenAI-compatible embeddings API client.
pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiEmbedderConfig,
}

impl OpenAiEmbedder {
    /// Create a new embedder.
    pub fn new(config: OpenAiEmbedderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.config.base_url)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Internal("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: self.config.model.clone(),
            input: texts.iter().map(|s| s.to_string()).collect(),
        };

        let mut builder = self
            .client
            .post(self.embeddings_url())
            .header("Content-Type", "application/json");
        if let Some(ref key) = self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Backend(format!(
                "Embedding request failed: HTTP {} - {}",
                status, body
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Serialization(format!("Failed to parse response: {}", e)))?;

        let mut data = result.data;
        data.sort_by_key(|e| e.index);

        if let Some(bad) = data
            .iter()
            .find(|d| d.embedding.len() != self.config.dimensions)
        {
            return Err(LlmError::Config(format!(
                "Embedding model '{}' returned {} dimensions, expected {}",
                self.config.model,
                bad.embedding.len(),
                self.config.dimensions
            )));
        }

        Ok(data.into_iter().map(|e| e.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, serde::Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, serde::Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Embedder Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Provider-agnostic description of the embedder to build.
///
/// The CLI fills this from `[embedding]` config so this crate does not depend
/// on scout-config.
#[derive(Debug, Clone, Default)]
pub struct EmbedderSpec {
    /// Provider name: "ollama", "openai", or "mock".
    pub provider: String,
    /// Model name override.
    pub model: Option<String>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// API key (required for "openai").
    pub api_key: Option<String>,
    /// Output dimensions.
    pub dimensions: Option<usize>,
}

/// Build a [`SharedEmbedder`] from a spec.
pub fn build_embedder(spec: &EmbedderSpec) -> Result<SharedEmbedder> {
    let mut config = match spec.provider.as_str() {
        "mock" => {
            let dims = spec.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
            return Ok(Arc::new(MockEmbedder::new(dims)));
        }
        "ollama" => OpenAiEmbedderConfig::ollama(),
        "openai" => {
            let api_key = spec.api_key.as_deref().ok_or_else(|| {
                LlmError::Config(
                    "OpenAI embedding provider requires an API key. \
                     Set OPENAI_API_KEY or configure [embedding] api_key."
                        .to_string(),
                )
            })?;
            OpenAiEmbedderConfig::openai(api_key)
        }
        other => {
            return Err(LlmError::Config(format!(
                "Unknown embedding provider '{}'. Valid: ollama, openai, mock",
                other
            )));
        }
    };

    if let Some(ref model) = spec.model {
        config = config.with_model(model);
    }
    if let Some(ref base_url) = spec.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(dims) = spec.dimensions {
        config = config.with_dimensions(dims);
    }

    tracing::debug!(
        provider = %spec.provider,
        model = %config.model,
        dimensions = config.dimensions,
        "Building embedder"
    );

    Ok(Arc::new(OpenAiEmbedder::new(config)?))
}

// ─────────────────────────────────────────────────────────────────────────────
// Utility Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Calculate Euclidean (L2) distance between two embeddings.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::MAX;
    }

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
