//! Language-model plumbing for Scout.
//!
//! This crate provides the text-completion and embedding backends the
//! research agent talks to. Everything speaks the OpenAI-compatible wire
//! protocol, so a local Ollama daemon, OpenAI and Groq are interchangeable.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  TextCompleter (prompt -> text)         │
//! └─────────────────────────────────────────┘
//!                    │ BackendCompleter
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │  LlmBackend trait                       │
//! │  - complete() -> CompletionResponse     │
//! │  - health_check()                       │
//! └─────────────────────────────────────────┘
//!                    │
//!          ┌─────────┴─────────┐
//!          ▼                   ▼
//!    ┌────────────┐      ┌────────────┐
//!    │ OpenAiBack │      │MockBackend │
//!    └────────────┘      └────────────┘
//! ```

pub mod backend;
pub mod completer;
pub mod embeddings;
pub mod error;
pub mod openai;
pub mod types;

pub use backend::{LlmBackend, SharedBackend, with_retry};
#[cfg(any(test, feature = "testing"))]
pub use backend::MockBackend;
pub use completer::{
    BackendCompleter, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, SharedCompleter, TextCompleter,
};
pub use error::{LlmError, RateLimitInfo, Result};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};

pub use embeddings::{
    DEFAULT_DIMENSIONS, Embedder, EmbedderSpec, MockEmbedder, OpenAiEmbedder,
    OpenAiEmbedderConfig, SharedEmbedder, build_embedder, euclidean_distance,
};

pub use openai::{DEFAULT_OLLAMA_BASE, OpenAiBackend, OpenAiConfig, create_shared_backend};
