//! Error types for the agent crate.

use thiserror::Error;

/// Result type alias using the agent error type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Error type for research operations.
///
/// None of these escape [`ResearchController::run`](crate::ResearchController::run);
/// handler errors are absorbed into the session and anything else becomes
/// an error-bearing answer.
#[derive(Debug, Error)]
pub enum AgentError {
    /// LLM backend error.
    #[error("LLM error: {0}")]
    Llm(#[from] scout_llm::LlmError),

    /// Knowledge store error.
    #[error("Knowledge store error: {0}")]
    Memory(#[from] scout_memory::MemoryError),

    /// Web search failed.
    #[error("Search error: {0}")]
    Search(String),

    /// Document listing or extraction failed.
    #[error("Document error: {0}")]
    Document(String),

    /// Session state violated one of its invariants.
    #[error("Session state error: {0}")]
    State(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Archive file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Create a search error.
    pub fn search(msg: impl Into<String>) -> Self {
        Self::Search(msg.into())
    }

    /// Create a document error.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// Create a session state error.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::search("provider returned 503");
        assert!(err.to_string().contains("Search error"));
        assert!(err.to_string().contains("provider returned 503"));
    }

    #[test]
    fn test_from_memory_error() {
        let err: AgentError = scout_memory::MemoryError::NotFound("chunk x".to_string()).into();
        assert!(matches!(err, AgentError::Memory(_)));
        assert!(err.to_string().contains("chunk x"));
    }
}
