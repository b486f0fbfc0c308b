//! Answer synthesis from the three finding slots.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use scout_llm::SharedCompleter;

use crate::prompts;
use crate::state::SourceFlags;

pub const NO_SEARCH_INFO: &str = "No web search information available.";
pub const NO_RETRIEVAL_INFO: &str = "No information retrieved from knowledge base.";
pub const NO_DOCUMENT_INFO: &str = "No document information available.";

/// The synthesized answer and which slots fed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub answer: String,
    pub source_flags: SourceFlags,
}

/// Produces the final answer. Never fails: errors become the answer text.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        question: &str,
        search: &str,
        retrieval: &str,
        documents: &str,
    ) -> Synthesis;
}

/// LLM-backed synthesizer.
pub struct AnswerSynthesizer {
    completer: SharedCompleter,
}

impl AnswerSynthesizer {
    pub fn new(completer: SharedCompleter) -> Self {
        Self { completer }
    }
}

fn or_placeholder<'a>(finding: &'a str, placeholder: &'a str) -> &'a str {
    if finding.trim().is_empty() {
        placeholder
    } else {
        finding
    }
}

#[async_trait]
impl Synthesizer for AnswerSynthesizer {
    async fn synthesize(
        &self,
        question: &str,
        search: &str,
        retrieval: &str,
        documents: &str,
    ) -> Synthesis {
        let source_flags = SourceFlags::from_findings(search, retrieval, documents);
        let prompt = prompts::answer_prompt(
            question,
            or_placeholder(search, NO_SEARCH_INFO),
            or_placeholder(retrieval, NO_RETRIEVAL_INFO),
            or_placeholder(documents, NO_DOCUMENT_INFO),
        );

        let answer = match self.completer.complete(&prompt).await {
            Ok(text) => {
                let text = text.trim().to_string();
                info!(chars = text.chars().count(), ?source_flags, "Answer synthesized");
                text
            }
            Err(e) => {
                warn!(error = %e, "Answer generation failed");
                format!("Error generating answer: {}", e)
            }
        };

        Synthesis {
            answer,
            source_flags,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
