//! Action handlers for the information-gathering actions.
//!
//! A handler reads the session, does its I/O and returns a [`HandlerDelta`].
//! It never mutates the session; the controller merges the delta. Errors
//! returned from `handle` are absorbed by the controller as failure notes.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use scout_llm::SharedCompleter;

use crate::action::Action;
use crate::documents::DocumentReader;
use crate::error::{AgentError, Result};
use crate::knowledge::{KnowledgeBase, format_retrieved};
use crate::prompts;
use crate::search::{SharedSearchBackend, format_search_results};
use crate::state::{FindingSlot, HandlerDelta, SessionState};

pub const NO_SEARCH_RESULTS: &str = "No search results found.";
pub const NO_RETRIEVAL_RESULTS: &str = "No relevant documents found in knowledge base.";
pub const NO_DOCUMENTS: &str = "No documents available to read.";
pub const NO_DOCUMENTS_READ: &str = "No documents were successfully read.";

/// Executes one non-terminal action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// The action this handler serves.
    fn action(&self) -> Action;

    async fn handle(&self, state: &SessionState) -> Result<HandlerDelta>;
}

/// Shared action handler.
pub type SharedHandler = Arc<dyn ActionHandler>;

/// Summarize with the completer, falling back to the raw text on failure.
async fn summarize_or_raw(summarizer: &SharedCompleter, prompt: &str, raw: String, what: &str) -> String {
    match summarizer.complete(prompt).await {
        Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
        Ok(_) => {
            warn!(what, "Summarizer returned nothing; using raw results");
            raw
        }
        Err(error) => {
            warn!(what, %error, "Summarization failed; using raw results");
            raw
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

/// Web search plus summarization.
pub struct SearchHandler {
    backend: SharedSearchBackend,
    summarizer: SharedCompleter,
}

impl SearchHandler {
    pub fn new(backend: SharedSearchBackend, summarizer: SharedCompleter) -> Self {
        Self {
            backend,
            summarizer,
        }
    }
}

#[async_trait]
impl ActionHandler for SearchHandler {
    fn action(&self) -> Action {
        Action::Search
    }

    async fn handle(&self, state: &SessionState) -> Result<HandlerDelta> {
        let question = &state.question;
        let results = self.backend.search(question).await?;
        let record = format!("Performed web search for: {}", question);
        info!(backend = self.backend.name(), found = results.len(), "Web search done");

        if results.is_empty() {
            return Ok(HandlerDelta::new(FindingSlot::Search, NO_SEARCH_RESULTS, record));
        }

        let formatted = format_search_results(&results);
        let prompt = prompts::search_summary_prompt(question, &formatted);
        let finding = summarize_or_raw(&self.summarizer, &prompt, formatted, "search").await;

        let urls = results
            .into_iter()
            .map(|r| r.url)
            .filter(|u| !u.trim().is_empty());
        Ok(HandlerDelta::new(FindingSlot::Search, finding, record).with_sources(urls))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retrieve
// ─────────────────────────────────────────────────────────────────────────────

/// Knowledge base lookup plus summarization.
pub struct RetrieveHandler {
    knowledge: KnowledgeBase,
    summarizer: SharedCompleter,
}

impl RetrieveHandler {
    pub fn new(knowledge: KnowledgeBase, summarizer: SharedCompleter) -> Self {
        Self {
            knowledge,
            summarizer,
        }
    }
}

#[async_trait]
impl ActionHandler for RetrieveHandler {
    fn action(&self) -> Action {
        Action::Retrieve
    }

    async fn handle(&self, state: &SessionState) -> Result<HandlerDelta> {
        let question = &state.question;
        let results = self
            .knowledge
            .search(question, self.knowledge.top_k())
            .await?;
        let record = "Retrieved information from knowledge base";
        info!(found = results.len(), "Knowledge retrieval done");

        if results.is_empty() {
            return Ok(HandlerDelta::new(FindingSlot::Retrieval, NO_RETRIEVAL_RESULTS, record));
        }

        let formatted = format_retrieved(&results);
        let prompt = prompts::retrieval_summary_prompt(question, &formatted);
        let finding = summarize_or_raw(&self.summarizer, &prompt, formatted, "retrieval").await;

        let mut sources: Vec<String> = Vec::new();
        for r in results {
            if !sources.contains(&r.source) {
                sources.push(r.source);
            }
        }
        Ok(HandlerDelta::new(FindingSlot::Retrieval, finding, record).with_sources(sources))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Read
// ─────────────────────────────────────────────────────────────────────────────

/// Reads every document in the data directory into the knowledge base.
pub struct ReadHandler {
    reader: DocumentReader,
    knowledge: KnowledgeBase,
}

impl ReadHandler {
    pub fn new(reader: DocumentReader, knowledge: KnowledgeBase) -> Self {
        Self { reader, knowledge }
    }
}

/// Outcome of ingesting the data directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Documents found.
    pub attempted: usize,
    /// Filenames stored, in order.
    pub stored: Vec<String>,
    /// `(filename, reason)` for documents that were skipped.
    pub skipped: Vec<(String, String)>,
    pub chunks: usize,
}

/// Read and store every document the reader lists.
pub async fn ingest_documents(reader: &DocumentReader, knowledge: &KnowledgeBase) -> Result<IngestReport> {
    let paths = reader.list_documents()?;
    let mut report = IngestReport {
        attempted: paths.len(),
        ..Default::default()
    };

    for path in paths {
        let worker = reader.clone();
        let doc = tokio::task::spawn_blocking(move || worker.read(&path))
            .await
            .map_err(|e| AgentError::internal(format!("document read task failed: {}", e)))?;

        if let Some(error) = doc.error {
            warn!(file = %doc.filename, %error, "Skipping document");
            report.skipped.push((doc.filename, error));
            continue;
        }
        if doc.chunks.is_empty() {
            warn!(file = %doc.filename, "Skipping empty document");
            report.skipped.push((doc.filename, "no text".to_string()));
            continue;
        }

        match knowledge.add(&doc.filename, &doc.chunks, &doc.metadata).await {
            Ok(stored) => {
                report.chunks += stored;
                report.stored.push(doc.filename);
            }
            Err(error) => {
                warn!(file = %doc.filename, %error, "Failed to store document");
                report.skipped.push((doc.filename, error.to_string()));
            }
        }
    }

    Ok(report)
}

#[async_trait]
impl ActionHandler for ReadHandler {
    fn action(&self) -> Action {
        Action::Read
    }

    async fn handle(&self, _state: &SessionState) -> Result<HandlerDelta> {
        let report = ingest_documents(&self.reader, &self.knowledge).await?;
        if report.attempted == 0 {
            return Ok(HandlerDelta::new(
                FindingSlot::Documents,
                NO_DOCUMENTS,
                "No documents found to read",
            ));
        }

        info!(
            attempted = report.attempted,
            stored = report.stored.len(),
            chunks = report.chunks,
            "Documents read"
        );
        let finding = if report.stored.is_empty() {
            NO_DOCUMENTS_READ.to_string()
        } else {
            report
                .stored
                .iter()
                .map(|f| format!("Read and stored document: {}", f))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let record = format!("Read {} document(s)", report.attempted);
        Ok(HandlerDelta::new(FindingSlot::Documents, finding, record).with_sources(report.stored))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{SearchBackend, SearchResult};
    use scout_llm::{BackendCompleter, MockBackend, MockEmbedder};
    use scout_memory::KnowledgeStore;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct StaticSearch(Vec<SearchResult>);

    #[async_trait]
    impl SearchBackend for StaticSearch {
        fn name(&self) -> &str {
            "static"
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenSearch;

    #[async_trait]
    impl SearchBackend for BrokenSearch {
        fn name(&self) -> &str {
            "broken"
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>> {
            Err(AgentError::search("network unreachable"))
        }
    }

    fn result(title: &str, url: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            snippet: format!("about {}", title),
            url: url.to_string(),
        }
    }

    fn completer(backend: MockBackend) -> SharedCompleter {
        Arc::new(BackendCompleter::new(Arc::new(backend), "test"))
    }

    fn knowledge_base() -> KnowledgeBase {
        let store = Arc::new(KnowledgeStore::open_in_memory(8, "mock").unwrap());
        KnowledgeBase::new(Arc::new(MockEmbedder::new(8)), store).unwrap()
    }

    #[tokio::test]
    async fn test_search_handler_summarizes() {
        let handler = SearchHandler::new(
            Arc::new(StaticSearch(vec![
                result("A", "https://a.dev"),
                result("B", ""),
            ])),
            completer(MockBackend::with_text("  A says yes.  ")),
        );
        let delta = handler.handle(&SessionState::new("Is it?")).await.unwrap();

        assert_eq!(delta.slot, FindingSlot::Search);
        assert_eq!(delta.finding, "A says yes.");
        assert_eq!(delta.new_sources, vec!["https://a.dev"]);
        assert_eq!(delta.record, "Performed web search for: Is it?");
    }

    #[tokio::test]
    async fn test_search_handler_falls_back_to_raw_results() {
        let handler = SearchHandler::new(
            Arc::new(StaticSearch(vec![result("A", "https://a.dev")])),
            completer(MockBackend::failing("llm down")),
        );
        let delta = handler.handle(&SessionState::new("q")).await.unwrap();
        assert!(delta.finding.starts_with("[1] A\n"));
    }

    #[tokio::test]
    async fn test_search_handler_empty_results() {
        let handler = SearchHandler::new(
            Arc::new(StaticSearch(Vec::new())),
            completer(MockBackend::failing("not called")),
        );
        let delta = handler.handle(&SessionState::new("q")).await.unwrap();
        assert_eq!(delta.finding, NO_SEARCH_RESULTS);
        assert!(delta.new_sources.is_empty());
    }

    #[tokio::test]
    async fn test_search_handler_propagates_backend_error() {
        let handler = SearchHandler::new(Arc::new(BrokenSearch), completer(MockBackend::new(vec![])));
        let err = handler.handle(&SessionState::new("q")).await.unwrap_err();
        assert!(matches!(err, AgentError::Search(_)));
    }

    #[tokio::test]
    async fn test_retrieve_handler() {
        let kb = knowledge_base();
        kb.add("a.md", &["alpha".to_string(), "beta".to_string()], &json!({}))
            .await
            .unwrap();
        kb.add("b.md", &["gamma".to_string()], &json!({})).await.unwrap();

        let handler = RetrieveHandler::new(kb, completer(MockBackend::with_text("summary")));
        let delta = handler.handle(&SessionState::new("alpha")).await.unwrap();

        assert_eq!(delta.slot, FindingSlot::Retrieval);
        assert_eq!(delta.finding, "summary");
        assert_eq!(delta.new_sources.len(), 2);
        assert_eq!(delta.new_sources[0], "a.md");
    }

    #[tokio::test]
    async fn test_retrieve_handler_empty_store() {
        let handler = RetrieveHandler::new(knowledge_base(), completer(MockBackend::new(vec![])));
        let delta = handler.handle(&SessionState::new("q")).await.unwrap();
        assert_eq!(delta.finding, NO_RETRIEVAL_RESULTS);
    }

    #[tokio::test]
    async fn test_read_handler_stores_documents() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "Alpha document.").unwrap();
        fs::write(dir.path().join("b.txt"), "   ").unwrap();

        let kb = knowledge_base();
        let handler = ReadHandler::new(DocumentReader::new(dir.path()), kb.clone());
        let delta = handler.handle(&SessionState::new("q")).await.unwrap();

        assert_eq!(delta.finding, "Read and stored document: a.md");
        assert_eq!(delta.new_sources, vec!["a.md"]);
        assert_eq!(delta.record, "Read 2 document(s)");
        assert_eq!(kb.store().count().unwrap(), 1);

        // Reading again replaces rather than duplicates
        handler.handle(&SessionState::new("q")).await.unwrap();
        assert_eq!(kb.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_read_handler_no_documents() {
        let dir = TempDir::new().unwrap();
        let handler = ReadHandler::new(DocumentReader::new(dir.path()), knowledge_base());
        let delta = handler.handle(&SessionState::new("q")).await.unwrap();
        assert_eq!(delta.finding, NO_DOCUMENTS);
        assert_eq!(delta.record, "No documents found to read");
    }

    #[tokio::test]
    async fn test_read_handler_nothing_readable() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();
        let handler = ReadHandler::new(DocumentReader::new(dir.path()), knowledge_base());
        let delta = handler.handle(&SessionState::new("q")).await.unwrap();
        assert_eq!(delta.finding, NO_DOCUMENTS_READ);
        assert!(delta.new_sources.is_empty());
    }
}
