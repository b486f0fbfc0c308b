//! Research controller for Scout.
//!
//! This crate provides the planning loop that answers a research question by
//! repeatedly choosing an action, running it, and folding the result into the
//! session, plus the handlers and collaborators those actions use.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  ResearchController                                         │
//! │  - plans via DecisionFunction (iteration ceiling enforced)  │
//! │  - dispatches to ActionHandlers under a timeout             │
//! │  - merges HandlerDelta into SessionState                    │
//! └─────────────────────────────────────────────────────────────┘
//!        │                 │                 │             │
//!        ▼                 ▼                 ▼             ▼
//!  ┌───────────┐   ┌──────────────┐   ┌────────────┐ ┌────────────┐
//!  │  Planner  │   │SearchHandler │   │ReadHandler │ │RetrieveHdlr│
//!  │(TextComp.)│   │ (WebSearch)  │   │(Documents) │ │(Knowledge) │
//!  └───────────┘   └──────────────┘   └────────────┘ └────────────┘
//!                                            │             │
//!                                            ▼             ▼
//!                                    ┌──────────────────────────┐
//!                                    │ KnowledgeBase            │
//!                                    │ (scout-memory store)     │
//!                                    └──────────────────────────┘
//! ```
//!
//! # Core Components
//!
//! - [`SessionState`]: everything known about one run, with the merge step
//! - [`Action`] / [`parse_action`]: the closed action set and model-output parsing
//! - [`ResearchController`]: the state machine
//! - [`AnswerSynthesizer`]: the terminal handler
//! - [`SessionArchive`]: finished sessions on disk

pub mod action;
pub mod archive;
pub mod controller;
pub mod documents;
pub mod error;
pub mod handlers;
pub mod knowledge;
pub mod planner;
pub mod prompts;
pub mod search;
pub mod state;
pub mod synthesis;

// Re-export core types
pub use action::{Action, FALLBACK_ACTION, UnknownAction, parse_action};
pub use error::{AgentError, Result};
pub use state::{
    FindingSlot, Findings, HandlerDelta, HistoryEntry, Phase, SessionState, SourceFlags,
};

// Re-export the controller
pub use controller::{
    ControllerConfig, DEFAULT_HANDLER_TIMEOUT, DEFAULT_MAX_ITERATIONS, ResearchController,
    ResearchControllerBuilder,
};

// Re-export planning and synthesis
pub use planner::{DecisionFunction, Planner, SharedDecisionFunction};
#[cfg(any(test, feature = "testing"))]
pub use planner::ScriptedPlanner;
pub use synthesis::{AnswerSynthesizer, Synthesis, Synthesizer};

// Re-export handlers
pub use handlers::{
    ActionHandler, IngestReport, ReadHandler, RetrieveHandler, SearchHandler, SharedHandler,
    ingest_documents,
};

// Re-export collaborators
pub use documents::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DocumentReader, ExtractedDocument, chunk_text,
};
pub use knowledge::{DEFAULT_TOP_K, KnowledgeBase, Retrieved, format_retrieved};
pub use search::{
    DEFAULT_MAX_RESULTS, SearchBackend, SearchProvider, SearchResult, SharedSearchBackend,
    WebSearch, WebSearchConfig, format_search_results,
};

// Re-export the archive
pub use archive::{ARCHIVE_FILE, ArchivedSession, SessionArchive, format_sources};
