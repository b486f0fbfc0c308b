//! Session state threaded through one research run.
//!
//! The controller owns the only [`SessionState`] of a session. Handlers see it
//! by shared reference and hand back a [`HandlerDelta`]; [`SessionState::merge`]
//! is the single place where a delta becomes part of the session, so context
//! formatting, source deduplication and history ordering are enforced here.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::Action;
use crate::error::{AgentError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Phase
// ─────────────────────────────────────────────────────────────────────────────

/// Where the controller is in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Planning,
    Searching,
    Reading,
    Retrieving,
    Answering,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Planning => "PLANNING",
            Phase::Searching => "SEARCHING",
            Phase::Reading => "READING",
            Phase::Retrieving => "RETRIEVING",
            Phase::Answering => "ANSWERING",
            Phase::Terminated => "TERMINATED",
        };
        f.write_str(s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────────────────

/// One line of the session's activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryEntry {
    /// The decision function chose an action.
    Planned { iteration: u32, action: Action },
    /// The iteration ceiling was hit and ANSWER was forced without planning.
    Forced { iteration: u32, ceiling: u32 },
    /// A handler's own description of what it did.
    Handler { action: Action, message: String },
    /// A handler failed, timed out or panicked.
    Failed { action: Action, message: String },
    /// The answer was synthesized.
    Answered { chars: usize },
}

impl HistoryEntry {
    pub fn is_failure(&self) -> bool {
        matches!(self, HistoryEntry::Failed { .. })
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryEntry::Planned { iteration, action } => {
                write!(f, "Iteration {}: Planned action: {}", iteration, action)
            }
            HistoryEntry::Forced { ceiling, .. } => {
                write!(f, "Iteration ceiling {} reached: forcing ANSWER", ceiling)
            }
            HistoryEntry::Handler { message, .. } => f.write_str(message),
            HistoryEntry::Failed { action, message } => write!(f, "{} failed: {}", action, message),
            HistoryEntry::Answered { chars } => write!(f, "Generated answer ({} chars)", chars),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Findings
// ─────────────────────────────────────────────────────────────────────────────

/// Which per-source finding a handler writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSlot {
    Search,
    Retrieval,
    Documents,
}

impl FindingSlot {
    /// Slot written by an action, `None` for ANSWER and DONE.
    pub fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::Search => Some(FindingSlot::Search),
            Action::Retrieve => Some(FindingSlot::Retrieval),
            Action::Read => Some(FindingSlot::Documents),
            Action::Answer | Action::Done => None,
        }
    }

    /// The action that owns this slot.
    pub fn action(&self) -> Action {
        match self {
            FindingSlot::Search => Action::Search,
            FindingSlot::Retrieval => Action::Retrieve,
            FindingSlot::Documents => Action::Read,
        }
    }

    /// Section header used when the finding is appended to the context.
    pub fn header(&self) -> &'static str {
        match self {
            FindingSlot::Search => "Web Search Results:",
            FindingSlot::Retrieval => "Knowledge Base Retrieval:",
            FindingSlot::Documents => "Documents Read:",
        }
    }
}

/// Latest summary from each information-gathering action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Findings {
    pub search: String,
    pub retrieval: String,
    pub documents: String,
}

impl Findings {
    fn set(&mut self, slot: FindingSlot, finding: String) {
        match slot {
            FindingSlot::Search => self.search = finding,
            FindingSlot::Retrieval => self.retrieval = finding,
            FindingSlot::Documents => self.documents = finding,
        }
    }
}

/// Which finding slots held information when the answer was synthesized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFlags {
    pub web_search: bool,
    pub knowledge_base: bool,
    pub documents: bool,
}

impl SourceFlags {
    /// Flags depend only on which slots are non-empty.
    pub fn from_findings(search: &str, retrieval: &str, documents: &str) -> Self {
        Self {
            web_search: !search.trim().is_empty(),
            knowledge_base: !retrieval.trim().is_empty(),
            documents: !documents.trim().is_empty(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler delta
// ─────────────────────────────────────────────────────────────────────────────

/// Partial update returned by an action handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerDelta {
    /// Slot this finding overwrites.
    pub slot: FindingSlot,
    /// Summary text for the slot and the context section.
    pub finding: String,
    /// Sources discovered by this call, possibly overlapping earlier ones.
    pub new_sources: Vec<String>,
    /// One-line description for the history.
    pub record: String,
}

impl HandlerDelta {
    pub fn new(slot: FindingSlot, finding: impl Into<String>, record: impl Into<String>) -> Self {
        Self {
            slot,
            finding: finding.into(),
            new_sources: Vec::new(),
            record: record.into(),
        }
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.new_sources = sources.into_iter().map(Into::into).collect();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session state
// ─────────────────────────────────────────────────────────────────────────────

/// Everything known about one research run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub id: Uuid,
    pub question: String,
    pub phase: Phase,
    pub current_action: Option<Action>,
    /// Append-only narrative of everything gathered so far.
    pub context: String,
    pub findings: Findings,
    /// Source identifiers (URLs or filenames) in discovery order, no duplicates.
    pub sources: Vec<String>,
    pub history: Vec<HistoryEntry>,
    /// Planning steps that consulted the decision function.
    pub iteration: u32,
    pub answer: Option<String>,
    pub source_flags: Option<SourceFlags>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Fresh state for a question.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            started_at: Utc::now(),
            ..Default::default()
        }
    }

    /// The answer, or `""` if none was produced.
    pub fn answer(&self) -> &str {
        self.answer.as_deref().unwrap_or("")
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    /// History lines as displayed to users.
    pub fn history_lines(&self) -> Vec<String> {
        self.history.iter().map(ToString::to_string).collect()
    }

    /// Whether any handler failure was recorded.
    pub fn has_failures(&self) -> bool {
        self.history.iter().any(HistoryEntry::is_failure)
    }

    /// Fold a handler delta into the session.
    ///
    /// The record goes to the history, unseen non-empty sources are appended
    /// in order, the finding replaces its slot and a headed section is
    /// appended to the context.
    pub fn merge(mut self, delta: HandlerDelta) -> Self {
        let HandlerDelta {
            slot,
            finding,
            new_sources,
            record,
        } = delta;

        self.history.push(HistoryEntry::Handler {
            action: slot.action(),
            message: record,
        });

        for source in new_sources {
            let source = source.trim();
            if !source.is_empty() && !self.sources.iter().any(|s| s == source) {
                self.sources.push(source.to_string());
            }
        }

        self.append_section(slot.header(), &finding);
        self.findings.set(slot, finding);
        self
    }

    /// Record a failed handler call without touching any finding slot.
    pub fn absorb_failure(mut self, action: Action, message: impl Into<String>) -> Self {
        let entry = HistoryEntry::Failed {
            action,
            message: message.into(),
        };
        let header = match FindingSlot::for_action(action) {
            Some(slot) => slot.header().to_string(),
            None => format!("{}:", action),
        };
        self.append_section(&header, &entry.to_string());
        self.history.push(entry);
        self
    }

    pub(crate) fn record(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    /// Set the answer. Fails if one was already set.
    pub(crate) fn set_answer(&mut self, answer: String, flags: SourceFlags) -> Result<()> {
        if self.answer.is_some() {
            return Err(AgentError::state("answer already set"));
        }
        self.history.push(HistoryEntry::Answered {
            chars: answer.chars().count(),
        });
        self.answer = Some(answer);
        self.source_flags = Some(flags);
        Ok(())
    }

    fn append_section(&mut self, header: &str, body: &str) {
        self.context.push_str("\n\n");
        self.context.push_str(header);
        self.context.push('\n');
        self.context.push_str(body);
    }

    /// Lengths that must never shrink during a session.
    pub(crate) fn progress(&self) -> Progress {
        Progress {
            context_len: self.context.len(),
            history_len: self.history.len(),
        }
    }

    /// Verify the invariants that hold across every transition.
    pub(crate) fn check_since(&self, before: &Progress, ceiling: u32) -> Result<()> {
        if self.context.len() < before.context_len {
            return Err(AgentError::state(format!(
                "context shrank from {} to {} bytes",
                before.context_len,
                self.context.len()
            )));
        }
        if self.history.len() < before.history_len {
            return Err(AgentError::state("history lost entries"));
        }
        if self.iteration > ceiling {
            return Err(AgentError::state(format!(
                "iteration {} exceeds ceiling {}",
                self.iteration, ceiling
            )));
        }
        if let Some((i, dup)) = self
            .sources
            .iter()
            .enumerate()
            .find(|(i, s)| self.sources[..*i].contains(*s))
        {
            return Err(AgentError::state(format!(
                "duplicate source '{}' at position {}",
                dup, i
            )));
        }
        Ok(())
    }
}

/// Snapshot of monotonic lengths taken before a transition.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Progress {
    context_len: usize,
    history_len: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
