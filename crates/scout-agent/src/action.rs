//! The closed set of research actions and keyword extraction from model output.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::state::Phase;

/// One step the controller can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Query the web search backend.
    Search,
    /// Ingest documents from the data directory into the knowledge base.
    Read,
    /// Query the knowledge base.
    Retrieve,
    /// Synthesize the final answer.
    Answer,
    /// Stop without answering.
    Done,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Search,
        Action::Read,
        Action::Retrieve,
        Action::Answer,
        Action::Done,
    ];

    /// Upper-case keyword as it appears in prompts and history.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Search => "SEARCH",
            Action::Read => "READ",
            Action::Retrieve => "RETRIEVE",
            Action::Answer => "ANSWER",
            Action::Done => "DONE",
        }
    }

    /// Controller phase entered when this action is chosen.
    pub fn phase(&self) -> Phase {
        match self {
            Action::Search => Phase::Searching,
            Action::Read => Phase::Reading,
            Action::Retrieve => Phase::Retrieving,
            Action::Answer => Phase::Answering,
            Action::Done => Phase::Terminated,
        }
    }

    /// Whether choosing this action ends the planning loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Action::Answer | Action::Done)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not exactly one action keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action '{}'", self.0)
    }
}

impl std::error::Error for UnknownAction {}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownAction(trimmed.to_string()))
    }
}

/// Action used when the model output names none.
pub const FALLBACK_ACTION: Action = Action::Search;

static ACTION_KEYWORD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(SEARCH|READ|RETRIEVE|ANSWER|DONE)\w*").ok());

/// Extract an action from free-form model output.
///
/// Keywords match case-insensitively at the start of a word, so inflected
/// forms like "RETRIEVING" count but "already" is not READ. The earliest
/// keyword in the text wins. Output with no keyword yields [`FALLBACK_ACTION`].
pub fn parse_action(raw: &str) -> Action {
    ACTION_KEYWORD
        .as_ref()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(FALLBACK_ACTION)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_keywords() {
        for action in Action::ALL {
            assert_eq!(parse_action(action.as_str()), action);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(parse_action("retrieve"), Action::Retrieve);
        assert_eq!(parse_action("  Answer\n"), Action::Answer);
    }

    #[test]
    fn test_parse_embedded_in_prose() {
        assert_eq!(
            parse_action("I think the best next step is to RETRIEVE from memory."),
            Action::Retrieve
        );
        assert_eq!(parse_action("Action: DONE."), Action::Done);
    }

    #[test]
    fn test_parse_earliest_keyword_wins() {
        assert_eq!(parse_action("READ first, then ANSWER"), Action::Read);
        assert_eq!(parse_action("ANSWER now rather than SEARCH"), Action::Answer);
    }

    #[test]
    fn test_parse_inflected_keywords() {
        assert_eq!(
            parse_action("RETRIEVING from the knowledge base"),
            Action::Retrieve
        );
        assert_eq!(parse_action("READING the documents"), Action::Read);
        assert_eq!(parse_action("ANSWERING now"), Action::Answer);
        assert_eq!(parse_action("Searched enough, answers next"), Action::Search);
    }

    #[test]
    fn test_parse_requires_word_start() {
        // "already" contains READ, "researching" contains SEARCH
        assert_eq!(parse_action("We already have enough; ANSWER"), Action::Answer);
        assert_eq!(parse_action("keep researching"), FALLBACK_ACTION);
        assert_eq!(parse_action("undone"), FALLBACK_ACTION);
    }

    #[test]
    fn test_parse_falls_back_to_search() {
        assert_eq!(parse_action(""), Action::Search);
        assert_eq!(parse_action("I'm not sure what to do."), Action::Search);
    }

    #[test]
    fn test_from_str_is_exact() {
        assert_eq!("done".parse::<Action>(), Ok(Action::Done));
        assert!("do it".parse::<Action>().is_err());
    }

    #[test]
    fn test_serde_uses_keywords() {
        assert_eq!(serde_json::to_string(&Action::Retrieve).unwrap(), "\"RETRIEVE\"");
        let parsed: Action = serde_json::from_str("\"ANSWER\"").unwrap();
        assert_eq!(parsed, Action::Answer);
    }

    #[test]
    fn test_phase_mapping() {
        assert_eq!(Action::Search.phase(), Phase::Searching);
        assert_eq!(Action::Done.phase(), Phase::Terminated);
        assert!(Action::Answer.is_terminal());
        assert!(!Action::Read.is_terminal());
    }
}
