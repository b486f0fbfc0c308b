//! Decision function choosing the next research action.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use scout_llm::SharedCompleter;

use crate::action::{Action, FALLBACK_ACTION, parse_action};
use crate::prompts;
use crate::state::HistoryEntry;

/// Chooses the next action from the question, context and history.
///
/// Stateless across calls and infallible: implementations resolve their own
/// failures to a valid [`Action`].
#[async_trait]
pub trait DecisionFunction: Send + Sync {
    async fn decide(&self, question: &str, context: &str, history: &[HistoryEntry]) -> Action;
}

/// Shared decision function.
pub type SharedDecisionFunction = Arc<dyn DecisionFunction>;

/// LLM-backed decision function.
pub struct Planner {
    completer: SharedCompleter,
    timeout: Option<Duration>,
}

impl Planner {
    pub fn new(completer: SharedCompleter) -> Self {
        Self {
            completer,
            timeout: None,
        }
    }

    /// Bound each completion call. A timeout falls back like any other error.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl DecisionFunction for Planner {
    async fn decide(&self, question: &str, context: &str, history: &[HistoryEntry]) -> Action {
        let prompt = prompts::planning_prompt(question, context, history);
        let call = self.completer.complete(&prompt);

        let response = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("timed out after {:?}", limit)),
            },
            None => call.await.map_err(|e| e.to_string()),
        };

        match response {
            Ok(text) => {
                let action = parse_action(&text);
                debug!(raw = %text.trim(), action = %action, "Planner decided");
                action
            }
            Err(error) => {
                warn!(%error, fallback = %FALLBACK_ACTION, "Planner call failed");
                FALLBACK_ACTION
            }
        }
    }
}

/// Decision function that replays a fixed script, then repeats a default.
///
/// Used to drive the controller deterministically.
#[cfg(any(test, feature = "testing"))]
pub struct ScriptedPlanner {
    script: parking_lot::Mutex<std::collections::VecDeque<Action>>,
    then: Action,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "testing"))]
impl ScriptedPlanner {
    pub fn new(script: impl IntoIterator<Item = Action>) -> Self {
        Self {
            script: parking_lot::Mutex::new(script.into_iter().collect()),
            then: Action::Answer,
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Always return `action`.
    pub fn always(action: Action) -> Self {
        Self::new([]).then(action)
    }

    /// Action returned once the script is exhausted (default ANSWER).
    pub fn then(mut self, action: Action) -> Self {
        self.then = action;
        self
    }

    /// Number of times `decide` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "testing"))]
#[async_trait]
impl DecisionFunction for ScriptedPlanner {
    async fn decide(&self, _question: &str, _context: &str, _history: &[HistoryEntry]) -> Action {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.script.lock().pop_front().unwrap_or(self.then)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use scout_llm::{BackendCompleter, MockBackend, TextCompleter};

    fn planner_with(backend: MockBackend) -> (Planner, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        let completer = BackendCompleter::new(backend.clone(), "test-model");
        (Planner::new(Arc::new(completer)), backend)
    }

    #[tokio::test]
    async fn test_planner_parses_response() {
        let (planner, _) = planner_with(MockBackend::with_text("Next: RETRIEVE"));
        let action = planner.decide("q", "", &[]).await;
        assert_eq!(action, Action::Retrieve);
    }

    #[tokio::test]
    async fn test_planner_sends_context_and_history() {
        let (planner, backend) = planner_with(MockBackend::with_text("ANSWER"));
        let history = vec![HistoryEntry::Planned {
            iteration: 1,
            action: Action::Search,
        }];
        planner
            .decide("What is WAL?", "\n\nWeb Search Results:\nwrite-ahead log", &history)
            .await;

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].messages[0].content;
        assert!(prompt.contains("What is WAL?"));
        assert!(prompt.contains("write-ahead log"));
        assert!(prompt.contains("Iteration 1: Planned action: SEARCH"));
    }

    #[tokio::test]
    async fn test_planner_falls_back_on_error() {
        let (planner, _) = planner_with(MockBackend::failing("backend down"));
        assert_eq!(planner.decide("q", "", &[]).await, Action::Search);
    }

    #[tokio::test]
    async fn test_planner_falls_back_on_gibberish() {
        let (planner, _) = planner_with(MockBackend::with_text("¯\\_(ツ)_/¯"));
        assert_eq!(planner.decide("q", "", &[]).await, Action::Search);
    }

    struct Stalled;

    #[async_trait]
    impl TextCompleter for Stalled {
        async fn complete(&self, _prompt: &str) -> scout_llm::Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("ANSWER".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_planner_falls_back_on_timeout() {
        let planner = Planner::new(Arc::new(Stalled)).with_timeout(Some(Duration::from_secs(5)));
        assert_eq!(planner.decide("q", "", &[]).await, Action::Search);
    }

    #[tokio::test]
    async fn test_scripted_planner() {
        let planner = ScriptedPlanner::new([Action::Read, Action::Retrieve]).then(Action::Done);
        assert_eq!(planner.decide("q", "", &[]).await, Action::Read);
        assert_eq!(planner.decide("q", "", &[]).await, Action::Retrieve);
        assert_eq!(planner.decide("q", "", &[]).await, Action::Done);
        assert_eq!(planner.decide("q", "", &[]).await, Action::Done);
        assert_eq!(planner.calls(), 4);
    }
}
