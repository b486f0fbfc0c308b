//! The research controller: plan, dispatch, merge, repeat.
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            ▼                              │ merge delta / absorb failure
//!       PLANNING ──SEARCH/READ/RETRIEVE──▶ handler
//!        │    │
//!   DONE │    │ ANSWER (chosen, or forced at the iteration ceiling)
//!        ▼    ▼
//!  TERMINATED ◀── ANSWERING
//! ```
//!
//! Each planning step either consults the decision function and increments
//! `iteration`, or, once `iteration` has reached the ceiling, forces ANSWER
//! without consulting it. Handler errors, timeouts and panics are folded into
//! the session as failure notes. Anything escaping the loop itself becomes an
//! error-bearing answer; [`ResearchController::run`] never fails.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::action::Action;
use crate::error::{AgentError, Result};
use crate::handlers::SharedHandler;
use crate::planner::SharedDecisionFunction;
use crate::state::{HandlerDelta, HistoryEntry, Phase, SessionState, SourceFlags};
use crate::synthesis::{Synthesis, Synthesizer};

/// Default iteration ceiling.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Default per-handler timeout.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(120);

/// Runtime limits for the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Planning steps that may consult the decision function.
    pub max_iterations: u32,
    /// Limit for each handler call, including answer synthesis.
    pub handler_timeout: Option<Duration>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            handler_timeout: Some(DEFAULT_HANDLER_TIMEOUT),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

/// Drives one research session per [`run`](Self::run) call.
///
/// Holds no per-session state, so one controller can serve concurrent runs.
pub struct ResearchController {
    planner: SharedDecisionFunction,
    handlers: HashMap<Action, SharedHandler>,
    synthesizer: Arc<dyn Synthesizer>,
    config: ControllerConfig,
}

impl std::fmt::Debug for ResearchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<_> = self.handlers.keys().map(Action::as_str).collect();
        actions.sort_unstable();
        f.debug_struct("ResearchController")
            .field("handlers", &actions)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResearchController {
    pub fn builder() -> ResearchControllerBuilder {
        ResearchControllerBuilder::default()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Research `question` to a terminal state.
    ///
    /// The returned state always has `phase == Terminated`. Failures show up
    /// in the history, the context or the answer text, never as an error.
    pub async fn run(&self, question: impl Into<String>) -> SessionState {
        let mut state = SessionState::new(question);
        info!(
            session = %state.id,
            question = %state.question,
            max_iterations = self.config.max_iterations,
            "Research session started"
        );

        let outcome = AssertUnwindSafe(self.drive(&mut state))
            .catch_unwind()
            .await;
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(format!("panic: {}", panic_message(panic.as_ref()))),
        };

        if let Some(message) = failure {
            error!(session = %state.id, error = %message, "Research session aborted");
            state.answer = Some(format!("Error during research: {}", message));
            state.current_action = Some(Action::Done);
            state.phase = Phase::Terminated;
        }

        state.finished_at = Some(Utc::now());
        info!(
            session = %state.id,
            iterations = state.iteration,
            sources = state.sources.len(),
            answered = state.answer.is_some(),
            "Research session finished"
        );
        state
    }

    async fn drive(&self, state: &mut SessionState) -> Result<()> {
        let ceiling = self.config.max_iterations;

        while !state.is_terminated() {
            let before = state.progress();
            state.phase = Phase::Planning;

            let action = self.plan(state).await;
            state.current_action = Some(action);
            state.phase = action.phase();

            match action {
                Action::Done => {
                    info!(iteration = state.iteration, "Research finished without answer");
                }
                Action::Answer => self.answer(state).await?,
                Action::Search | Action::Read | Action::Retrieve => {
                    self.dispatch(state, action).await;
                    state.phase = Phase::Planning;
                }
            }

            state.check_since(&before, ceiling)?;
        }
        Ok(())
    }

    /// One planning step: forced ANSWER at the ceiling, otherwise a decision.
    async fn plan(&self, state: &mut SessionState) -> Action {
        let ceiling = self.config.max_iterations;
        if state.iteration >= ceiling {
            warn!(
                iteration = state.iteration,
                ceiling, "Iteration ceiling reached; forcing ANSWER"
            );
            state.record(HistoryEntry::Forced {
                iteration: state.iteration,
                ceiling,
            });
            return Action::Answer;
        }

        state.iteration += 1;
        // Decision functions bound their own latency (see `Planner::with_timeout`).
        let action = self
            .planner
            .decide(&state.question, &state.context, &state.history)
            .await;

        info!(iteration = state.iteration, action = %action, "Planned next action");
        state.record(HistoryEntry::Planned {
            iteration: state.iteration,
            action,
        });
        action
    }

    /// Run a non-terminal handler and fold its outcome into the session.
    async fn dispatch(&self, state: &mut SessionState, action: Action) {
        let Some(handler) = self.handlers.get(&action) else {
            warn!(action = %action, "No handler registered");
            absorb(state, action, "no handler registered".to_string());
            return;
        };

        let outcome = {
            let call = AssertUnwindSafe(handler.handle(state)).catch_unwind();
            let finished = match self.config.handler_timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| format!("timed out after {:?}", limit)),
                None => Ok(call.await),
            };
            match finished {
                Ok(Ok(Ok(delta))) => check_slot(action, delta),
                Ok(Ok(Err(e))) => Err(e.to_string()),
                Ok(Err(panic)) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
                Err(timeout) => Err(timeout),
            }
        };

        match outcome {
            Ok(delta) => {
                debug!(
                    action = %action,
                    new_sources = delta.new_sources.len(),
                    finding_chars = delta.finding.len(),
                    "Merging handler result"
                );
                *state = std::mem::take(state).merge(delta);
            }
            Err(message) => {
                warn!(action = %action, error = %message, "Handler failed; continuing");
                absorb(state, action, message);
            }
        }
    }

    /// Synthesize the answer and terminate.
    async fn answer(&self, state: &mut SessionState) -> Result<()> {
        let findings = &state.findings;
        let synthesis = self.synthesizer.synthesize(
            &state.question,
            &findings.search,
            &findings.retrieval,
            &findings.documents,
        );

        let Synthesis {
            answer,
            source_flags,
        } = match self.config.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, synthesis).await {
                Ok(synthesis) => synthesis,
                Err(_) => {
                    warn!(?limit, "Answer synthesis timed out");
                    Synthesis {
                        answer: format!("Error generating answer: timed out after {:?}", limit),
                        source_flags: SourceFlags::from_findings(
                            &findings.search,
                            &findings.retrieval,
                            &findings.documents,
                        ),
                    }
                }
            },
            None => synthesis.await,
        };

        state.set_answer(answer, source_flags)?;
        state.current_action = Some(Action::Done);
        state.phase = Phase::Terminated;
        Ok(())
    }
}

fn absorb(state: &mut SessionState, action: Action, message: String) {
    *state = std::mem::take(state).absorb_failure(action, message);
}

fn check_slot(action: Action, delta: HandlerDelta) -> std::result::Result<HandlerDelta, String> {
    if delta.slot.action() == action {
        Ok(delta)
    } else {
        Err(format!("handler returned a {} finding", delta.slot.action()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`ResearchController`].
#[derive(Default)]
pub struct ResearchControllerBuilder {
    planner: Option<SharedDecisionFunction>,
    handlers: Vec<SharedHandler>,
    synthesizer: Option<Arc<dyn Synthesizer>>,
    config: ControllerConfig,
}

impl ResearchControllerBuilder {
    pub fn with_planner(mut self, planner: SharedDecisionFunction) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Register a handler for its action. A later handler replaces an earlier one.
    pub fn with_handler(mut self, handler: SharedHandler) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.handler_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ResearchController> {
        let planner = self
            .planner
            .ok_or_else(|| AgentError::config("controller needs a decision function"))?;
        let synthesizer = self
            .synthesizer
            .ok_or_else(|| AgentError::config("controller needs an answer synthesizer"))?;
        if self.config.max_iterations == 0 {
            return Err(AgentError::config("max_iterations must be at least 1"));
        }

        let mut handlers = HashMap::new();
        for handler in self.handlers {
            let action = handler.action();
            if action.is_terminal() {
                return Err(AgentError::config(format!(
                    "{} is handled by the controller itself",
                    action
                )));
            }
            handlers.insert(action, handler);
        }

        Ok(ResearchController {
            planner,
            handlers,
            synthesizer,
            config: self.config,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ActionHandler;
    use crate::planner::{DecisionFunction, ScriptedPlanner};
    use crate::state::FindingSlot;
    use crate::synthesis::{AnswerSynthesizer, NO_DOCUMENT_INFO, NO_RETRIEVAL_INFO, NO_SEARCH_INFO};
    use async_trait::async_trait;
    use scout_llm::{BackendCompleter, MockBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Handler returning a fixed delta and counting calls.
    struct Stub {
        action: Action,
        finding: &'static str,
        sources: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl Stub {
        fn new(action: Action, finding: &'static str, sources: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                action,
                finding,
                sources,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ActionHandler for Stub {
        fn action(&self) -> Action {
            self.action
        }

        async fn handle(&self, _state: &SessionState) -> Result<HandlerDelta> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let slot = FindingSlot::for_action(self.action).unwrap();
            Ok(
                HandlerDelta::new(slot, self.finding, format!("{} stub ran", self.action))
                    .with_sources(self.sources.clone()),
            )
        }
    }

    enum Misbehavior {
        Fail,
        Panic,
        Hang,
        WrongSlot,
    }

    struct Broken(Action, Misbehavior);

    #[async_trait]
    impl ActionHandler for Broken {
        fn action(&self) -> Action {
            self.0
        }

        async fn handle(&self, _state: &SessionState) -> Result<HandlerDelta> {
            match self.1 {
                Misbehavior::Fail => Err(AgentError::search("connection reset")),
                Misbehavior::Panic => panic!("handler exploded"),
                Misbehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(AgentError::internal("unreachable"))
                }
                Misbehavior::WrongSlot => Ok(HandlerDelta::new(FindingSlot::Documents, "x", "y")),
            }
        }
    }

    struct PanickingPlanner;

    #[async_trait]
    impl DecisionFunction for PanickingPlanner {
        async fn decide(&self, _q: &str, context: &str, _h: &[HistoryEntry]) -> Action {
            if context.is_empty() {
                Action::Search
            } else {
                panic!("planner state corrupted")
            }
        }
    }

    fn synthesizer(backend: Arc<MockBackend>) -> Arc<dyn Synthesizer> {
        Arc::new(AnswerSynthesizer::new(Arc::new(BackendCompleter::new(
            backend, "test",
        ))))
    }

    fn answering() -> Arc<dyn Synthesizer> {
        synthesizer(Arc::new(MockBackend::with_text("The answer.")))
    }

    fn planned_count(state: &SessionState) -> usize {
        state
            .history
            .iter()
            .filter(|e| matches!(e, HistoryEntry::Planned { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_scenario_a_ceiling_forces_answer() {
        let planner = Arc::new(ScriptedPlanner::always(Action::Search));
        let search = Stub::new(Action::Search, "web says hi", vec!["https://a.dev"]);
        let controller = ResearchController::builder()
            .with_planner(planner.clone())
            .with_handler(search.clone())
            .with_synthesizer(answering())
            .with_max_iterations(1)
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert_eq!(state.iteration, 1);
        assert_eq!(state.answer(), "The answer.");
        assert_eq!(planner.calls(), 1);
        assert_eq!(search.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.phase, Phase::Terminated);
        assert_eq!(state.current_action, Some(Action::Done));
        assert!(state.history.iter().any(|e| matches!(
            e,
            HistoryEntry::Forced {
                iteration: 1,
                ceiling: 1
            }
        )));
        assert_eq!(planned_count(&state), state.iteration as usize);
        assert!(state.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_scenario_b_done_immediately() {
        let backend = Arc::new(MockBackend::with_text("never used"));
        let controller = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::always(Action::Done)))
            .with_synthesizer(synthesizer(backend.clone()))
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert!(state.context.is_empty());
        assert_eq!(state.answer(), "");
        assert!(state.answer.is_none());
        assert_eq!(state.current_action, Some(Action::Done));
        assert_eq!(state.phase, Phase::Terminated);
        assert_eq!(state.iteration, 1);
        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_scenario_c_handler_failure_continues() {
        let planner = Arc::new(ScriptedPlanner::new([Action::Search, Action::Answer]));
        let controller = ResearchController::builder()
            .with_planner(planner.clone())
            .with_handler(Arc::new(Broken(Action::Search, Misbehavior::Fail)))
            .with_synthesizer(answering())
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert!(state.has_failures());
        assert!(
            state
                .history_lines()
                .iter()
                .any(|l| l.starts_with("SEARCH failed:") && l.contains("connection reset"))
        );
        assert_eq!(planner.calls(), 2);
        assert_eq!(state.iteration, 2);
        assert_eq!(state.answer(), "The answer.");
        assert!(state.findings.search.is_empty());
        assert!(state.context.contains("SEARCH failed"));
    }

    #[tokio::test]
    async fn test_scenario_d_empty_findings_use_placeholders() {
        let backend = Arc::new(MockBackend::with_text("Nothing known."));
        let controller = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::always(Action::Answer)))
            .with_synthesizer(synthesizer(backend.clone()))
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert_eq!(state.source_flags, Some(SourceFlags::default()));
        let prompt = &backend.requests()[0].messages[0].content;
        assert!(prompt.contains(NO_SEARCH_INFO));
        assert!(prompt.contains(NO_RETRIEVAL_INFO));
        assert!(prompt.contains(NO_DOCUMENT_INFO));
    }

    #[tokio::test]
    async fn test_scenario_e_sources_are_a_union() {
        let controller = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::new([
                Action::Retrieve,
                Action::Search,
                Action::Answer,
            ])))
            .with_handler(Stub::new(
                Action::Retrieve,
                "kb",
                vec!["a.md", "b.md", "https://c.dev"],
            ))
            .with_handler(Stub::new(
                Action::Search,
                "web",
                vec!["https://c.dev", "a.md"],
            ))
            .with_synthesizer(answering())
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert_eq!(state.sources, vec!["a.md", "b.md", "https://c.dev"]);
        let flags = state.source_flags.unwrap();
        assert!(flags.web_search && flags.knowledge_base && !flags.documents);
    }

    #[tokio::test]
    async fn test_ceiling_is_never_exceeded() {
        let planner = Arc::new(ScriptedPlanner::always(Action::Retrieve));
        let controller = ResearchController::builder()
            .with_planner(planner.clone())
            .with_handler(Stub::new(Action::Retrieve, "kb", vec!["a.md"]))
            .with_synthesizer(answering())
            .with_max_iterations(3)
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert_eq!(state.iteration, 3);
        assert_eq!(planner.calls(), 3);
        assert_eq!(planned_count(&state), 3);
        assert_eq!(state.sources, vec!["a.md"]);
        assert_eq!(
            state.history_lines().last().map(String::as_str),
            Some("Generated answer (11 chars)")
        );
        // Slot holds the latest finding; context holds all three
        assert_eq!(state.findings.retrieval, "kb");
        assert_eq!(state.context.matches("Knowledge Base Retrieval:").count(), 3);
    }

    #[tokio::test]
    async fn test_context_and_history_only_grow() {
        let controller = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::new([
                Action::Search,
                Action::Read,
                Action::Retrieve,
                Action::Search,
            ])))
            .with_handler(Stub::new(Action::Search, "web", vec![]))
            .with_handler(Arc::new(Broken(Action::Read, Misbehavior::Fail)))
            .with_handler(Stub::new(Action::Retrieve, "kb", vec![]))
            .with_synthesizer(answering())
            .build()
            .unwrap();

        let state = controller.run("q").await;

        let lines = state.history_lines();
        assert_eq!(lines[0], "Iteration 1: Planned action: SEARCH");
        assert_eq!(lines[1], "SEARCH stub ran");
        assert_eq!(lines[2], "Iteration 2: Planned action: READ");
        assert!(lines[3].starts_with("READ failed:"));
        assert_eq!(state.iteration, 5);
        assert!(state.context.find("Web Search Results:") < state.context.find("Documents Read:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_timeout_is_a_failure() {
        let controller = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::new([Action::Read])))
            .with_handler(Arc::new(Broken(Action::Read, Misbehavior::Hang)))
            .with_synthesizer(answering())
            .with_handler_timeout(Some(Duration::from_secs(2)))
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert!(
            state
                .history_lines()
                .iter()
                .any(|l| l == "READ failed: timed out after 2s")
        );
        assert_eq!(state.answer(), "The answer.");
    }

    struct SlowPlanner(Duration);

    #[async_trait]
    impl DecisionFunction for SlowPlanner {
        async fn decide(&self, _q: &str, _c: &str, _h: &[HistoryEntry]) -> Action {
            tokio::time::sleep(self.0).await;
            Action::Answer
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_decision_is_awaited_not_replaced() {
        // Longer than every configured limit; only the decision function bounds itself.
        let controller = ResearchController::builder()
            .with_planner(Arc::new(SlowPlanner(Duration::from_secs(600))))
            .with_synthesizer(answering())
            .with_handler_timeout(Some(Duration::from_secs(2)))
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert_eq!(
            state.history_lines()[0],
            "Iteration 1: Planned action: ANSWER"
        );
        assert_eq!(planned_count(&state), 1);
        assert_eq!(state.answer(), "The answer.");
    }

    #[tokio::test]
    async fn test_handler_panic_is_a_failure() {
        let controller = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::new([Action::Retrieve])))
            .with_handler(Arc::new(Broken(Action::Retrieve, Misbehavior::Panic)))
            .with_synthesizer(answering())
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert!(
            state
                .history_lines()
                .iter()
                .any(|l| l.contains("panicked: handler exploded"))
        );
        assert_eq!(state.answer(), "The answer.");
    }

    #[tokio::test]
    async fn test_missing_handler_and_wrong_slot_are_failures() {
        let controller = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::new([Action::Search, Action::Retrieve])))
            .with_handler(Arc::new(Broken(Action::Retrieve, Misbehavior::WrongSlot)))
            .with_synthesizer(answering())
            .build()
            .unwrap();

        let state = controller.run("q").await;
        let lines = state.history_lines();

        assert!(lines.contains(&"SEARCH failed: no handler registered".to_string()));
        assert!(lines.contains(&"RETRIEVE failed: handler returned a READ finding".to_string()));
        assert!(state.findings.documents.is_empty());
    }

    #[tokio::test]
    async fn test_escaping_panic_becomes_error_answer() {
        let controller = ResearchController::builder()
            .with_planner(Arc::new(PanickingPlanner))
            .with_handler(Stub::new(Action::Search, "web", vec!["https://a.dev"]))
            .with_synthesizer(answering())
            .build()
            .unwrap();

        let state = controller.run("q").await;

        assert!(state.answer().starts_with("Error during research: "));
        assert!(state.answer().contains("planner state corrupted"));
        assert_eq!(state.current_action, Some(Action::Done));
        assert_eq!(state.phase, Phase::Terminated);
        // Progress before the failure is kept
        assert_eq!(state.sources, vec!["https://a.dev"]);
        assert_eq!(state.findings.search, "web");
    }

    #[tokio::test]
    async fn test_synthesis_error_is_the_answer() {
        let controller = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::always(Action::Answer)))
            .with_synthesizer(synthesizer(Arc::new(MockBackend::failing("boom"))))
            .build()
            .unwrap();

        let state = controller.run("q").await;
        assert!(state.answer().starts_with("Error generating answer: "));
        assert_eq!(state.phase, Phase::Terminated);
    }

    #[test]
    fn test_builder_validation() {
        let err = ResearchController::builder()
            .with_synthesizer(answering())
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));

        let err = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::always(Action::Done)))
            .with_synthesizer(answering())
            .with_max_iterations(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_iterations"));

        let controller = ResearchController::builder()
            .with_planner(Arc::new(ScriptedPlanner::always(Action::Done)))
            .with_synthesizer(answering())
            .build()
            .unwrap();
        assert_eq!(controller.config(), &ControllerConfig::default());
    }
}
