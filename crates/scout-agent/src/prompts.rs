//! Prompt templates sent to the text completer.

use crate::action::Action;
use crate::state::HistoryEntry;

pub const NO_CONTEXT: &str = "No context available yet";
pub const NO_HISTORY: &str = "No previous actions";

/// Prompt asking the model to pick the next action.
pub fn planning_prompt(question: &str, context: &str, history: &[HistoryEntry]) -> String {
    let context = if context.trim().is_empty() {
        NO_CONTEXT.to_string()
    } else {
        context.trim().to_string()
    };
    let history = if history.is_empty() {
        NO_HISTORY.to_string()
    } else {
        history
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    };
    let keywords = Action::ALL.map(|a| a.as_str()).join(", ");

    format!(
        r#"You plan the next step of a research assistant.

Pick exactly one action:
- SEARCH: look the question up on the web. Good for recent events or anything time-sensitive.
- READ: ingest the local documents into the knowledge base. Good when documents exist and have not been read.
- RETRIEVE: query the knowledge base for stored passages. Good when earlier reading may be relevant.
- ANSWER: write the final answer. Choose this once the gathered context covers the question.
- DONE: stop. Only when an answer has already been given.

Question: {question}

Gathered so far:
{context}

Steps taken:
{history}

Reply with one word: {keywords}."#
    )
}

/// Prompt condensing raw web results.
pub fn search_summary_prompt(question: &str, results: &str) -> String {
    format!(
        r#"Below are web search results for a research question.

Question: {question}

Results:
{results}

Summarize what these results say about the question. Keep the facts, figures and dates, cite which result each point came from, and say so plainly if the results do not answer it."#
    )
}

/// Prompt condensing passages pulled from the knowledge base.
pub fn retrieval_summary_prompt(question: &str, passages: &str) -> String {
    format!(
        r#"Below are passages retrieved from a local knowledge base.

Question: {question}

Passages:
{passages}

Summarize what the passages contribute to the question, naming the source document for each point. Ignore passages that are off topic."#
    )
}

/// Prompt producing the final answer from every finding slot.
pub fn answer_prompt(question: &str, search: &str, retrieval: &str, documents: &str) -> String {
    format!(
        r#"Write the answer to a research question using only the material below.

Question: {question}

From the web:
{search}

From the knowledge base:
{retrieval}

From local documents:
{documents}

Answer directly first, then give supporting detail. Point out where sources disagree and note anything the material leaves open. Mention which kind of source each claim relies on."#
    )
}
