//! Research command - answer a question through the planning loop.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use scout_agent::{SessionState, format_sources};

use super::{Context, print_json};
use crate::app::{App, Overrides};

/// Arguments for the research command.
#[derive(Args, Debug)]
pub struct ResearchArgs {
    /// The question to research
    pub question: String,

    /// Planning steps before an answer is forced
    #[arg(short = 'n', long)]
    pub max_iterations: Option<u32>,

    /// Per-action timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Directory of documents for the READ action
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Do not record the session in history
    #[arg(long)]
    pub no_archive: bool,
}

/// Run the research command.
pub async fn run(args: ResearchArgs, ctx: &Context) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let app = App::load(ctx)?;
    let overrides = Overrides {
        max_iterations: args.max_iterations,
        handler_timeout_secs: args.timeout,
        documents_dir: args.data_dir,
    };
    let controller = app.controller(&overrides)?;

    let spinner = if ctx.json_output {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
        spinner.set_message(format!("Researching: {}", truncate(question, 60)));
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    };

    let state = controller.run(question).await;
    spinner.finish_and_clear();

    if !args.no_archive {
        if let Err(e) = archive_session(&app, &state) {
            warn!(error = %e, "Failed to archive session");
        }
    }

    if ctx.json_output {
        print_json(&state)
    } else {
        print_session(&state);
        Ok(())
    }
}

fn archive_session(app: &App, state: &SessionState) -> Result<()> {
    app.archive()?.append(state)?;
    Ok(())
}

fn print_session(state: &SessionState) {
    let dim = Style::new().dim();

    println!("{}", style("Answer").bold().cyan());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!("{}", state.answer());
    println!();

    println!("{}", style("Sources").bold());
    println!("{}", format_sources(&state.sources));
    println!();

    if let Some(flags) = state.source_flags {
        let mark = |used: bool| if used { style("yes").green() } else { style("no").dim() };
        println!(
            "{}  web: {}  knowledge base: {}  documents: {}",
            dim.apply_to("Used"),
            mark(flags.web_search),
            mark(flags.knowledge_base),
            mark(flags.documents)
        );
    }

    println!();
    println!("{}", style("Activity").bold());
    for line in state.history_lines() {
        println!("  {} {}", dim.apply_to("•"), line);
    }

    println!();
    println!(
        "{}",
        dim.apply_to(format!(
            "{} planning step(s), session {}",
            state.iteration, state.id
        ))
    );
}

/// Shorten `text` to at most `max` characters for one-line display.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer question", 8), "a lon...");
        assert_eq!(truncate("ünïcödé text", 6), "ünï...");
    }
}
