//! History command - recently finished research sessions.

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use scout_agent::format_sources;

use super::research::truncate;
use super::{Context, print_json};
use crate::app::App;

/// Arguments for the history command.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Number of sessions to show
    #[arg(short, long, default_value = "5")]
    pub limit: usize,

    /// Show full answers and sources
    #[arg(long)]
    pub full: bool,
}

/// Run the history command.
pub async fn run(args: HistoryArgs, ctx: &Context) -> Result<()> {
    let app = App::load(ctx)?;
    let archive = app.archive()?;
    let sessions = archive.recent(args.limit);

    if ctx.json_output {
        return print_json(&sessions);
    }

    if sessions.is_empty() {
        println!("No research sessions yet.");
        return Ok(());
    }

    let dim = Style::new().dim();
    for session in &sessions {
        println!(
            "{} {}",
            dim.apply_to(session.timestamp.format("%Y-%m-%d %H:%M")),
            style(&session.question).bold()
        );
        if args.full {
            println!("{}", session.answer);
            println!("{}", format_sources(&session.sources));
        } else {
            println!("  {}", truncate(session.answer.lines().next().unwrap_or(""), 100));
            println!(
                "  {}",
                dim.apply_to(format!(
                    "{} source(s), {} step(s)",
                    session.sources.len(),
                    session.iteration
                ))
            );
        }
        println!();
    }

    if ctx.verbose
        && let Some(path) = archive.path()
    {
        println!("{}", dim.apply_to(format!("Archive: {}", path.display())));
    }
    Ok(())
}
