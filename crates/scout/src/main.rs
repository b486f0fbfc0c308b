//! Scout - multi-step research assistant
//!
//! Main entry point for the Scout CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod app;
mod commands;

use commands::{check, config, documents, history, ingest, memory, research};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Scout - multi-step research assistant
#[derive(Parser)]
#[command(name = "scout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config directory (default: platform config dir)
    #[arg(long, global = true, env = "SCOUT_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Research a question using web search, documents and the knowledge base
    Research(research::ResearchArgs),

    /// Show recently finished research sessions
    History(history::HistoryArgs),

    /// List documents available to the READ action
    Documents(documents::DocumentsArgs),

    /// Chunk, embed and store every document in the data directory
    Ingest(ingest::IngestArgs),

    /// Knowledge base operations
    Memory(memory::MemoryArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Check that the LLM, embedder and knowledge store are reachable
    Check(check::CheckArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "scout=debug,scout_agent=debug,scout_llm=debug,scout_memory=debug,scout_config=debug,info"
    } else {
        "scout=info,scout_agent=info,scout_llm=info,scout_memory=info,scout_config=info,warn"
    };

    let log_dir = cli
        .config_dir
        .clone()
        .or_else(scout_config::config_dir)
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "scout.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "scout=trace,scout_agent=trace,scout_llm=trace,scout_memory=trace,scout_config=trace,info",
                )),
        )
        .init();

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir: cli.config_dir,
    };

    match cli.command {
        Commands::Research(args) => research::run(args, &ctx).await,
        Commands::History(args) => history::run(args, &ctx).await,
        Commands::Documents(args) => documents::run(args, &ctx).await,
        Commands::Ingest(args) => ingest::run(args, &ctx).await,
        Commands::Memory(args) => memory::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::Check(args) => check::run(args, &ctx).await,
    }
}
