//! Memory command - inspect and manage the knowledge base.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;

use scout_agent::format_retrieved;

use super::research::truncate;
use super::{Context, print_json};
use crate::app::App;

/// Arguments for the memory command.
#[derive(Args, Debug)]
pub struct MemoryArgs {
    #[command(subcommand)]
    pub command: MemoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemoryCommand {
    /// Show knowledge base statistics
    Stats,

    /// Search the knowledge base
    Search {
        /// Search query
        query: String,

        /// Maximum results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List stored sources
    Sources,

    /// Remove every chunk from one source
    Remove {
        /// Source name as shown by `memory sources`
        source: String,
    },

    /// Delete everything in the knowledge base
    Clear {
        /// Skip confirmation
        #[arg(long)]
        yes: bool,
    },
}

/// Run the memory command.
pub async fn run(args: MemoryArgs, ctx: &Context) -> Result<()> {
    let app = App::load(ctx)?;
    match args.command {
        MemoryCommand::Stats => cmd_stats(&app, ctx),
        MemoryCommand::Search { query, limit } => cmd_search(&app, &query, limit, ctx).await,
        MemoryCommand::Sources => cmd_sources(&app, ctx),
        MemoryCommand::Remove { source } => cmd_remove(&app, &source, ctx),
        MemoryCommand::Clear { yes } => cmd_clear(&app, yes, ctx),
    }
}

fn cmd_stats(app: &App, ctx: &Context) -> Result<()> {
    let embedder = app.embedder()?;
    let store = app.open_store(&embedder)?;
    let stats = store.stats()?;

    if ctx.json_output {
        return print_json(&json!({
            "database": app.database_path().display().to_string(),
            "total_chunks": stats.total_chunks,
            "total_sources": stats.total_sources,
            "total_embeddings": stats.total_embeddings,
            "dimensions": stats.dimensions,
            "embedding_model": stats.embedding_model,
            "schema_version": stats.schema_version,
            "vector_version": stats.vector_version,
        }));
    }

    let dim = Style::new().dim();
    println!("{}", style("Knowledge Base").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!("  Database:   {}", app.database_path().display());
    println!("  Chunks:     {}", stats.total_chunks);
    println!("  Sources:    {}", stats.total_sources);
    println!("  Embeddings: {}", stats.total_embeddings);
    println!("  Dimensions: {}", stats.dimensions);
    if let Some(ref model) = stats.embedding_model {
        println!("  Embedder:   {}", model);
    }
    println!("  Schema:     v{}", stats.schema_version);
    println!("  sqlite-vec: {}", stats.vector_version);
    Ok(())
}

async fn cmd_search(app: &App, query: &str, limit: Option<usize>, ctx: &Context) -> Result<()> {
    let knowledge = app.knowledge_base()?;
    let k = limit.unwrap_or_else(|| knowledge.top_k());
    let results = knowledge.search(query, k).await?;

    if ctx.json_output {
        return print_json(&results);
    }

    if results.is_empty() {
        println!("No matches for '{}'", query);
        return Ok(());
    }

    if ctx.verbose {
        println!("{}", format_retrieved(&results));
        return Ok(());
    }

    let dim = Style::new().dim();
    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. {} {}",
            i + 1,
            style(&r.source).cyan(),
            dim.apply_to(format!("(score {:.3})", r.score))
        );
        println!("   {}", truncate(&r.text.replace('\n', " "), 120));
    }
    Ok(())
}

fn cmd_sources(app: &App, ctx: &Context) -> Result<()> {
    let embedder = app.embedder()?;
    let sources = app.open_store(&embedder)?.sources()?;

    if ctx.json_output {
        return print_json(&sources);
    }
    if sources.is_empty() {
        println!("Knowledge base is empty.");
    }
    for source in &sources {
        println!("  {}", source);
    }
    Ok(())
}

fn cmd_remove(app: &App, source: &str, ctx: &Context) -> Result<()> {
    let embedder = app.embedder()?;
    let removed = app.open_store(&embedder)?.remove_source(source)?;

    if ctx.json_output {
        return print_json(&json!({ "source": source, "removed": removed }));
    }
    if removed == 0 {
        println!("No chunks stored for '{}'", source);
    } else {
        println!("Removed {} chunk(s) from '{}'", removed, source);
    }
    Ok(())
}

fn cmd_clear(app: &App, yes: bool, ctx: &Context) -> Result<()> {
    if !yes {
        anyhow::bail!("Refusing to clear the knowledge base without --yes");
    }
    let embedder = app.embedder()?;
    let removed = app.open_store(&embedder)?.clear()?;

    if ctx.json_output {
        return print_json(&json!({ "removed": removed }));
    }
    println!("Cleared {} chunk(s)", removed);
    Ok(())
}
