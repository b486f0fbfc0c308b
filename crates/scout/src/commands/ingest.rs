//! Ingest command - load every document into the knowledge base.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde_json::json;

use scout_agent::ingest_documents;

use super::{Context, print_json};
use crate::app::App;

/// Arguments for the ingest command.
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Directory of documents (default: [research] data_dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

/// Run the ingest command.
pub async fn run(args: IngestArgs, ctx: &Context) -> Result<()> {
    let app = App::load(ctx)?;
    let reader = app.document_reader(args.data_dir);
    let knowledge = app.knowledge_base()?;

    let report = ingest_documents(&reader, &knowledge).await?;

    if ctx.json_output {
        let skipped: Vec<_> = report
            .skipped
            .iter()
            .map(|(name, reason)| json!({ "document": name, "reason": reason }))
            .collect();
        return print_json(&json!({
            "attempted": report.attempted,
            "stored": report.stored,
            "skipped": skipped,
            "chunks": report.chunks,
        }));
    }

    let dim = Style::new().dim();
    if report.attempted == 0 {
        println!("No documents found in {}", reader.data_dir().display());
        return Ok(());
    }

    for name in &report.stored {
        println!("  {} {}", style("✓").green(), name);
    }
    for (name, reason) in &report.skipped {
        println!("  {} {} {}", style("✗").red(), name, dim.apply_to(reason));
    }
    println!();
    println!(
        "Stored {} of {} document(s), {} chunk(s)",
        report.stored.len(),
        report.attempted,
        report.chunks
    );
    Ok(())
}
