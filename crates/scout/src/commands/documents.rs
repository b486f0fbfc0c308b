//! Documents command - list files the READ action would see.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use serde_json::json;

use super::{Context, print_json};
use crate::app::App;

/// Arguments for the documents command.
#[derive(Args, Debug)]
pub struct DocumentsArgs {
    /// Directory of documents (default: [research] data_dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

/// Run the documents command.
pub async fn run(args: DocumentsArgs, ctx: &Context) -> Result<()> {
    let app = App::load(ctx)?;
    let reader = app.document_reader(args.data_dir);
    let documents = reader.list_documents()?;

    if ctx.json_output {
        let paths: Vec<String> = documents.iter().map(|p| p.display().to_string()).collect();
        return print_json(&json!({
            "data_dir": reader.data_dir().display().to_string(),
            "documents": paths,
        }));
    }

    let dim = Style::new().dim();
    println!(
        "{} {}",
        style("Documents in").bold(),
        reader.data_dir().display()
    );
    println!("{}", dim.apply_to("─".repeat(50)));

    if documents.is_empty() {
        println!("No documents found.");
        return Ok(());
    }
    for path in &documents {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        println!("  {}", name);
    }
    println!();
    println!("{}", dim.apply_to(format!("{} document(s)", documents.len())));
    Ok(())
}
