//! Check command - verify the pieces a research session depends on.

use anyhow::Result;
use clap::Args;
use console::style;
use serde::Serialize;

use super::{Context, print_json};
use crate::app::App;

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Skip network checks (LLM and embedder)
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: &'static str,
    ok: bool,
    detail: String,
}

impl CheckResult {
    fn from_result(name: &'static str, result: Result<String>) -> Self {
        match result {
            Ok(detail) => Self {
                name,
                ok: true,
                detail,
            },
            Err(e) => Self {
                name,
                ok: false,
                detail: format!("{:#}", e),
            },
        }
    }
}

/// Run the check command.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let app = App::load(ctx)?;
    let mut results = Vec::new();

    results.push(CheckResult::from_result("documents", check_documents(&app)));

    results.push(CheckResult::from_result("knowledge store", check_store(&app)));

    if !args.offline {
        results.push(CheckResult::from_result("llm", check_llm(&app).await));
        results.push(CheckResult::from_result("embedder", check_embedder(&app).await));
    }

    let all_ok = results.iter().all(|r| r.ok);

    if ctx.json_output {
        print_json(&results)?;
    } else {
        for r in &results {
            let mark = if r.ok {
                style("✓").green()
            } else {
                style("✗").red()
            };
            println!("{} {:<16} {}", mark, r.name, r.detail);
        }
    }

    if !all_ok {
        anyhow::bail!("Some checks failed");
    }
    Ok(())
}

fn check_documents(app: &App) -> Result<String> {
    let reader = app.document_reader(None);
    let dir = reader.data_dir();
    if !dir.is_dir() {
        anyhow::bail!("{} does not exist", dir.display());
    }
    let documents = reader.list_documents()?;
    Ok(format!("{} document(s) in {}", documents.len(), dir.display()))
}

fn check_store(app: &App) -> Result<String> {
    let embedder = app.embedder()?;
    let store = app.open_store(&embedder)?;
    let stats = store.stats()?;
    if stats.total_embeddings != stats.total_chunks {
        anyhow::bail!(
            "{} chunk(s) but {} embedding(s) at {}",
            stats.total_chunks,
            stats.total_embeddings,
            app.database_path().display()
        );
    }
    Ok(format!(
        "{} chunk(s) from {} source(s) at {} (sqlite-vec {})",
        stats.total_chunks,
        stats.total_sources,
        app.database_path().display(),
        stats.vector_version
    ))
}

async fn check_llm(app: &App) -> Result<String> {
    let backend = app.backend()?;
    backend.health_check().await?;
    Ok(format!("{} / {}", backend.name(), app.config.llm().model))
}

async fn check_embedder(app: &App) -> Result<String> {
    let embedder = app.embedder()?;
    let vector = embedder.embed("health check").await?;
    Ok(format!("{} ({} dims)", embedder.name(), vector.len()))
}
