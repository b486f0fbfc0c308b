//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;

use scout_config::ScoutConfig;

use super::{Context, print_json};
use crate::app::App;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./scout.toml) instead of user config
        #[arg(long)]
        local: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { local } => cmd_init(local, ctx),
    }
}

fn user_config_path(ctx: &Context) -> Option<PathBuf> {
    match ctx.config_dir {
        Some(ref dir) => Some(dir.join("config.toml")),
        None => scout_config::config_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let app = App::load(ctx)?;

    if ctx.json_output {
        return print_json(&json!({
            "files": app.config_files,
            "data_dir": app.data_dir,
            "llm": app.config.llm(),
            "embedding": app.config.embedding(),
            "research": app.config.research(),
            "search": app.config.search(),
            "memory": app.config.memory(),
        }));
    }

    let dim = Style::new().dim();
    println!("{}", style("# Scout Configuration").bold());
    println!();

    if app.config_files.is_empty() {
        println!("No config files loaded (using defaults)");
    } else {
        println!("Config files:");
        for path in &app.config_files {
            println!("  {}", path.display());
        }
    }
    println!("Data directory: {}", app.data_dir.display());
    println!();

    let llm = app.config.llm();
    let key_status = if llm.resolve_api_key().is_some() {
        style("key set").green()
    } else {
        style("no key").dim()
    };
    println!(
        "LLM:        {} / {}  {}",
        llm.backend, llm.model, key_status
    );

    let embedding = app.config.embedding();
    println!(
        "Embedding:  {} ({} dims)",
        embedding.provider.as_str(),
        embedding.effective_dimensions()
    );

    let search = app.config.search();
    println!(
        "Search:     {} (max {} results)",
        search.provider.as_str(),
        search.max_results
    );

    let research = app.config.research();
    println!(
        "Research:   {} iterations, top_k {}, chunks {}/{}",
        research.max_iterations, research.top_k, research.chunk_size, research.chunk_overlap
    );
    println!("Documents:  {}", research.documents_dir().display());
    println!("Database:   {}", app.database_path().display());

    if ctx.verbose {
        println!();
        println!("{}", dim.apply_to("─".repeat(50)));
        let mut effective = ScoutConfig {
            llm: Some(llm),
            embedding: Some(embedding),
            research: Some(research),
            search: Some(search),
            memory: Some(app.config.memory()),
        };
        if let Some(api_key) = effective.llm.as_mut().and_then(|l| l.api_key.as_mut()) {
            *api_key = "********".to_string();
        }
        print!("{}", effective.to_toml()?);
    }
    Ok(())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    match user_config_path(ctx) {
        Some(path) => {
            if ctx.json_output {
                print_json(&json!({ "path": path }))?;
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
        None => anyhow::bail!("Could not determine config directory"),
    }
}

const TEMPLATE: &str = r#"# Scout Configuration

[llm]
backend = "ollama"        # ollama | openai | groq | custom
model = "llama3"
temperature = 0.7
max_tokens = 2048
# api_key: prefer OPENAI_API_KEY / GROQ_API_KEY

[embedding]
provider = "ollama"       # ollama | openai | mock
# model = "nomic-embed-text"
# dimensions = 384

[research]
max_iterations = 10
top_k = 5
chunk_size = 1000
chunk_overlap = 200
handler_timeout_secs = 120
planner_timeout_secs = 60
# data_dir = "data"

[search]
provider = "duckduckgo"   # duckduckgo | brave | serper | tavily
max_results = 5

[memory]
# database = "knowledge.db"
"#;

fn cmd_init(local: bool, ctx: &Context) -> Result<()> {
    let path = if local {
        PathBuf::from("scout.toml")
    } else {
        user_config_path(ctx)
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
    };

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, TEMPLATE)?;
    println!("Created {}", path.display());
    Ok(())
}
