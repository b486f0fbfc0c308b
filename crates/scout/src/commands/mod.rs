//! CLI command handlers.

use std::path::PathBuf;

pub mod check;
pub mod config;
pub mod documents;
pub mod history;
pub mod ingest;
pub mod memory;
pub mod research;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// User config directory override.
    pub config_dir: Option<PathBuf>,
}

/// Print a value as pretty JSON.
pub(crate) fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
