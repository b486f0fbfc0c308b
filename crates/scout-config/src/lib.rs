//! Configuration system for Scout.
//!
//! Provides TOML-based configuration with:
//! - `[llm]`, `[embedding]`, `[research]`, `[search]` and `[memory]` sections
//! - Config file layering (user config dir + project-local `scout.toml`)
//! - API key resolution (config file, then environment variable)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, config_dir, config_path, data_dir, load_config,
    load_config_file, load_config_with_options, save_config,
};
pub use error::{ConfigError, Result};
pub use types::*;
