//! Config file discovery and layered merging.
//!
//! Resolution order (later overrides earlier):
//! 1. `<config dir>/config.toml` (user config)
//! 2. `./scout.toml` (project-local)
//! 3. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, Result, ScoutConfig};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "scout.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for platform directory resolution.
const APP_NAME: &str = "scout";

/// Overrides the user config directory.
const CONFIG_DIR_ENV: &str = "SCOUT_CONFIG_DIR";

/// Overrides the data directory (knowledge store, session archive).
const DATA_DIR_ENV: &str = "SCOUT_DATA_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the config file.
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: ScoutConfig,
    /// Sources that were checked, in order of precedence (lowest first).
    pub sources: Vec<ConfigSource>,
    /// Warnings generated during loading (unparsable layers, plaintext keys).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Get paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration by discovering and merging all config layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Load configuration with explicit control over the user config directory.
///
/// `config_dir` overrides both `SCOUT_CONFIG_DIR` and the platform default.
/// Layers that fail to parse are skipped with a warning. The merged result
/// must pass [`ScoutConfig::validate`].
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let mut config = ScoutConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    check_plaintext_keys(&config, &mut warnings);
    config.validate()?;

    Ok(LoadedConfig {
        config,
        sources,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<ScoutConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    ScoutConfig::from_toml(&contents)
}

/// Save configuration to a file.
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &ScoutConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_toml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// User config file path.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// User config directory.
///
/// Checks `SCOUT_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/scout` on Linux, `~/Library/Application Support/scout` on macOS).
pub fn config_dir() -> Option<PathBuf> {
    env_dir(CONFIG_DIR_ENV).or_else(|| dirs::config_dir().map(|d| d.join(APP_NAME)))
}

/// Data directory for the knowledge store and session archive.
///
/// Checks `SCOUT_DATA_DIR` first, then the platform data directory.
pub fn data_dir() -> Option<PathBuf> {
    env_dir(DATA_DIR_ENV).or_else(|| dirs::data_dir().map(|d| d.join(APP_NAME)))
}

fn env_dir(var: &str) -> Option<PathBuf> {
    match std::env::var(var) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => None,
    }
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(config: &mut ScoutConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    let loaded = match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            true
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            false
        }
    };

    ConfigSource {
        path: path.to_path_buf(),
        loaded,
    }
}

/// Check for plaintext API keys in the config and emit warnings.
fn check_plaintext_keys(config: &ScoutConfig, warnings: &mut Vec<String>) {
    if let Some(ref llm) = config.llm
        && llm.has_plaintext_api_key()
    {
        warnings.push(format!(
            "[llm] contains a plaintext API key. Consider setting {} instead.",
            llm.backend.env_var()
        ));
    }

    if config
        .search
        .as_ref()
        .is_some_and(|s| s.api_key.is_some())
    {
        warnings.push(
            "[search] contains a plaintext API key. Consider using an environment variable instead."
                .to_string(),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    use crate::Backend;

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[llm]\nbackend = \"groq\"\nmodel = \"test-model\"\n").unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.llm().backend, Backend::Groq);
        assert_eq!(config.llm().model, "test-model");
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "this is not valid toml {{{{").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_no_files() {
        let dir = TempDir::new().unwrap();
        let empty_config_dir = TempDir::new().unwrap();

        let loaded =
            load_config_with_options(Some(dir.path()), Some(empty_config_dir.path())).unwrap();
        assert!(loaded.config.llm.is_none());
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.sources.len(), 2);
    }

    #[test]
    fn test_load_config_layered_merge() {
        let user_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();

        fs::write(
            user_dir.path().join("config.toml"),
            r#"
[llm]
backend = "groq"
model = "base-model"

[research]
max_iterations = 6
"#,
        )
        .unwrap();
        fs::write(
            project_dir.path().join("scout.toml"),
            r#"
[llm]
model = "project-model"
"#,
        )
        .unwrap();

        let loaded =
            load_config_with_options(Some(project_dir.path()), Some(user_dir.path())).unwrap();

        // Project-local [llm] replaces the user section wholesale
        let llm = loaded.config.llm();
        assert_eq!(llm.model, "project-model");
        assert_eq!(llm.backend, Backend::Ollama);
        // Untouched sections survive
        assert_eq!(loaded.config.research().max_iterations, 6);
        assert_eq!(loaded.loaded_from().len(), 2);
    }

    #[test]
    fn test_malformed_config_warns_but_continues() {
        let dir = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        fs::write(dir.path().join("scout.toml"), "not valid toml {{{{").unwrap();

        let loaded = load_config_with_options(Some(dir.path()), Some(empty.path())).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("Failed to load"));
        assert!(loaded.loaded_from().is_empty());
    }

    #[test]
    fn test_invalid_values_fail_loading() {
        let dir = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        fs::write(
            dir.path().join("scout.toml"),
            "[research]\nchunk_size = 100\nchunk_overlap = 500\n",
        )
        .unwrap();

        let err = load_config_with_options(Some(dir.path()), Some(empty.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_plaintext_key_warning() {
        let dir = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        fs::write(
            dir.path().join("scout.toml"),
            r#"
[llm]
backend = "openai"
api_key = "sk-secret"

[search]
provider = "brave"
api_key = "brave-secret"
"#,
        )
        .unwrap();

        let loaded = load_config_with_options(Some(dir.path()), Some(empty.path())).unwrap();
        assert_eq!(loaded.warnings.len(), 2);
        assert!(loaded.warnings[0].contains("OPENAI_API_KEY"));
        assert!(loaded.warnings[1].contains("[search]"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ScoutConfig::new();
        config.llm = Some(crate::LlmConfig {
            model: "mistral".to_string(),
            ..Default::default()
        });
        save_config(&config, &path).unwrap();

        assert_eq!(load_config_file(&path).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_config_dir_env_override() {
        let dir = TempDir::new().unwrap();
        // SAFETY: serialized with other env-touching tests
        unsafe { std::env::set_var(CONFIG_DIR_ENV, dir.path()) };
        assert_eq!(config_dir().as_deref(), Some(dir.path()));
        assert_eq!(config_path(), Some(dir.path().join("config.toml")));

        unsafe { std::env::set_var(CONFIG_DIR_ENV, "") };
        let fallback = config_dir();
        unsafe { std::env::remove_var(CONFIG_DIR_ENV) };

        if let Some(p) = fallback {
            assert!(p.ends_with("scout"));
        }
    }

    #[test]
    #[serial]
    fn test_data_dir_env_override() {
        let dir = TempDir::new().unwrap();
        unsafe { std::env::set_var(DATA_DIR_ENV, dir.path()) };
        let resolved = data_dir();
        unsafe { std::env::remove_var(DATA_DIR_ENV) };

        assert_eq!(resolved.as_deref(), Some(dir.path()));
    }
}
