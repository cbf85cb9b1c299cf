//! Configuration loading for ROAM services
//!
//! Provides two-tier configuration resolution with ENV → TOML priority,
//! plus platform config-file discovery.

use crate::params::Tunables;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Model provider (LLM) endpoint configuration
///
/// The endpoint is OpenAI-compatible chat completions; any gateway speaking
/// that protocol works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model identifier passed through to the provider
    pub model: String,
    pub request_timeout_secs: u64,
    /// Provider-side quota; the client never exceeds this
    pub requests_per_second: u32,
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 20,
            requests_per_second: 2,
            max_tokens: 800,
        }
    }
}

/// Venue-verification provider endpoint configuration
///
/// Points at the deployment's places-verification service (a thin proxy in
/// front of the upstream places API, owned by an external collaborator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub requests_per_second: u32,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5820".to_string(),
            api_key: None,
            request_timeout_secs: 10,
            requests_per_second: 5,
        }
    }
}

/// TOML configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub model: ModelConfig,
    pub places: PlacesConfig,
    pub tunables: Tunables,
}

/// Resolve the config file path
///
/// Priority order:
/// 1. `ROAM_CONFIG` environment variable
/// 2. Platform config dir (`~/.config/roam/roam-rec.toml` on Linux)
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("ROAM_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("roam").join("roam-rec.toml"))
}

/// Load configuration, falling back to defaults when no file exists
pub fn load_config() -> Result<TomlConfig> {
    let path = match config_file_path() {
        Some(p) if p.exists() => p,
        _ => {
            info!("No config file found, using defaults");
            return Ok(TomlConfig::default());
        }
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}

/// Resolve the model provider API key from 2-tier configuration
///
/// **Priority:** ENV → TOML
pub fn resolve_model_api_key(config: &TomlConfig) -> Result<String> {
    resolve_api_key(
        "model",
        "ROAM_MODEL_API_KEY",
        config.model.api_key.as_deref(),
    )
}

/// Resolve the places provider API key from 2-tier configuration
///
/// **Priority:** ENV → TOML
pub fn resolve_places_api_key(config: &TomlConfig) -> Result<String> {
    resolve_api_key(
        "places",
        "ROAM_PLACES_API_KEY",
        config.places.api_key.as_deref(),
    )
}

fn resolve_api_key(provider: &str, env_var: &str, toml_key: Option<&str>) -> Result<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in both environment and TOML. Using environment (highest priority).",
            provider
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", provider);
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", provider);
        return Ok(key.to_string());
    }

    Err(Error::Config(format!(
        "{} API key not configured. Set {} or add api_key to the [{}] section of roam-rec.toml",
        provider, env_var, provider
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.model.api_key.is_none());
        assert_eq!(config.tunables.max_results, 10);
    }

    #[test]
    fn test_partial_toml_parses() {
        let config: TomlConfig = toml::from_str(
            r#"
            [model]
            model = "gpt-4o"
            api_key = "sk-test"

            [tunables]
            max_results = 6
            "#,
        )
        .unwrap();
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.tunables.max_results, 6);
        // Untouched sections keep defaults
        assert_eq!(config.places.requests_per_second, 5);
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[test]
    fn test_resolve_key_errors_when_absent() {
        let config = TomlConfig::default();
        // Key name chosen to not collide with a real environment variable
        let result = resolve_api_key("model", "ROAM_TEST_NO_SUCH_KEY", config.model.api_key.as_deref());
        assert!(result.is_err());
    }
}
