//! Configuration for the remote Assistants API.
//!
//! Supports reading secrets from `~/.config/adjutant/secret.json` with
//! environment-variable fallback.

use adjutant_core::{AdjutantError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Fallback model when the user leaves the model field empty.
pub const DEFAULT_MODEL: &str = "gpt-4";
/// Base URL of the remote API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Wire identifier for the file-search tool. Older deployments of the remote
/// API expect "retrieval", newer ones "file_search"; it is configuration,
/// not a constant the code depends on.
pub const DEFAULT_FILE_SEARCH_TOOL: &str = "retrieval";

/// Root configuration structure for secret.json
#[derive(Debug, Clone, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub openai: Option<OpenAiSecret>,
}

/// OpenAI API configuration section of secret.json
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSecret {
    pub api_key: String,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub file_search_tool: Option<String>,
}

/// Resolved configuration used by the transport and the REPL.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bearer credential attached to every request
    pub api_key: String,
    /// Base URL the request paths are joined onto
    pub base_url: String,
    /// Model used when the user does not pick one
    pub default_model: String,
    /// Wire name of the file-search tool
    pub file_search_tool: String,
}

impl ApiConfig {
    /// Creates a config with the default base URL, model, and tool name.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            file_search_tool: DEFAULT_FILE_SEARCH_TOOL.to_string(),
        }
    }

    /// Loads configuration from secret.json or environment variables.
    ///
    /// Priority:
    /// 1. ~/.config/adjutant/secret.json
    /// 2. Environment variables (OPENAI_API_KEY, OPENAI_MODEL_NAME, OPENAI_BASE_URL)
    pub fn load() -> Result<Self> {
        let secrets = match config_path() {
            Ok(path) if path.exists() => Some(load_secret_config(&path)?),
            _ => None,
        };
        Self::resolve(secrets, |key| env::var(key).ok())
    }

    /// Resolves a config from an already-loaded secret file and an
    /// environment lookup. The secret file wins when it has an `openai`
    /// section; otherwise the environment is consulted.
    fn resolve(
        secrets: Option<SecretConfig>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        if let Some(openai) = secrets.and_then(|s| s.openai) {
            return Ok(Self::from_secret(openai));
        }

        let api_key = env("OPENAI_API_KEY").ok_or_else(|| {
            AdjutantError::config(
                "OPENAI_API_KEY not found in ~/.config/adjutant/secret.json or environment variables",
            )
        })?;

        let mut config = Self::new(api_key);
        if let Some(model) = env("OPENAI_MODEL_NAME") {
            config.default_model = model;
        }
        if let Some(base_url) = env("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    fn from_secret(secret: OpenAiSecret) -> Self {
        Self {
            api_key: secret.api_key,
            base_url: secret.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            default_model: secret
                .model_name
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            file_search_tool: secret
                .file_search_tool
                .unwrap_or_else(|| DEFAULT_FILE_SEARCH_TOOL.to_string()),
        }
    }
}

/// Loads and parses a secret.json file.
pub fn load_secret_config(path: &Path) -> Result<SecretConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        AdjutantError::config(format!(
            "Failed to read configuration file at {}: {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&content).map_err(|e| {
        AdjutantError::config(format!(
            "Failed to parse configuration file at {}: {}",
            path.display(),
            e
        ))
    })
}

/// Returns the path to the configuration file: ~/.config/adjutant/secret.json
fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AdjutantError::config("Could not determine home directory"))?;
    Ok(home.join(".config").join("adjutant").join("secret.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_secret_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"openai": {{"api_key": "sk-test", "model_name": "gpt-4o", "file_search_tool": "file_search"}}}}"#
        )
        .unwrap();

        let secrets = load_secret_config(file.path()).unwrap();
        let openai = secrets.openai.unwrap();
        let config = ApiConfig::from_secret(openai);

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.file_search_tool, "file_search");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"openai": {{"api_key": "sk-test"}}}}"#).unwrap();

        let secrets = load_secret_config(file.path()).unwrap();
        let config = ApiConfig::from_secret(secrets.openai.unwrap());

        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.file_search_tool, DEFAULT_FILE_SEARCH_TOOL);
    }

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    fn secret_with_key(api_key: &str) -> SecretConfig {
        SecretConfig {
            openai: Some(OpenAiSecret {
                api_key: api_key.to_string(),
                model_name: None,
                base_url: None,
                file_search_tool: None,
            }),
        }
    }

    #[test]
    fn secret_file_wins_over_environment() {
        let config = ApiConfig::resolve(Some(secret_with_key("sk-file")), |key| match key {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.api_key, "sk-file");
    }

    #[test]
    fn environment_fallback_applies_overrides() {
        let config = ApiConfig::resolve(None, |key| match key {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            "OPENAI_MODEL_NAME" => Some("gpt-4o".to_string()),
            "OPENAI_BASE_URL" => Some("https://proxy.example/v1".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.api_key, "sk-env");
        assert_eq!(config.default_model, "gpt-4o");
        assert_eq!(config.base_url, "https://proxy.example/v1");
    }

    #[test]
    fn secret_file_without_openai_section_falls_back_to_environment() {
        let config = ApiConfig::resolve(Some(SecretConfig { openai: None }), |key| match key {
            "OPENAI_API_KEY" => Some("sk-env".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.api_key, "sk-env");
    }

    #[test]
    fn missing_key_everywhere_is_a_config_error() {
        let err = ApiConfig::resolve(None, no_env).unwrap_err();

        assert!(matches!(err, AdjutantError::Config(_)));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = load_secret_config(file.path()).unwrap_err();
        assert!(matches!(err, AdjutantError::Config(_)));
    }
}
