//! Runtime settings, persisted as TOML.
//!
//! ```toml
//! vocabulary_dir = "/home/me/.local/share/ammie/vocabulary"
//!
//! [llm]
//! url = "https://api.deepseek.com/chat/completions"
//! model = "deepseek-chat"
//! timeout_secs = 15
//! api_key_env = "AMI_LLM_API_KEY"
//! ```
//!
//! The API key itself is never stored in the file; it is read from the
//! environment variable named by `llm.api_key_env`. `AMI_LLM_URL` overrides
//! the endpoint URL.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::{DEFAULT_URL, LlmConfig};

/// Environment variable that overrides `llm.url`.
pub const URL_ENV: &str = "AMI_LLM_URL";

/// Errors from settings operations.
#[derive(Debug, Error, Diagnostic)]
pub enum SettingsError {
    #[error("failed to read settings: {path}")]
    #[diagnostic(
        code(ammie::settings::read),
        help("Ensure the settings file is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {path}")]
    #[diagnostic(
        code(ammie::settings::parse),
        help("Check the TOML syntax in the settings file. {message}")
    )]
    Parse { path: String, message: String },
}

pub type SettingsResult<T> = std::result::Result<T, SettingsError>;

/// LLM section of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_url() -> String {
    DEFAULT_URL.into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_api_key_env() -> String {
    "AMI_LLM_API_KEY".into()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the vocabulary documents. `None` uses the XDG default.
    #[serde(default)]
    pub vocabulary_dir: Option<PathBuf>,
    #[serde(default)]
    pub llm: LlmSettings,
}

impl Settings {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file, or use defaults if it does not exist.
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Build the client configuration from the process environment.
    pub fn llm_config(&self) -> LlmConfig {
        self.llm_config_with(|name| std::env::var(name).ok())
    }

    /// Build the client configuration using an explicit variable lookup.
    pub fn llm_config_with(&self, var: impl Fn(&str) -> Option<String>) -> LlmConfig {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());
        LlmConfig {
            url: non_empty(URL_ENV).unwrap_or_else(|| self.llm.url.clone()),
            model: self.llm.model.clone(),
            timeout_secs: self.llm.timeout_secs,
            api_key: non_empty(&self.llm.api_key_env),
        }
    }
}
