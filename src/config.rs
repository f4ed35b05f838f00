//! Configuration loader and validator for the tutoring portal client.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub backend: Backend,
    #[serde(default)]
    pub dashboard: Dashboard,
    #[serde(default)]
    pub upload: UploadSettings,
}

/// Backend API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backend {
    /// Base URL of the JSON API, e.g. `http://localhost:5000/api/`.
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// Parent dashboard behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dashboard {
    pub exclude_general_exams: bool,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self {
            exclude_general_exams: true,
        }
    }
}

/// Limits the backend enforces on Excel uploads, checked before sending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadSettings {
    pub groups: Vec<String>,
    pub max_session_number: u32,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            groups: ["cam1", "maimi", "cam2", "west", "station1", "station2", "station3"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_session_number: 8,
        }
    }
}

fn default_timeout_seconds() -> u64 {
    15
}

impl Config {
    /// Backend base URL, honouring a `BACKEND_URL` override.
    pub fn resolved_base_url(&self) -> String {
        std::env::var("BACKEND_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.backend.base_url.clone())
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.backend.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("backend.base_url must be non-empty"));
    }
    if Url::parse(cfg.backend.base_url.trim()).is_err() {
        return Err(ConfigError::Invalid("backend.base_url must be an absolute URL"));
    }
    if cfg.backend.timeout_seconds == 0 {
        return Err(ConfigError::Invalid("backend.timeout_seconds must be > 0"));
    }
    if cfg.upload.groups.iter().all(|g| g.trim().is_empty()) {
        return Err(ConfigError::Invalid("upload.groups must list at least one group"));
    }
    if cfg.upload.max_session_number == 0 {
        return Err(ConfigError::Invalid("upload.max_session_number must be > 0"));
    }
    Ok(())
}

/// Returns a complete example configuration.
pub fn example() -> &'static str {
    r#"backend:
  base_url: "http://localhost:5000/api/"
  timeout_seconds: 15

dashboard:
  exclude_general_exams: true

upload:
  max_session_number: 8
  groups:
    - cam1
    - maimi
    - cam2
    - west
    - station1
    - station2
    - station3
"#
}
