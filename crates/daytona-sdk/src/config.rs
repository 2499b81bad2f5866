use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DaytonaError, Result};

pub const DEFAULT_API_URL: &str = "https://app.daytona.io/api";
pub const DEFAULT_TARGET: &str = "us";

pub const ENV_API_KEY: &str = "DAYTONA_API_KEY";
pub const ENV_API_URL: &str = "DAYTONA_API_URL";
pub const ENV_TARGET: &str = "DAYTONA_TARGET";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaytonaConfig {
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_target")]
    pub target: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

impl DaytonaConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: default_api_url(),
            target: default_target(),
        }
    }

    /// Build a config from `DAYTONA_API_KEY`, `DAYTONA_API_URL` and
    /// `DAYTONA_TARGET`. Only the key is required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let api_key = non_empty(ENV_API_KEY).ok_or_else(|| {
            DaytonaError::Config(format!("API key is required (set {ENV_API_KEY})"))
        })?;
        Ok(Self {
            api_key,
            api_url: non_empty(ENV_API_URL).unwrap_or_else(default_api_url),
            target: non_empty(ENV_TARGET).unwrap_or_else(default_target),
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(DaytonaError::Config("API key is required".to_string()));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(DaytonaError::Config(format!(
                "api_url must be an http(s) URL: {}",
                self.api_url
            )));
        }
        Ok(())
    }
}

/// Load and validate a config from a YAML file.
pub async fn load(path: &Path) -> Result<DaytonaConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DaytonaError::Config(format!("read {}: {e}", path.display())))?;
    let config: DaytonaConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| DaytonaError::Config(format!("parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}
