use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GmailError, Result};

/// Largest page size the Gmail `messages.list` endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 500;

/// Every path and constant the fetch pipeline depends on
///
/// The defaults reproduce the fixed behaviour of the tool: read
/// `credentials.json`, cache the token in `token.json`, scan `in:inbox`
/// 500 messages per page and write `senders.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_token_cache_path")]
    pub token_cache_path: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials_path: default_credentials_path(),
            token_cache_path: default_token_cache_path(),
            output_path: default_output_path(),
            query: default_query(),
            page_size: default_page_size(),
            user_id: default_user_id(),
        }
    }
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("credentials.json")
}

fn default_token_cache_path() -> PathBuf {
    PathBuf::from("token.json")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("senders.json")
}

fn default_query() -> String {
    "in:inbox".to_string()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_user_id() -> String {
    "me".to_string()
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GmailError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(GmailError::ConfigError(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.page_size > MAX_PAGE_SIZE {
            return Err(GmailError::ConfigError(format!(
                "page_size cannot exceed {} (Gmail API maximum)",
                MAX_PAGE_SIZE
            )));
        }

        if self.query.trim().is_empty() {
            return Err(GmailError::ConfigError("query cannot be empty".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "user_id cannot be empty".to_string(),
            ));
        }

        for (name, path) in [
            ("credentials_path", &self.credentials_path),
            ("token_cache_path", &self.token_cache_path),
            ("output_path", &self.output_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(GmailError::ConfigError(format!("{} cannot be empty", name)));
            }
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }
}
