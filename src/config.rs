// src/config.rs
//! User configuration at `~/.buckaroo/buckaroo.json`
//!
//! Sections:
//! - `cookbooks` - local recipe directories, consulted before GitHub
//! - `github` - API/raw/archive endpoints and an optional token
//! - `network` - timeouts and retry policy
//! - `resolver` - resolution limits
//!
//! Every field has a default, so `{}` is a valid config file. A missing file
//! is created with the defaults on first run.

use crate::error::{Error, Result};
use crate::model::Identifier;
use crate::retry::{RetryPolicy, MAX_RETRIES, RETRY_DELAY_MS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory under the home directory holding the config
pub const CONFIG_DIR: &str = ".buckaroo";

/// Config file name
pub const CONFIG_FILE: &str = "buckaroo.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Local cookbooks, searched in order
    #[serde(default)]
    pub cookbooks: Vec<CookbookConfig>,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// A named local recipe directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookbookConfig {
    /// Source tag that routes identifiers to this cookbook (`name+org/recipe`)
    pub name: Identifier,
    /// Root directory; relative paths are taken from the config file's directory
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_raw_url")]
    pub raw_url: String,

    #[serde(default = "default_archive_url")]
    pub archive_url: String,

    /// Personal access token; raises the API rate limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            raw_url: default_raw_url(),
            archive_url: default_archive_url(),
            token: None,
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_archive_url() -> String {
    "https://github.com".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-attempt timeout for API calls and small files
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Per-attempt timeout for archive downloads
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl NetworkConfig {
    /// Retry policy for recipe lookups
    pub fn fetch_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_delay_ms),
            Duration::from_secs(self.fetch_timeout_secs),
        )
    }

    /// Retry policy for archive and build-file downloads
    pub fn download_policy(&self) -> RetryPolicy {
        self.fetch_policy()
            .with_timeout(Duration::from_secs(self.download_timeout_secs))
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_download_timeout_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    MAX_RETRIES
}

fn default_retry_delay_ms() -> u64 {
    RETRY_DELAY_MS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How often one package may be re-opened before resolution gives up
    #[serde(default = "default_max_reopens")]
    pub max_reopens: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_reopens: default_max_reopens(),
        }
    }
}

fn default_max_reopens() -> u32 {
    16
}

impl Config {
    /// `~/.buckaroo/buckaroo.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
            .ok_or_else(|| Error::InitError("Could not determine home directory".to_string()))
    }

    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let mut config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::ParseError(format!("Failed to parse config file {}: {e}", path.display()))
        })?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Load the config, writing a default one first if the file is missing
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            return Self::load(path);
        }

        info!("No config at {}, writing defaults", path.display());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {e}", parent.display()))
            })?;
        }

        let config = Config::default();
        let content = serde_json::to_string_pretty(&config)?;
        std::fs::write(path, content + "\n").map_err(|e| {
            Error::IoError(format!("Failed to write config file {}: {e}", path.display()))
        })?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for cookbook in &mut self.cookbooks {
            if cookbook.path.is_relative() {
                cookbook.path = base.join(&cookbook.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.resolver.max_reopens, 16);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.network.download_timeout_secs, 300);
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = serde_json::from_str(
            r#"{ "network": { "max_retries": 5 }, "resolver": { "max_reopens": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.network.max_retries, 5);
        assert_eq!(config.network.fetch_timeout_secs, 30);
        assert_eq!(config.resolver.max_reopens, 4);
    }

    #[test]
    fn test_policies() {
        let network = NetworkConfig::default();
        let fetch = network.fetch_policy();
        assert_eq!(fetch.max_attempts, 3);
        assert_eq!(fetch.timeout, Duration::from_secs(30));
        assert_eq!(network.download_policy().timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_load_or_init_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_DIR).join(CONFIG_FILE);

        let config = Config::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, Config::default());

        // Second call reads what the first wrote
        assert_eq!(Config::load_or_init(&path).unwrap(), config);
    }

    #[test]
    fn test_relative_cookbook_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{ "cookbooks": [ { "name": "local", "path": "cookbook" } ] }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.cookbooks[0].path, dir.path().join("cookbook"));
        assert_eq!(config.cookbooks[0].name.as_str(), "local");
    }

    #[test]
    fn test_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::ParseError(_))));
    }
}
