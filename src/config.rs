//! Configuration for boardsync.
//!
//! Settings are read from `.boardsync/boardsync.toml` in the working
//! directory, falling back to `<config dir>/boardsync/boardsync.toml` and then
//! to built-in defaults. Environment variables override the file, and CLI
//! flags override both.
//!
//! ```toml
//! [api]
//! url = "http://localhost:3001/api"
//! socket_url = "http://localhost:3001"
//! token = "..."
//! timeout_secs = 30
//! page_size = 100
//!
//! [board]
//! default_project = "P-1"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_DIR: &str = ".boardsync";
pub const CONFIG_FILE: &str = "boardsync.toml";

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API
    #[serde(default = "default_api_url")]
    pub url: String,
    /// Real-time event endpoint
    #[serde(default = "default_socket_url")]
    pub socket_url: String,
    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Upper bound for a single gateway call; elapsed calls count as failed
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Issues requested per page when loading a project
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_api_url() -> String {
    "http://localhost:3001/api".to_string()
}

fn default_socket_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            socket_url: default_socket_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Board view settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Project opened when none is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub board: BoardConfig,
}

impl SyncConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse boardsync.toml")
    }

    /// Config file to use from `dir`, if one exists there or in the user
    /// config directory.
    pub fn locate(dir: &Path) -> Option<PathBuf> {
        let local = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|d| d.join("boardsync").join(CONFIG_FILE))
            .filter(|p| p.exists())
    }

    /// Load from the located file (or defaults), then apply environment
    /// overrides.
    pub fn resolve(dir: &Path) -> Result<Self> {
        let mut config = match Self::locate(dir) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BOARDSYNC_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BOARDSYNC_API_URL") {
            self.api.url = url;
        }
        if let Some(url) = lookup("BOARDSYNC_SOCKET_URL") {
            self.api.socket_url = url;
        }
        if let Some(token) = lookup("BOARDSYNC_TOKEN") {
            self.api.token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(secs) = lookup("BOARDSYNC_TIMEOUT_SECS") {
            self.api.timeout_secs = secs
                .parse()
                .with_context(|| format!("Invalid BOARDSYNC_TIMEOUT_SECS '{}'", secs))?;
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize boardsync.toml")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.api.url.starts_with("http://") && !self.api.url.starts_with("https://") {
            warnings.push(format!("api.url '{}' is not an http(s) URL", self.api.url));
        }
        if self.api.timeout_secs == 0 {
            warnings.push("api.timeout_secs is 0; every request will time out".to_string());
        }
        if self.api.page_size == 0 {
            warnings.push("api.page_size is 0; no issues will be loaded".to_string());
        }
        if self.api.token.is_none() {
            warnings.push("api.token is not set; requests are unauthenticated".to_string());
        }

        warnings
    }
}
