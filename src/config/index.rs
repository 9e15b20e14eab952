use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the index service.
#[derive(Clone, Deserialize)]
pub struct IndexConfig {
    /// Base URL, e.g. "https://indexd.example.org". Unset means no remote index.
    #[serde(default)]
    pub url: Option<String>,
    /// Basic auth credentials used for writes.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for IndexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl IndexConfig {
    /// Layers explicitly supplied values over this config.
    #[must_use]
    pub fn with_overrides(
        mut self,
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        if url.is_some() {
            self.url = url;
        }
        if username.is_some() {
            self.username = username;
        }
        if password.is_some() {
            self.password = password;
        }
        self
    }
}

/// Contents of `sheepdog.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub index: IndexConfig,
}

impl FileConfig {
    /// Reads the config file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}
