// ABOUTME: Configuration types and parsing for dockyard.yml.
// ABOUTME: Handles YAML parsing, file discovery, and built-in defaults.

mod timeouts;
mod transport;

pub use timeouts::{RetryPolicy, Timeouts};
pub use transport::TransportConfig;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "dockyard.yml";
pub const CONFIG_FILENAME_ALT: &str = "dockyard.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dockyard/config.yml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: default_listen(),
            transport: TransportConfig::default(),
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty file is a valid config with every default.
        if yaml.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// The first config file found in `dir`, if any.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Load the first config file in `dir`, or defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::load(&path)
            }
            None => {
                tracing::debug!(dir = %dir.display(), "no configuration file, using defaults");
                Ok(Config::default())
            }
        }
    }

    /// Load an explicit path, which must exist, or discover from `dir`.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(Error::ConfigNotFound(path.to_path_buf())),
            Some(path) => Self::load(path),
            None => Self::discover(dir),
        }
    }

    fn check(&self) -> Result<()> {
        if self.retry.attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        if self.timeouts.call.is_zero() || self.timeouts.pull.is_zero() {
            return Err(Error::InvalidConfig(
                "timeouts.call and timeouts.pull must be greater than zero".to_string(),
            ));
        }
        if let Some(binary) = &self.transport.binary
            && binary.trim().is_empty()
        {
            return Err(Error::InvalidConfig(
                "transport.binary cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The effective configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::from)
    }
}
