//! Server configuration: defaults, an optional JSON file, then command-line
//! overrides, in that order of precedence.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::aggregate::MAINTENANCE_WINDOW_DAYS;
use crate::paginate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("parsing {}: {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DeskConfig {
    /// HTTP listen address.
    pub bind: String,
    /// Simulated latency of every action.
    pub action_delay_ms: u64,
    pub action_timeout_ms: u64,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub maintenance_window_days: i64,
    /// JSON fixture loaded at startup.
    pub fixture: Option<PathBuf>,
    /// Where snapshots are written. Takes precedence over `fixture` at
    /// startup when the file exists.
    pub snapshot: Option<PathBuf>,
    /// Autosave period; 0 disables the autosave thread.
    pub autosave_secs: u64,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9000".to_string(),
            action_delay_ms: 300,
            action_timeout_ms: 5_000,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            maintenance_window_days: MAINTENANCE_WINDOW_DAYS,
            fixture: None,
            snapshot: None,
            autosave_secs: 0,
        }
    }
}

impl DeskConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be at least 1".into()));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size must be within 1..={}",
                self.max_page_size
            )));
        }
        if self.action_timeout_ms == 0 {
            return Err(ConfigError::Invalid("action_timeout_ms must be positive".into()));
        }
        if self.maintenance_window_days < 0 {
            return Err(ConfigError::Invalid("maintenance_window_days must not be negative".into()));
        }
        Ok(())
    }
}
