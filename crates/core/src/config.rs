//! Settings file handling
//!
//! bm reads an optional TOML settings file for tuning that rarely changes
//! between runs: region, addressing style, and the upload retry policy.
//! Credentials are never stored here; they come from the command line.
//! Precedence is command-line flags, then the file, then built-in defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

const DEFAULT_REGION: &str = "us-east-1";

/// Default seconds between upload retry attempts (scaled linearly per attempt)
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 30;

/// Default maximum upload attempts before a file is given up on
pub const DEFAULT_MAX_RETRIES: u32 = 15;

/// Settings loaded from the optional TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Region identifier sent to the store
    #[serde(default = "default_region")]
    pub region: String,

    /// Use path-style bucket addressing (required by most S3-compatible stores)
    #[serde(default = "default_true")]
    pub path_style: bool,

    /// Upload retry tuning
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Retry tuning for the live upload path
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Base wait between attempts, in seconds
    #[serde(default = "default_retry_wait")]
    pub wait_secs: u64,

    /// Maximum number of attempts per file
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_retry_wait() -> u64 {
    DEFAULT_RETRY_WAIT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            region: default_region(),
            path_style: true,
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            wait_secs: default_retry_wait(),
            max_retries: default_max_retries(),
        }
    }
}

impl Settings {
    /// Load settings from a specific file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load settings from the default location, falling back to defaults when
    /// no file exists there.
    pub fn load_default() -> Result<Self> {
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// Default settings file location: `<config_dir>/bm/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bm").join("config.toml"))
}
