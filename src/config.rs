//! Runtime configuration for the monitor.
//!
//! Sources, highest priority first:
//! 1. Command-line flags
//! 2. Environment variables (`ECGMON_SERVER_URL`, `ECGMON_API_KEY`)
//! 3. TOML file given with `--config`
//! 4. Built-in defaults
//!
//! Flags and environment variables are merged by clap in `main.rs`; this
//! module owns the file format and the defaults.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{MonitorError, Result};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";
pub const PROCESS_ECG_PATH: &str = "/process_ecg";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the inference server, without the endpoint path.
    pub server_url: String,

    /// Keep the `songs` list returned by the server.
    pub enable_media_recommendations: bool,

    /// Forwarded as `apiKey` in every upload when set.
    pub api_key: Option<String>,

    /// Unset means the transport's default applies.
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            enable_media_recommendations: true,
            api_key: None,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&data)
            .map_err(|e| MonitorError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(data: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    /// Full URL of the upload endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), PROCESS_ECG_PATH)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
