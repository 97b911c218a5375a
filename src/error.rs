use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, Error)]
pub enum MonitorError {
    /// Directory grant refused, cancelled, or the location cannot be listed.
    #[error("{0}")]
    PermissionDenied(String),

    /// Listing a granted directory failed. Logged by discovery, never surfaced.
    #[error("Error reading directory {}: {source}", .path.display())]
    DiscoveryFailure { path: PathBuf, source: io::Error },

    #[error("Error processing file {}: {source}", .path.display())]
    ReadFailure { path: PathBuf, source: io::Error },

    /// Connection errors, non-2xx statuses and malformed bodies alike.
    #[error("Error processing file {}: {message}", .path.display())]
    NetworkFailure { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MonitorError {
    pub fn denied() -> Self {
        MonitorError::PermissionDenied("Permission to access directory was denied".to_string())
    }
}
