use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Access to a directory the user approved. Only the access gateway creates these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryHandle {
    path: PathBuf,
}

impl DirectoryHandle {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredFile {
    pub path: PathBuf,
}

impl DiscoveredFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Base name sent to the server alongside the content.
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgUploadRequest {
    #[serde(rename = "ecgData")]
    pub ecg_data: String,
    pub filename: String,
    #[serde(rename = "apiKey", skip_serializing_if = "Option::is_none", default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub emotions: Vec<String>,
    #[serde(default)]
    pub songs: Vec<String>,
}

/// Sent from the scan worker to whoever owns the monitor state.
/// Every event carries the generation of the scan that produced it.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    ScanStarted { generation: u64, files: Vec<DiscoveredFile> },
    FileStarted { generation: u64, index: usize },
    FileCompleted { generation: u64, index: usize, result: InferenceResult },
    FileFailed { generation: u64, index: usize, message: String },
    ScanFinished { generation: u64 },
}

impl MonitorEvent {
    pub fn generation(&self) -> u64 {
        match self {
            MonitorEvent::ScanStarted { generation, .. }
            | MonitorEvent::FileStarted { generation, .. }
            | MonitorEvent::FileCompleted { generation, .. }
            | MonitorEvent::FileFailed { generation, .. }
            | MonitorEvent::ScanFinished { generation } => *generation,
        }
    }
}
