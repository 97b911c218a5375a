use crate::error::{MonitorError, Result};
use crate::models::DiscoveredFile;

/// Read a discovered file's full content as UTF-8 text.
pub fn read_file(file: &DiscoveredFile) -> Result<String> {
    std::fs::read_to_string(&file.path).map_err(|source| MonitorError::ReadFailure {
        path: file.path.clone(),
        source,
    })
}
