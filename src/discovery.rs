use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::MonitorError;
use crate::models::{DirectoryHandle, DiscoveredFile};

const CSV_SUFFIX: &str = ".csv";

/// Case-sensitive suffix match on the entry's name.
fn is_csv_name(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.as_encoded_bytes().ends_with(CSV_SUFFIX.as_bytes()))
}

fn read_entries(dir: &Path) -> Result<Vec<PathBuf>, MonitorError> {
    let entries = std::fs::read_dir(dir).map_err(|source| MonitorError::DiscoveryFailure {
        path: dir.to_path_buf(),
        source,
    })?;
    entries
        .map(|entry| {
            entry.map(|e| e.path()).map_err(|source| MonitorError::DiscoveryFailure {
                path: dir.to_path_buf(),
                source,
            })
        })
        .collect()
}

/// List the CSV files directly under a granted directory, sorted by name.
///
/// Listing failures are logged and yield an empty list.
pub fn list_csv_files(handle: &DirectoryHandle) -> Vec<DiscoveredFile> {
    let mut paths = match read_entries(handle.path()) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("{}", e);
            return Vec::new();
        }
    };
    paths.retain(|p| is_csv_name(p));
    paths.sort();
    debug!(count = paths.len(), dir = %handle.path().display(), "discovered csv files");
    paths.into_iter().map(DiscoveredFile::new).collect()
}
