use std::path::Path;

use tracing::{debug, info};

use crate::error::{MonitorError, Result};
use crate::models::DirectoryHandle;

/// The consent step in front of every scan.
///
/// `requested` is `None` when the user backed out of the prompt.
pub trait DirectoryAccessGateway {
    fn request_access(&self, requested: Option<&Path>) -> Result<DirectoryHandle>;
}

/// Grants access to any local directory the process can list.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDirectoryAccess;

impl DirectoryAccessGateway for FsDirectoryAccess {
    fn request_access(&self, requested: Option<&Path>) -> Result<DirectoryHandle> {
        let path = requested.ok_or_else(MonitorError::denied)?;
        debug!(path = %path.display(), "requesting directory access");

        let metadata = std::fs::metadata(path).map_err(|e| {
            MonitorError::PermissionDenied(format!("Error requesting permissions: {}", e))
        })?;
        if !metadata.is_dir() {
            return Err(MonitorError::PermissionDenied(format!(
                "Error requesting permissions: {} is not a directory",
                path.display()
            )));
        }
        // A directory we cannot list is as good as a refused grant.
        std::fs::read_dir(path).map_err(|e| {
            MonitorError::PermissionDenied(format!("Error requesting permissions: {}", e))
        })?;

        info!(path = %path.display(), "directory access granted");
        Ok(DirectoryHandle::new(path.to_path_buf()))
    }
}
