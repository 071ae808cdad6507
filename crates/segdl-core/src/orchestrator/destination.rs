//! Destination checks made before any request is sent.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{DownloadError, Result};

/// `dir` must exist, be a directory, and accept new files.
pub(crate) fn check_dir(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(DownloadError::FileNotFound { path: dir.to_path_buf() }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DownloadError::FileNotFound { path: dir.to_path_buf() })
        }
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            return Err(DownloadError::Permission { path: dir.to_path_buf() })
        }
        Err(e) => return Err(DownloadError::io(dir, e)),
    }

    // Removed again when dropped.
    tempfile::Builder::new()
        .prefix(".segdl-write-check")
        .tempfile_in(dir)
        .map(drop)
        .map_err(|e| DownloadError::from_create(dir, e))
}
