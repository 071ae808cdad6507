//! Error taxonomy for a download job.
//!
//! Every failure the engine can hit is mapped to exactly one category so the
//! caller (and the event sink) can tell a bad link from a dead worker. None of
//! these are retried internally.

use std::path::PathBuf;
use thiserror::Error;

use crate::external::SubprocessFailure;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, DownloadError>;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// The link could not be parsed as a URL.
    #[error("invalid link: {link}")]
    Link { link: String },

    /// Connecting to or probing the resource failed.
    #[error("failed to connect to {url}: {reason}")]
    Connection { url: String, reason: String },

    /// The destination directory is not writable.
    #[error("write access to {} is denied", path.display())]
    Permission { path: PathBuf },

    /// The destination path does not exist or the file cannot be created there.
    #[error("destination not found or not creatable: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The response body could not be read to completion.
    #[error("failed reading stream from {url}: {reason}")]
    StreamRead { url: String, reason: String },

    /// A range worker exited before writing its whole segment.
    #[error("segment {index} incomplete: wrote {written} of {target} bytes")]
    WorkerIncomplete {
        index: usize,
        written: u64,
        target: u64,
    },

    /// The external video downloader failed.
    #[error("external downloader failed: {0}")]
    Subprocess(SubprocessFailure),

    /// Audio conversion reported failure.
    #[error("audio conversion failed: {0}")]
    Conversion(String),

    /// The job was cancelled before finishing.
    #[error("download cancelled")]
    Cancelled,

    /// Temp file or merge I/O failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DownloadError::Io {
            path: path.into(),
            source,
        }
    }

    /// Short category name, stable for logs and tests.
    pub fn category(&self) -> &'static str {
        match self {
            DownloadError::Link { .. } => "link",
            DownloadError::Connection { .. } => "connection",
            DownloadError::Permission { .. } => "permission",
            DownloadError::FileNotFound { .. } => "file-not-found",
            DownloadError::StreamRead { .. } => "stream-read",
            DownloadError::WorkerIncomplete { .. } => "worker-incomplete",
            DownloadError::Subprocess(_) => "subprocess",
            DownloadError::Conversion(_) => "conversion",
            DownloadError::Cancelled => "cancelled",
            DownloadError::Io { .. } => "io",
        }
    }

    /// Map a file creation error on `path` to the destination categories.
    pub(crate) fn from_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => DownloadError::Permission { path },
            std::io::ErrorKind::NotFound => DownloadError::FileNotFound { path },
            _ => DownloadError::Io { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn create_errors_map_to_destination_categories() {
        let denied = DownloadError::from_create(
            "/root/x",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(denied.category(), "permission");

        let missing = DownloadError::from_create(
            "/nope/x",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(missing.category(), "file-not-found");

        let other = DownloadError::from_create("/x", io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(other.category(), "io");
    }

    #[test]
    fn worker_incomplete_message() {
        let e = DownloadError::WorkerIncomplete {
            index: 2,
            written: 100,
            target: 250,
        };
        assert_eq!(e.to_string(), "segment 2 incomplete: wrote 100 of 250 bytes");
    }
}
