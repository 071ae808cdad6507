//! Unsplit path: one GET streamed straight into the destination.

use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use super::Downloader;
use crate::error::{DownloadError, Result};
use crate::monitor::ProgressSource;
use crate::worker::{stream_to_file, CancelToken};

pub(super) fn run(
    dl: &Downloader,
    url: &str,
    output: &Path,
    file_name: &str,
    total: Option<u64>,
    cancel: &CancelToken,
) -> Result<u64> {
    let file = File::create(output).map_err(|e| DownloadError::from_create(output, e))?;
    let written = Arc::new(AtomicU64::new(0));
    let source = ProgressSource {
        file_name: file_name.to_string(),
        counters: vec![(Arc::clone(&written), total)],
        total_bytes: total,
    };

    tracing::info!(url, output = %output.display(), size = ?total, "single-stream download");
    let result = dl.with_monitor(source, || stream_to_file(url, file, output, &dl.http, cancel, Arc::clone(&written)));

    if matches!(result, Err(DownloadError::Cancelled)) {
        let _ = fs::remove_file(output);
    }
    result
}
