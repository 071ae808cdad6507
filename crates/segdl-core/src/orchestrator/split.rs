//! Split path: one range worker per segment, then the merge loop.

use std::path::Path;
use std::time::Duration;

use super::Downloader;
use crate::error::{DownloadError, Result};
use crate::merge::{MergeCoordinator, MergeStatus, SegmentSlot};
use crate::monitor::ProgressSource;
use crate::segmenter::{create_segment_file, plan_segments};
use crate::worker::{fetch_range, CancelToken, CompletionSignal, WorkerHandle};

pub(super) fn run(
    dl: &Downloader,
    url: &str,
    output: &Path,
    file_name: &str,
    total: u64,
    worker_count: usize,
    cancel: &CancelToken,
) -> Result<u64> {
    let temp_dir = dl.cfg.temp_dir();
    let signal = CompletionSignal::new();
    let segments = plan_segments(total, worker_count);
    tracing::info!(url, total, segments = segments.len(), temp_dir = %temp_dir.display(), "split download");

    let mut slots = Vec::with_capacity(segments.len());
    let mut spawn_error = None;
    for segment in segments {
        let (file, temp_path) = match create_segment_file(&temp_dir, file_name, segment.index) {
            Ok(v) => v,
            Err(e) => {
                spawn_error = Some(DownloadError::io(&temp_dir, e));
                break;
            }
        };
        let worker_url = url.to_string();
        let opts = dl.http;
        let spawned = WorkerHandle::spawn(segment.index, cancel.child(), signal.clone(), move |ctx| {
            fetch_range(&worker_url, segment, file, &opts, ctx)
        });
        match spawned {
            Ok(worker) => {
                tracing::debug!(segment = segment.index, range = %segment.range_header_value(), temp = %temp_path.display(), "worker started");
                slots.push(SegmentSlot {
                    segment,
                    target: segment.target_len(total),
                    temp_path,
                    worker,
                });
            }
            Err(e) => {
                let _ = std::fs::remove_file(&temp_path);
                spawn_error = Some(DownloadError::io(&temp_path, e));
                break;
            }
        }
    }

    let mut coord = MergeCoordinator::new(slots, output, dl.cfg.merge_policy, dl.sink.clone());
    if let Some(err) = spawn_error {
        coord.cancel_all();
        coord.discard_parts();
        return Err(err);
    }

    let source = ProgressSource {
        file_name: file_name.to_string(),
        counters: coord.counters(),
        total_bytes: Some(total),
    };
    let interval = dl.cfg.merge_poll_interval();
    let result = dl.with_monitor(source, || merge_loop(&mut coord, &signal, cancel, interval, total));

    match &result {
        Ok(_) => {
            let removed = coord.discard_parts();
            tracing::debug!(removed, "segment files removed");
        }
        Err(_) => {
            coord.cancel_all();
            coord.discard_parts();
        }
    }
    result
}

/// Poll the coordinator, sleeping on the completion signal between polls.
fn merge_loop(
    coord: &mut MergeCoordinator,
    signal: &CompletionSignal,
    cancel: &CancelToken,
    interval: Duration,
    total: u64,
) -> Result<u64> {
    loop {
        let seen = signal.exits();
        match coord.poll()? {
            MergeStatus::Merged { bytes } => return Ok(bytes),
            MergeStatus::AlreadyMerged => return Ok(total),
            MergeStatus::Pending { complete, total } => {
                tracing::trace!(complete, total, "merge pending");
            }
        }
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        signal.wait_for_more(seen, interval);
    }
}
