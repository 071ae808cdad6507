//! Merge coordinator: watches segment sinks and worker liveness, and once every
//! segment is complete concatenates the temp files into the final output.
//!
//! The coordinator only reads shared state (file sizes, liveness flags). It is
//! polled by the orchestrator until it reports [`MergeStatus::Merged`] or an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::error::{DownloadError, Result};
use crate::events::EventSink;
use crate::segmenter::Segment;
use crate::worker::WorkerHandle;

/// What the merge loop does once a worker has died short of its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Return `WorkerIncomplete` from the first poll that sees the dead segment.
    #[default]
    FailFast,
    /// Report the dead segment and keep returning `Pending`; the job never
    /// completes on its own and has to be cancelled.
    PollForever,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MergePolicy::FailFast => "fail_fast",
            MergePolicy::PollForever => "poll_forever",
        })
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(MergePolicy::FailFast),
            "poll_forever" => Ok(MergePolicy::PollForever),
            other => Err(format!("unknown merge policy '{}' (expected fail_fast or poll_forever)", other)),
        }
    }
}

/// Outcome of one [`MergeCoordinator::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// Not every segment is complete yet.
    Pending { complete: usize, total: usize },
    /// The output was written by this call.
    Merged { bytes: u64 },
    /// An earlier call already merged; nothing was touched.
    AlreadyMerged,
}

/// One segment, its temp file and the worker filling it.
#[derive(Debug)]
pub struct SegmentSlot {
    pub segment: Segment,
    /// Bytes the segment must reach to count as complete.
    pub target: u64,
    pub temp_path: PathBuf,
    pub worker: WorkerHandle,
}

pub struct MergeCoordinator {
    slots: Vec<SegmentSlot>,
    output: PathBuf,
    policy: MergePolicy,
    sink: Arc<dyn EventSink>,
    /// Segments already reported dead, so each is reported once.
    reported: Vec<bool>,
    merged: bool,
}

impl MergeCoordinator {
    /// Slots are merged in ascending segment index, whatever order they arrive in.
    pub fn new(mut slots: Vec<SegmentSlot>, output: impl Into<PathBuf>, policy: MergePolicy, sink: Arc<dyn EventSink>) -> Self {
        slots.sort_by_key(|s| s.segment.index);
        let reported = vec![false; slots.len()];
        Self {
            slots,
            output: output.into(),
            policy,
            sink,
            reported,
            merged: false,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Byte counters and targets, in segment order, for the progress monitor.
    pub fn counters(&self) -> Vec<(Arc<AtomicU64>, Option<u64>)> {
        self.slots
            .iter()
            .map(|s| (s.worker.written_counter(), Some(s.target)))
            .collect()
    }

    pub fn temp_paths(&self) -> Vec<&Path> {
        self.slots.iter().map(|s| s.temp_path.as_path()).collect()
    }

    /// Check every segment once; merge if all are complete.
    ///
    /// A segment is complete when its worker has exited and its temp file holds
    /// at least `target` bytes. Liveness is read before the size so an exited
    /// worker's size is final.
    pub fn poll(&mut self) -> Result<MergeStatus> {
        if self.merged {
            return Ok(MergeStatus::AlreadyMerged);
        }

        let total = self.slots.len();
        let mut complete = 0;
        let mut failure = None;

        for (i, slot) in self.slots.iter().enumerate() {
            if slot.worker.is_alive() {
                continue;
            }
            let current = sink_len(&slot.temp_path)?;
            if current >= slot.target {
                complete += 1;
                continue;
            }

            let err = DownloadError::WorkerIncomplete {
                index: slot.segment.index,
                written: current,
                target: slot.target,
            };
            if !self.reported[i] {
                self.reported[i] = true;
                tracing::warn!(segment = slot.segment.index, written = current, target = slot.target, "segment worker died short");
                self.sink.error(&err.to_string());
            }
            failure.get_or_insert(err);
        }

        if let Some(err) = failure {
            if self.policy == MergePolicy::FailFast {
                return Err(err);
            }
        }
        if complete < total {
            return Ok(MergeStatus::Pending { complete, total });
        }

        let bytes = self.concatenate()?;
        self.merged = true;
        for slot in &mut self.slots {
            if let Err(e) = slot.worker.join() {
                tracing::debug!(segment = slot.segment.index, error = %e, "worker reported an error after filling its segment");
            }
        }
        tracing::info!(output = %self.output.display(), bytes, segments = total, "segments merged");
        Ok(MergeStatus::Merged { bytes })
    }

    /// Writes every temp file into the output in segment order.
    fn concatenate(&self) -> Result<u64> {
        let mut out = File::create(&self.output).map_err(|e| DownloadError::from_create(&self.output, e))?;
        let mut bytes = 0u64;
        for slot in &self.slots {
            let part = File::open(&slot.temp_path).map_err(|e| DownloadError::io(&slot.temp_path, e))?;
            let copied = io::copy(&mut part.take(slot.target), &mut out).map_err(|e| DownloadError::io(&self.output, e))?;
            bytes += copied;
        }
        out.flush().map_err(|e| DownloadError::io(&self.output, e))?;
        Ok(bytes)
    }

    /// Ask every worker to stop and wait for them.
    pub fn cancel_all(&mut self) {
        for slot in &self.slots {
            slot.worker.cancel();
        }
        for slot in &mut self.slots {
            let _ = slot.worker.join();
        }
    }

    /// Remove the temp files. Missing files are not an error. Returns how many were removed.
    pub fn discard_parts(&self) -> usize {
        let mut removed = 0;
        for slot in &self.slots {
            match fs::remove_file(&slot.temp_path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %slot.temp_path.display(), error = %e, "could not remove segment file"),
            }
        }
        removed
    }
}

/// Current size of a segment sink; a missing file counts as empty.
fn sink_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(m) => Ok(m.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(DownloadError::io(path, e)),
    }
}
