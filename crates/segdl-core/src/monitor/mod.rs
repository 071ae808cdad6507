//! Progress monitor: a thread that samples byte counters on an interval and
//! hands snapshots to the event sink until the job goes inactive.
//!
//! Reads only atomics the writers update; it never blocks a worker.

mod stats;

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::events::EventSink;
use crate::job::JobStatus;

pub use stats::ProgressStats;

/// Byte counters to sample, with each one's target (None = unknown).
#[derive(Debug, Clone)]
pub struct ProgressSource {
    pub file_name: String,
    pub counters: Vec<(Arc<AtomicU64>, Option<u64>)>,
    pub total_bytes: Option<u64>,
}

impl ProgressSource {
    pub fn sample(&self, started: Instant, finished: bool) -> ProgressStats {
        let mut bytes_done = 0u64;
        let mut segments_done = 0usize;
        for (counter, target) in &self.counters {
            let n = counter.load(Ordering::Relaxed);
            bytes_done += n;
            if target.map(|t| n >= t).unwrap_or(false) {
                segments_done += 1;
            }
        }
        ProgressStats {
            file_name: self.file_name.clone(),
            bytes_done,
            total_bytes: self.total_bytes,
            elapsed_secs: started.elapsed().as_secs_f64(),
            segments_done,
            segment_count: self.counters.len(),
            finished,
        }
    }
}

pub struct ProgressMonitor {
    handle: JoinHandle<()>,
    done_rx: mpsc::Receiver<()>,
}

impl ProgressMonitor {
    /// Starts sampling `source` every `interval` until `status` goes inactive,
    /// then renders once more and exits.
    pub fn start(
        source: ProgressSource,
        status: JobStatus,
        interval: Duration,
        sink: Arc<dyn EventSink>,
    ) -> io::Result<Self> {
        let (done_tx, done_rx) = mpsc::channel();
        let started = Instant::now();
        let handle = std::thread::Builder::new()
            .name("segdl-progress".to_string())
            .spawn(move || {
                loop {
                    let active = status.wait_while_active(interval);
                    sink.progress(&source.sample(started, !active));
                    if !active {
                        break;
                    }
                }
                let _ = done_tx.send(());
            })?;
        Ok(Self { handle, done_rx })
    }

    /// Wait up to `grace` for the final render. Call after the job is marked
    /// inactive. Returns false if the monitor did not finish in time (it is
    /// then left to exit on its own).
    pub fn finish(self, grace: Duration) -> bool {
        match self.done_rx.recv_timeout(grace) {
            Ok(()) => {
                let _ = self.handle.join();
                true
            }
            Err(_) => false,
        }
    }
}
