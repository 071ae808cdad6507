//! Range workers: one OS thread per segment, each owning its temp file.
//!
//! A worker runs to completion or dies; there is no retry. Its liveness and
//! byte count are readable without locks, and every exit (ok or not) bumps a
//! shared [`CompletionSignal`] so the merge loop can wake immediately.

mod cancel;
mod range;
mod signal;
mod stream;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

pub use cancel::CancelToken;
pub use range::{fetch_range, RangeHandler};
pub use signal::CompletionSignal;
pub use stream::{stream_to_file, StreamHandler};

/// Why a worker stopped short.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("{0}")]
    Curl(#[from] curl::Error),
    #[error("unexpected HTTP {0} for ranged request")]
    Http(u32),
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("cancelled")]
    Cancelled,
}

/// State a worker body gets to report into.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub index: usize,
    pub cancel: CancelToken,
    /// Bytes written to the worker's sink so far.
    pub written: Arc<AtomicU64>,
}

impl WorkerContext {
    pub fn add_written(&self, n: u64) {
        self.written.fetch_add(n, Ordering::Relaxed);
    }
}

/// Marks the worker exited and notifies the signal when dropped, so a panic
/// inside the body still counts as termination.
struct ExitGuard {
    alive: Arc<AtomicBool>,
    signal: CompletionSignal,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.signal.notify();
    }
}

/// Handle to one running worker.
#[derive(Debug)]
pub struct WorkerHandle {
    index: usize,
    alive: Arc<AtomicBool>,
    written: Arc<AtomicU64>,
    cancel: CancelToken,
    join: Option<JoinHandle<Result<(), WorkerError>>>,
}

impl WorkerHandle {
    /// Runs `body` on a new thread. Anything `body` captures (its sink in
    /// particular) is dropped before the worker counts as exited.
    pub fn spawn<F>(index: usize, cancel: CancelToken, signal: CompletionSignal, body: F) -> std::io::Result<Self>
    where
        F: FnOnce(&WorkerContext) -> Result<(), WorkerError> + Send + 'static,
    {
        let alive = Arc::new(AtomicBool::new(true));
        let written = Arc::new(AtomicU64::new(0));
        let ctx = WorkerContext {
            index,
            cancel: cancel.clone(),
            written: Arc::clone(&written),
        };
        let guard = ExitGuard {
            alive: Arc::clone(&alive),
            signal,
        };

        let join = std::thread::Builder::new()
            .name(format!("segdl-worker-{}", index))
            .spawn(move || {
                let _guard = guard;
                let result = body(&ctx);
                match &result {
                    Ok(()) => tracing::debug!(
                        segment = ctx.index,
                        bytes = ctx.written.load(Ordering::Relaxed),
                        "worker finished"
                    ),
                    Err(e) => tracing::warn!(segment = ctx.index, error = %e, "worker terminated"),
                }
                result
            })?;

        Ok(Self {
            index,
            alive,
            written,
            cancel,
            join: Some(join),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Bytes the worker has written so far.
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Shared counter, for the progress monitor.
    pub fn written_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.written)
    }

    /// Ask this worker (only) to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker thread and return its result. A second call returns `Ok(())`.
    pub fn join(&mut self) -> Result<(), WorkerError> {
        match self.join.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                Err(WorkerError::Write(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "worker panicked",
                )))
            }),
            None => Ok(()),
        }
    }
}
