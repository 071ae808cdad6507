//! Worker exit notification.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Counts worker exits. Workers call [`notify`](CompletionSignal::notify) once
/// when they stop; waiters block until the count moves past what they last saw.
#[derive(Debug, Clone, Default)]
pub struct CompletionSignal {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        let (lock, cvar) = &*self.inner;
        if let Ok(mut exits) = lock.lock() {
            *exits += 1;
        }
        cvar.notify_all();
    }

    /// Number of exits so far.
    pub fn exits(&self) -> usize {
        let (lock, _) = &*self.inner;
        lock.lock().map(|g| *g).unwrap_or(0)
    }

    /// Block until more than `seen` exits happened or `timeout` elapsed.
    /// Returns the current exit count.
    pub fn wait_for_more(&self, seen: usize, timeout: Duration) -> usize {
        let (lock, cvar) = &*self.inner;
        let guard = match lock.lock() {
            Ok(g) => g,
            Err(_) => return seen,
        };
        match cvar.wait_timeout_while(guard, timeout, |exits| *exits <= seen) {
            Ok((g, _)) => *g,
            Err(_) => seen,
        }
    }
}
