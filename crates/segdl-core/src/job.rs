//! Job description and the per-job active flag.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Immutable description of one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Link to fetch.
    pub link: String,
    /// Link the user originally supplied, when it differs from `link`
    /// (an audio-only source resolved to a video link).
    pub source_link: Option<String>,
    /// Directory the final file is written into.
    pub dir: PathBuf,
    /// Target filename; empty means derive it from the link.
    pub file_name: String,
}

impl Job {
    pub fn new(link: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            link: link.into(),
            source_link: None,
            dir: dir.into(),
            file_name: String::new(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_source_link(mut self, source_link: impl Into<String>) -> Self {
        self.source_link = Some(source_link.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The link used for classification of the requested output (audio vs video).
    pub fn source_link(&self) -> &str {
        self.source_link.as_deref().unwrap_or(&self.link)
    }
}

/// Shared "transfer in progress" flag. Written once by the orchestrator,
/// read by the progress monitor. Cloning shares the flag.
#[derive(Debug, Clone)]
pub struct JobStatus {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStatus {
    /// A new status starts active.
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(true), Condvar::new())),
        }
    }

    pub fn is_active(&self) -> bool {
        let (lock, _) = &*self.inner;
        lock.lock().map(|g| *g).unwrap_or(false)
    }

    /// Mark the transfer finished and wake anyone waiting on the flag.
    pub fn set_inactive(&self) {
        let (lock, cvar) = &*self.inner;
        if let Ok(mut active) = lock.lock() {
            *active = false;
        }
        cvar.notify_all();
    }

    /// Sleep up to `timeout`, returning early when the job becomes inactive.
    /// Returns whether the job is still active.
    pub fn wait_while_active(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let guard = match lock.lock() {
            Ok(g) => g,
            Err(_) => return false,
        };
        match cvar.wait_timeout_while(guard, timeout, |active| *active) {
            Ok((g, _)) => *g,
            Err(_) => false,
        }
    }
}
