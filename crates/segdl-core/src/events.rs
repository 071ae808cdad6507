//! One-way event sink for user-facing messages.
//!
//! Components receive an `Arc<dyn EventSink>` at construction and push
//! `info`/`error` messages and progress snapshots into it. The engine never
//! reads anything back.

use std::sync::mpsc;
use std::sync::Mutex;

use crate::monitor::ProgressStats;

pub trait EventSink: Send + Sync {
    fn info(&self, message: &str);

    fn error(&self, message: &str);

    /// Called by the progress monitor on every sample. Default: ignored.
    fn progress(&self, _stats: &ProgressStats) {}
}

/// Forwards messages to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn progress(&self, stats: &ProgressStats) {
        tracing::trace!(
            bytes_done = stats.bytes_done,
            total = ?stats.total_bytes,
            "progress"
        );
    }
}

/// An event as delivered through [`ChannelSink`].
#[derive(Debug, Clone)]
pub enum Event {
    Info(String),
    Error(String),
    Progress(ProgressStats),
}

/// Sends every event into a std mpsc channel (e.g. to a UI thread).
/// Send failures (receiver dropped) are ignored.
pub struct ChannelSink {
    tx: Mutex<mpsc::Sender<Event>>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }

    fn send(&self, event: Event) {
        if let Ok(tx) = self.tx.lock() {
            let _ = tx.send(event);
        }
    }
}

impl EventSink for ChannelSink {
    fn info(&self, message: &str) {
        self.send(Event::Info(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.send(Event::Error(message.to_string()));
    }

    fn progress(&self, stats: &ProgressStats) {
        self.send(Event::Progress(stats.clone()));
    }
}
