//! Event sink that writes to the terminal.

use segdl_core::monitor::ProgressStats;
use segdl_core::EventSink;
use std::io::Write;
use std::sync::Mutex;

/// Messages go to stdout/stderr; progress is redrawn in place on stderr.
#[derive(Default)]
pub struct ConsoleSink {
    /// Width of the last progress line, to blank out leftovers when redrawing.
    last_width: Mutex<usize>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

/// `\r` + line, padded to cover the previous one; newline after the final frame.
pub(crate) fn frame(stats: &ProgressStats, last_width: usize) -> String {
    let line = stats.render_line();
    let pad = last_width.saturating_sub(line.chars().count());
    let mut out = format!("\r{}{}", line, " ".repeat(pad));
    if stats.finished {
        out.push('\n');
    }
    out
}

impl EventSink for ConsoleSink {
    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("error: {}", message);
    }

    fn progress(&self, stats: &ProgressStats) {
        let Ok(mut width) = self.last_width.lock() else {
            return;
        };
        let out = frame(stats, *width);
        *width = if stats.finished { 0 } else { stats.render_line().chars().count() };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(out.as_bytes());
        let _ = stderr.flush();
    }
}
