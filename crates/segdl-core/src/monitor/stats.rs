//! Progress snapshot (bytes done, rate, ETA) and its one-line rendering.

const MIB: f64 = 1_048_576.0;

/// Snapshot of one job's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStats {
    pub file_name: String,
    /// Bytes written so far across all sinks.
    pub bytes_done: u64,
    /// Total size, if the server reported one.
    pub total_bytes: Option<u64>,
    /// Seconds since the transfer started.
    pub elapsed_secs: f64,
    /// Segments whose sink reached its target.
    pub segments_done: usize,
    /// 1 for an unsplit transfer.
    pub segment_count: usize,
    /// The job has stopped writing; this is the final snapshot.
    pub finished: bool,
}

impl ProgressStats {
    /// Average rate in bytes per second (0 if no time has elapsed).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Seconds remaining at the current rate. None when size or rate is unknown.
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0]; None when the size is unknown.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) => Some(1.0),
            Some(total) => Some((self.bytes_done as f64 / total as f64).min(1.0)),
            None => None,
        }
    }

    /// `name  12.0 / 50.0 MiB (24.0%)  3.10 MiB/s  ETA 12s  [2/4]`
    pub fn render_line(&self) -> String {
        let done = self.bytes_done as f64 / MIB;
        let rate = self.bytes_per_sec() / MIB;
        let size = match (self.total_bytes, self.fraction()) {
            (Some(total), Some(f)) => format!("{:.1} / {:.1} MiB ({:.1}%)", done, total as f64 / MIB, f * 100.0),
            _ => format!("{:.1} MiB", done),
        };
        let eta = self
            .eta_secs()
            .map(|s| format!("{:.0}s", s))
            .unwrap_or_else(|| "?".to_string());
        let mut line = format!("{}  {}  {:.2} MiB/s  ETA {}", self.file_name, size, rate, eta);
        if self.segment_count > 1 {
            line.push_str(&format!("  [{}/{}]", self.segments_done, self.segment_count));
        }
        line
    }
}
