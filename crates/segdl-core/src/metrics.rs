//! Split decision for one download.

use serde::Serialize;

/// Decision inputs and outputs for one download. Filled once by [`TransferMetrics::decide`],
/// read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransferMetrics {
    /// Total size in bytes, `None` when the server did not send `Content-Length`.
    pub total_size: Option<u64>,
    /// Server advertised `Accept-Ranges: bytes`.
    pub range_capable: bool,
    /// Download as `worker_count` concurrent segments.
    pub split_enabled: bool,
    pub worker_count: usize,
    /// Size must be strictly greater than this to split.
    pub threshold: u64,
}

impl TransferMetrics {
    /// Worker count of 0 is treated as 1.
    pub fn new(worker_count: usize, threshold: u64) -> Self {
        Self {
            total_size: None,
            range_capable: false,
            split_enabled: false,
            worker_count: worker_count.max(1),
            threshold,
        }
    }

    /// Record the probe results and derive `split_enabled`.
    pub fn decide(&mut self, total_size: Option<u64>, range_capable: bool) -> bool {
        self.total_size = total_size;
        self.range_capable = range_capable;
        self.split_enabled = match total_size {
            Some(size) => size > self.threshold && range_capable,
            None => false,
        };
        self.split_enabled
    }

    /// Total size in the `-1 = unknown` convention used in progress output.
    pub fn total_size_or_unknown(&self) -> i64 {
        self.total_size
            .map(|s| i64::try_from(s).unwrap_or(i64::MAX))
            .unwrap_or(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_requires_size_above_threshold_and_ranges() {
        let mut m = TransferMetrics::new(4, 1000);
        assert!(m.decide(Some(1001), true));
        assert!(!m.decide(Some(1000), true));
        assert!(!m.decide(Some(5000), false));
        assert!(!m.decide(Some(10), true));
    }

    #[test]
    fn unknown_size_never_splits() {
        let mut m = TransferMetrics::new(4, 0);
        assert!(!m.decide(None, true));
        assert_eq!(m.total_size_or_unknown(), -1);
    }

    #[test]
    fn missing_accept_ranges_above_threshold_stays_unsplit() {
        let mut m = TransferMetrics::new(4, 1000);
        m.decide(Some(5000), false);
        assert!(!m.split_enabled);
        assert_eq!(m.total_size_or_unknown(), 5000);
    }

    #[test]
    fn decision_matches_predicate_over_grid() {
        for threshold in [0u64, 1, 999, 1000, 1_000_000] {
            for size in [None, Some(0u64), Some(1), Some(1000), Some(1001), Some(2_000_000)] {
                for ranges in [false, true] {
                    let mut m = TransferMetrics::new(3, threshold);
                    let expected = ranges && size.map(|s| s > threshold).unwrap_or(false);
                    assert_eq!(m.decide(size, ranges), expected, "{threshold} {size:?} {ranges}");
                }
            }
        }
    }

    #[test]
    fn zero_workers_clamped() {
        assert_eq!(TransferMetrics::new(0, 10).worker_count, 1);
    }
}
