//! Segment type and range planning.

use serde::Serialize;

/// One contiguous byte range, both ends inclusive.
///
/// `start > end` marks an empty segment (only produced when there are more
/// workers than bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Position in the plan; also the concatenation order.
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl Segment {
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Size of the inclusive range `[start, end]`.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    /// Bytes the server can actually deliver for this range of a `total_size`
    /// resource. The last range ends at `total_size`, one past the final byte,
    /// so its target is one less than its `len`.
    pub fn target_len(&self, total_size: u64) -> u64 {
        if total_size == 0 || self.is_empty() {
            return 0;
        }
        let last = self.end.min(total_size - 1);
        if self.start > last {
            0
        } else {
            last - self.start + 1
        }
    }

    /// curl range option value: `start-end`.
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }

    /// HTTP `Range` header value: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Splits `[0, total_size]` across `worker_count` segments.
///
/// `part = total_size / worker_count`; segment `i` starts at `0` for the first
/// worker and `i * part + 1` otherwise, and ends at `i * part + part`, except
/// the last which ends at `total_size`. The first segment is therefore one byte
/// longer than `part` and the last absorbs the division remainder.
///
/// A worker count of 0 is treated as 1.
pub fn plan_segments(total_size: u64, worker_count: usize) -> Vec<Segment> {
    let n = worker_count.max(1) as u64;
    let part = total_size / n;

    (0..n)
        .map(|i| {
            let start = if i == 0 { 0 } else { i * part + 1 };
            let end = if i == n - 1 { total_size } else { i * part + part };
            Segment {
                index: i as usize,
                start,
                end,
            }
        })
        .collect()
}
