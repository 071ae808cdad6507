//! Ranged GET into a segment temp file.

use curl::easy::{Easy2, Handler, WriteError};
use std::fs::File;
use std::io::{self, Write};
use std::str;

use super::{WorkerContext, WorkerError};
use crate::http::{parse_status_line, HttpOptions};
use crate::segmenter::Segment;

/// curl handler for one segment. Writes the body sequentially into `sink`
/// once the response is confirmed to be a 206 for the requested start offset.
pub struct RangeHandler {
    segment: Segment,
    sink: File,
    ctx: WorkerContext,
    status: Option<u32>,
    content_range_start: Option<u64>,
    /// None = not yet checked; Some(false) = response rejected, transfer aborted.
    range_ok: Option<bool>,
    written: u64,
    write_error: Option<io::Error>,
}

impl RangeHandler {
    pub fn new(segment: Segment, sink: File, ctx: WorkerContext) -> Self {
        Self {
            segment,
            sink,
            ctx,
            status: None,
            content_range_start: None,
            range_ok: None,
            written: 0,
            write_error: None,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn accepts_response(&self) -> bool {
        self.status == Some(206)
            && self
                .content_range_start
                .map(|s| s == self.segment.start)
                .unwrap_or(true)
    }
}

/// `Content-Range: bytes 251-500/1000` → 251.
fn parse_content_range_start(line: &str) -> Option<u64> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-range") {
        return None;
    }
    let spec = value.trim().strip_prefix("bytes")?.trim();
    spec.split('-').next()?.trim().parse().ok()
}

impl Handler for RangeHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(line) = str::from_utf8(data) {
            let line = line.trim_end();
            if let Some(code) = parse_status_line(line) {
                self.status = Some(code);
                self.content_range_start = None;
            } else if let Some(start) = parse_content_range_start(line) {
                self.content_range_start = Some(start);
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.ctx.cancel.is_cancelled() {
            return Ok(0);
        }
        let ok = match self.range_ok {
            Some(ok) => ok,
            None => {
                let ok = self.accepts_response();
                self.range_ok = Some(ok);
                ok
            }
        };
        if !ok {
            return Ok(0);
        }

        // Never write past the requested range, even if the server sends more.
        let room = self.segment.len().saturating_sub(self.written);
        let take = (data.len() as u64).min(room) as usize;
        if let Err(e) = self.sink.write_all(&data[..take]) {
            self.write_error = Some(e);
            return Ok(0);
        }
        self.written += take as u64;
        self.ctx.add_written(take as u64);
        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self.ctx.cancel.is_cancelled()
    }
}

/// Downloads `segment` of `url` into `sink`. Empty segments return at once.
/// No retry: any failure leaves the sink short and is returned.
pub fn fetch_range(
    url: &str,
    segment: Segment,
    sink: File,
    opts: &HttpOptions,
    ctx: &WorkerContext,
) -> Result<(), WorkerError> {
    if segment.is_empty() {
        return Ok(());
    }

    let mut easy = Easy2::new(RangeHandler::new(segment, sink, ctx.clone()));
    opts.configure(&mut easy, url)?;
    easy.range(&segment.curl_range())?;
    easy.progress(true)?;

    tracing::debug!(segment = segment.index, range = %segment.range_header_value(), "range request");
    let performed = easy.perform();

    let handler = easy.get_mut();
    if ctx.cancel.is_cancelled() {
        return Err(WorkerError::Cancelled);
    }
    if let Some(e) = handler.write_error.take() {
        return Err(WorkerError::Write(e));
    }
    let rejected = match handler.range_ok {
        Some(ok) => !ok,
        // No body arrived; judge by the final status alone.
        None => performed.is_ok() && !handler.accepts_response(),
    };
    if rejected {
        return Err(WorkerError::Http(handler.status.unwrap_or(0)));
    }
    performed?;
    handler.sink.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::plan_segments;
    use crate::worker::CancelToken;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn handler(segment: Segment) -> (RangeHandler, tempfile::TempDir, std::path::PathBuf, WorkerContext) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.tmp");
        let file = File::create(&path).unwrap();
        let ctx = WorkerContext {
            index: segment.index,
            cancel: CancelToken::new(),
            written: Arc::new(AtomicU64::new(0)),
        };
        (RangeHandler::new(segment, file, ctx.clone()), dir, path, ctx)
    }

    #[test]
    fn rejects_full_body_response() {
        let seg = plan_segments(1000, 4)[1];
        let (mut h, _dir, path, _) = handler(seg);
        h.header(b"HTTP/1.1 200 OK\r\n");
        h.header(b"Content-Length: 1000\r\n");
        assert_eq!(h.write(b"data").unwrap(), 0);
        assert_eq!(h.range_ok, Some(false));
        assert_eq!(std::fs::metadata(path).unwrap().len(), 0);
    }

    #[test]
    fn status_resets_after_redirect() {
        let seg = plan_segments(1000, 4)[1];
        let (mut h, _dir, _path, _) = handler(seg);
        h.header(b"HTTP/1.1 302 Found\r\n");
        h.header(b"Location: http://elsewhere/\r\n");
        h.header(b"HTTP/1.1 206 Partial Content\r\n");
        h.header(b"Content-Range: bytes 251-500/1000\r\n");
        assert_eq!(h.write(b"abcd").unwrap(), 4);
        assert_eq!(h.range_ok, Some(true));
    }

    #[test]
    fn rejects_mismatched_content_range() {
        let seg = plan_segments(1000, 4)[2];
        let (mut h, _dir, _path, _) = handler(seg);
        h.header(b"HTTP/1.1 206 Partial Content\r\n");
        h.header(b"Content-Range: bytes 0-249/1000\r\n");
        assert_eq!(h.write(b"abcd").unwrap(), 0);
    }

    #[test]
    fn writes_sequentially_and_counts() {
        let seg = plan_segments(1000, 4)[1];
        let (mut h, _dir, path, ctx) = handler(seg);
        h.header(b"HTTP/1.1 206 Partial Content\r\n");
        assert_eq!(h.write(b"abcd").unwrap(), 4);
        assert_eq!(h.write(b"efgh").unwrap(), 4);
        assert_eq!(h.written(), 8);
        assert_eq!(ctx.written.load(Ordering::Relaxed), 8);
        assert_eq!(std::fs::read(path).unwrap(), b"abcdefgh");
    }

    #[test]
    fn caps_at_segment_length() {
        let seg = Segment {
            index: 0,
            start: 0,
            end: 3,
        };
        let (mut h, _dir, path, _) = handler(seg);
        h.header(b"HTTP/1.1 206 Partial Content\r\n");
        assert_eq!(h.write(b"abcdefgh").unwrap(), 8);
        assert_eq!(std::fs::read(path).unwrap(), b"abcd");
    }

    #[test]
    fn cancelled_handler_aborts() {
        let seg = plan_segments(1000, 4)[0];
        let (mut h, _dir, _path, ctx) = handler(seg);
        h.header(b"HTTP/1.1 206 Partial Content\r\n");
        ctx.cancel.cancel();
        assert_eq!(h.write(b"abcd").unwrap(), 0);
        assert!(!h.progress(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn content_range_parse() {
        assert_eq!(parse_content_range_start("Content-Range: bytes 251-500/1000"), Some(251));
        assert_eq!(parse_content_range_start("content-range: bytes */1000"), None);
        assert_eq!(parse_content_range_start("Content-Length: 5"), None);
    }

    #[test]
    fn empty_segment_needs_no_request() {
        let seg = Segment {
            index: 1,
            start: 1,
            end: 0,
        };
        let (_h, _dir, path, ctx) = handler(seg);
        let file = File::create(&path).unwrap();
        assert!(fetch_range("http://127.0.0.1:9/", seg, file, &HttpOptions::default(), &ctx).is_ok());
    }
}
