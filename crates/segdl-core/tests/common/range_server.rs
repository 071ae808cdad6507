//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body at any path. HEAD gets Content-Length (and
//! Accept-Ranges: bytes when enabled); GET with Range gets 206 Partial Content.
//! Options simulate refused HEAD, missing range support, a range that dies
//! mid-transfer and a range that stalls.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// HEAD is answered with this status line (e.g. "405 Method Not Allowed"
    /// or "403 Forbidden") while GET keeps working.
    pub head_refusal: Option<&'static str>,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` header even if ranges work.
    pub advertise_ranges: bool,
    /// A range request starting at `.0` announces its full length but sends
    /// only `.1` bytes before closing the connection.
    pub truncate_range: Option<(u64, usize)>,
    /// A range request starting here sends headers, then nothing, for a long time.
    pub stall_range_start: Option<u64>,
    pub content_disposition: Option<&'static str>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_refusal: None,
            support_ranges: true,
            advertise_ranges: true,
            truncate_range: None,
            stall_range_start: None,
            content_disposition: None,
        }
    }
}

pub struct RangeServer {
    /// e.g. "http://127.0.0.1:12345/data.bin"
    pub url: String,
    ranged_gets: Arc<AtomicUsize>,
    plain_gets: Arc<AtomicUsize>,
}

impl RangeServer {
    /// GET requests that carried a Range header.
    pub fn ranged_gets(&self) -> usize {
        self.ranged_gets.load(Ordering::SeqCst)
    }

    /// GET requests without a Range header.
    pub fn plain_gets(&self) -> usize {
        self.plain_gets.load(Ordering::SeqCst)
    }
}

/// Starts a server in a background thread serving `body`. The server runs
/// until the process exits.
pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

/// Like `start` but allows customizing server behavior (HEAD blocked, ranges missing, etc.).
pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let ranged_gets = Arc::new(AtomicUsize::new(0));
    let plain_gets = Arc::new(AtomicUsize::new(0));
    let counters = (Arc::clone(&ranged_gets), Arc::clone(&plain_gets));
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let counters = (Arc::clone(&counters.0), Arc::clone(&counters.1));
            thread::spawn(move || handle(stream, &body, opts, counters));
        }
    });
    RangeServer {
        url: format!("http://127.0.0.1:{}/data.bin", port),
        ranged_gets,
        plain_gets,
    }
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    opts: RangeServerOptions,
    (ranged_gets, plain_gets): (Arc<AtomicUsize>, Arc<AtomicUsize>),
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    let total = body.len() as u64;
    let accept_ranges = if opts.advertise_ranges && opts.support_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };
    let disposition = opts
        .content_disposition
        .map(|d| format!("Content-Disposition: {}\r\n", d))
        .unwrap_or_default();

    if method.eq_ignore_ascii_case("HEAD") {
        if let Some(status) = opts.head_refusal {
            let _ = stream.write_all(format!("HTTP/1.1 {}\r\nContent-Length: 0\r\n\r\n", status).as_bytes());
            return;
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}{}\r\n",
            total, accept_ranges, disposition
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }

    if range.is_some() {
        ranged_gets.fetch_add(1, Ordering::SeqCst);
    } else {
        plain_gets.fetch_add(1, Ordering::SeqCst);
    }

    let (status, content_range, slice, start) = match range.filter(|_| opts.support_ranges) {
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start >= total || start > end_incl {
                ("416 Range Not Satisfiable", format!("Content-Range: bytes */{}\r\n", total), &body[0..0], start)
            } else {
                let slice = &body[start as usize..=end_incl as usize];
                (
                    "206 Partial Content",
                    format!("Content-Range: bytes {}-{}/{}\r\n", start, end_incl, total),
                    slice,
                    start,
                )
            }
        }
        None => ("200 OK", String::new(), body, 0),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}{}{}\r\n",
        status,
        slice.len(),
        content_range,
        accept_ranges,
        disposition
    );
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }

    if range.is_some() && opts.stall_range_start == Some(start) {
        thread::sleep(Duration::from_secs(30));
        return;
    }
    let slice = match opts.truncate_range {
        Some((at, keep)) if range.is_some() && at == start => &slice[..keep.min(slice.len())],
        _ => slice,
    };
    let _ = stream.write_all(slice);
    let _ = stream.flush();
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    let part = value[6..].trim();
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}
