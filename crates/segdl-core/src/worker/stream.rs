//! Single-stream GET straight into the destination file (unsplit path).

use curl::easy::{Easy2, Handler, WriteError};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::str;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::CancelToken;
use crate::error::{DownloadError, Result};
use crate::http::{classify_curl_error, parse_status_line, HttpOptions};

/// curl handler that copies a 2xx body into `sink`.
pub struct StreamHandler {
    sink: File,
    cancel: CancelToken,
    written: Arc<AtomicU64>,
    status: Option<u32>,
    write_error: Option<io::Error>,
}

impl StreamHandler {
    pub fn new(sink: File, cancel: CancelToken, written: Arc<AtomicU64>) -> Self {
        Self {
            sink,
            cancel,
            written,
            status: None,
            write_error: None,
        }
    }

    fn status_ok(&self) -> bool {
        self.status.map(|c| (200..300).contains(&c)).unwrap_or(false)
    }
}

impl Handler for StreamHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Some(code) = str::from_utf8(data).ok().and_then(|l| parse_status_line(l.trim_end())) {
            self.status = Some(code);
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> std::result::Result<usize, WriteError> {
        if self.cancel.is_cancelled() || !self.status_ok() {
            return Ok(0);
        }
        if let Err(e) = self.sink.write_all(data) {
            self.write_error = Some(e);
            return Ok(0);
        }
        self.written.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self.cancel.is_cancelled()
    }
}

/// Copies the whole body of `url` into `sink` (the file at `dest`). Returns bytes written.
///
/// Error mapping: unreachable host or non-2xx status → `Connection`; a stream
/// that breaks after the response started → `StreamRead`; a failing write →
/// `Io`; a fired `cancel` → `Cancelled`.
pub fn stream_to_file(
    url: &str,
    sink: File,
    dest: &Path,
    opts: &HttpOptions,
    cancel: &CancelToken,
    written: Arc<AtomicU64>,
) -> Result<u64> {
    let mut easy = Easy2::new(StreamHandler::new(sink, cancel.clone(), Arc::clone(&written)));
    opts.configure(&mut easy, url)
        .and_then(|_| easy.progress(true))
        .map_err(|e| classify_curl_error(url, &e))?;

    let performed = easy.perform();
    let handler = easy.get_mut();

    if cancel.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }
    if let Some(e) = handler.write_error.take() {
        return Err(DownloadError::io(dest, e));
    }
    if let Some(code) = handler.status.filter(|_| !handler.status_ok()) {
        return Err(DownloadError::Connection {
            url: url.to_string(),
            reason: format!("GET returned HTTP {}", code),
        });
    }
    performed.map_err(|e| classify_curl_error(url, &e))?;
    if handler.status.is_none() {
        return Err(DownloadError::StreamRead {
            url: url.to_string(),
            reason: "no response".to_string(),
        });
    }
    handler.sink.flush().map_err(|e| DownloadError::io(dest, e))?;

    Ok(written.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> (StreamHandler, tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let file = File::create(&path).unwrap();
        let h = StreamHandler::new(file, CancelToken::new(), Arc::new(AtomicU64::new(0)));
        (h, dir, path)
    }

    #[test]
    fn error_status_body_is_not_written() {
        let (mut h, _dir, path) = handler();
        h.header(b"HTTP/1.1 404 Not Found\r\n");
        assert_eq!(h.write(b"<html>nope</html>").unwrap(), 0);
        assert_eq!(std::fs::metadata(path).unwrap().len(), 0);
    }

    #[test]
    fn ok_body_is_copied() {
        let (mut h, _dir, path) = handler();
        h.header(b"HTTP/1.1 301 Moved\r\n");
        h.header(b"HTTP/1.1 200 OK\r\n");
        assert_eq!(h.write(b"hello ").unwrap(), 6);
        assert_eq!(h.write(b"world").unwrap(), 5);
        assert_eq!(h.written.load(Ordering::Relaxed), 11);
        assert_eq!(std::fs::read(path).unwrap(), b"hello world");
    }

    #[test]
    fn unreachable_host_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");
        let file = File::create(&dest).unwrap();
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let err = stream_to_file(
            &format!("http://127.0.0.1:{}/file", port),
            file,
            &dest,
            &HttpOptions::default(),
            &CancelToken::new(),
            Arc::new(AtomicU64::new(0)),
        )
        .unwrap_err();
        assert_eq!(err.category(), "connection");
    }
}
