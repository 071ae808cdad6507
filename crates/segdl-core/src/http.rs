//! Shared curl handle setup and curl error classification.

use curl::easy::{Easy2, Handler};
use std::time::Duration;

use crate::config::SegdlConfig;
use crate::error::DownloadError;

/// Per-handle curl settings taken from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self::from_config(&SegdlConfig::default())
    }
}

impl HttpOptions {
    pub fn from_config(cfg: &SegdlConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            low_speed_limit: cfg.low_speed_limit_bytes,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
        }
    }

    /// Point `easy` at `url` with redirects and timeouts applied.
    pub(crate) fn configure<H: Handler>(&self, easy: &mut Easy2<H>, url: &str) -> Result<(), curl::Error> {
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        // No wall-clock timeout: only stalled transfers are aborted.
        easy.low_speed_limit(self.low_speed_limit)?;
        easy.low_speed_time(self.low_speed_time)?;
        Ok(())
    }
}

/// Status code from an `HTTP/x y reason` status line.
pub(crate) fn parse_status_line(line: &str) -> Option<u32> {
    if !line.starts_with("HTTP/") {
        return None;
    }
    line.split_whitespace().nth(1)?.parse().ok()
}

/// True for curl errors that mean the resource could not be reached at all
/// (as opposed to a stream that broke after the response started).
pub fn is_connect_error(e: &curl::Error) -> bool {
    e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_ssl_connect_error()
        || e.is_peer_failed_verification()
        || e.is_url_malformed()
        || e.is_unsupported_protocol()
}

/// Map a curl failure on `url` into the connection or stream-read category.
pub(crate) fn classify_curl_error(url: &str, e: &curl::Error) -> DownloadError {
    if is_connect_error(e) {
        DownloadError::Connection {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else {
        DownloadError::StreamRead {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_config() {
        let mut cfg = SegdlConfig::default();
        cfg.connect_timeout_secs = 7;
        cfg.low_speed_limit_bytes = 10;
        cfg.low_speed_time_secs = 3;
        let o = HttpOptions::from_config(&cfg);
        assert_eq!(o.connect_timeout, Duration::from_secs(7));
        assert_eq!(o.low_speed_limit, 10);
        assert_eq!(o.low_speed_time, Duration::from_secs(3));
    }

    #[test]
    fn status_lines() {
        assert_eq!(parse_status_line("HTTP/1.1 206 Partial Content"), Some(206));
        assert_eq!(parse_status_line("HTTP/2 200"), Some(200));
        assert_eq!(parse_status_line("Content-Length: 5"), None);
    }

    #[test]
    fn couldnt_connect_is_connection_error() {
        let e = curl::Error::new(7); // CURLE_COULDNT_CONNECT
        assert!(is_connect_error(&e));
        assert_eq!(classify_curl_error("http://x/", &e).category(), "connection");
    }

    #[test]
    fn recv_error_is_stream_error() {
        let e = curl::Error::new(56); // CURLE_RECV_ERROR
        assert!(!is_connect_error(&e));
        assert_eq!(classify_curl_error("http://x/", &e).category(), "stream-read");
    }
}
