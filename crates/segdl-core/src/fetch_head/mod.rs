//! Resource probe: size, range support and filename hint, from HEAD or the
//! headers of a GET.

mod parse;

use curl::easy::{Easy2, Handler, WriteError};
use serde::Serialize;
use std::str;

use crate::error::{DownloadError, Result};
use crate::http::{classify_curl_error, HttpOptions};

pub use parse::parse_headers;

/// What the server told us about the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceInfo {
    /// `Content-Length`, if sent.
    pub content_length: Option<u64>,
    /// `Accept-Ranges: bytes` was sent.
    pub accept_ranges: bool,
    /// Raw `Content-Disposition`, used as a filename hint.
    pub content_disposition: Option<String>,
}

/// Keeps the header lines of the last response in a redirect chain.
#[derive(Debug, Default)]
struct HeaderCollector {
    lines: Vec<String>,
    /// Abort as soon as the body starts (GET used as a header probe).
    headers_only: bool,
}

impl Handler for HeaderCollector {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                self.lines.clear();
            }
            if !line.is_empty() {
                self.lines.push(line.to_string());
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> std::result::Result<usize, WriteError> {
        if self.headers_only {
            return Ok(0);
        }
        Ok(data.len())
    }
}

/// HEAD answers after which the same resource is still worth a GET:
/// any 4xx (405 from servers that block HEAD, 403 from presigned URLs and
/// CDNs that only sign GET) and 501.
fn retry_with_get(code: u32) -> bool {
    code == 501 || (400..500).contains(&code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Head,
    /// GET that stops reading once the response headers are in.
    HeadersOfGet,
}

impl Method {
    fn name(self) -> &'static str {
        match self {
            Method::Head => "HEAD",
            Method::HeadersOfGet => "GET",
        }
    }
}

/// Sends one request and returns the final status code and its header lines.
fn request_headers(url: &str, opts: &HttpOptions, method: Method) -> Result<(u32, Vec<String>)> {
    let headers_only = method == Method::HeadersOfGet;
    let mut easy = Easy2::new(HeaderCollector {
        lines: Vec::new(),
        headers_only,
    });
    opts.configure(&mut easy, url)
        .and_then(|_| easy.nobody(method == Method::Head))
        .map_err(|e| classify_curl_error(url, &e))?;
    match easy.perform() {
        Ok(()) => {}
        // The collector refused the body on purpose.
        Err(e) if headers_only && e.is_write_error() => {}
        Err(e) => {
            return Err(DownloadError::Connection {
                url: url.to_string(),
                reason: e.to_string(),
            })
        }
    }
    let code = easy
        .response_code()
        .map_err(|e| classify_curl_error(url, &e))?;
    Ok((code, std::mem::take(&mut easy.get_mut().lines)))
}

/// Probes `url` (following redirects) for size, range support and filename hint.
///
/// Starts with HEAD. When HEAD is refused with a 4xx or 501, a GET is opened
/// and dropped after its headers, the way a plain download would see the
/// resource. A non-2xx answer to that GET is a connection error.
/// Blocking; run off any async runtime.
pub fn probe(url: &str, opts: &HttpOptions) -> Result<ResourceInfo> {
    let (mut code, mut lines) = request_headers(url, opts, Method::Head)?;
    let mut method = Method::Head;
    if retry_with_get(code) {
        tracing::debug!(url, code, "HEAD refused; reading headers from GET");
        method = Method::HeadersOfGet;
        (code, lines) = request_headers(url, opts, method)?;
    }
    if !(200..300).contains(&code) {
        return Err(DownloadError::Connection {
            url: url.to_string(),
            reason: format!("{} returned HTTP {}", method.name(), code),
        });
    }

    let info = parse_headers(&lines);
    tracing::debug!(
        url,
        method = method.name(),
        content_length = ?info.content_length,
        accept_ranges = info.accept_ranges,
        "probed resource"
    );
    Ok(info)
}
