//! Target filename resolution.
//!
//! An explicit job filename wins; otherwise the `Content-Disposition` hint,
//! then the last URL path segment, then [`DEFAULT_FILENAME`]. Derived names are
//! sanitized so they can never escape the target directory.

/// Used when nothing better can be derived.
pub const DEFAULT_FILENAME: &str = "download.bin";

const NAME_MAX: usize = 255;

/// Picks the filename for a job.
pub fn resolve_file_name(job_name: &str, url: &str, content_disposition: Option<&str>) -> String {
    let explicit = job_name.trim();
    if !explicit.is_empty() {
        return sanitize(explicit).unwrap_or_else(|| DEFAULT_FILENAME.to_string());
    }

    content_disposition
        .and_then(disposition_file_name)
        .and_then(|n| sanitize(&n))
        .or_else(|| url_file_name(url).and_then(|n| sanitize(&n)))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

/// Last non-empty path segment of `url`, percent-decoded.
pub fn url_file_name(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode(segment).unwrap_or_else(|| segment.to_string());
    Some(decoded)
}

/// `filename*=UTF-8''...` takes precedence over `filename=`.
pub fn disposition_file_name(header: &str) -> Option<String> {
    let mut plain = None;
    for param in header.split(';') {
        let Some((key, value)) = param.trim().split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value
                    .split_once("''")
                    .map(|(_, rest)| rest)
                    .unwrap_or(value);
                if let Some(name) = percent_decode(encoded).filter(|n| !n.is_empty()) {
                    return Some(name);
                }
            }
            "filename" => {
                let unquoted = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .map(|v| v.replace("\\\"", "\"").replace("\\\\", "\\"))
                    .unwrap_or_else(|| value.to_string());
                if !unquoted.is_empty() {
                    plain = Some(unquoted);
                }
            }
            _ => {}
        }
    }
    plain
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Replaces path separators and control characters, trims dots/spaces, caps
/// the length. `None` when nothing usable is left.
fn sanitize(name: &str) -> Option<String> {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c == '\0' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        return None;
    }

    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    Some(trimmed[..end].to_string())
}
