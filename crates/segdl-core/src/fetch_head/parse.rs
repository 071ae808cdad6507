//! Header line parsing.

use super::ResourceInfo;

/// Builds a [`ResourceInfo`] from raw header lines (status line and blanks are skipped).
pub fn parse_headers<S: AsRef<str>>(lines: &[S]) -> ResourceInfo {
    let mut info = ResourceInfo::default();

    for line in lines {
        let Some((name, value)) = line.as_ref().trim().split_once(':') else {
            continue;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => info.content_length = value.parse::<u64>().ok(),
            "accept-ranges" => info.accept_ranges = value.eq_ignore_ascii_case("bytes"),
            "content-disposition" => info.content_disposition = Some(value.to_string()),
            _ => {}
        }
    }

    info
}
