//! Exit code, spawn error and stderr classification tables.

use std::io;

use super::SubprocessFailure;

/// Substrings looked for in the downloader's stderr, after lowercasing and
/// removing whitespace. First match wins.
pub const STDERR_PATTERNS: &[(&str, SubprocessFailure)] = &[
    ("cannotrunprogram", SubprocessFailure::NotExecutable),
    ("permissiondenied", SubprocessFailure::PermissionDenied),
    ("privatevideo", SubprocessFailure::PermissionDenied),
    ("loginrequired", SubprocessFailure::PermissionDenied),
    ("videounavailable", SubprocessFailure::Unavailable),
    ("videoisunavailable", SubprocessFailure::Unavailable),
    ("notavailableinyourcountry", SubprocessFailure::Unavailable),
];

/// `Some(0)` is success, `Some(1)` a generic failure, anything else unknown.
pub fn classify_exit(code: Option<i32>) -> Result<(), SubprocessFailure> {
    match code {
        Some(0) => Ok(()),
        Some(1) => Err(SubprocessFailure::GenericFailure),
        other => Err(SubprocessFailure::UnknownExit(other)),
    }
}

pub fn classify_spawn_error(e: &io::Error) -> SubprocessFailure {
    match e.kind() {
        io::ErrorKind::PermissionDenied => SubprocessFailure::NotExecutable,
        io::ErrorKind::NotFound => SubprocessFailure::FailedToStart("program not found".to_string()),
        _ => SubprocessFailure::FailedToStart(e.to_string()),
    }
}

pub fn classify_stderr(stderr: &str) -> Option<SubprocessFailure> {
    let normalized: String = stderr
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    STDERR_PATTERNS
        .iter()
        .find(|(pattern, _)| normalized.contains(pattern))
        .map(|(_, failure)| failure.clone())
}
