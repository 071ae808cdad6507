//! Per-segment temp files.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Prefix for segment `index` of `file_name`: short SHA-256 of the name plus the index.
pub fn temp_prefix(file_name: &str, index: usize) -> String {
    let digest = Sha256::digest(file_name.as_bytes());
    format!("{}-{}-", hex::encode(&digest[..6]), index)
}

/// Creates an empty, persistent temp file for one segment in `dir`.
/// A random suffix keeps concurrent jobs for the same name apart.
pub fn create_segment_file(dir: &Path, file_name: &str, index: usize) -> io::Result<(File, PathBuf)> {
    let named = tempfile::Builder::new()
        .prefix(&temp_prefix(file_name, index))
        .suffix(".tmp")
        .tempfile_in(dir)?;
    named.keep().map_err(|e| e.error)
}
