//! yt-dlp compatible downloader subprocess.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use super::{classify_exit, classify_spawn_error, classify_stderr, SubprocessFailure, VideoDownloader, VideoRequest};

/// How much of the downloader's stderr is kept for failure classification.
const STDERR_TAIL_BYTES: usize = 64 * 1024;

pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

/// Copies `input` to `out` as it arrives and returns the last `limit` bytes.
///
/// Progress redraws use `\r`, so chunks are forwarded as read rather than per line.
fn tee_tail<R: Read, W: Write>(mut input: R, mut out: W, limit: usize) -> Vec<u8> {
    let mut tail = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        let _ = out.write_all(&buf[..n]);
        let _ = out.flush();
        tail.extend_from_slice(&buf[..n]);
        if tail.len() > limit {
            let excess = tail.len() - limit;
            tail.drain(..excess);
        }
    }
    tail
}

/// Last non-empty line of `input`; the downloader prints the final file path there.
fn last_line<R: Read>(input: R) -> Option<String> {
    let mut reader = BufReader::new(input);
    let mut line = Vec::new();
    let mut last = None;
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line).trim().to_string();
                if !text.is_empty() {
                    last = Some(text);
                }
            }
        }
    }
    last
}

impl VideoDownloader for YtDlp {
    fn download(&self, request: &VideoRequest) -> Result<PathBuf, SubprocessFailure> {
        tracing::info!(program = %self.program, link = %request.link, format = request.format.selector(), "starting external downloader");
        let mut child = Command::new(&self.program)
            .args(request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| classify_spawn_error(&e))?;

        // Progress and warnings go to stderr: shown live, tail kept.
        let stderr_reader = match child.stderr.take() {
            Some(pipe) => thread::Builder::new()
                .name("segdl-ytdlp-stderr".to_string())
                .spawn(move || tee_tail(pipe, io::stderr(), STDERR_TAIL_BYTES))
                .ok(),
            None => None,
        };
        let printed = child.stdout.take().and_then(last_line);
        let status = child
            .wait()
            .map_err(|e| SubprocessFailure::FailedToStart(e.to_string()))?;
        let stderr_tail = stderr_reader
            .and_then(|h| h.join().ok())
            .map(|tail| String::from_utf8_lossy(&tail).into_owned())
            .unwrap_or_default();

        if status.success() {
            return Ok(printed.map(PathBuf::from).unwrap_or_else(|| request.output_path()));
        }
        tracing::warn!(program = %self.program, code = ?status.code(), stderr = %stderr_tail.trim(), "external downloader failed");
        match classify_stderr(&stderr_tail) {
            Some(failure) => Err(failure),
            None => classify_exit(status.code()).map(|()| request.output_path()),
        }
    }
}
