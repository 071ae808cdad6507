//! External collaborators run as subprocesses: a command-line video downloader
//! (yt-dlp compatible) for streaming-video links and an audio converter for
//! audio-only output.
//!
//! Exit codes, spawn errors and stderr text are mapped to [`SubprocessFailure`]
//! through the tables in `classify`.

mod classify;
mod ffmpeg;
mod ytdlp;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

pub use classify::{classify_exit, classify_spawn_error, classify_stderr, STDERR_PATTERNS};
pub use ffmpeg::Ffmpeg;
pub use ytdlp::YtDlp;

/// Why the external downloader did not produce a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubprocessFailure {
    /// The program exists but cannot be run.
    NotExecutable,
    /// The source refused access (private or login-only media).
    PermissionDenied,
    /// The media is gone or blocked.
    Unavailable,
    /// The process could not be started at all.
    FailedToStart(String),
    /// Exit code 1.
    GenericFailure,
    /// Any other exit code, or none (killed by a signal).
    UnknownExit(Option<i32>),
}

impl fmt::Display for SubprocessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubprocessFailure::NotExecutable => f.write_str("downloader program is not executable"),
            SubprocessFailure::PermissionDenied => f.write_str("permission denied by the source (private media?)"),
            SubprocessFailure::Unavailable => f.write_str("media is unavailable"),
            SubprocessFailure::FailedToStart(reason) => write!(f, "failed to start download process: {}", reason),
            SubprocessFailure::GenericFailure => f.write_str("download failed"),
            SubprocessFailure::UnknownExit(Some(code)) => write!(f, "unknown error, exit code {}", code),
            SubprocessFailure::UnknownExit(None) => f.write_str("unknown error, process terminated by signal"),
        }
    }
}

/// Requested output of a video download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    /// Best audio stream; converted afterwards.
    Audio,
    Video,
}

impl MediaFormat {
    pub fn selector(self) -> &'static str {
        match self {
            MediaFormat::Audio => "bestaudio",
            MediaFormat::Video => "mp4",
        }
    }
}

/// Output template used when the job has no file name: the media title plus
/// whatever extension the downloader picks.
pub const TITLE_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub link: String,
    pub dir: PathBuf,
    /// `None` lets the downloader name the file after the media title.
    pub file_name: Option<String>,
    pub format: MediaFormat,
}

impl VideoRequest {
    pub fn output_template(&self) -> &str {
        self.file_name.as_deref().unwrap_or(TITLE_TEMPLATE)
    }

    /// `--quiet --progress -P <dir> <link> -o <template> -f <format> --print after_move:filepath`
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "--quiet".into(),
            "--progress".into(),
            "-P".into(),
            self.dir.clone().into_os_string(),
            self.link.clone().into(),
            "-o".into(),
            self.output_template().into(),
            "-f".into(),
            self.format.selector().into(),
            "--print".into(),
            "after_move:filepath".into(),
        ]
    }

    /// Where the file lands when it was named up front; for the title
    /// template this is the unexpanded template.
    pub fn output_path(&self) -> PathBuf {
        self.dir.join(self.output_template())
    }
}

pub trait VideoDownloader: Send + Sync {
    /// Blocks until the download process exits. Returns the path of the file written.
    fn download(&self, request: &VideoRequest) -> Result<PathBuf, SubprocessFailure>;
}

pub trait AudioConverter: Send + Sync {
    /// Converts `path` to audio. Returns a human-readable message; a message
    /// containing `Failed` means the conversion did not happen.
    fn convert(&self, path: &Path) -> String;

    /// The file `convert` writes for `input`.
    fn output_path(&self, input: &Path) -> PathBuf;
}

/// True if a converter message reports failure.
pub fn conversion_failed(message: &str) -> bool {
    message.contains("Failed")
}
