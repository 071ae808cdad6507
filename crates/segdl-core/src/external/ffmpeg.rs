//! ffmpeg audio conversion.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::AudioConverter;

pub struct Ffmpeg {
    program: String,
}

impl Ffmpeg {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl AudioConverter for Ffmpeg {
    fn convert(&self, path: &Path) -> String {
        let out = self.output_path(path);
        if out == path {
            return format!("{} is already mp3", path.display());
        }
        let result = Command::new(&self.program)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(path)
            .args(["-vn", "-codec:a", "libmp3lame", "-q:a", "2"])
            .arg(&out)
            .stdin(Stdio::null())
            .output();

        match result {
            Ok(output) if output.status.success() => {
                format!("Converted {} to {}", path.display(), out.display())
            }
            Ok(output) => format!(
                "Failed to convert {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => format!("Failed to run {}: {}", self.program, e),
        }
    }

    /// `clip.webm` → `clip.mp3`, next to the input.
    fn output_path(&self, input: &Path) -> PathBuf {
        input.with_extension("mp3")
    }
}
