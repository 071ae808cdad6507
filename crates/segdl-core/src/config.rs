use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::merge::MergePolicy;

/// Programs used for streaming-video links and audio-only output (optional section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTools {
    /// Command-line video downloader (yt-dlp compatible arguments).
    pub video_downloader: String,
    /// Audio converter used after an audio-only download.
    pub audio_converter: String,
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            video_downloader: "yt-dlp".to_string(),
            audio_converter: "ffmpeg".to_string(),
        }
    }
}

/// Configuration loaded from `~/.config/segdl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegdlConfig {
    /// Number of range workers for a split download.
    pub worker_count: usize,
    /// Resources must be strictly larger than this (in bytes) to be split.
    pub split_threshold_bytes: u64,
    /// Upper bound between merge polls, in milliseconds.
    pub merge_poll_interval_ms: u64,
    /// Progress monitor sampling interval, in milliseconds.
    pub progress_interval_ms: u64,
    /// How long to wait for the monitor's final render after the transfer ends.
    pub grace_delay_ms: u64,
    /// What the merge loop does when a worker dies short of its range.
    #[serde(default)]
    pub merge_policy: MergePolicy,
    /// Directory for segment temp files (None = OS temp dir).
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    /// Abort a transfer whose rate stays under this many bytes/sec for `low_speed_time_secs`.
    pub low_speed_limit_bytes: u32,
    pub low_speed_time_secs: u64,
    #[serde(default)]
    pub external: ExternalTools,
}

impl Default for SegdlConfig {
    fn default() -> Self {
        Self {
            worker_count: 3,
            split_threshold_bytes: 50 * 1024 * 1024,
            merge_poll_interval_ms: 500,
            progress_interval_ms: 500,
            grace_delay_ms: 1800,
            merge_policy: MergePolicy::default(),
            temp_dir: None,
            connect_timeout_secs: 30,
            low_speed_limit_bytes: 1024,
            low_speed_time_secs: 60,
            external: ExternalTools::default(),
        }
    }
}

impl SegdlConfig {
    pub fn merge_poll_interval(&self) -> Duration {
        Duration::from_millis(self.merge_poll_interval_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    /// Directory where segment temp files are created.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("segdl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SegdlConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SegdlConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: SegdlConfig = toml::from_str(&data)?;
    Ok(cfg)
}
