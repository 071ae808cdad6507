//! Streaming-video links: hand off to the external downloader, then convert
//! to audio when the user asked for an audio-only source.

use std::fs;
use std::path::PathBuf;

use super::Downloader;
use crate::error::{DownloadError, Result};
use crate::external::{conversion_failed, MediaFormat, VideoRequest};
use crate::job::Job;
use crate::link::LinkKind;
use crate::worker::CancelToken;

/// Returns the path of the final file and its size (0 if it cannot be read).
pub(super) fn run(dl: &Downloader, job: &Job, cancel: &CancelToken) -> Result<(PathBuf, u64)> {
    let format = if dl.classifier.classify(job.source_link()) == LinkKind::Spotify {
        MediaFormat::Audio
    } else {
        MediaFormat::Video
    };
    let request = VideoRequest {
        link: job.link.clone(),
        dir: job.dir().to_path_buf(),
        file_name: Some(job.file_name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        format,
    };

    // The subprocess cannot be interrupted once started.
    if cancel.is_cancelled() {
        return Err(DownloadError::Cancelled);
    }
    dl.sink.info(&format!("Downloading \"{}\" ...", request.file_name.as_deref().unwrap_or(&request.link)));
    let downloaded = dl.video.download(&request).map_err(DownloadError::Subprocess)?;
    dl.sink.info(&format!("Successfully downloaded \"{}\"", downloaded.display()));

    let final_path = if format == MediaFormat::Audio {
        dl.sink.info("Converting to mp3 ...");
        let message = dl.converter.convert(&downloaded);
        if conversion_failed(&message) {
            return Err(DownloadError::Conversion(message));
        }
        dl.sink.info(&message);
        dl.converter.output_path(&downloaded)
    } else {
        downloaded
    };

    let bytes = fs::metadata(&final_path).map(|m| m.len()).unwrap_or(0);
    Ok((final_path, bytes))
}
