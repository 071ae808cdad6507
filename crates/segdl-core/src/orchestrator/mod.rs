//! Download orchestrator: classifies the link, probes the resource, decides
//! split vs single stream, runs the chosen path with the progress monitor
//! alongside, and reports the outcome to the event sink.

mod destination;
mod single;
mod split;
mod video;

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::SegdlConfig;
use crate::error::{DownloadError, Result};
use crate::events::EventSink;
use crate::external::{AudioConverter, Ffmpeg, VideoDownloader, YtDlp};
use crate::fetch_head::{self, ResourceInfo};
use crate::filename::resolve_file_name;
use crate::http::HttpOptions;
use crate::job::{Job, JobStatus};
use crate::link::{HostClassifier, LinkClassifier};
use crate::metrics::TransferMetrics;
use crate::monitor::{ProgressMonitor, ProgressSource};
use crate::segmenter::{plan_segments, Segment};
use crate::worker::CancelToken;

/// How the final file was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    Split { segments: usize },
    Single,
    /// Written by the external video downloader.
    External,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Split { segments } => write!(f, "split into {} segments", segments),
            TransferMode::Single => f.write_str("single stream"),
            TransferMode::External => f.write_str("external downloader"),
        }
    }
}

/// Returned by a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub mode: TransferMode,
    pub elapsed: Duration,
}

impl DownloadReport {
    pub fn split_used(&self) -> bool {
        matches!(self.mode, TransferMode::Split { .. })
    }
}

/// What a HEAD probe says about a link, and what a download would do with it.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub url: String,
    pub file_name: String,
    pub info: ResourceInfo,
    pub metrics: TransferMetrics,
    /// Planned segments; empty when the download would not be split.
    pub segments: Vec<Segment>,
}

pub struct Downloader {
    cfg: SegdlConfig,
    http: HttpOptions,
    sink: Arc<dyn EventSink>,
    classifier: Arc<dyn LinkClassifier>,
    video: Arc<dyn VideoDownloader>,
    converter: Arc<dyn AudioConverter>,
}

impl Downloader {
    /// Uses host-based link classification and the external programs named in `cfg`.
    pub fn new(cfg: SegdlConfig, sink: Arc<dyn EventSink>) -> Self {
        let video = Arc::new(YtDlp::new(cfg.external.video_downloader.clone()));
        let converter = Arc::new(Ffmpeg::new(cfg.external.audio_converter.clone()));
        Self {
            http: HttpOptions::from_config(&cfg),
            cfg,
            sink,
            classifier: Arc::new(HostClassifier),
            video,
            converter,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn LinkClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_video_downloader(mut self, video: Arc<dyn VideoDownloader>) -> Self {
        self.video = video;
        self
    }

    pub fn with_audio_converter(mut self, converter: Arc<dyn AudioConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn config(&self) -> &SegdlConfig {
        &self.cfg
    }

    pub fn run(&self, job: &Job) -> Result<DownloadReport> {
        self.run_with_cancel(job, &CancelToken::new())
    }

    /// Runs `job` to completion. Any failure is reported to the event sink
    /// and returned; nothing is retried.
    pub fn run_with_cancel(&self, job: &Job, cancel: &CancelToken) -> Result<DownloadReport> {
        let started = Instant::now();
        let result = self.execute(job, cancel, started);
        match &result {
            Ok(report) => {
                tracing::info!(
                    path = %report.path.display(),
                    bytes = report.bytes,
                    mode = %report.mode,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "download complete"
                );
                self.sink.info(&format!("Successfully downloaded {}", report.path.display()));
            }
            Err(e) => {
                tracing::error!(link = %job.link, category = e.category(), error = %e, "download failed");
                self.sink.error(&e.to_string());
            }
        }
        result
    }

    /// HEAD the link and report the split decision without downloading.
    pub fn probe(&self, link: &str) -> Result<ProbeReport> {
        let url = parse_link(link)?;
        let info = fetch_head::probe(url.as_str(), &self.http)?;
        let metrics = self.decide(&info);
        let segments = match metrics.total_size {
            Some(total) if metrics.split_enabled => plan_segments(total, metrics.worker_count),
            _ => Vec::new(),
        };
        Ok(ProbeReport {
            file_name: resolve_file_name("", url.as_str(), info.content_disposition.as_deref()),
            url: url.into(),
            info,
            metrics,
            segments,
        })
    }

    fn decide(&self, info: &ResourceInfo) -> TransferMetrics {
        let mut metrics = TransferMetrics::new(self.cfg.worker_count, self.cfg.split_threshold_bytes);
        metrics.decide(info.content_length, info.accept_ranges);
        metrics
    }

    fn execute(&self, job: &Job, cancel: &CancelToken, started: Instant) -> Result<DownloadReport> {
        let kind = self.classifier.classify(&job.link);
        if kind.is_streaming_video() {
            tracing::info!(link = %job.link, ?kind, "streaming-video link; using external downloader");
            let (path, bytes) = video::run(self, job, cancel)?;
            return Ok(DownloadReport {
                path,
                bytes,
                mode: TransferMode::External,
                elapsed: started.elapsed(),
            });
        }

        let url = parse_link(&job.link)?;
        destination::check_dir(job.dir())?;
        let info = fetch_head::probe(url.as_str(), &self.http)?;
        let metrics = self.decide(&info);
        let file_name = resolve_file_name(&job.file_name, url.as_str(), info.content_disposition.as_deref());
        let output = job.dir().join(&file_name);

        tracing::info!(
            url = %url,
            size = metrics.total_size_or_unknown(),
            range_capable = metrics.range_capable,
            split = metrics.split_enabled,
            workers = metrics.worker_count,
            "transfer decided"
        );
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        self.sink.info(&format!("Downloading \"{}\" ...", file_name));

        let (bytes, mode) = match metrics.total_size {
            Some(total) if metrics.split_enabled => {
                let bytes = split::run(self, url.as_str(), &output, &file_name, total, metrics.worker_count, cancel)?;
                (bytes, TransferMode::Split { segments: metrics.worker_count })
            }
            _ => {
                let bytes = single::run(self, url.as_str(), &output, &file_name, metrics.total_size, cancel)?;
                (bytes, TransferMode::Single)
            }
        };

        Ok(DownloadReport {
            path: output,
            bytes,
            mode,
            elapsed: started.elapsed(),
        })
    }

    /// Runs `transfer` with the progress monitor alongside. The job is marked
    /// inactive when `transfer` returns, and the monitor gets up to the grace
    /// delay for its final render.
    fn with_monitor<T>(&self, source: ProgressSource, transfer: impl FnOnce() -> Result<T>) -> Result<T> {
        let status = JobStatus::new();
        let monitor = ProgressMonitor::start(source, status.clone(), self.cfg.progress_interval(), Arc::clone(&self.sink));
        if let Err(e) = &monitor {
            tracing::warn!(error = %e, "could not start progress monitor");
        }

        let result = transfer();
        status.set_inactive();

        if let Ok(monitor) = monitor {
            if !monitor.finish(self.cfg.grace_delay()) {
                tracing::debug!("progress monitor did not finish within the grace delay");
            }
        }
        result
    }
}

/// Only absolute http(s) links with a host are accepted.
pub fn parse_link(link: &str) -> Result<Url> {
    let invalid = || DownloadError::Link { link: link.to_string() };
    let url = Url::parse(link.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelSink, Event};
    use crate::external::{conversion_failed, AudioConverter, SubprocessFailure, VideoRequest};
    use crate::link::LinkKind;
    use std::path::Path;
    use std::sync::Mutex;

    #[test]
    fn link_parsing() {
        assert!(parse_link("https://example.com/file.iso").is_ok());
        assert!(parse_link("  http://127.0.0.1:8080/x  ").is_ok());
        for bad in ["", "not a url", "ftp://example.com/x", "file:///etc/passwd", "https://"] {
            assert_eq!(parse_link(bad).unwrap_err().category(), "link", "{bad}");
        }
    }

    #[test]
    fn probe_report_json_shape() {
        let mut metrics = TransferMetrics::new(4, 100);
        metrics.decide(Some(1000), true);
        let report = ProbeReport {
            url: "https://example.com/f.bin".to_string(),
            file_name: "f.bin".to_string(),
            info: ResourceInfo {
                content_length: Some(1000),
                accept_ranges: true,
                content_disposition: None,
            },
            metrics,
            segments: plan_segments(1000, 4),
        };
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["metrics"]["split_enabled"], true);
        assert_eq!(v["info"]["content_length"], 1000);
        assert_eq!(v["segments"][3]["start"], 751);
        assert_eq!(v["segments"][3]["end"], 1000);
    }

    #[test]
    fn malformed_link_is_reported_to_sink() {
        let (sink, rx) = ChannelSink::new();
        let dl = Downloader::new(SegdlConfig::default(), Arc::new(sink));
        let dir = tempfile::tempdir().unwrap();
        let err = dl.run(&Job::new("htp:/broken", dir.path())).unwrap_err();
        assert_eq!(err.category(), "link");
        let events: Vec<Event> = rx.try_iter().collect();
        assert!(events.iter().any(|e| matches!(e, Event::Error(m) if m.contains("htp:/broken"))));
    }

    #[test]
    fn missing_destination_fails_before_any_request() {
        let (sink, _rx) = ChannelSink::new();
        let dl = Downloader::new(SegdlConfig::default(), Arc::new(sink));
        let dir = tempfile::tempdir().unwrap();
        // Port 9 is never contacted: the directory check comes first.
        let job = Job::new("http://127.0.0.1:9/file.bin", dir.path().join("missing"));
        assert_eq!(dl.run(&job).unwrap_err().category(), "file-not-found");
    }

    struct FixedKind(LinkKind, LinkKind);

    impl LinkClassifier for FixedKind {
        fn classify(&self, link: &str) -> LinkKind {
            if link.contains("spotify") {
                self.1
            } else {
                self.0
            }
        }
    }

    #[derive(Default)]
    struct FakeVideo {
        requests: Mutex<Vec<VideoRequest>>,
        result: Option<SubprocessFailure>,
    }

    impl VideoDownloader for FakeVideo {
        fn download(&self, request: &VideoRequest) -> std::result::Result<PathBuf, SubprocessFailure> {
            self.requests.lock().unwrap().push(request.clone());
            // Unnamed requests get the title the real downloader would pick.
            let path = match &request.file_name {
                Some(name) => request.dir.join(name),
                None => request.dir.join("Some Title.webm"),
            };
            std::fs::write(&path, b"media").unwrap();
            match &self.result {
                Some(f) => Err(f.clone()),
                None => Ok(path),
            }
        }
    }

    /// Writes `<input>.ogg` with a fixed message.
    struct FakeConverter(&'static str);

    impl AudioConverter for FakeConverter {
        fn convert(&self, path: &Path) -> String {
            if !conversion_failed(self.0) {
                std::fs::write(self.output_path(path), b"vorbis audio").unwrap();
            }
            self.0.to_string()
        }

        fn output_path(&self, input: &Path) -> PathBuf {
            input.with_extension("ogg")
        }
    }

    fn video_downloader(video: Arc<FakeVideo>, converter: &'static str) -> (Downloader, std::sync::mpsc::Receiver<Event>) {
        let (sink, rx) = ChannelSink::new();
        let dl = Downloader::new(SegdlConfig::default(), Arc::new(sink))
            .with_classifier(Arc::new(FixedKind(LinkKind::Youtube, LinkKind::Spotify)))
            .with_video_downloader(video)
            .with_audio_converter(Arc::new(FakeConverter(converter)));
        (dl, rx)
    }

    #[test]
    fn video_link_uses_external_downloader() {
        let video = Arc::new(FakeVideo::default());
        let (dl, _rx) = video_downloader(Arc::clone(&video), "unused");
        let dir = tempfile::tempdir().unwrap();
        let job = Job::new("https://youtu.be/abc", dir.path()).with_file_name("clip.mp4");
        let report = dl.run(&job).unwrap();
        assert_eq!(report.mode, TransferMode::External);
        assert_eq!(report.bytes, 5);
        let reqs = video.requests.lock().unwrap();
        assert_eq!(reqs[0].format.selector(), "mp4");
    }

    #[test]
    fn unnamed_video_is_named_by_the_downloader() {
        let video = Arc::new(FakeVideo::default());
        let (dl, _rx) = video_downloader(Arc::clone(&video), "unused");
        let dir = tempfile::tempdir().unwrap();
        let report = dl.run(&Job::new("https://www.youtube.com/watch?v=abc", dir.path())).unwrap();
        assert_eq!(report.path, dir.path().join("Some Title.webm"));
        assert_eq!(report.bytes, 5);
        let reqs = video.requests.lock().unwrap();
        assert_eq!(reqs[0].file_name, None);
        assert_eq!(reqs[0].output_template(), "%(title)s.%(ext)s");
    }

    #[test]
    fn audio_source_requests_best_audio_and_converts() {
        let video = Arc::new(FakeVideo::default());
        let (dl, rx) = video_downloader(Arc::clone(&video), "Converted clip.webm to clip.ogg");
        let dir = tempfile::tempdir().unwrap();
        let job = Job::new("https://youtu.be/abc", dir.path())
            .with_file_name("clip.webm")
            .with_source_link("https://open.spotify.com/track/1");
        let report = dl.run(&job).unwrap();
        // The converter decides where its output goes.
        assert_eq!(report.path, dir.path().join("clip.ogg"));
        assert_eq!(report.bytes, 12);
        assert_eq!(video.requests.lock().unwrap()[0].format.selector(), "bestaudio");
        let infos: Vec<String> = rx
            .try_iter()
            .filter_map(|e| match e {
                Event::Info(m) => Some(m),
                _ => None,
            })
            .collect();
        assert!(infos.iter().any(|m| m == "Converting to mp3 ..."));
    }

    #[test]
    fn failed_conversion_is_conversion_error() {
        let video = Arc::new(FakeVideo::default());
        let (dl, _rx) = video_downloader(video, "Failed to convert clip.webm: codec");
        let dir = tempfile::tempdir().unwrap();
        let job = Job::new("https://youtu.be/abc", dir.path())
            .with_file_name("clip.webm")
            .with_source_link("https://open.spotify.com/track/1");
        assert_eq!(dl.run(&job).unwrap_err().category(), "conversion");
    }

    #[test]
    fn subprocess_failure_is_reported() {
        let video = Arc::new(FakeVideo {
            result: Some(SubprocessFailure::Unavailable),
            ..Default::default()
        });
        let (dl, rx) = video_downloader(video, "unused");
        let dir = tempfile::tempdir().unwrap();
        let err = dl.run(&Job::new("https://youtu.be/gone", dir.path())).unwrap_err();
        assert_eq!(err.category(), "subprocess");
        assert!(rx.try_iter().any(|e| matches!(e, Event::Error(m) if m.contains("unavailable"))));
    }
}
