//! Segmented single-resource HTTP downloader.
//!
//! [`Downloader`] probes a link, splits large range-capable resources across
//! concurrent range workers and merges their temp files in order; everything
//! else is streamed in one GET. Streaming-video links are handed to an external
//! downloader.

pub mod config;
pub mod error;
pub mod events;
pub mod external;
pub mod fetch_head;
pub mod filename;
pub mod http;
pub mod job;
pub mod link;
pub mod logging;
pub mod merge;
pub mod metrics;
pub mod monitor;
pub mod orchestrator;
pub mod segmenter;
pub mod worker;

pub use config::SegdlConfig;
pub use error::{DownloadError, Result};
pub use events::{EventSink, TracingSink};
pub use job::Job;
pub use orchestrator::{DownloadReport, Downloader, ProbeReport, TransferMode};
pub use worker::CancelToken;
