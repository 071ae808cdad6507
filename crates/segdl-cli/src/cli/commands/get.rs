//! `segdl get` – download one link.

use anyhow::{Context, Result};
use segdl_core::merge::MergePolicy;
use segdl_core::{CancelToken, Downloader, Job, SegdlConfig};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::console::ConsoleSink;

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub url: String,
    pub dir: Option<PathBuf>,
    pub output: Option<String>,
    pub source: Option<String>,
    pub workers: Option<usize>,
    pub threshold: Option<u64>,
    pub merge_policy: Option<MergePolicy>,
}

impl GetOptions {
    /// Command-line flags take precedence over the config file.
    pub fn apply_to(&self, cfg: &mut SegdlConfig) {
        if let Some(n) = self.workers {
            cfg.worker_count = n;
        }
        if let Some(t) = self.threshold {
            cfg.split_threshold_bytes = t;
        }
        if let Some(p) = self.merge_policy {
            cfg.merge_policy = p;
        }
    }

    pub fn job(&self, default_dir: PathBuf) -> Job {
        let mut job = Job::new(self.url.clone(), self.dir.clone().unwrap_or(default_dir));
        if let Some(name) = &self.output {
            job = job.with_file_name(name.clone());
        }
        if let Some(source) = &self.source {
            job = job.with_source_link(source.clone());
        }
        job
    }
}

pub async fn run_get(mut cfg: SegdlConfig, opts: GetOptions) -> Result<()> {
    opts.apply_to(&mut cfg);
    let job = opts.job(std::env::current_dir()?);
    tracing::debug!(?job, workers = cfg.worker_count, policy = %cfg.merge_policy, "get");

    let downloader = Downloader::new(cfg, Arc::new(ConsoleSink::new()));
    let cancel = CancelToken::new();

    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; cancelling download");
            on_interrupt.cancel();
        }
    });

    let result = tokio::task::spawn_blocking(move || downloader.run_with_cancel(&job, &cancel))
        .await
        .context("download task failed")?;
    interrupt.abort();

    let report = result?;
    println!(
        "{} ({} bytes, {}, {:.1}s)",
        report.path.display(),
        report.bytes,
        report.mode,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}
