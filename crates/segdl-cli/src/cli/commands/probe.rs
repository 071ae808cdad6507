//! `segdl probe` – HEAD a link and show what a download would do.

use anyhow::{Context, Result};
use segdl_core::{Downloader, ProbeReport, SegdlConfig, TracingSink};
use std::sync::Arc;

pub async fn run_probe(cfg: SegdlConfig, url: String, json: bool) -> Result<()> {
    let downloader = Downloader::new(cfg, Arc::new(TracingSink));
    let report = tokio::task::spawn_blocking(move || downloader.probe(&url))
        .await
        .context("probe task failed")??;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", describe(&report));
    }
    Ok(())
}

pub(crate) fn describe(report: &ProbeReport) -> String {
    let size = report
        .info
        .content_length
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let mut out = format!(
        "url:        {}\nfile name:  {}\nsize:       {}\nranges:     {}\n",
        report.url,
        report.file_name,
        size,
        if report.info.accept_ranges { "yes" } else { "no" }
    );
    if report.metrics.split_enabled {
        out.push_str(&format!("plan:       split into {} segments\n", report.segments.len()));
    } else {
        out.push_str("plan:       single stream\n");
    }
    out
}
