//! CLI for the segdl segmented downloader.

mod commands;
mod console;

use anyhow::Result;
use clap::{Parser, Subcommand};
use segdl_core::config;
use segdl_core::merge::MergePolicy;
use std::path::PathBuf;

use commands::{run_get, run_plan, run_probe, GetOptions};

/// Top-level CLI for segdl.
#[derive(Debug, Parser)]
#[command(name = "segdl")]
#[command(about = "segdl: segmented single-resource downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one link.
    Get {
        /// HTTP/HTTPS link (or a streaming-video link handled by the external downloader).
        url: String,

        /// Directory to save into (default: current directory).
        #[arg(long, short = 'd', value_name = "DIR")]
        dir: Option<PathBuf>,

        /// File name to save as (default: derived from the response or the URL).
        #[arg(long, short = 'o', value_name = "NAME")]
        output: Option<String>,

        /// Link originally supplied by the user, when `url` was resolved from it.
        #[arg(long, value_name = "LINK")]
        source: Option<String>,

        /// Number of range workers for a split download.
        #[arg(long, short = 'w', value_name = "N")]
        workers: Option<usize>,

        /// Split only resources larger than this many bytes.
        #[arg(long, value_name = "BYTES")]
        threshold: Option<u64>,

        /// What to do when a range worker dies short: fail_fast or poll_forever.
        #[arg(long, value_name = "POLICY")]
        merge_policy: Option<MergePolicy>,
    },

    /// Show size, range support and the split decision for a link.
    Probe {
        url: String,

        /// Print the probe result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the segment table for a resource size.
    Plan {
        /// Total size in bytes.
        size: u64,

        #[arg(long, short = 'w', value_name = "N")]
        workers: Option<usize>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                url,
                dir,
                output,
                source,
                workers,
                threshold,
                merge_policy,
            } => {
                let opts = GetOptions {
                    url,
                    dir,
                    output,
                    source,
                    workers,
                    threshold,
                    merge_policy,
                };
                run_get(cfg, opts).await?
            }
            CliCommand::Probe { url, json } => run_probe(cfg, url, json).await?,
            CliCommand::Plan { size, workers } => run_plan(size, workers.unwrap_or(cfg.worker_count)),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
