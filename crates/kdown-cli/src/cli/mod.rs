//! CLI for the kdown download queue.

mod commands;
mod progress;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kdown_core::config;
use std::path::PathBuf;

use commands::{run_get, run_probe, GetArgs};

/// Top-level CLI for kdown.
#[derive(Debug, Parser)]
#[command(name = "kdown")]
#[command(about = "kdown: prioritised, resumable download queue", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more URLs through the queue. Ctrl-C pauses; run the
    /// same command again to resume.
    Get {
        /// Direct HTTP/HTTPS URLs.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Destination directory (default: current directory).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Destination filename; only valid with a single URL.
        #[arg(long)]
        name: Option<String>,

        /// Queue priority; higher runs first.
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        priority: i32,

        /// Replace existing files instead of failing.
        #[arg(long)]
        overwrite: bool,

        /// Track all URLs as one group with this label.
        #[arg(long, value_name = "LABEL")]
        group: Option<String>,

        /// Concurrent transfers (overrides config; clamped to 1-20).
        #[arg(long, value_name = "N")]
        connections: Option<usize>,
    },

    /// Show length, range support and ETag of a URL without downloading.
    Probe {
        /// Direct HTTP/HTTPS URL.
        url: String,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                urls,
                dir,
                name,
                priority,
                overwrite,
                group,
                connections,
            } => {
                if let Some(n) = connections {
                    cfg.max_connections = n;
                }
                let dir = match dir {
                    Some(d) => d,
                    None => std::env::current_dir()?,
                };
                let args = GetArgs {
                    urls,
                    dir,
                    name,
                    priority,
                    overwrite,
                    group,
                };
                run_get(cfg, args).await?;
            }
            CliCommand::Probe { url } => run_probe(&cfg, &url).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
