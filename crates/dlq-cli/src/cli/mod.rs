//! CLI for the DLQ download queue.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dlq_core::config;

use commands::{run_formats, run_get};

/// Top-level CLI for the DLQ download queue.
#[derive(Debug, Parser)]
#[command(name = "dlq")]
#[command(about = "DLQ: queue and run yt-dlp downloads", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more targets and wait until every job finishes.
    Get {
        /// URLs (or anything else the tool accepts as a target).
        #[arg(required = true, value_name = "TARGET")]
        targets: Vec<String>,

        /// Extra tool flags for every job, shell-quoted in one string (e.g. "-f 'bv*+ba'").
        #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
        args: Option<String>,

        /// Run up to N jobs at once (overrides max_concurrent from the config).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// Print each update as a JSON line instead of a table row.
        #[arg(long)]
        json: bool,
    },

    /// List the formats available for a target without downloading.
    Formats {
        target: String,

        /// Extra tool flags, shell-quoted in one string.
        #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
        args: Option<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                targets,
                args,
                jobs,
                json,
            } => run_get(&cfg, &targets, args.as_deref(), jobs, json).await?,
            CliCommand::Formats { target, args } => {
                run_formats(&cfg, &target, args.as_deref()).await?
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
