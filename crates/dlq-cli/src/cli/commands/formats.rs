//! `dlq formats` – list the formats a target offers.

use anyhow::{bail, Result};
use dlq_core::config::DlqConfig;
use dlq_core::process::ToolRunner;

use super::job_args;

pub async fn run_formats(cfg: &DlqConfig, target: &str, args: Option<&str>) -> Result<()> {
    let extra = job_args(args);
    let listing = ToolRunner::new(cfg).list_formats(target, &extra).await;
    print!("{}", listing.output);
    if let Some(err) = listing.error {
        bail!("format listing failed: {}", err);
    }
    Ok(())
}
