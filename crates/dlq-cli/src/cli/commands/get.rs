//! `dlq get` – queue targets, stream their progress, wait for the outcome.

use anyhow::{bail, Result};
use dlq_core::broadcast::ChannelBroadcaster;
use dlq_core::config::DlqConfig;
use dlq_core::job::{Job, JobId, JobSnapshot, JobStatus};
use dlq_core::scheduler::Scheduler;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::job_args;

pub async fn run_get(
    cfg: &DlqConfig,
    targets: &[String],
    args: Option<&str>,
    jobs: Option<usize>,
    json: bool,
) -> Result<()> {
    let mut cfg = cfg.clone();
    if let Some(n) = jobs {
        cfg.max_concurrent = n.max(1);
    }
    let job_args = job_args(args);

    let hub = ChannelBroadcaster::default();
    let mut updates = hub.subscribe();
    let sched = Scheduler::start(&cfg, Arc::new(hub));
    let ids: Vec<JobId> = targets
        .iter()
        .map(|t| sched.submit(Job::new(t.as_str(), job_args.clone())).id)
        .collect();

    let mut printer = Printer::new(json);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    while !all_finished(&sched, &ids) {
        tokio::select! {
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    tracing::warn!("cannot listen for Ctrl-C: {}", e);
                }
                eprintln!("interrupted; stopping downloads");
                interrupted = true;
                break;
            }
            update = updates.recv() => match update {
                Ok(snap) => printer.show(&snap)?,
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "progress updates lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    sched.shutdown();
    sched.join().await;

    let finals: Vec<JobSnapshot> = ids.iter().filter_map(|id| sched.get(id)).collect();
    for snap in &finals {
        printer.show(snap)?;
    }
    let failed = finals
        .iter()
        .filter(|s| s.status == JobStatus::Failed)
        .count();
    if interrupted {
        bail!("interrupted before all jobs finished");
    }
    if failed > 0 {
        bail!("{} of {} job(s) failed", failed, finals.len());
    }
    tracing::info!("get finished {} job(s)", finals.len());
    Ok(())
}

fn all_finished(sched: &Scheduler, ids: &[JobId]) -> bool {
    ids.iter()
        .all(|id| sched.get(id).map_or(true, |s| s.status.is_terminal()))
}

/// Prints a job only when its status or progress text moved.
struct Printer {
    json: bool,
    last: HashMap<JobId, (JobStatus, String)>,
}

impl Printer {
    fn new(json: bool) -> Self {
        Self {
            json,
            last: HashMap::new(),
        }
    }

    fn show(&mut self, snap: &JobSnapshot) -> Result<()> {
        let key = (snap.status, snap.progress.progress_text.clone());
        if self.last.get(&snap.id) == Some(&key) {
            return Ok(());
        }
        self.last.insert(snap.id.clone(), key);
        if self.json {
            println!("{}", serde_json::to_string(snap)?);
        } else {
            println!("{}", human_line(snap));
        }
        Ok(())
    }
}

fn human_line(snap: &JobSnapshot) -> String {
    let p = &snap.progress;
    let mut line = format!(
        "{:<12} {:<9} {:>6} {:>12} {:>8}  {}",
        snap.id,
        snap.status,
        dash_if_empty(&p.progress_text),
        dash_if_empty(&p.speed),
        dash_if_empty(&p.eta),
        p.title
    );
    if let Some(err) = &snap.error {
        line.push_str(&format!("  ({err})"));
    }
    line
}

fn dash_if_empty(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}
