//! Worker pool: pull a job id, run the tool for it, record the outcome.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ExecError;
use crate::job::{Job, JobSnapshot, JobStatus, ProcessHandle};
use crate::parser;
use crate::process::{ExitOutcome, OutputLine};

use super::queue::SharedReceiver;
use super::Inner;

pub(super) fn spawn_workers(
    inner: &Arc<Inner>,
    rx: SharedReceiver,
    count: usize,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker| tokio::spawn(worker_loop(Arc::clone(inner), Arc::clone(&rx), worker)))
        .collect()
}

async fn worker_loop(inner: Arc<Inner>, rx: SharedReceiver, worker: usize) {
    tracing::debug!(worker, "worker started");
    loop {
        let next = rx.lock().await.recv().await;
        let Some(id) = next else {
            break;
        };
        if inner.is_shutting_down() {
            tracing::debug!(worker, job_id = %id, "shutting down; not starting job");
            continue;
        }
        let Some(job) = inner.job(&id) else {
            tracing::debug!(worker, job_id = %id, "job removed before start");
            continue;
        };
        inner.execute(&job, worker).await;
    }
    tracing::debug!(worker, "worker stopped");
}

impl Inner {
    /// Runs one job end to end. Skips it if it is no longer `Queued`
    /// (cancelled while waiting, or a stale duplicate id).
    async fn execute(&self, job: &Arc<Job>, worker: usize) {
        // A stale duplicate id must not park this worker on the slot of a job
        // another worker is already running.
        let status = job.status();
        if !self.can_start(status) {
            tracing::debug!(worker, job_id = job.id(), %status, "skipping job");
            return;
        }
        // A resumed job waits here until its previous process is gone.
        let _slot = job.exec_slot().lock().await;
        let cancel = CancellationToken::new();
        let started = {
            let mut st = job.state();
            // Re-checked under the job lock so shutdown either sees our handle or we see its flag.
            if !self.can_start(st.status) {
                tracing::debug!(worker, job_id = job.id(), status = %st.status, "skipping job");
                return;
            }
            st.status = JobStatus::Running;
            st.process = Some(ProcessHandle {
                cancel: cancel.clone(),
                pid: None,
            });
            st.touch();
            job.snapshot_locked(&st)
        };
        tracing::info!(worker, job_id = job.id(), target = job.target(), "job started");
        self.broadcast(&started);

        let result = self
            .runner
            .run(
                job.target(),
                job.args(),
                &cancel,
                |pid| {
                    if let Some(handle) = job.state().process.as_mut() {
                        handle.pid = pid;
                    }
                },
                |line| self.on_output(job, line),
            )
            .await;

        let finished = finish(job, result);
        self.broadcast(&finished);
    }

    fn can_start(&self, status: JobStatus) -> bool {
        status == JobStatus::Queued && !self.is_shutting_down()
    }

    fn on_output(&self, job: &Job, line: OutputLine) {
        let changed = {
            let mut st = job.state();
            st.append_log(line.text.as_str());
            parser::parse_line(&line.text, job.target(), &mut st.progress)
                .then(|| job.snapshot_locked(&st))
        };
        if let Some(snap) = changed {
            self.broadcast(&snap);
        }
    }
}

/// Records the run outcome. Status only changes if the job is still
/// `Running`; a cancel or pause that landed during the run wins.
fn finish(job: &Job, result: Result<ExitOutcome, ExecError>) -> JobSnapshot {
    let mut st = job.state();
    st.process = None;
    let running = st.status == JobStatus::Running;
    match result {
        Ok(ExitOutcome::Success) if running => {
            st.status = JobStatus::Completed;
            st.progress.mark_complete();
            tracing::info!(job_id = job.id(), "job completed");
        }
        Ok(ExitOutcome::Cancelled) if running => {
            st.status = JobStatus::Cancelled;
            tracing::info!(job_id = job.id(), "job cancelled");
        }
        Err(e) if running => {
            tracing::warn!(job_id = job.id(), "job failed: {}", e);
            st.fail(&e.to_string());
        }
        Ok(outcome) => {
            tracing::debug!(job_id = job.id(), ?outcome, status = %st.status, "run ended after status change");
        }
        Err(e) => {
            tracing::debug!(job_id = job.id(), status = %st.status, "run ended after status change: {}", e);
        }
    }
    st.touch();
    job.snapshot_locked(&st)
}
