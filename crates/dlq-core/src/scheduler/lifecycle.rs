//! Lifecycle operations: cancel, pause, resume, retry, delete, clear, shutdown.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::artifacts;
use crate::error::SchedulerError;
use crate::job::{Job, JobSnapshot, JobState, JobStatus};

use super::Scheduler;

impl Scheduler {
    /// Stops a running job or withdraws a queued/paused one.
    pub fn cancel(&self, id: &str) -> Result<JobSnapshot, SchedulerError> {
        self.transition(id, "cancel", |st| match st.status {
            JobStatus::Running | JobStatus::Queued | JobStatus::Paused => {
                let pid = st.process.as_ref().and_then(|h| h.pid);
                if st.cancel_process() {
                    tracing::debug!(?pid, "cancel signalled to tool");
                }
                st.status = JobStatus::Cancelled;
                true
            }
            _ => false,
        })
    }

    /// Stops a running job's process and parks it as `Paused`. Resuming reruns
    /// the tool with the same arguments; picking up partial downloads is up to the tool.
    pub fn pause(&self, id: &str) -> Result<JobSnapshot, SchedulerError> {
        self.transition(id, "pause", |st| {
            if st.status != JobStatus::Running {
                return false;
            }
            st.cancel_process();
            st.status = JobStatus::Paused;
            true
        })
    }

    /// Requeues a paused or failed job.
    pub fn resume(&self, id: &str) -> Result<JobSnapshot, SchedulerError> {
        let snap = self.transition(id, "resume", |st| {
            if !matches!(st.status, JobStatus::Paused | JobStatus::Failed) {
                return false;
            }
            st.error = None;
            st.status = JobStatus::Queued;
            true
        })?;
        self.requeue(snap)
    }

    /// Requeues a finished job from scratch: progress, error and log are cleared.
    pub fn retry(&self, id: &str) -> Result<JobSnapshot, SchedulerError> {
        let snap = self.transition(id, "retry", |st| {
            if !st.status.is_terminal() {
                return false;
            }
            st.progress.reset_transfer();
            st.logs.clear();
            st.error = None;
            st.status = JobStatus::Queued;
            true
        })?;
        self.requeue(snap)
    }

    /// Cancels the job if possible, forgets it and deletes its files from the download dir.
    pub async fn delete(&self, id: &str) -> Result<(), SchedulerError> {
        let _ = self.cancel(id);
        let job = self
            .inner
            .write_registry()
            .remove(id)
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))?;
        tracing::info!(job_id = id, "job deleted");
        self.remove_job_files(&job).await;
        Ok(())
    }

    /// Removes every completed, failed or cancelled job; returns how many.
    pub async fn clear_completed(&self) -> usize {
        let removed = self
            .inner
            .write_registry()
            .remove_where(|job| job.status().is_terminal());
        tracing::info!(count = removed.len(), "cleared finished jobs");
        for job in &removed {
            self.remove_job_files(job).await;
        }
        removed.len()
    }

    /// Stops accepting work, cancels every live process and closes the queue.
    /// Workers exit once the queue is drained. Safe to call more than once.
    pub fn shutdown(&self) {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.queue.close();
        let jobs = self.inner.read_registry().newest_first();
        let mut signalled = 0usize;
        for job in &jobs {
            if let Some(handle) = job.state().process.as_ref() {
                handle.cancel.cancel();
                signalled += 1;
            }
        }
        tracing::info!(signalled, "scheduler shutting down");
    }

    /// Applies `apply` under the job lock. `apply` returns false when the
    /// operation is not valid for the current status; nothing is changed then.
    fn transition<F>(&self, id: &str, op: &'static str, apply: F) -> Result<JobSnapshot, SchedulerError>
    where
        F: FnOnce(&mut JobState) -> bool,
    {
        let job = self.inner.job_or_not_found(id)?;
        let snap = {
            let mut st = job.state();
            let from = st.status;
            if !apply(&mut st) {
                return Err(SchedulerError::InvalidTransition { op, status: from });
            }
            st.touch();
            tracing::info!(job_id = id, op, from = %from, to = %st.status, "job transition");
            job.snapshot_locked(&st)
        };
        self.inner.broadcast(&snap);
        Ok(snap)
    }

    /// Returns the `Queued` snapshot on success; a rejected job is failed.
    fn requeue(&self, queued: JobSnapshot) -> Result<JobSnapshot, SchedulerError> {
        match self.inner.queue.try_enqueue(queued.id.clone()) {
            Ok(()) => Ok(queued),
            Err(e) => {
                if let Some(job) = self.inner.job(&queued.id) {
                    self.inner.fail_queued(&job, &e);
                }
                Err(e)
            }
        }
    }

    async fn remove_job_files(&self, job: &Arc<Job>) {
        let filename = job.state().progress.filename.clone();
        let removed = artifacts::remove_artifacts(self.inner.runner.download_dir(), &filename).await;
        if !removed.is_empty() {
            tracing::debug!(job_id = job.id(), count = removed.len(), "removed job files");
        }
    }
}
