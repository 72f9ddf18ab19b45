//! Job entity: identity, parsed progress, bounded log and process handle.
//!
//! A `Job` is shared between the scheduler registry and the worker running it.
//! Immutable fields live on the struct; everything that changes during a run
//! sits behind a per-job mutex (`JobState`). Callers only ever see
//! [`JobSnapshot`] copies.

mod log;
mod snapshot;
mod status;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use log::{LogBuffer, MAX_LOG_LINES};
pub use snapshot::{JobSnapshot, JobStats};
pub use status::JobStatus;

/// Job identifier (12 hex chars).
pub type JobId = String;

fn new_job_id() -> JobId {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}

/// Fields the output parser fills in while the tool runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobProgress {
    pub title: String,
    pub filename: String,
    /// Human-readable percentage, e.g. "45.2%".
    #[serde(rename = "progress")]
    pub progress_text: String,
    /// 0-100.
    pub percent: f64,
    pub size: String,
    pub speed: String,
    pub eta: String,
}

impl JobProgress {
    fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn mark_complete(&mut self) {
        self.progress_text = "100%".to_string();
        self.percent = 100.0;
    }

    /// Clear transfer counters; title and filename survive (artifacts still need the filename).
    pub fn reset_transfer(&mut self) {
        self.progress_text.clear();
        self.percent = 0.0;
        self.size.clear();
        self.speed.clear();
        self.eta.clear();
    }
}

/// Handle to the process of the current run. Present only while `Running`.
#[derive(Debug)]
pub(crate) struct ProcessHandle {
    pub(crate) cancel: CancellationToken,
    pub(crate) pid: Option<u32>,
}

/// Mutable part of a job, guarded by the job's own lock.
#[derive(Debug)]
pub(crate) struct JobState {
    pub(crate) status: JobStatus,
    pub(crate) progress: JobProgress,
    pub(crate) error: Option<String>,
    pub(crate) logs: LogBuffer,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) process: Option<ProcessHandle>,
}

impl JobState {
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub(crate) fn append_log(&mut self, line: impl Into<String>) {
        self.logs.push(line);
        self.touch();
    }

    /// Record a terminal failure: status, error text, and an `ERROR:` log line.
    pub(crate) fn fail(&mut self, message: &str) {
        self.status = JobStatus::Failed;
        self.error = Some(message.to_string());
        self.logs.push(format!("ERROR: {message}"));
        self.touch();
    }

    /// Signal the current process (if any) to stop and drop the handle.
    pub(crate) fn cancel_process(&mut self) -> bool {
        match self.process.take() {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

/// A single download job.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    target: String,
    args: Vec<String>,
    created_at: DateTime<Utc>,
    state: Mutex<JobState>,
    /// Held by a worker for a whole run, so a resumed job never overlaps its previous process.
    exec_slot: tokio::sync::Mutex<()>,
}

impl Job {
    /// Creates a queued job. The title starts out as the target and is replaced once
    /// the tool reports a destination.
    pub fn new(target: impl Into<String>, args: Vec<String>) -> Self {
        let target = target.into();
        let now = Utc::now();
        Self {
            id: new_job_id(),
            state: Mutex::new(JobState {
                status: JobStatus::Queued,
                progress: JobProgress::new(&target),
                error: None,
                logs: LogBuffer::default(),
                updated_at: now,
                process: None,
            }),
            target,
            args,
            created_at: now,
            exec_slot: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn status(&self) -> JobStatus {
        self.state().status
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let st = self.state();
        self.snapshot_locked(&st)
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn exec_slot(&self) -> &tokio::sync::Mutex<()> {
        &self.exec_slot
    }

    /// Build a snapshot from an already-held state guard.
    pub(crate) fn snapshot_locked(&self, st: &JobState) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            target: self.target.clone(),
            status: st.status,
            progress: st.progress.clone(),
            error: st.error.clone(),
            logs: st.logs.to_vec(),
            args: self.args.clone(),
            created_at: self.created_at,
            updated_at: st.updated_at,
        }
    }
}
