//! Immutable copies of job state handed to callers and broadcasters.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{JobId, JobProgress, JobStatus};

/// Point-in-time copy of a job's observable fields.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub target: String,
    pub status: JobStatus,
    #[serde(flatten)]
    pub progress: JobProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub args: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Job counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total: usize,
    pub queued: usize,
    pub running: usize,
    pub paused: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl JobStats {
    pub fn record(&mut self, status: JobStatus) {
        self.total += 1;
        let slot = match status {
            JobStatus::Queued => &mut self.queued,
            JobStatus::Running => &mut self.running,
            JobStatus::Paused => &mut self.paused,
            JobStatus::Completed => &mut self.completed,
            JobStatus::Failed => &mut self.failed,
            JobStatus::Cancelled => &mut self.cancelled,
        };
        *slot += 1;
    }

    pub fn count(&self, status: JobStatus) -> usize {
        match status {
            JobStatus::Queued => self.queued,
            JobStatus::Running => self.running,
            JobStatus::Paused => self.paused,
            JobStatus::Completed => self.completed,
            JobStatus::Failed => self.failed,
            JobStatus::Cancelled => self.cancelled,
        }
    }

    /// True when no job is queued or running.
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.running == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Job;

    #[test]
    fn snapshot_json_is_flat() {
        let job = Job::new("https://x/1", vec!["-f".into(), "best".into()]);
        let value = serde_json::to_value(job.snapshot()).unwrap();
        assert_eq!(value["target"], "https://x/1");
        assert_eq!(value["status"], "queued");
        assert_eq!(value["title"], "https://x/1");
        assert_eq!(value["percent"], 0.0);
        assert!(value.get("error").is_none());
        assert_eq!(value["args"][1], "best");
    }

    #[test]
    fn stats_count_per_status() {
        let mut stats = JobStats::default();
        stats.record(JobStatus::Queued);
        stats.record(JobStatus::Failed);
        stats.record(JobStatus::Failed);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.count(JobStatus::Failed), 2);
        assert!(!stats.is_idle());
    }
}
