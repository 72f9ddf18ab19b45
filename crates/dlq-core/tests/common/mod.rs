//! Shared helpers for scheduler integration tests.
//!
//! The "tool" is a shell script run through `/bin/sh`, so tests never exec a
//! freshly written file directly. The script sees the target as `$1` (tests
//! pass no per-job args and the default args are empty) and runs with the
//! download dir as its working directory.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dlq_core::broadcast::{Broadcaster, NoopBroadcaster};
use dlq_core::config::DlqConfig;
use dlq_core::job::{JobSnapshot, JobStatus};
use dlq_core::scheduler::Scheduler;
use tempfile::TempDir;

/// Dispatches on the target prefix.
pub const SCENARIO_TOOL: &str = r#"
case "$1" in
  ok*)
    echo '[download] Destination: video.mp4'
    echo '[download]  50.0% of 10.00MiB at 1.00MiB/s ETA 00:05'
    echo '[download] 100% of 10.00MiB in 00:01'
    : > video.mp4
    ;;
  slow*)
    : > slow.mp4.part
    echo '[download] Destination: slow.mp4'
    exec sleep 30
    ;;
  fail*)
    echo 'ERROR: Unsupported URL' >&2
    exit 1
    ;;
  *)
    echo "unknown target $1"
    ;;
esac
"#;

pub struct Harness {
    pub dir: TempDir,
    pub cfg: DlqConfig,
}

impl Harness {
    pub fn new(script: &str) -> Self {
        Self::with_limits(script, 2, 16)
    }

    pub fn with_limits(script: &str, max_concurrent: usize, queue_capacity: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool.sh");
        std::fs::write(&tool, script).unwrap();
        let cfg = DlqConfig {
            download_dir: dir.path().join("downloads"),
            config_dir: dir.path().join("config"),
            max_concurrent,
            queue_capacity,
            tool_path: tool,
            interpreter: Some(PathBuf::from("/bin/sh")),
            default_args: Some(Vec::new()),
            format_query_timeout_secs: 5,
            kill_grace_ms: 200,
        };
        Self { dir, cfg }
    }

    pub fn start(&self) -> Scheduler {
        Scheduler::start(&self.cfg, Arc::new(NoopBroadcaster))
    }

    pub fn start_with(&self, broadcaster: Arc<dyn Broadcaster>) -> Scheduler {
        Scheduler::start(&self.cfg, broadcaster)
    }

    pub fn download_dir(&self) -> PathBuf {
        self.cfg.download_dir.clone()
    }
}

/// Polls until the job satisfies `pred` or the timeout elapses.
pub async fn wait_until<F>(sched: &Scheduler, id: &str, mut pred: F) -> JobSnapshot
where
    F: FnMut(&JobSnapshot) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let snap = sched.get(id).expect("job exists");
        if pred(&snap) {
            return snap;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for job {id}; last state: {snap:?}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

pub async fn wait_for_status(sched: &Scheduler, id: &str, status: JobStatus) -> JobSnapshot {
    wait_until(sched, id, |s| s.status == status).await
}
