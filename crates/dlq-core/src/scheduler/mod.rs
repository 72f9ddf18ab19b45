//! Job scheduler.
//!
//! Owns the job registry, a bounded queue of pending job ids and a fixed pool
//! of workers that run the tool for one job at a time:
//! submit → registry + queue → worker → tool → output parser → broadcaster.
//!
//! Locking: the registry lock guards the map and insertion order only; each
//! job has its own lock for its mutable fields. A job lock is never held while
//! waiting for the registry lock, and broadcasts happen with no lock held.

mod lifecycle;
mod queue;
mod registry;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::task::JoinHandle;

use crate::broadcast::Broadcaster;
use crate::config::DlqConfig;
use crate::error::SchedulerError;
use crate::job::{Job, JobSnapshot, JobStats, JobStatus};
use crate::process::{FormatListing, ToolRunner};

use self::queue::JobQueue;
use self::registry::Registry;

/// Handle to a running scheduler. Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    registry: RwLock<Registry>,
    queue: JobQueue,
    shutting_down: AtomicBool,
    runner: ToolRunner,
    broadcaster: Arc<dyn Broadcaster>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates the scheduler and spawns `max_concurrent` workers (at least one).
    /// Must be called from within a Tokio runtime.
    pub fn start(cfg: &DlqConfig, broadcaster: Arc<dyn Broadcaster>) -> Self {
        let (queue, rx) = JobQueue::new(cfg.queue_capacity);
        let inner = Arc::new(Inner {
            registry: RwLock::new(Registry::default()),
            queue,
            shutting_down: AtomicBool::new(false),
            runner: ToolRunner::new(cfg),
            broadcaster,
            workers: Mutex::new(Vec::new()),
        });
        let worker_count = cfg.max_concurrent.max(1);
        let handles = worker::spawn_workers(&inner, rx, worker_count);
        *inner.workers.lock().unwrap_or_else(PoisonError::into_inner) = handles;
        tracing::info!(
            workers = worker_count,
            queue_capacity = cfg.queue_capacity.max(1),
            "scheduler started"
        );
        Self { inner }
    }

    /// Registers `job` and queues it. If the queue is full or the scheduler is
    /// shutting down, the job is failed right away instead of blocking.
    pub fn submit(&self, job: Job) -> JobSnapshot {
        let job = Arc::new(job);
        self.inner.write_registry().insert(Arc::clone(&job));
        let snap = job.snapshot();
        tracing::info!(job_id = %snap.id, target = %snap.target, "job submitted");
        self.inner.broadcast(&snap);
        match self.inner.queue.try_enqueue(snap.id.clone()) {
            Ok(()) => snap,
            Err(e) => self.inner.fail_queued(&job, &e),
        }
    }

    pub fn get(&self, id: &str) -> Option<JobSnapshot> {
        self.inner.job(id).map(|job| job.snapshot())
    }

    /// All jobs, newest first.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let jobs = self.inner.read_registry().newest_first();
        jobs.iter().map(|job| job.snapshot()).collect()
    }

    pub fn stats(&self) -> JobStats {
        let jobs = self.inner.read_registry().newest_first();
        let mut stats = JobStats::default();
        for job in &jobs {
            stats.record(job.status());
        }
        stats
    }

    /// One-shot format listing for `target`; not tied to any job.
    pub async fn list_formats(&self, target: &str, extra_args: &[String]) -> FormatListing {
        self.inner.runner.list_formats(target, extra_args).await
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.is_shutting_down()
    }

    /// Waits for every worker to exit. Only returns after [`Scheduler::shutdown`].
    pub async fn join(&self) {
        let handles = std::mem::take(
            &mut *self
                .inner
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("worker task ended abnormally: {}", e);
            }
        }
    }
}

impl Inner {
    fn read_registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn job(&self, id: &str) -> Option<Arc<Job>> {
        self.read_registry().get(id)
    }

    fn job_or_not_found(&self, id: &str) -> Result<Arc<Job>, SchedulerError> {
        self.job(id)
            .ok_or_else(|| SchedulerError::NotFound(id.to_string()))
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    fn broadcast(&self, snap: &JobSnapshot) {
        self.broadcaster.notify(snap);
    }

    /// Enqueue rejected: fail the job if nothing else moved it out of `Queued` meanwhile.
    fn fail_queued(&self, job: &Job, err: &SchedulerError) -> JobSnapshot {
        let (snap, changed) = {
            let mut st = job.state();
            let changed = st.status == JobStatus::Queued;
            if changed {
                st.fail(&err.to_string());
            }
            (job.snapshot_locked(&st), changed)
        };
        if changed {
            tracing::warn!(job_id = %snap.id, "could not queue job: {}", err);
            self.broadcast(&snap);
        }
        snap
    }
}
