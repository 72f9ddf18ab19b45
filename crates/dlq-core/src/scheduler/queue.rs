//! Bounded FIFO of pending job ids shared by the worker pool.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::SchedulerError;
use crate::job::JobId;

/// Receiving end shared by all workers; each id goes to exactly one of them.
pub(super) type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<JobId>>>;

#[derive(Debug)]
pub(super) struct JobQueue {
    /// `None` once closed.
    tx: Mutex<Option<mpsc::Sender<JobId>>>,
}

impl JobQueue {
    pub(super) fn new(capacity: usize) -> (Self, SharedReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Self {
            tx: Mutex::new(Some(tx)),
        };
        (queue, Arc::new(tokio::sync::Mutex::new(rx)))
    }

    /// Never waits: a full queue is reported instead.
    pub(super) fn try_enqueue(&self, id: JobId) -> Result<(), SchedulerError> {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Err(SchedulerError::ShuttingDown);
        };
        tx.try_send(id).map_err(|e| match e {
            TrySendError::Full(_) => SchedulerError::QueueSaturated,
            TrySendError::Closed(_) => SchedulerError::ShuttingDown,
        })
    }

    /// Drops the sender so workers see the end of the queue after draining it.
    /// Returns false if already closed.
    pub(super) fn close(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_queue_is_reported_not_awaited() {
        let (queue, rx) = JobQueue::new(1);
        queue.try_enqueue("a".into()).unwrap();
        assert_eq!(
            queue.try_enqueue("b".into()),
            Err(SchedulerError::QueueSaturated)
        );
        assert_eq!(rx.lock().await.recv().await.as_deref(), Some("a"));
        queue.try_enqueue("c".into()).unwrap();
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let (queue, rx) = JobQueue::new(4);
        queue.try_enqueue("a".into()).unwrap();
        assert!(queue.close());
        assert!(!queue.close());
        assert_eq!(
            queue.try_enqueue("b".into()),
            Err(SchedulerError::ShuttingDown)
        );
        let mut rx = rx.lock().await;
        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await, None);
    }
}
