//! Job-change notification.
//!
//! The scheduler only depends on [`Broadcaster::notify`]. It calls it with no
//! locks held, possibly from several workers at once.

use tokio::sync::broadcast;

use crate::job::JobSnapshot;

/// Receives a snapshot after every job state change.
pub trait Broadcaster: Send + Sync {
    /// Must not block indefinitely.
    fn notify(&self, job: &JobSnapshot);
}

impl<F> Broadcaster for F
where
    F: Fn(&JobSnapshot) + Send + Sync,
{
    fn notify(&self, job: &JobSnapshot) {
        self(job)
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn notify(&self, _job: &JobSnapshot) {}
}

/// Fan-out hub: every subscriber gets every snapshot. A subscriber that falls
/// behind by more than the channel capacity skips the oldest snapshots
/// (`RecvError::Lagged`) instead of stalling the scheduler.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    tx: broadcast::Sender<JobSnapshot>,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobSnapshot> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn notify(&self, job: &JobSnapshot) {
        // No subscribers is not an error.
        let _ = self.tx.send(job.clone());
    }
}
