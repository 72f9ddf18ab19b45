//! Error types for scheduler operations and job execution.

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::job::{JobId, JobStatus};

/// Returned synchronously by lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("cannot {op} job in state {status}")]
    InvalidTransition { op: &'static str, status: JobStatus },

    #[error("queue full, try again later")]
    QueueSaturated,

    #[error("scheduler is shutting down")]
    ShuttingDown,
}

/// Failure while running the external tool. Recorded on the job, never
/// returned to a caller.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Tool (or interpreter) could not be located.
    #[error("{name} not found; searched: {}", .searched.join(", "))]
    Resolution { name: String, searched: Vec<String> },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to capture tool output: {0}")]
    Pipe(&'static str),

    #[error("tool exited with {0}")]
    Exit(ExitStatus),

    #[error("waiting for tool: {0}")]
    Wait(#[source] io::Error),
}
