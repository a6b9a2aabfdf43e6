//! Error types for queue operations.

use thiserror::Error;

use super::job::JobId;

/// Errors returned by [`JobQueue`](super::JobQueue) operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No job exists with the given ID.
    #[error("job {id} not found")]
    NotFound {
        /// The unknown job ID.
        id: JobId,
    },

    /// The job is still queued or downloading and cannot be removed.
    #[error("job {id} is not in a terminal state")]
    NotTerminal {
        /// The live job's ID.
        id: JobId,
    },

    /// The queue has been shut down and accepts no new jobs.
    #[error("queue is shutting down")]
    ShuttingDown,
}
