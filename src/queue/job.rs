//! Job state: lifecycle status, internal record, and the serializable
//! snapshot handed to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Unique job identifier.
pub type JobId = Uuid;

/// Lifecycle of a download job.
///
/// Transitions are strictly forward: Queued → Downloading → one of the three
/// terminal states, or Queued → Cancelled directly when cancelled before a
/// worker picks the job up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, waiting for a worker.
    Queued,
    /// A worker is actively downloading.
    Downloading,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before or during download.
    Cancelled,
}

impl JobStatus {
    /// Returns true for the three end states.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Point-in-time copy of a job's public state.
///
/// Snapshots are plain data: mutating one never affects the queue, and the
/// cancellation token is deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job identifier.
    pub id: JobId,
    /// The URL being downloaded.
    pub url: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Percentage 0-100; only meaningful once a total size is known.
    pub progress: f64,
    /// Bytes (or HLS segments / image count) completed so far.
    pub downloaded: u64,
    /// Known total, 0 when the size is unknown.
    pub total: u64,
    /// Resolved output filename(s); multi-image jobs join names with `", "`.
    pub filename: Option<String>,
    /// Failure description for Failed jobs.
    pub error: Option<String>,
    /// When the job was accepted.
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Internal mutable job record. Lives only inside the queue's map.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) id: JobId,
    pub(crate) url: String,
    /// Caller-requested output name, pre-sanitization.
    pub(crate) requested_filename: Option<String>,
    pub(crate) status: JobStatus,
    pub(crate) progress: f64,
    pub(crate) downloaded: u64,
    pub(crate) total: u64,
    pub(crate) filename: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    /// Creation-order tiebreaker for listing.
    pub(crate) seq: u64,
    pub(crate) token: CancellationToken,
}

impl Job {
    pub(crate) fn new(url: String, requested_filename: Option<String>, seq: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            url,
            requested_filename,
            status: JobStatus::Queued,
            progress: 0.0,
            downloaded: 0,
            total: 0,
            filename: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
            seq,
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            url: self.url.clone(),
            status: self.status,
            progress: self.progress,
            downloaded: self.downloaded,
            total: self.total,
            filename: self.filename.clone(),
            error: self.error.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}
