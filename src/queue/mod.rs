//! Bounded-concurrency job queue.
//!
//! Jobs live in one mutex-guarded map; a fixed pool of worker tasks pulls
//! job IDs from a shared backlog channel, so at most `max_concurrent`
//! downloads run at once while accepted jobs wait in FIFO order. All reads
//! hand out detached [`JobSnapshot`] copies. A background sweep evicts
//! terminal jobs once their retention window expires.
//!
//! The queue knows nothing about downloading: work goes through the
//! [`JobRunner`] seam, which the download engine implements and tests
//! replace with scripted runners.

pub mod error;
pub mod job;

pub use error::QueueError;
pub use job::{JobId, JobSnapshot, JobStatus};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::download::DownloadError;
use job::Job;

/// What a worker hands the runner for one job.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// The URL to download.
    pub url: String,
    /// Caller-requested output filename, if any.
    pub filename: Option<String>,
}

/// Callback surface a runner uses to report back to its job.
pub trait JobObserver: Send + Sync {
    /// Reports (completed units, total units); total 0 means unknown.
    fn progress(&self, downloaded: u64, total: u64);

    /// Reports the resolved output filename, possibly more than once if a
    /// later step (remux) adjusts the final path.
    fn set_filename(&self, filename: &str);
}

/// Seam between the queue and the download engine.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Performs one job to completion, cancellation, or failure.
    ///
    /// # Errors
    ///
    /// Returns the [`DownloadError`] that terminated the job;
    /// [`DownloadError::Cancelled`] maps to the Cancelled status, everything
    /// else to Failed.
    async fn run(
        &self,
        request: &JobRequest,
        observer: &dyn JobObserver,
        token: &CancellationToken,
    ) -> Result<(), DownloadError>;
}

/// Shared queue state.
struct QueueInner {
    jobs: Mutex<HashMap<JobId, Job>>,
    seq: AtomicU64,
    backlog: Mutex<Option<UnboundedSender<JobId>>>,
    runner: Arc<dyn JobRunner>,
    history_retention: Duration,
}

impl QueueInner {
    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims a queued job for a worker. Returns `None` when the job was
    /// cancelled (or removed) while still in the backlog.
    fn begin(&self, id: JobId) -> Option<(JobRequest, CancellationToken)> {
        let mut jobs = self.lock_jobs();
        let job = jobs.get_mut(&id)?;
        if job.status != JobStatus::Queued {
            return None;
        }
        job.status = JobStatus::Downloading;
        Some((
            JobRequest {
                url: job.url.clone(),
                filename: job.requested_filename.clone(),
            },
            job.token.clone(),
        ))
    }

    fn finish(&self, id: JobId, result: Result<(), DownloadError>) {
        let mut jobs = self.lock_jobs();
        let Some(job) = jobs.get_mut(&id) else {
            return;
        };
        match result {
            Ok(()) => {
                job.status = JobStatus::Completed;
                job.progress = 100.0;
                info!(job = %id, "job completed");
            }
            Err(e) if e.is_cancelled() => {
                job.status = JobStatus::Cancelled;
                info!(job = %id, "job cancelled");
            }
            Err(e) => {
                job.status = JobStatus::Failed;
                job.error = Some(e.to_string());
                warn!(job = %id, error = %e, "job failed");
            }
        }
        job.completed_at = Some(Utc::now());
    }

    /// Removes terminal jobs past the retention window; returns the count.
    fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let retention = self.history_retention;
        let mut jobs = self.lock_jobs();
        let before = jobs.len();
        jobs.retain(|_, job| {
            let expired = job.status.is_terminal()
                && job.completed_at.is_some_and(|done| {
                    (now - done).to_std().unwrap_or_default() >= retention
                });
            !expired
        });
        before - jobs.len()
    }
}

/// Per-job observer mutating the queue's map.
struct QueueObserver {
    inner: Arc<QueueInner>,
    id: JobId,
}

impl JobObserver for QueueObserver {
    #[allow(clippy::cast_precision_loss)]
    fn progress(&self, downloaded: u64, total: u64) {
        let mut jobs = self.inner.lock_jobs();
        let Some(job) = jobs.get_mut(&self.id) else {
            return;
        };
        if job.status != JobStatus::Downloading {
            return;
        }
        job.downloaded = downloaded;
        job.total = total;
        if total > 0 {
            // Percentage only moves forward; late or duplicate callbacks
            // never make it regress.
            let pct = (downloaded as f64 / total as f64 * 100.0).min(100.0);
            if pct > job.progress {
                job.progress = pct;
            }
        }
    }

    fn set_filename(&self, filename: &str) {
        let mut jobs = self.inner.lock_jobs();
        if let Some(job) = jobs.get_mut(&self.id) {
            job.filename = Some(filename.to_string());
        }
    }
}

fn spawn_worker(
    inner: Arc<QueueInner>,
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<JobId>>>,
    worker: usize,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            // Hold the receiver lock only while waiting for the next ID.
            let id = {
                let mut rx = receiver.lock().await;
                match rx.recv().await {
                    Some(id) => id,
                    None => break,
                }
            };
            let Some((request, token)) = inner.begin(id) else {
                continue;
            };
            debug!(worker, job = %id, url = %request.url, "job started");
            let observer = QueueObserver {
                inner: Arc::clone(&inner),
                id,
            };
            let result = inner.runner.run(&request, &observer, &token).await;
            inner.finish(id, result);
        }
        debug!(worker, "worker stopped");
    })
}

fn spawn_sweeper(
    inner: Arc<QueueInner>,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = inner.sweep_expired();
                    if removed > 0 {
                        debug!(removed, "retention sweep evicted jobs");
                    }
                }
            }
        }
    })
}

/// Job queue with a fixed worker pool.
pub struct JobQueue {
    inner: Arc<QueueInner>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    sweep_token: CancellationToken,
}

impl JobQueue {
    /// Starts the queue: spawns `max_concurrent` workers plus the retention
    /// sweeper.
    #[must_use]
    pub fn new(config: &Config, runner: Arc<dyn JobRunner>) -> Self {
        let config = config.clone().normalized();
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(QueueInner {
            jobs: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
            backlog: Mutex::new(Some(tx)),
            runner,
            history_retention: config.history_retention,
        });

        let receiver = Arc::new(tokio::sync::Mutex::new(rx));
        let mut handles = Vec::with_capacity(config.max_concurrent + 1);
        for worker in 0..config.max_concurrent {
            handles.push(spawn_worker(
                Arc::clone(&inner),
                Arc::clone(&receiver),
                worker,
            ));
        }
        let sweep_token = CancellationToken::new();
        handles.push(spawn_sweeper(
            Arc::clone(&inner),
            config.sweep_interval,
            sweep_token.clone(),
        ));

        info!(workers = config.max_concurrent, "job queue started");
        Self {
            inner,
            handles: Mutex::new(handles),
            sweep_token,
        }
    }

    /// Accepts a job and enqueues it for a worker.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ShuttingDown`] after [`JobQueue::shutdown`].
    #[instrument(skip(self, filename))]
    pub fn add_job(
        &self,
        url: impl Into<String> + std::fmt::Debug,
        filename: Option<String>,
    ) -> Result<JobSnapshot, QueueError> {
        let sender = self
            .inner
            .backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sender) = sender else {
            return Err(QueueError::ShuttingDown);
        };

        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let job = Job::new(url.into(), filename, seq);
        let id = job.id;
        let snapshot = job.snapshot();
        self.inner.lock_jobs().insert(id, job);

        if sender.send(id).is_err() {
            // Shutdown raced the insert; undo it.
            self.inner.lock_jobs().remove(&id);
            return Err(QueueError::ShuttingDown);
        }
        info!(job = %id, "job queued");
        Ok(snapshot)
    }

    /// Records a job that failed before it could be enqueued (malformed URL
    /// in a batch). The job is terminal immediately and never runs.
    pub fn add_failed_job(&self, url: impl Into<String>, error: impl Into<String>) -> JobSnapshot {
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let mut job = Job::new(url.into(), None, seq);
        job.status = JobStatus::Failed;
        job.error = Some(error.into());
        job.completed_at = Some(Utc::now());
        let snapshot = job.snapshot();
        self.inner.lock_jobs().insert(job.id, job);
        snapshot
    }

    /// Returns a snapshot of one job.
    #[must_use]
    pub fn get_job(&self, id: JobId) -> Option<JobSnapshot> {
        self.inner.lock_jobs().get(&id).map(Job::snapshot)
    }

    /// Returns snapshots of all jobs in creation order.
    #[must_use]
    pub fn get_all_jobs(&self) -> Vec<JobSnapshot> {
        let jobs = self.inner.lock_jobs();
        let mut entries: Vec<(u64, JobSnapshot)> =
            jobs.values().map(|job| (job.seq, job.snapshot())).collect();
        drop(jobs);
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, snapshot)| snapshot).collect()
    }

    /// Requests cancellation of a job.
    ///
    /// A queued job goes to Cancelled immediately; a downloading job has its
    /// token signalled and reaches Cancelled when the runner observes it.
    /// Returns false for terminal or unknown jobs.
    #[instrument(skip(self))]
    pub fn cancel_job(&self, id: JobId) -> bool {
        let mut jobs = self.inner.lock_jobs();
        let Some(job) = jobs.get_mut(&id) else {
            return false;
        };
        match job.status {
            JobStatus::Queued => {
                job.status = JobStatus::Cancelled;
                job.completed_at = Some(Utc::now());
                job.token.cancel();
                info!(job = %id, "queued job cancelled");
                true
            }
            JobStatus::Downloading => {
                job.token.cancel();
                info!(job = %id, "cancellation signalled");
                true
            }
            _ => false,
        }
    }

    /// Removes one terminal job from history.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NotFound`] for unknown IDs and
    /// [`QueueError::NotTerminal`] for jobs still queued or downloading.
    pub fn remove_job(&self, id: JobId) -> Result<(), QueueError> {
        let mut jobs = self.inner.lock_jobs();
        let Some(job) = jobs.get(&id) else {
            return Err(QueueError::NotFound { id });
        };
        if !job.status.is_terminal() {
            return Err(QueueError::NotTerminal { id });
        }
        jobs.remove(&id);
        Ok(())
    }

    /// Removes all terminal jobs, returning how many were dropped.
    pub fn clear_history(&self) -> usize {
        let mut jobs = self.inner.lock_jobs();
        let before = jobs.len();
        jobs.retain(|_, job| !job.status.is_terminal());
        before - jobs.len()
    }

    /// Stops accepting jobs, drains the backlog, and waits for in-flight
    /// jobs to finish.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.inner
            .backlog
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.sweep_token.cancel();

        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
            guard.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "queue task ended abnormally");
            }
        }
        info!("job queue stopped");
    }
}
