//! Bookkeeping snapshots of recent jobs.
//!
//! The tracker is the only structure shared between admission, the executor
//! loop and the cleanup sweep. It uses DashMap so none of them block each
//! other, and atomic counters for the running-job instrumentation.

use crate::classify::ErrorKind;
use crate::document::DocumentType;
use crate::executor::{JobId, JobStatus};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// What the service remembers about a job after handing it to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub document_type: DocumentType,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set for failed jobs, including ones answered with fallback output.
    pub error_kind: Option<ErrorKind>,
    /// True when the job was answered with fallback output.
    pub degraded: bool,
    /// Last update, used for retention.
    touched: Instant,
}

impl JobSnapshot {
    /// Time since the snapshot was last updated.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.touched)
    }
}

/// Concurrent map of job snapshots with running-job instrumentation.
///
/// Running jobs are counted through their own set, so the counters stay
/// exact whatever happens to the snapshots.
#[derive(Debug, Default)]
pub struct JobTracker {
    jobs: DashMap<JobId, JobSnapshot>,
    running_jobs: DashSet<JobId>,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly admitted job.
    pub fn track_queued(
        &self,
        job_id: JobId,
        document_type: DocumentType,
        submitted_at: DateTime<Utc>,
    ) {
        self.jobs.insert(
            job_id.clone(),
            JobSnapshot {
                job_id,
                document_type,
                status: JobStatus::Queued,
                submitted_at,
                started_at: None,
                finished_at: None,
                error_kind: None,
                degraded: false,
                touched: Instant::now(),
            },
        );
    }

    /// Marks a job Running and updates the running counters.
    pub fn mark_running(&self, job_id: &JobId, started_at: DateTime<Utc>) {
        match self.jobs.get_mut(job_id) {
            Some(mut entry) => {
                entry.status = JobStatus::Running;
                entry.started_at = Some(started_at);
                entry.touched = Instant::now();
            }
            None => tracing::warn!(job_id = %job_id, "Running job has no snapshot"),
        }

        if !self.running_jobs.insert(job_id.clone()) {
            return;
        }
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(now_running, Ordering::SeqCst);
        tracing::trace!(job_id = %job_id, running = now_running, "Job marked running");
    }

    /// Records a terminal status.
    ///
    /// The running counter is decremented only if the job was marked Running.
    pub fn mark_finished(
        &self,
        job_id: &JobId,
        status: JobStatus,
        finished_at: DateTime<Utc>,
        error_kind: Option<ErrorKind>,
        degraded: bool,
    ) {
        if let Some(mut entry) = self.jobs.get_mut(job_id) {
            entry.status = status;
            entry.finished_at = Some(finished_at);
            entry.error_kind = error_kind;
            entry.degraded = degraded;
            entry.touched = Instant::now();
        }

        if self.running_jobs.remove(job_id).is_some() {
            self.running.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn get(&self, job_id: &JobId) -> Option<JobSnapshot> {
        self.jobs.get(job_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs currently Running.
    pub fn running_count(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously Running jobs ever observed.
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }

    /// Removes finished snapshots untouched for longer than `retention`.
    pub fn prune_stale(&self, retention: Duration) -> usize {
        self.prune_stale_at(Instant::now(), retention)
    }

    /// Like [`prune_stale`](Self::prune_stale) with an explicit clock.
    ///
    /// Stale keys are collected first and each is removed with a re-check,
    /// so an entry updated in between survives. Queued and Running jobs are
    /// never pruned.
    pub fn prune_stale_at(&self, now: Instant, retention: Duration) -> usize {
        let is_stale = |snapshot: &JobSnapshot| {
            snapshot.status.is_terminal() && snapshot.idle_for(now) > retention
        };

        let stale: Vec<JobId> = self
            .jobs
            .iter()
            .filter(|entry| is_stale(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        stale
            .iter()
            .filter(|job_id| {
                self.jobs
                    .remove_if(*job_id, |_, snapshot| is_stale(snapshot))
                    .is_some()
            })
            .count()
    }
}
