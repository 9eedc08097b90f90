//! Job record and lifecycle.
//!
//! A [`Job`] is created at admission, moved through the queue channel to the
//! executor, and transitions exactly once to a terminal status.

use crate::classify::ErrorInfo;
use crate::document::{DocumentScope, DocumentType, RenderOptions};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Global counter for generating unique job IDs.
static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a job.
///
/// # Example
///
/// ```
/// use docgate::executor::JobId;
///
/// let a = JobId::auto();
/// let b = JobId::auto();
/// assert_ne!(a, b);
/// assert!(a.as_str().starts_with("job-"));
/// ```
#[derive(Clone, Hash, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Creates a new job ID with the given string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a unique auto-generated job ID of the form `job-{counter}`.
    pub fn auto() -> Self {
        let counter = JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("job-{}", counter))
    }

    /// Returns the string value of this job ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting in the admission queue.
    #[default]
    Queued,
    /// Being rendered. At most one job is Running at any instant.
    Running,
    /// Rendered and validated.
    Succeeded,
    /// Failed; the error is attached. The caller may still have received
    /// fallback output.
    Failed,
}

impl JobStatus {
    /// Returns true for Succeeded and Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Illegal status transition. The job is left unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Job {job_id}: cannot transition from {from} to {to}")]
pub struct JobTransitionError {
    pub job_id: JobId,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One admitted rendering task.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub document_type: DocumentType,
    pub payload: Arc<Value>,
    pub options: Arc<RenderOptions>,
    pub scope: DocumentScope,
    /// Per-request fallback choice; `None` uses the service default.
    pub fallback: Option<bool>,
    pub submitted_at: DateTime<Utc>,
    status: JobStatus,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<ErrorInfo>,
}

impl Job {
    /// Creates a Queued job with a fresh id.
    pub fn new(document_type: DocumentType, payload: Value) -> Self {
        Self {
            id: JobId::auto(),
            document_type,
            payload: Arc::new(payload),
            options: Arc::new(RenderOptions::default()),
            scope: DocumentScope::Document,
            fallback: None,
            submitted_at: Utc::now(),
            status: JobStatus::Queued,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    /// Queued → Running.
    pub fn start(&mut self) -> Result<(), JobTransitionError> {
        self.transition(JobStatus::Running, &[JobStatus::Queued])?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Running → Succeeded.
    pub fn succeed(&mut self) -> Result<(), JobTransitionError> {
        self.transition(JobStatus::Succeeded, &[JobStatus::Running])?;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Running → Failed, or Queued → Failed for jobs abandoned at shutdown.
    pub fn fail(&mut self, info: ErrorInfo) -> Result<(), JobTransitionError> {
        self.transition(JobStatus::Failed, &[JobStatus::Queued, JobStatus::Running])?;
        self.finished_at = Some(Utc::now());
        self.error = Some(info);
        Ok(())
    }

    /// Wall time between start and finish, once both are known.
    pub fn run_time(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    fn transition(&mut self, to: JobStatus, from: &[JobStatus]) -> Result<(), JobTransitionError> {
        if !from.contains(&self.status) {
            return Err(JobTransitionError {
                job_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
