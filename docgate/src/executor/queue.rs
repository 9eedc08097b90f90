//! Admission queue.
//!
//! This module contains [`AdmissionQueue`] - the public interface for
//! admitting jobs - and [`GenerateRequest`].

use super::job::Job;
use super::stats::ExecutorCounters;
use super::telemetry::{TelemetryEvent, TelemetrySink};
use super::ticket::{GenerateError, JobOutcome, JobTicket};
use crate::document::{DocumentScope, DocumentType, RenderOptions};
use crate::monitor::JobTracker;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Generate Request
// =============================================================================

/// A document request with its presentation options.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub document_type: DocumentType,
    pub payload: Value,
    pub options: RenderOptions,
    pub scope: DocumentScope,
    /// `None` uses the service default.
    pub fallback: Option<bool>,
}

impl GenerateRequest {
    pub fn new(document_type: DocumentType, payload: Value) -> Self {
        Self {
            document_type,
            payload,
            options: RenderOptions::default(),
            scope: DocumentScope::Document,
            fallback: None,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_scope(mut self, scope: DocumentScope) -> Self {
        self.scope = scope;
        self
    }

    /// Requests (or refuses) fallback output if rendering fails.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub(crate) fn into_job(self) -> Job {
        let mut job = Job::new(self.document_type, self.payload);
        job.options = Arc::new(self.options);
        job.scope = self.scope;
        job.fallback = self.fallback;
        job
    }
}

/// A job in the channel together with its reply slot.
pub(crate) struct QueuedJob {
    pub job: Job,
    pub reply: oneshot::Sender<JobOutcome>,
    pub enqueued_at: Instant,
}

// =============================================================================
// Admission Queue
// =============================================================================

/// Handle for admitting jobs.
///
/// Cloneable and cheap to share across tasks. Admission never blocks and
/// never fails; after shutdown the returned ticket resolves to
/// [`GenerateError::ShutDown`].
#[derive(Clone)]
pub struct AdmissionQueue {
    sender: mpsc::UnboundedSender<QueuedJob>,
    tracker: Arc<JobTracker>,
    counters: Arc<ExecutorCounters>,
    telemetry: Arc<dyn TelemetrySink>,
    shutdown: CancellationToken,
}

impl AdmissionQueue {
    pub(crate) fn new(
        sender: mpsc::UnboundedSender<QueuedJob>,
        tracker: Arc<JobTracker>,
        counters: Arc<ExecutorCounters>,
        telemetry: Arc<dyn TelemetrySink>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            sender,
            tracker,
            counters,
            telemetry,
            shutdown,
        }
    }

    /// Admits a job with default options.
    pub fn enqueue(&self, document_type: DocumentType, payload: Value) -> JobTicket {
        self.submit(GenerateRequest::new(document_type, payload))
    }

    /// Admits a request, appending it to the tail of the queue.
    pub fn submit(&self, request: GenerateRequest) -> JobTicket {
        let job = request.into_job();
        let job_id = job.id.clone();
        let document_type = job.document_type;

        if self.shutdown.is_cancelled() {
            tracing::debug!(job_id = %job_id, "Service shut down, rejecting job");
            return JobTicket::resolved(job_id, Err(GenerateError::ShutDown));
        }

        self.tracker
            .track_queued(job_id.clone(), document_type, job.submitted_at);

        let (reply, receiver) = oneshot::channel();
        let queued = QueuedJob {
            job,
            reply,
            enqueued_at: Instant::now(),
        };

        let queue_depth = self.counters.enqueued();
        if let Err(mpsc::error::SendError(rejected)) = self.sender.send(queued) {
            self.counters.dequeued();
            super::worker::abandon(
                rejected.job,
                rejected.reply,
                &self.tracker,
                &self.counters,
                &*self.telemetry,
            );
            return JobTicket::new(job_id, receiver);
        }

        tracing::debug!(
            job_id = %job_id,
            document_type = %document_type,
            queue_depth,
            "Job enqueued"
        );
        self.telemetry.emit(TelemetryEvent::JobQueued {
            job_id: job_id.clone(),
            document_type,
            queue_depth,
        });

        JobTicket::new(job_id, receiver)
    }

    /// Jobs waiting to run.
    pub fn depth(&self) -> usize {
        self.counters
            .queue_depth
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    /// True once the service has shut down.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.sender.is_closed()
    }
}

impl std::fmt::Debug for AdmissionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionQueue")
            .field("depth", &self.depth())
            .field("closed", &self.is_closed())
            .finish()
    }
}
