//! The drain loop.
//!
//! A single task pulls jobs from the admission channel one at a time, so at
//! most one render is ever in flight. For each job it waits for memory
//! headroom, renders under a deadline, validates the output and answers the
//! caller. Any failure is classified and becomes either fallback output or a
//! rejection; the loop itself never fails.

use super::config::ExecutorConfig;
use super::job::{Job, JobStatus};
use super::queue::QueuedJob;
use super::stats::{ExecutorCounters, ExecutorState};
use super::telemetry::{TelemetryEvent, TelemetrySink};
use super::ticket::{GenerateError, JobOutcome, RenderedDocument};
use crate::classify::{create_fallback, ErrorClassifier, ErrorInfo, ErrorKind, FallbackPolicy};
use crate::config::format_size;
use crate::monitor::{BudgetWait, JobTracker, ResourceMonitor};
use crate::render::{panic_message, RenderContext, RendererRegistry};
use chrono::Utc;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of the render step, before the caller is answered.
enum RenderOutcome {
    Rendered(Vec<u8>),
    Failed(ErrorInfo),
    /// Shutdown fired while the job was waiting or rendering.
    Interrupted,
}

pub(crate) struct DrainLoop {
    pub receiver: mpsc::UnboundedReceiver<QueuedJob>,
    pub config: ExecutorConfig,
    pub renderers: RendererRegistry,
    pub monitor: Arc<ResourceMonitor>,
    pub classifier: ErrorClassifier,
    pub fallback: FallbackPolicy,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub counters: Arc<ExecutorCounters>,
    pub shutdown: CancellationToken,
}

impl DrainLoop {
    /// Runs until shutdown, then answers every job still queued.
    pub(crate) async fn run(mut self) {
        info!(
            job_timeout_ms = self.config.job_timeout.as_millis(),
            inter_job_delay_ms = self.config.inter_job_delay.as_millis(),
            "Generation executor started"
        );
        self.counters.set_state(ExecutorState::Idle);

        loop {
            let queued = match self.receiver.try_recv() {
                Ok(queued) => queued,
                Err(mpsc::error::TryRecvError::Disconnected) => break,
                Err(mpsc::error::TryRecvError::Empty) => {
                    self.counters.set_state(ExecutorState::Idle);
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break,
                        next = self.receiver.recv() => match next {
                            Some(queued) => queued,
                            None => break,
                        },
                    }
                }
            };
            self.counters.dequeued();

            if self.shutdown.is_cancelled() {
                abandon(
                    queued.job,
                    queued.reply,
                    self.tracker(),
                    &self.counters,
                    &*self.telemetry,
                );
                break;
            }

            self.counters.set_state(ExecutorState::Draining);
            self.process(queued).await;

            if !self.config.inter_job_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.config.inter_job_delay) => {}
                }
            }
        }

        self.receiver.close();
        let mut abandoned = 0usize;
        while let Ok(queued) = self.receiver.try_recv() {
            self.counters.dequeued();
            abandon(
                queued.job,
                queued.reply,
                self.tracker(),
                &self.counters,
                &*self.telemetry,
            );
            abandoned += 1;
        }

        self.counters.set_state(ExecutorState::Stopped);
        info!(abandoned, "Generation executor stopped");
    }

    fn tracker(&self) -> &JobTracker {
        self.monitor.tracker()
    }

    async fn process(&self, queued: QueuedJob) {
        let QueuedJob {
            mut job,
            reply,
            enqueued_at,
        } = queued;

        if let Err(e) = job.start() {
            warn!(error = %e, "Dropping job in unexpected state");
            return;
        }
        let job_id = job.id.clone();
        self.tracker()
            .mark_running(&job_id, job.started_at().unwrap_or_else(Utc::now));
        self.telemetry.emit(TelemetryEvent::JobStarted {
            job_id: job_id.clone(),
            document_type: job.document_type,
            queue_wait: enqueued_at.elapsed(),
        });

        let started = Instant::now();
        let cancel = self.shutdown.child_token();

        let outcome = if self.await_budget(&job, &cancel).await {
            self.render(&job, &cancel).await
        } else {
            RenderOutcome::Interrupted
        };

        let result = match outcome {
            RenderOutcome::Interrupted => {
                abandon(job, reply, self.tracker(), &self.counters, &*self.telemetry);
                return;
            }
            RenderOutcome::Rendered(bytes) => self.succeed(job, bytes, started.elapsed()),
            RenderOutcome::Failed(info) => self.fail(job, info, started.elapsed()),
        };

        if reply.send(result).is_err() {
            debug!(job_id = %job_id, "Caller dropped ticket before the result arrived");
        }
    }

    /// Waits for memory headroom. Returns false only if shutdown interrupted
    /// the wait.
    async fn await_budget(&self, job: &Job, cancel: &CancellationToken) -> bool {
        let budget = self.config.memory_budget();
        let (sample, waited, recovered) = match self.monitor.wait_for_budget(&budget, cancel).await
        {
            BudgetWait::Within { .. } => return true,
            BudgetWait::Cancelled => return false,
            BudgetWait::Recovered { sample, waited } => (sample, waited, true),
            BudgetWait::Expired { sample, waited } => (sample, waited, false),
        };

        if recovered {
            debug!(
                job_id = %job.id,
                used_bytes = sample.heap_used_bytes,
                waited_ms = waited.as_millis(),
                "Memory back within budget"
            );
        } else {
            warn!(
                job_id = %job.id,
                used_bytes = sample.heap_used_bytes,
                ceiling_bytes = budget.ceiling_bytes,
                waited_ms = waited.as_millis(),
                "Memory still over budget after waiting, running job anyway"
            );
        }

        self.telemetry.emit(TelemetryEvent::BudgetWaited {
            job_id: job.id.clone(),
            used_bytes: sample.heap_used_bytes,
            ceiling_bytes: budget.ceiling_bytes,
            waited,
            recovered,
        });
        true
    }

    async fn render(&self, job: &Job, cancel: &CancellationToken) -> RenderOutcome {
        let Some(renderer) = self.renderers.get(job.document_type) else {
            return RenderOutcome::Failed(ErrorInfo::new(
                ErrorKind::Generation,
                format!(
                    "no renderer registered for document type '{}'",
                    job.document_type
                ),
            ));
        };

        let ctx = RenderContext {
            job_id: job.id.clone(),
            document_type: job.document_type,
            record: Arc::clone(&job.payload),
            options: Arc::clone(&job.options),
            cancellation: cancel.clone(),
        };

        debug!(job_id = %job.id, renderer = renderer.name(), "Rendering");
        let render = AssertUnwindSafe(renderer.render(&ctx)).catch_unwind();

        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return RenderOutcome::Interrupted,
            result = tokio::time::timeout(self.config.job_timeout, render) => result,
        };

        match result {
            Err(_elapsed) => {
                cancel.cancel();
                RenderOutcome::Failed(ErrorInfo::new(
                    ErrorKind::Timeout,
                    format!(
                        "render timed out after {} ms",
                        self.config.job_timeout.as_millis()
                    ),
                ))
            }
            Ok(Err(panic)) => RenderOutcome::Failed(self.classifier.classify(&format!(
                "renderer panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Ok(Ok(Err(e))) => RenderOutcome::Failed(self.classifier.classify_render_error(&e)),
            Ok(Ok(Ok(bytes))) => self.validate(job, bytes),
        }
    }

    /// Rejects empty output and output over the scope's size limit.
    fn validate(&self, job: &Job, bytes: Vec<u8>) -> RenderOutcome {
        if bytes.is_empty() {
            return RenderOutcome::Failed(ErrorInfo::new(
                ErrorKind::Generation,
                "invalid output: renderer returned no bytes",
            ));
        }

        let limit = self.config.output_limits.limit_for(job.scope);
        let size = bytes.len() as u64;
        if size > limit {
            return RenderOutcome::Failed(ErrorInfo::new(
                ErrorKind::Generation,
                format!(
                    "invalid output: {} bytes exceeds the {} {} limit",
                    size,
                    format_size(limit),
                    job.scope
                ),
            ));
        }

        RenderOutcome::Rendered(bytes)
    }

    fn succeed(&self, mut job: Job, bytes: Vec<u8>, duration: Duration) -> JobOutcome {
        if let Err(e) = job.succeed() {
            warn!(error = %e, "Unexpected job state on success");
        }
        self.tracker().mark_finished(
            &job.id,
            JobStatus::Succeeded,
            job.finished_at().unwrap_or_else(Utc::now),
            None,
            false,
        );
        self.counters.succeeded.fetch_add(1, Ordering::Relaxed);

        debug!(
            job_id = %job.id,
            bytes = bytes.len(),
            elapsed_ms = duration.as_millis(),
            "Job succeeded"
        );
        self.telemetry.emit(TelemetryEvent::JobSucceeded {
            job_id: job.id.clone(),
            bytes: bytes.len(),
            duration,
        });

        Ok(RenderedDocument {
            job_id: job.id,
            document_type: job.document_type,
            bytes,
            degraded: false,
            error: None,
        })
    }

    fn fail(&self, mut job: Job, info: ErrorInfo, duration: Duration) -> JobOutcome {
        if info.kind == ErrorKind::Timeout {
            self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
        }

        warn!(
            job_id = %job.id,
            kind = %info.kind,
            severity = %info.severity,
            detail = %info.technical_detail,
            elapsed_ms = duration.as_millis(),
            "Job failed"
        );

        let fallback = self
            .fallback
            .should_fallback(&info, job.fallback)
            .then(|| create_fallback(job.document_type, &job.payload, &job.options));

        if let Err(e) = job.fail(info.clone()) {
            warn!(error = %e, "Unexpected job state on failure");
        }
        self.tracker().mark_finished(
            &job.id,
            JobStatus::Failed,
            job.finished_at().unwrap_or_else(Utc::now),
            Some(info.kind),
            fallback.is_some(),
        );
        self.telemetry.emit(TelemetryEvent::JobFailed {
            job_id: job.id.clone(),
            kind: info.kind,
            duration,
            degraded: fallback.is_some(),
        });

        match fallback {
            Some(bytes) => {
                self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                info!(job_id = %job.id, kind = %info.kind, "Returning fallback document");
                self.telemetry.emit(TelemetryEvent::FallbackProduced {
                    job_id: job.id.clone(),
                    kind: info.kind,
                    bytes: bytes.len(),
                });
                Ok(RenderedDocument {
                    job_id: job.id,
                    document_type: job.document_type,
                    bytes,
                    degraded: true,
                    error: Some(info),
                })
            }
            None => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                Err(GenerateError::Rejected {
                    job_id: job.id,
                    info,
                })
            }
        }
    }
}

/// Answers a job with [`GenerateError::ShutDown`] without running it to
/// completion.
pub(crate) fn abandon(
    mut job: Job,
    reply: oneshot::Sender<JobOutcome>,
    tracker: &JobTracker,
    counters: &ExecutorCounters,
    telemetry: &dyn TelemetrySink,
) {
    let _ = job.fail(ErrorInfo::new(
        ErrorKind::Unknown,
        "service shut down before the job completed",
    ));
    tracker.mark_finished(
        &job.id,
        JobStatus::Failed,
        job.finished_at().unwrap_or_else(Utc::now),
        None,
        false,
    );
    counters.failed.fetch_add(1, Ordering::Relaxed);

    debug!(job_id = %job.id, "Job abandoned at shutdown");
    telemetry.emit(TelemetryEvent::JobAbandoned {
        job_id: job.id.clone(),
    });
    let _ = reply.send(Err(GenerateError::ShutDown));
}
