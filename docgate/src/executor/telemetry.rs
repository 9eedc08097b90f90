//! Telemetry for job execution observability.
//!
//! The executor emits structured events through a sink abstraction and does
//! not know how they are consumed.
//!
//! # Pattern: Emit, Don't Present
//!
//! The admission queue and drain loop focus on emitting events. Consumers
//! (logs, metrics, a status page) decide how to present or aggregate them.
//!
//! # Example
//!
//! ```
//! use docgate::executor::{TelemetryEvent, TelemetrySink};
//!
//! struct LoggingSink;
//!
//! impl TelemetrySink for LoggingSink {
//!     fn emit(&self, event: TelemetryEvent) {
//!         tracing::info!(event = event.event_type(), "Generation event");
//!     }
//! }
//! ```

use super::job::JobId;
use crate::classify::ErrorKind;
use crate::document::DocumentType;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Telemetry Events
// =============================================================================

/// Events emitted during admission and execution.
#[derive(Clone, Debug, PartialEq)]
pub enum TelemetryEvent {
    /// A job was appended to the admission queue.
    JobQueued {
        job_id: JobId,
        document_type: DocumentType,
        queue_depth: usize,
    },

    /// A job left the queue and started running.
    JobStarted {
        job_id: JobId,
        document_type: DocumentType,
        queue_wait: Duration,
    },

    /// A job waited for memory before rendering.
    BudgetWaited {
        job_id: JobId,
        used_bytes: u64,
        ceiling_bytes: u64,
        waited: Duration,
        /// False when the wait limit passed and the job ran anyway.
        recovered: bool,
    },

    /// A job rendered successfully.
    JobSucceeded {
        job_id: JobId,
        bytes: usize,
        duration: Duration,
    },

    /// A job failed.
    JobFailed {
        job_id: JobId,
        kind: ErrorKind,
        duration: Duration,
        degraded: bool,
    },

    /// Fallback output was produced for a failed job.
    FallbackProduced {
        job_id: JobId,
        kind: ErrorKind,
        bytes: usize,
    },

    /// A job was answered with a shutdown error without running to completion.
    JobAbandoned { job_id: JobId },
}

impl TelemetryEvent {
    /// Returns the job ID associated with this event.
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::JobQueued { job_id, .. }
            | Self::JobStarted { job_id, .. }
            | Self::BudgetWaited { job_id, .. }
            | Self::JobSucceeded { job_id, .. }
            | Self::JobFailed { job_id, .. }
            | Self::FallbackProduced { job_id, .. }
            | Self::JobAbandoned { job_id } => job_id,
        }
    }

    /// Returns a short name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::JobQueued { .. } => "job_queued",
            Self::JobStarted { .. } => "job_started",
            Self::BudgetWaited { .. } => "budget_waited",
            Self::JobSucceeded { .. } => "job_succeeded",
            Self::JobFailed { .. } => "job_failed",
            Self::FallbackProduced { .. } => "fallback_produced",
            Self::JobAbandoned { .. } => "job_abandoned",
        }
    }
}

// =============================================================================
// Telemetry Sink Trait
// =============================================================================

/// Sink for telemetry events.
///
/// Implementations must be thread-safe (`Send + Sync`) and fast: events are
/// emitted inline from the admission path and the drain loop.
pub trait TelemetrySink: Send + Sync {
    /// Called when a telemetry event occurs.
    fn emit(&self, event: TelemetryEvent);
}

// =============================================================================
// Built-in Sink Implementations
// =============================================================================

/// No-op sink for when telemetry is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetrySink;

impl TelemetrySink for NullTelemetrySink {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Sink that logs events using the `tracing` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn emit(&self, event: TelemetryEvent) {
        match &event {
            TelemetryEvent::JobQueued {
                job_id,
                document_type,
                queue_depth,
            } => {
                tracing::trace!(
                    job_id = %job_id,
                    document_type = %document_type,
                    queue_depth = queue_depth,
                    "Job queued"
                );
            }
            TelemetryEvent::JobStarted {
                job_id,
                document_type,
                queue_wait,
            } => {
                tracing::debug!(
                    job_id = %job_id,
                    document_type = %document_type,
                    queue_wait_ms = queue_wait.as_millis(),
                    "Job started"
                );
            }
            TelemetryEvent::BudgetWaited {
                job_id,
                used_bytes,
                ceiling_bytes,
                waited,
                recovered,
            } => {
                tracing::debug!(
                    job_id = %job_id,
                    used_bytes = used_bytes,
                    ceiling_bytes = ceiling_bytes,
                    waited_ms = waited.as_millis(),
                    recovered = recovered,
                    "Job waited for memory"
                );
            }
            TelemetryEvent::JobSucceeded {
                job_id,
                bytes,
                duration,
            } => {
                tracing::debug!(
                    job_id = %job_id,
                    bytes = bytes,
                    duration_ms = duration.as_millis(),
                    "Job succeeded"
                );
            }
            TelemetryEvent::JobFailed {
                job_id,
                kind,
                duration,
                degraded,
            } => {
                tracing::debug!(
                    job_id = %job_id,
                    kind = %kind,
                    duration_ms = duration.as_millis(),
                    degraded = degraded,
                    "Job failed"
                );
            }
            TelemetryEvent::FallbackProduced {
                job_id,
                kind,
                bytes,
            } => {
                tracing::debug!(
                    job_id = %job_id,
                    kind = %kind,
                    bytes = bytes,
                    "Fallback produced"
                );
            }
            TelemetryEvent::JobAbandoned { job_id } => {
                tracing::debug!(job_id = %job_id, "Job abandoned at shutdown");
            }
        }
    }
}

/// Sink that forwards events to multiple sinks.
pub struct MultiplexTelemetrySink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl MultiplexTelemetrySink {
    /// Creates a new multiplex sink with the given sinks.
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }

    /// Adds a sink to the multiplex.
    pub fn add_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }
}

impl TelemetrySink for MultiplexTelemetrySink {
    fn emit(&self, event: TelemetryEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

impl std::fmt::Debug for MultiplexTelemetrySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplexTelemetrySink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}
