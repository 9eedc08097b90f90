//! Serialized Generation Executor
//!
//! This module admits document jobs and renders them strictly one at a time,
//! isolating failures so one bad job never takes down the jobs behind it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GenerationService                         │
//! │  Owns the queue and background tasks, start / shutdown      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AdmissionQueue ──(unbounded FIFO)──▶ DrainLoop             │
//! │  enqueue / submit                     budget wait, render,  │
//! │  returns JobTicket                    validate, classify    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Resource    │  │ Error       │  │ Telemetry           │  │
//! │  │ Monitor     │  │ Classifier  │  │ Sink                │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Job**: One request to render a document type from a JSON record.
//!   Jobs move `Queued → Running → Succeeded | Failed` and never go back.
//!
//! - **Ticket**: The caller's handle on an admitted job. Awaiting it yields
//!   a [`RenderedDocument`] or a [`GenerateError`].
//!
//! - **Degraded output**: When a fallback-eligible failure occurs and the
//!   caller allows it, the ticket resolves to plain-text fallback bytes with
//!   `degraded` set instead of an error.
//!
//! # Guarantees
//!
//! - Jobs start in admission order and at most one renders at a time.
//! - Every admitted job reaches a terminal state, including on timeout,
//!   panic and shutdown.
//! - Identical requests are never merged; each admission is its own job.
//!
//! # Telemetry
//!
//! The executor emits structured events via the [`TelemetrySink`] trait:
//! queueing, start, budget waits, success, failure, fallback and
//! abandonment at shutdown.

mod config;
mod job;
mod queue;
mod service;
mod stats;
mod telemetry;
mod ticket;
mod worker;

// Configuration
pub use config::{ExecutorConfig, OutputLimits};

// Job types
pub use job::{Job, JobId, JobStatus, JobTransitionError};

// Admission
pub use queue::{AdmissionQueue, GenerateRequest};

// Service facade
pub use service::{GenerationService, GenerationServiceBuilder, ServiceError};

// Statistics
pub use stats::{ExecutorState, ExecutorStats};

// Telemetry
pub use telemetry::{
    MultiplexTelemetrySink, NullTelemetrySink, TelemetryEvent, TelemetrySink, TracingTelemetrySink,
};

// Results
pub use ticket::{GenerateError, JobOutcome, JobTicket, RenderedDocument};
