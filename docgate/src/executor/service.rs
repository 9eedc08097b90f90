//! Generation service.
//!
//! [`GenerationService`] owns the admission queue, the drain loop and the
//! tracker cleanup task, and is the entry point for applications:
//!
//! ```ignore
//! let service = GenerationService::builder(ExecutorConfig::default())
//!     .renderer(DocumentType::Report, my_renderer)
//!     .build();
//! service.start()?;
//!
//! let document = service.generate(DocumentType::Report, record, RenderOptions::new()).await?;
//! service.shutdown().await;
//! ```

use super::config::ExecutorConfig;
use super::job::JobId;
use super::queue::{AdmissionQueue, GenerateRequest, QueuedJob};
use super::stats::{ExecutorCounters, ExecutorState, ExecutorStats};
use super::telemetry::{TelemetrySink, TracingTelemetrySink};
use super::ticket::{JobOutcome, JobTicket};
use super::worker::{abandon, DrainLoop};
use crate::classify::{ErrorClassifier, FallbackPolicy};
use crate::document::{DocumentType, RenderOptions};
use crate::monitor::{JobSnapshot, ResourceMonitor};
use crate::render::{Renderer, RendererRegistry};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors from starting the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Generation service already started")]
    AlreadyStarted,

    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("Generation service is shut down")]
    ShutDown,
}

/// Parts that only exist between construction and shutdown.
struct Runtime {
    receiver: Option<mpsc::UnboundedReceiver<QueuedJob>>,
    tasks: Vec<JoinHandle<()>>,
    started: bool,
}

/// Serialized document generation.
///
/// Jobs are admitted into an unbounded FIFO queue and rendered one at a time
/// by a single drain loop.
pub struct GenerationService {
    config: ExecutorConfig,
    renderers: RendererRegistry,
    monitor: Arc<ResourceMonitor>,
    classifier: ErrorClassifier,
    telemetry: Arc<dyn TelemetrySink>,
    counters: Arc<ExecutorCounters>,
    shutdown: CancellationToken,
    queue: AdmissionQueue,
    runtime: Mutex<Runtime>,
}

impl GenerationService {
    /// Creates a service with the default monitor, classifier and telemetry.
    pub fn new(config: ExecutorConfig, renderers: RendererRegistry) -> Self {
        Self::builder(config).renderers(renderers).build()
    }

    pub fn builder(config: ExecutorConfig) -> GenerationServiceBuilder {
        GenerationServiceBuilder {
            config,
            renderers: RendererRegistry::new(),
            monitor: None,
            classifier: ErrorClassifier::default(),
            telemetry: Arc::new(TracingTelemetrySink),
        }
    }

    /// Spawns the drain loop and the tracker cleanup task.
    ///
    /// Must be called from within a Tokio runtime. Jobs admitted before
    /// `start` wait in the queue.
    pub fn start(&self) -> Result<(), ServiceError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| ServiceError::NoRuntime(e.to_string()))?;

        if self.shutdown.is_cancelled() {
            return Err(ServiceError::ShutDown);
        }

        let mut runtime = self.lock_runtime();
        if runtime.started {
            return Err(ServiceError::AlreadyStarted);
        }
        let receiver = runtime.receiver.take().ok_or(ServiceError::ShutDown)?;

        let drain = DrainLoop {
            receiver,
            config: self.config.clone(),
            renderers: self.renderers.clone(),
            monitor: Arc::clone(&self.monitor),
            classifier: self.classifier.clone(),
            fallback: FallbackPolicy::new(self.config.fallback_by_default),
            telemetry: Arc::clone(&self.telemetry),
            counters: Arc::clone(&self.counters),
            shutdown: self.shutdown.clone(),
        };

        runtime.tasks.push(handle.spawn(drain.run()));
        runtime.tasks.push(
            handle.spawn(Arc::clone(&self.monitor).run_cleanup(self.shutdown.clone())),
        );
        runtime.started = true;

        info!(
            renderers = self.renderers.len(),
            memory_ceiling_bytes = self.config.memory_ceiling_per_job,
            "Generation service started"
        );
        Ok(())
    }

    /// Admits a job with default options.
    pub fn enqueue(&self, document_type: DocumentType, payload: Value) -> JobTicket {
        self.queue.enqueue(document_type, payload)
    }

    /// Admits a request.
    pub fn submit(&self, request: GenerateRequest) -> JobTicket {
        self.queue.submit(request)
    }

    /// Admits a job and waits for its outcome.
    pub async fn generate(
        &self,
        document_type: DocumentType,
        record: Value,
        options: RenderOptions,
    ) -> JobOutcome {
        self.submit(GenerateRequest::new(document_type, record).with_options(options))
            .await
    }

    /// Stops accepting work and waits for the background tasks to finish.
    ///
    /// A render in progress is cancelled. Every job still queued is answered
    /// with [`GenerateError::ShutDown`](super::GenerateError::ShutDown).
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let (tasks, receiver) = {
            let mut runtime = self.lock_runtime();
            (
                std::mem::take(&mut runtime.tasks),
                runtime.receiver.take(),
            )
        };

        // Never started: nothing else will answer the queued jobs.
        if let Some(mut receiver) = receiver {
            receiver.close();
            while let Ok(queued) = receiver.try_recv() {
                self.counters.dequeued();
                abandon(
                    queued.job,
                    queued.reply,
                    self.monitor.tracker(),
                    &self.counters,
                    &*self.telemetry,
                );
            }
        }

        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Generation task ended abnormally");
            }
        }

        info!("Generation service shut down");
    }

    /// Cloneable handle for admitting jobs from other tasks.
    pub fn queue(&self) -> AdmissionQueue {
        self.queue.clone()
    }

    /// Snapshot of a job still held by the tracker.
    pub fn job_status(&self, job_id: &JobId) -> Option<JobSnapshot> {
        self.monitor.tracker().get(job_id)
    }

    pub fn stats(&self) -> ExecutorStats {
        let tracker = self.monitor.tracker();
        self.counters
            .snapshot(tracker.running_count(), tracker.peak_running())
    }

    pub fn state(&self) -> ExecutorState {
        self.counters.state()
    }

    pub fn monitor(&self) -> &Arc<ResourceMonitor> {
        &self.monitor
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn lock_runtime(&self) -> std::sync::MutexGuard<'_, Runtime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for GenerationService {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for GenerationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationService")
            .field("state", &self.state())
            .field("queue_depth", &self.queue.depth())
            .field("renderers", &self.renderers.document_types())
            .finish()
    }
}

/// Builder for [`GenerationService`].
pub struct GenerationServiceBuilder {
    config: ExecutorConfig,
    renderers: RendererRegistry,
    monitor: Option<ResourceMonitor>,
    classifier: ErrorClassifier,
    telemetry: Arc<dyn TelemetrySink>,
}

impl GenerationServiceBuilder {
    pub fn renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn renderer(mut self, document_type: DocumentType, renderer: impl Renderer + 'static) -> Self {
        self.renderers.register(document_type, Arc::new(renderer));
        self
    }

    /// Replaces the process-RSS monitor, e.g. with a fixed probe in tests.
    pub fn monitor(mut self, monitor: ResourceMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn build(self) -> GenerationService {
        let config = self.config;
        let monitor = Arc::new(self.monitor.unwrap_or_else(|| {
            ResourceMonitor::for_process()
                .with_retention(config.tracker_retention)
                .with_cleanup_interval(config.cleanup_interval)
        }));

        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(ExecutorCounters::new());
        let shutdown = CancellationToken::new();
        let queue = AdmissionQueue::new(
            sender,
            Arc::clone(monitor.tracker()),
            Arc::clone(&counters),
            Arc::clone(&self.telemetry),
            shutdown.clone(),
        );

        GenerationService {
            config,
            renderers: self.renderers,
            monitor,
            classifier: self.classifier,
            telemetry: self.telemetry,
            counters,
            shutdown,
            queue,
            runtime: Mutex::new(Runtime {
                receiver: Some(receiver),
                tasks: Vec::new(),
                started: false,
            }),
        }
    }
}
