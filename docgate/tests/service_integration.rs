//! Integration tests for the generation service.
//!
//! These tests drive a real service instance through its public API:
//! - FIFO ordering and one-at-a-time execution
//! - Failure isolation between jobs
//! - Timeouts, panics and invalid output
//! - Fallback output for eligible failures
//! - Memory budget waits
//! - Shutdown with work still queued

use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docgate::classify::ErrorKind;
use docgate::document::{DocumentScope, DocumentType, RenderOptions};
use docgate::executor::{
    ExecutorConfig, ExecutorState, GenerateError, GenerateRequest, GenerationService, JobStatus,
    OutputLimits, TelemetryEvent, TelemetrySink,
};
use docgate::monitor::{FixedMemoryProbe, ResourceMonitor};
use docgate::render::{
    BlockingRenderer, RenderContext, RenderError, RenderFuture, Renderer, RendererRegistry,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// Renderer whose behaviour is chosen by the record's `mode` field.
///
/// Records the order jobs start in and the highest number of renders seen
/// in flight at once.
#[derive(Default)]
struct ScriptedRenderer {
    active: AtomicUsize,
    max_active: AtomicUsize,
    order: Mutex<Vec<u64>>,
}

/// Decrements the in-flight count even if the render future is dropped.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Renderer for ScriptedRenderer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn render<'a>(&'a self, ctx: &'a RenderContext) -> RenderFuture<'a> {
        Box::pin(async move {
            let n = ctx.record["n"].as_u64().unwrap_or(0);
            self.order.lock().unwrap().push(n);

            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            let _guard = ActiveGuard(&self.active);

            tokio::time::sleep(Duration::from_millis(5)).await;

            match ctx.record["mode"].as_str().unwrap_or("ok") {
                "oom" => Err(RenderError::Failed(
                    "out of memory while laying out page".to_string(),
                )),
                "invalid" => Err(RenderError::InvalidRecord(
                    "missing field 'title'".to_string(),
                )),
                "unreachable" => Err(RenderError::DataAccess(
                    "connection refused".to_string(),
                )),
                "db_failed" => Err(RenderError::Failed(
                    "database connection refused".to_string(),
                )),
                "hang" => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                "panic" => panic!("layout engine exploded"),
                "slow" => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(format!("document {}", n).into_bytes())
                }
                "empty" => Ok(Vec::new()),
                "big" => Ok(vec![b'x'; 64]),
                "over_default" => Ok(vec![
                    b'x';
                    OutputLimits::default().max_document_bytes as usize + 1
                ]),
                _ => Ok(format!("document {}", n).into_bytes()),
            }
        })
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<TelemetryEvent>>);

impl RecordingSink {
    fn events(&self) -> Vec<TelemetryEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn emit(&self, event: TelemetryEvent) {
        self.0.lock().unwrap().push(event);
    }
}

fn fast_config() -> ExecutorConfig {
    ExecutorConfig::default().with_inter_job_delay(Duration::from_millis(1))
}

fn registry(renderer: &Arc<ScriptedRenderer>) -> RendererRegistry {
    let mut registry = RendererRegistry::new();
    for document_type in DocumentType::ALL {
        registry.register(document_type, Arc::clone(renderer) as Arc<dyn Renderer>);
    }
    registry
}

fn service_with(config: ExecutorConfig, renderer: &Arc<ScriptedRenderer>) -> GenerationService {
    GenerationService::builder(config)
        .renderers(registry(renderer))
        .monitor(ResourceMonitor::new(Arc::new(FixedMemoryProbe::new(0))))
        .build()
}

fn record(n: u64, mode: &str) -> Value {
    json!({ "n": n, "mode": mode })
}

// =============================================================================
// Ordering and Serialization
// =============================================================================

#[tokio::test]
async fn test_jobs_run_in_admission_order_one_at_a_time() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = service_with(fast_config(), &renderer);

    // Admit before starting so the whole batch is queued at once.
    let tickets: Vec<_> = (0..10)
        .map(|n| service.enqueue(DocumentType::Report, record(n, "ok")))
        .collect();
    assert_eq!(service.stats().queue_depth, 10);

    service.start().unwrap();
    for (n, ticket) in tickets.into_iter().enumerate() {
        let document = ticket.await.unwrap();
        assert_eq!(document.bytes, format!("document {}", n).into_bytes());
    }

    assert_eq!(*renderer.order.lock().unwrap(), (0..10u64).collect::<Vec<_>>());
    assert_eq!(renderer.max_active.load(Ordering::SeqCst), 1);

    let stats = service.stats();
    assert_eq!(stats.submitted, 10);
    assert_eq!(stats.succeeded, 10);
    assert_eq!(stats.queue_depth, 0);
    assert_eq!(stats.peak_running, 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_submitters_are_serialized() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = Arc::new(service_with(fast_config(), &renderer));
    service.start().unwrap();

    let mut handles = Vec::new();
    for n in 0..8 {
        let queue = service.queue();
        handles.push(tokio::spawn(async move {
            queue.enqueue(DocumentType::Result, record(n, "ok")).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(renderer.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(service.stats().peak_running, 1);
    service.shutdown().await;
}

// =============================================================================
// Failure Isolation and Fallback
// =============================================================================

#[tokio::test]
async fn test_memory_failure_in_the_middle_degrades_only_that_job() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = service_with(fast_config(), &renderer);
    service.start().unwrap();

    let tickets: Vec<_> = (1..=5)
        .map(|n| {
            let mode = if n == 3 { "oom" } else { "ok" };
            service.enqueue(DocumentType::Report, record(n, mode))
        })
        .collect();

    for (i, ticket) in tickets.into_iter().enumerate() {
        let document = ticket.await.unwrap();
        if i == 2 {
            assert!(document.degraded);
            assert!(!document.bytes.is_empty());
            let info = document.error.unwrap();
            assert_eq!(info.kind, ErrorKind::Memory);
            assert!(info.fallback_eligible);
            let text = String::from_utf8(document.bytes).unwrap();
            assert!(text.contains("mode: oom"));
        } else {
            assert!(!document.degraded);
            assert!(document.error.is_none());
        }
    }

    let stats = service.stats();
    assert_eq!(stats.succeeded, 4);
    assert_eq!(stats.degraded, 1);
    assert_eq!(stats.failed, 0);
    service.shutdown().await;
}

#[tokio::test]
async fn test_memory_failure_without_fallback_is_rejected() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = service_with(fast_config(), &renderer);
    service.start().unwrap();

    let tickets: Vec<_> = (1..=5)
        .map(|n| {
            let mode = if n == 3 { "oom" } else { "ok" };
            service.submit(
                GenerateRequest::new(DocumentType::Process, record(n, mode)).with_fallback(false),
            )
        })
        .collect();

    let mut outcomes = Vec::new();
    for ticket in tickets {
        outcomes.push(ticket.await);
    }

    for (i, outcome) in outcomes.iter().enumerate() {
        if i == 2 {
            let err = outcome.as_ref().unwrap_err();
            assert_eq!(err.kind(), Some(ErrorKind::Memory));
            assert!(matches!(err, GenerateError::Rejected { .. }));
        } else {
            assert!(outcome.is_ok());
        }
    }
    assert_eq!(service.stats().failed, 1);
    service.shutdown().await;
}

#[tokio::test]
async fn test_service_default_can_disable_fallback() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = service_with(fast_config().with_fallback_by_default(false), &renderer);
    service.start().unwrap();

    let outcome = service
        .enqueue(DocumentType::Report, record(1, "invalid"))
        .await;
    assert_eq!(outcome.unwrap_err().kind(), Some(ErrorKind::Validation));

    // A request can still opt in.
    let document = service
        .submit(GenerateRequest::new(DocumentType::Report, record(2, "invalid")).with_fallback(true))
        .await
        .unwrap();
    assert!(document.degraded);
    service.shutdown().await;
}

#[tokio::test]
async fn test_data_access_failure_never_falls_back() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = service_with(fast_config(), &renderer);
    service.start().unwrap();

    let outcome = service
        .submit(GenerateRequest::new(DocumentType::Result, record(1, "unreachable")).with_fallback(true))
        .await;

    let info = outcome.unwrap_err().info().cloned().unwrap();
    assert_eq!(info.kind, ErrorKind::DataAccess);
    assert!(!info.fallback_eligible);

    // A generic failure whose message names the data source.
    let outcome = service
        .submit(GenerateRequest::new(DocumentType::Result, record(2, "db_failed")).with_fallback(true))
        .await;
    let info = outcome.unwrap_err().info().cloned().unwrap();
    assert_eq!(info.kind, ErrorKind::DataAccess);
    assert_eq!(info.technical_detail, "render failed: database connection refused");

    service.shutdown().await;
}

#[tokio::test]
async fn test_panicking_renderer_does_not_stop_the_queue() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = service_with(fast_config(), &renderer);
    service.start().unwrap();

    let panicking = service.submit(
        GenerateRequest::new(DocumentType::Report, record(1, "panic")).with_fallback(false),
    );
    let next = service.enqueue(DocumentType::Report, record(2, "ok"));

    let err = panicking.await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Generation));
    assert!(err.info().unwrap().technical_detail.contains("layout engine exploded"));
    assert_eq!(next.await.unwrap().bytes, b"document 2");
    assert_eq!(renderer.active.load(Ordering::SeqCst), 0);

    service.shutdown().await;
}

#[tokio::test]
async fn test_missing_renderer_is_a_generation_failure() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = GenerationService::builder(fast_config())
        .renderers(RendererRegistry::new().with(
            DocumentType::Report,
            BlockingRenderer::new("plain", |_ctx: &RenderContext| Ok(b"ok".to_vec())),
        ))
        .monitor(ResourceMonitor::new(Arc::new(FixedMemoryProbe::new(0))))
        .build();
    service.start().unwrap();

    let err = service
        .submit(GenerateRequest::new(DocumentType::Process, record(1, "ok")).with_fallback(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Generation));
    assert!(renderer.order.lock().unwrap().is_empty());
    service.shutdown().await;
}

// =============================================================================
// Output Validation
// =============================================================================

#[tokio::test]
async fn test_output_over_scope_limit_is_rejected() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let config = fast_config().with_output_limits(OutputLimits {
        max_document_bytes: 128,
        max_subdocument_bytes: 32,
    });
    let service = service_with(config, &renderer);
    service.start().unwrap();

    // 64 bytes fits a document but not a subdocument.
    let document = service
        .enqueue(DocumentType::Report, record(1, "big"))
        .await
        .unwrap();
    assert_eq!(document.bytes.len(), 64);

    let err = service
        .submit(
            GenerateRequest::new(DocumentType::Report, record(2, "big"))
                .with_scope(DocumentScope::Subdocument)
                .with_fallback(false),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Generation));
    assert!(err.info().unwrap().technical_detail.contains("invalid output"));

    service.shutdown().await;
}

#[tokio::test]
async fn test_default_document_limit_is_100_mb() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = service_with(fast_config(), &renderer);
    service.start().unwrap();

    assert_eq!(OutputLimits::default().max_document_bytes, 100 * 1024 * 1024);

    let err = service
        .submit(
            GenerateRequest::new(DocumentType::Report, record(1, "over_default"))
                .with_fallback(false),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Generation));
    assert!(err.info().unwrap().technical_detail.contains("104857601 bytes"));

    service.shutdown().await;
}

#[tokio::test]
async fn test_empty_output_is_rejected() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = service_with(fast_config(), &renderer);
    service.start().unwrap();

    let err = service
        .submit(GenerateRequest::new(DocumentType::Report, record(1, "empty")).with_fallback(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Generation));
    service.shutdown().await;
}

// =============================================================================
// Timeouts and Cancellation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_hung_render_times_out_at_the_deadline_and_queue_continues() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let config = fast_config().with_job_timeout(Duration::from_secs(2));
    let service = service_with(config, &renderer);
    service.start().unwrap();

    let started = tokio::time::Instant::now();
    let hung = service.submit(
        GenerateRequest::new(DocumentType::Report, record(1, "hang")).with_fallback(false),
    );
    let next = service.enqueue(DocumentType::Report, record(2, "ok"));

    let err = hung.await.unwrap_err();
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(err.kind(), Some(ErrorKind::Timeout));

    assert_eq!(next.await.unwrap().bytes, b"document 2");
    let stats = service.stats();
    assert_eq!(stats.timed_out, 1);
    assert_eq!(stats.running, 0);
    assert_eq!(renderer.active.load(Ordering::SeqCst), 0);

    service.shutdown().await;
}

#[tokio::test]
async fn test_timeout_cancels_blocking_renderer_token() {
    let observed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&observed);
    let service = GenerationService::builder(
        fast_config().with_job_timeout(Duration::from_millis(100)),
    )
    .renderer(
        DocumentType::Report,
        BlockingRenderer::new("slow", move |ctx: &RenderContext| {
            for _ in 0..500 {
                if ctx.is_cancelled() {
                    flag.store(true, Ordering::SeqCst);
                    return Err(RenderError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Ok(b"too late".to_vec())
        }),
    )
    .monitor(ResourceMonitor::new(Arc::new(FixedMemoryProbe::new(0))))
    .build();
    service.start().unwrap();

    let err = service
        .submit(GenerateRequest::new(DocumentType::Report, json!({})).with_fallback(false))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Timeout));

    for _ in 0..200 {
        if observed.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(observed.load(Ordering::SeqCst));
    service.shutdown().await;
}

// =============================================================================
// Memory Budget
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_job_waits_for_memory_to_recover() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let probe = Arc::new(FixedMemoryProbe::new(500 * 1024 * 1024));
    let sink = Arc::new(RecordingSink::default());
    let service = GenerationService::builder(fast_config())
        .renderers(registry(&renderer))
        .monitor(ResourceMonitor::new(Arc::clone(&probe) as _))
        .telemetry(Arc::clone(&sink) as Arc<dyn TelemetrySink>)
        .build();
    service.start().unwrap();

    let release = Arc::clone(&probe);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        release.set(10 * 1024 * 1024);
    });

    let document = service
        .enqueue(DocumentType::Report, record(1, "ok"))
        .await
        .unwrap();
    assert!(!document.degraded);

    let waited = sink.events().into_iter().find_map(|event| match event {
        TelemetryEvent::BudgetWaited { recovered, waited, .. } => Some((recovered, waited)),
        _ => None,
    });
    let (recovered, waited) = waited.unwrap();
    assert!(recovered);
    assert!(waited >= Duration::from_secs(1));

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_job_runs_after_budget_wait_expires() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let sink = Arc::new(RecordingSink::default());
    let service = GenerationService::builder(fast_config())
        .renderers(registry(&renderer))
        .monitor(ResourceMonitor::new(Arc::new(FixedMemoryProbe::new(u64::MAX))))
        .telemetry(Arc::clone(&sink) as Arc<dyn TelemetrySink>)
        .build();
    service.start().unwrap();

    let document = service
        .enqueue(DocumentType::Report, record(1, "ok"))
        .await
        .unwrap();
    assert_eq!(document.bytes, b"document 1");

    assert!(sink.events().iter().any(|event| matches!(
        event,
        TelemetryEvent::BudgetWaited { recovered: false, .. }
    )));
    service.shutdown().await;
}

// =============================================================================
// Status, Telemetry and Shutdown
// =============================================================================

#[tokio::test]
async fn test_job_status_and_telemetry_sequence() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let sink = Arc::new(RecordingSink::default());
    let service = GenerationService::builder(fast_config())
        .renderers(registry(&renderer))
        .monitor(ResourceMonitor::new(Arc::new(FixedMemoryProbe::new(0))))
        .telemetry(Arc::clone(&sink) as Arc<dyn TelemetrySink>)
        .build();

    let ok = service.enqueue(DocumentType::Report, record(1, "ok"));
    let ok_id = ok.job_id().clone();
    let bad = service.enqueue(DocumentType::Report, record(2, "oom"));
    let bad_id = bad.job_id().clone();

    assert_eq!(service.job_status(&ok_id).unwrap().status, JobStatus::Queued);
    assert_eq!(service.state(), ExecutorState::Stopped);

    service.start().unwrap();
    ok.await.unwrap();
    bad.await.unwrap();

    let ok_snapshot = service.job_status(&ok_id).unwrap();
    assert_eq!(ok_snapshot.status, JobStatus::Succeeded);
    assert!(ok_snapshot.started_at.is_some());
    assert!(ok_snapshot.finished_at.is_some());

    let bad_snapshot = service.job_status(&bad_id).unwrap();
    assert_eq!(bad_snapshot.status, JobStatus::Failed);
    assert_eq!(bad_snapshot.error_kind, Some(ErrorKind::Memory));
    assert!(bad_snapshot.degraded);

    let types: Vec<_> = sink
        .events()
        .iter()
        .filter(|event| event.job_id() == &ok_id)
        .map(|event| event.event_type())
        .collect();
    assert_eq!(types, vec!["job_queued", "job_started", "job_succeeded"]);

    let bad_types: Vec<_> = sink
        .events()
        .iter()
        .filter(|event| event.job_id() == &bad_id)
        .map(|event| event.event_type())
        .collect();
    assert_eq!(
        bad_types,
        vec!["job_queued", "job_started", "job_failed", "fallback_produced"]
    );

    service.shutdown().await;
    assert_eq!(service.state(), ExecutorState::Stopped);
}

#[tokio::test]
async fn test_cleanup_sweep_keeps_waiting_jobs_and_running_count_exact() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let monitor = ResourceMonitor::new(Arc::new(FixedMemoryProbe::new(0)))
        .with_retention(Duration::from_millis(20))
        .with_cleanup_interval(Duration::from_millis(10));
    let service = GenerationService::builder(fast_config())
        .renderers(registry(&renderer))
        .monitor(monitor)
        .build();
    service.start().unwrap();

    let tickets: Vec<_> = (1..=3u64)
        .map(|n| service.enqueue(DocumentType::Report, record(n, "slow")))
        .collect();
    let last_id = tickets[2].job_id().clone();

    // Several sweeps pass while the last job is still waiting.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(
        service.job_status(&last_id).map(|s| s.status),
        Some(JobStatus::Queued)
    );

    for ticket in tickets {
        ticket.await.unwrap();
    }

    let stats = service.stats();
    assert_eq!(stats.running, 0);
    assert_eq!(stats.peak_running, 1);

    service.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_answers_running_and_queued_jobs() {
    let renderer = Arc::new(ScriptedRenderer::default());
    let service = service_with(fast_config(), &renderer);
    service.start().unwrap();

    let hung = service.enqueue(DocumentType::Report, record(1, "hang"));
    let hung_id = hung.job_id().clone();
    let queued: Vec<_> = (2..5)
        .map(|n| service.enqueue(DocumentType::Report, record(n, "ok")))
        .collect();

    for _ in 0..200 {
        if service.job_status(&hung_id).map(|s| s.status) == Some(JobStatus::Running) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(service.job_status(&hung_id).unwrap().status, JobStatus::Running);

    service.shutdown().await;

    assert_eq!(hung.await, Err(GenerateError::ShutDown));
    for ticket in queued {
        assert_eq!(ticket.await, Err(GenerateError::ShutDown));
    }

    let late = service.enqueue(DocumentType::Report, record(9, "ok"));
    assert_eq!(late.await, Err(GenerateError::ShutDown));

    let stats = service.stats();
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.running, 0);
    assert_eq!(stats.queue_depth, 0);
    assert_eq!(*renderer.order.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn test_generate_passes_render_options() {
    let service = GenerationService::builder(fast_config())
        .renderer(
            DocumentType::Report,
            BlockingRenderer::new("titled", |ctx: &RenderContext| {
                Ok(ctx.options.title.clone().unwrap_or_default().into_bytes())
            }),
        )
        .monitor(ResourceMonitor::new(Arc::new(FixedMemoryProbe::new(0))))
        .build();
    service.start().unwrap();

    let document = service
        .generate(
            DocumentType::Report,
            json!({}),
            RenderOptions::new().with_title("Quarterly"),
        )
        .await
        .unwrap();
    assert_eq!(document.bytes, b"Quarterly");
    assert_eq!(document.document_type, DocumentType::Report);

    service.shutdown().await;
}
