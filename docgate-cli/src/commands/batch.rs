//! Batch command - render every record in a directory through one queue.
//!
//! All records are admitted up front, so the run also shows the queue's
//! ordering: results come back in file-name order, one render at a time.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use docgate::config::format_size;
use docgate::document::DocumentType;
use docgate::executor::{GenerateRequest, TelemetryEvent, TelemetrySink};

use super::common::{read_record, FallbackArgs, OptionArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the batch command.
pub struct BatchArgs {
    pub document_type: DocumentType,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub options: OptionArgs,
    pub fallback: FallbackArgs,
}

/// Collects queue figures for the batch summary.
#[derive(Debug, Default)]
struct BatchProgress {
    memory_waits: AtomicUsize,
    longest_queue_wait_ms: AtomicU64,
}

impl TelemetrySink for BatchProgress {
    fn emit(&self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::JobStarted { queue_wait, .. } => {
                self.longest_queue_wait_ms
                    .fetch_max(queue_wait.as_millis() as u64, Ordering::Relaxed);
            }
            TelemetryEvent::BudgetWaited { .. } => {
                self.memory_waits.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}

/// Run the batch command.
pub fn run(runner: &CliRunner, args: BatchArgs) -> Result<(), CliError> {
    runner.log_startup("batch");

    let inputs = list_records(&args.input_dir)?;
    if inputs.is_empty() {
        println!("No .json records found in {}", args.input_dir.display());
        return Ok(());
    }

    // Unreadable records are reported but do not stop the batch.
    let mut failed = 0usize;
    let mut requests = Vec::new();
    for path in &inputs {
        match read_record(path) {
            Ok(record) => {
                let mut request = GenerateRequest::new(args.document_type, record)
                    .with_options(args.options.to_render_options());
                if let Some(fallback) = args.fallback.choice() {
                    request = request.with_fallback(fallback);
                }
                requests.push((path.clone(), request));
            }
            Err(e) => {
                failed += 1;
                println!("  ✗ {}", e);
            }
        }
    }

    println!(
        "Generating {} {} document(s) from {}",
        requests.len(),
        args.document_type,
        args.input_dir.display()
    );

    let progress = Arc::new(BatchProgress::default());
    let runtime = runner.runtime()?;
    let (outcomes, stats) = runtime.block_on(async {
        let service = runner.create_service_with(
            runner.executor_config(),
            vec![Arc::clone(&progress) as Arc<dyn TelemetrySink>],
        );
        let tickets: Vec<_> = requests
            .into_iter()
            .map(|(path, request)| (path, service.submit(request)))
            .collect();
        service.start()?;

        let mut outcomes = Vec::with_capacity(tickets.len());
        for (path, ticket) in tickets {
            outcomes.push((path, ticket.await));
        }
        let stats = service.stats();
        service.shutdown().await;
        Ok::<_, CliError>((outcomes, stats))
    })?;

    let mut degraded = 0usize;
    for (path, outcome) in outcomes {
        let name = file_stem(&path);
        match outcome {
            Ok(document) => {
                let output = args.output_dir.join(format!("{}.txt", name));
                runner.save_document(&output, &document.bytes)?;
                let size = format_size(document.bytes.len() as u64);
                match document.error.filter(|_| document.degraded) {
                    Some(error) => {
                        degraded += 1;
                        println!("  ~ {} ({}, simplified: {})", name, size, error.kind);
                    }
                    None => println!("  ✓ {} ({})", name, size),
                }
            }
            Err(e) => {
                failed += 1;
                println!("  ✗ {}: {}", name, e);
            }
        }
    }

    println!();
    println!(
        "Done: {} succeeded, {} simplified, {} failed (peak concurrent renders: {})",
        stats.succeeded, degraded, failed, stats.peak_running
    );
    println!(
        "Longest queue wait: {} ms, memory waits: {}",
        progress.longest_queue_wait_ms.load(Ordering::Relaxed),
        progress.memory_waits.load(Ordering::Relaxed)
    );

    if failed > 0 {
        return Err(CliError::BatchFailed {
            failed,
            total: inputs.len(),
        });
    }
    Ok(())
}

/// `*.json` files in `dir`, sorted by name.
fn list_records(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CliError::FileRead {
        path: dir.to_path_buf(),
        error: e,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json")
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}
