//! Generate command - render a single record to a file.

use std::path::PathBuf;
use std::time::Duration;

use docgate::config::format_size;
use docgate::document::{DocumentScope, DocumentType};
use docgate::executor::GenerateRequest;
use tracing::info;

use super::common::{read_record, FallbackArgs, OptionArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the generate command.
pub struct GenerateArgs {
    pub document_type: DocumentType,
    pub record: PathBuf,
    pub output: PathBuf,
    pub options: OptionArgs,
    pub fallback: FallbackArgs,
    pub timeout_secs: Option<u64>,
    pub subdocument: bool,
}

/// Run the generate command.
pub fn run(runner: &CliRunner, args: GenerateArgs) -> Result<(), CliError> {
    runner.log_startup("generate");

    let record = read_record(&args.record)?;

    let mut config = runner.executor_config();
    if let Some(secs) = args.timeout_secs {
        if secs == 0 {
            return Err(CliError::Config(
                "--timeout-secs must be at least 1".to_string(),
            ));
        }
        config = config.with_job_timeout(Duration::from_secs(secs));
    }

    let scope = if args.subdocument {
        DocumentScope::Subdocument
    } else {
        DocumentScope::Document
    };
    let mut request = GenerateRequest::new(args.document_type, record)
        .with_options(args.options.to_render_options())
        .with_scope(scope);
    if let Some(fallback) = args.fallback.choice() {
        request = request.with_fallback(fallback);
    }

    println!(
        "Generating {} from {}",
        args.document_type,
        args.record.display()
    );

    let runtime = runner.runtime()?;
    let outcome = runtime.block_on(async {
        let service = runner.create_service(config);
        service.start()?;
        let outcome = service.submit(request).await;
        service.shutdown().await;
        Ok::<_, CliError>(outcome)
    })?;

    let document = outcome?;
    runner.save_document(&args.output, &document.bytes)?;

    if let Some(error) = document.error.as_ref().filter(|_| document.degraded) {
        info!(kind = %error.kind, "Saved simplified document");
        println!(
            "Saved simplified document: {} ({})",
            args.output.display(),
            format_size(document.bytes.len() as u64)
        );
        println!("  Reason: {}", error.user_message);
        println!("  Detail: {}", error);
    } else {
        println!(
            "Saved document: {} ({})",
            args.output.display(),
            format_size(document.bytes.len() as u64)
        );
    }

    Ok(())
}
