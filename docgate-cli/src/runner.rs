//! CLI runner for common setup and operations.
//!
//! Encapsulates logging initialization, service creation, and file operations
//! to reduce duplication across command handlers.

use crate::error::CliError;
use crate::renderer;
use docgate::config::{format_size, ConfigFile};
use docgate::executor::{
    ExecutorConfig, GenerationService, MultiplexTelemetrySink, TelemetrySink, TracingTelemetrySink,
};
use docgate::logging::{init_logging, split_log_path, LoggingGuard};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    /// * `verbose` - When true, log lines are also written to stderr
    pub fn with_logging(debug_mode: bool, verbose: bool) -> Result<Self, CliError> {
        // Load config file (or use defaults if not present)
        let config = ConfigFile::load()?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard = init_logging(&log_dir, &log_file, verbose, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("docgate v{}", docgate::VERSION);
        info!("docgate CLI: {} command", command);
    }

    /// Runtime configuration derived from the config file.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::from(&self.config)
    }

    /// Create a service with the built-in text renderer for every document type.
    pub fn create_service(&self, config: ExecutorConfig) -> GenerationService {
        self.create_service_with(config, Vec::new())
    }

    /// Like [`create_service`](Self::create_service), with extra telemetry
    /// sinks next to the tracing sink.
    pub fn create_service_with(
        &self,
        config: ExecutorConfig,
        sinks: Vec<Arc<dyn TelemetrySink>>,
    ) -> GenerationService {
        info!(
            job_timeout_secs = config.job_timeout.as_secs(),
            memory_ceiling = %format_size(config.memory_ceiling_per_job),
            extra_sinks = sinks.len(),
            "Creating generation service"
        );

        let mut telemetry = MultiplexTelemetrySink::new(vec![Arc::new(TracingTelemetrySink)]);
        for sink in sinks {
            telemetry.add_sink(sink);
        }

        GenerationService::builder(config)
            .renderers(renderer::registry())
            .telemetry(Arc::new(telemetry))
            .build()
    }

    /// Build the async runtime used by service commands.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }

    /// Save document bytes to a file, creating parent directories.
    pub fn save_document(&self, path: &Path, data: &[u8]) -> Result<(), CliError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CliError::FileWrite {
                path: path.to_path_buf(),
                error: e,
            })?;
        }

        std::fs::write(path, data).map_err(|e| CliError::FileWrite {
            path: path.to_path_buf(),
            error: e,
        })?;

        info!(path = %path.display(), bytes = data.len(), "Document saved");
        Ok(())
    }
}
