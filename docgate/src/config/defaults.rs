//! Default values and constants for all configuration settings.
//!
//! Contains all `DEFAULT_*` constants and the `ConfigFile::default()`
//! implementation.

use super::file::config_directory;
use super::settings::*;

/// Default render deadline per job (seconds).
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 30;

/// Default pause between consecutive jobs (milliseconds).
pub const DEFAULT_INTER_JOB_DELAY_MS: u64 = 100;

/// Renders in flight at once. The executor serializes rendering.
pub const MAX_CONCURRENCY: usize = 1;

/// Default memory ceiling per job (100 MB).
pub const DEFAULT_JOB_MEMORY_CEILING: u64 = 100 * 1024 * 1024;

/// Default memory re-poll interval while over budget (milliseconds).
pub const DEFAULT_BUDGET_POLL_MS: u64 = 250;

/// Default longest wait for memory before proceeding (seconds).
pub const DEFAULT_BUDGET_MAX_WAIT_SECS: u64 = 10;

/// Default retention of job snapshots (5 minutes).
pub const DEFAULT_TRACKER_RETENTION_SECS: u64 = 300;

/// Default interval of the stale-entry sweep (seconds).
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Default limit for top-level documents (100 MB).
pub const DEFAULT_MAX_DOCUMENT_SIZE: u64 = 100 * 1024 * 1024;

/// Default limit for sub-documents (50 MB).
pub const DEFAULT_MAX_SUBDOCUMENT_SIZE: u64 = 50 * 1024 * 1024;

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "docgate.log";

/// Clamps the configured concurrency to the single supported value.
pub(super) fn clamp_concurrency(value: usize) -> usize {
    if value != MAX_CONCURRENCY {
        tracing::warn!(
            requested = value,
            supported = MAX_CONCURRENCY,
            "max_concurrency is fixed at {}, ignoring configured value",
            MAX_CONCURRENCY
        );
    }
    MAX_CONCURRENCY
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            inter_job_delay_ms: DEFAULT_INTER_JOB_DELAY_MS,
            max_concurrency: MAX_CONCURRENCY,
        }
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            job_ceiling: DEFAULT_JOB_MEMORY_CEILING,
            budget_poll_ms: DEFAULT_BUDGET_POLL_MS,
            budget_max_wait_secs: DEFAULT_BUDGET_MAX_WAIT_SECS,
            tracker_retention_secs: DEFAULT_TRACKER_RETENTION_SECS,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
            max_subdocument_size: DEFAULT_MAX_SUBDOCUMENT_SIZE,
        }
    }
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: config_directory().join(DEFAULT_LOG_FILE_NAME),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            executor: ExecutorSettings::default(),
            memory: MemorySettings::default(),
            output: OutputSettings::default(),
            fallback: FallbackSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_concurrency_always_returns_one() {
        assert_eq!(clamp_concurrency(1), 1);
        assert_eq!(clamp_concurrency(0), 1);
        assert_eq!(clamp_concurrency(8), 1);
    }

    #[test]
    fn test_default_limits() {
        let output = OutputSettings::default();
        assert!(output.max_subdocument_size < output.max_document_size);
        assert_eq!(output.max_document_size, 100 * 1024 * 1024);
    }

    #[test]
    fn test_default_log_file_in_config_directory() {
        let logging = LoggingSettings::default();
        assert!(logging.file.ends_with(DEFAULT_LOG_FILE_NAME));
        assert!(logging.file.starts_with(config_directory()));
    }
}
