//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Executor timing and concurrency
    pub executor: ExecutorSettings,
    /// Memory budget and bookkeeping retention
    pub memory: MemorySettings,
    /// Output size limits
    pub output: OutputSettings,
    /// Degraded-output policy
    pub fallback: FallbackSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// `[executor]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Per-job render deadline in seconds.
    pub job_timeout_secs: u64,
    /// Pause between consecutive jobs in milliseconds.
    pub inter_job_delay_ms: u64,
    /// Concurrent renders. Always 1; other values are clamped on load.
    pub max_concurrency: usize,
}

/// `[memory]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySettings {
    /// Memory ceiling per job in bytes.
    pub job_ceiling: u64,
    /// Interval between memory samples while over budget, in milliseconds.
    pub budget_poll_ms: u64,
    /// Longest a job waits for memory before proceeding anyway, in seconds.
    pub budget_max_wait_secs: u64,
    /// How long finished job snapshots are kept, in seconds.
    pub tracker_retention_secs: u64,
    /// Interval of the stale-entry sweep, in seconds.
    pub cleanup_interval_secs: u64,
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    /// Largest accepted top-level document in bytes.
    pub max_document_size: u64,
    /// Largest accepted sub-document in bytes.
    pub max_subdocument_size: u64,
}

/// `[fallback]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackSettings {
    /// Produce text fallback output when a request does not say otherwise.
    pub enabled: bool,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
