//! Executor configuration.
//!
//! This module contains the [`ExecutorConfig`] struct and the output limits
//! applied to rendered documents.

use std::time::Duration;

use crate::config::{
    ConfigFile, DEFAULT_BUDGET_MAX_WAIT_SECS, DEFAULT_BUDGET_POLL_MS,
    DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_INTER_JOB_DELAY_MS, DEFAULT_JOB_MEMORY_CEILING,
    DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_MAX_DOCUMENT_SIZE, DEFAULT_MAX_SUBDOCUMENT_SIZE,
    DEFAULT_TRACKER_RETENTION_SECS, MAX_CONCURRENCY,
};
use crate::document::DocumentScope;
use crate::monitor::MemoryBudget;

// =============================================================================
// Output Limits
// =============================================================================

/// Largest accepted output per document scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputLimits {
    pub max_document_bytes: u64,
    pub max_subdocument_bytes: u64,
}

impl OutputLimits {
    pub fn limit_for(&self, scope: DocumentScope) -> u64 {
        match scope {
            DocumentScope::Document => self.max_document_bytes,
            DocumentScope::Subdocument => self.max_subdocument_bytes,
        }
    }
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_SIZE,
            max_subdocument_bytes: DEFAULT_MAX_SUBDOCUMENT_SIZE,
        }
    }
}

// =============================================================================
// Executor Configuration
// =============================================================================

/// Configuration for the generation executor.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutorConfig {
    /// Deadline for one render.
    pub job_timeout: Duration,

    /// Pause after each job before the next one is pulled.
    pub inter_job_delay: Duration,

    /// Memory ceiling per running job.
    pub memory_ceiling_per_job: u64,

    /// Renders in flight. Always 1.
    pub max_concurrency: usize,

    /// How often memory is re-sampled while over budget.
    pub budget_poll_interval: Duration,

    /// Longest wait for memory before the job runs anyway.
    pub budget_max_wait: Duration,

    pub output_limits: OutputLimits,

    /// Fallback choice for requests that do not specify one.
    pub fallback_by_default: bool,

    /// Retention of job snapshots in the tracker.
    pub tracker_retention: Duration,

    /// Interval of the tracker sweep.
    pub cleanup_interval: Duration,
}

impl ExecutorConfig {
    /// Memory budget for the pre-render wait: per-job ceiling times the
    /// number of renders in flight.
    pub fn memory_budget(&self) -> MemoryBudget {
        MemoryBudget {
            ceiling_bytes: self
                .memory_ceiling_per_job
                .saturating_mul(self.max_concurrency as u64),
            poll_interval: self.budget_poll_interval,
            max_wait: self.budget_max_wait,
        }
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_inter_job_delay(mut self, delay: Duration) -> Self {
        self.inter_job_delay = delay;
        self
    }

    pub fn with_memory_ceiling(mut self, bytes: u64) -> Self {
        self.memory_ceiling_per_job = bytes;
        self
    }

    pub fn with_output_limits(mut self, limits: OutputLimits) -> Self {
        self.output_limits = limits;
        self
    }

    pub fn with_fallback_by_default(mut self, enabled: bool) -> Self {
        self.fallback_by_default = enabled;
        self
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS),
            inter_job_delay: Duration::from_millis(DEFAULT_INTER_JOB_DELAY_MS),
            memory_ceiling_per_job: DEFAULT_JOB_MEMORY_CEILING,
            max_concurrency: MAX_CONCURRENCY,
            budget_poll_interval: Duration::from_millis(DEFAULT_BUDGET_POLL_MS),
            budget_max_wait: Duration::from_secs(DEFAULT_BUDGET_MAX_WAIT_SECS),
            output_limits: OutputLimits::default(),
            fallback_by_default: true,
            tracker_retention: Duration::from_secs(DEFAULT_TRACKER_RETENTION_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }
}

impl From<&ConfigFile> for ExecutorConfig {
    fn from(config: &ConfigFile) -> Self {
        Self {
            job_timeout: Duration::from_secs(config.executor.job_timeout_secs),
            inter_job_delay: Duration::from_millis(config.executor.inter_job_delay_ms),
            memory_ceiling_per_job: config.memory.job_ceiling,
            max_concurrency: MAX_CONCURRENCY,
            budget_poll_interval: Duration::from_millis(config.memory.budget_poll_ms),
            budget_max_wait: Duration::from_secs(config.memory.budget_max_wait_secs),
            output_limits: OutputLimits {
                max_document_bytes: config.output.max_document_size,
                max_subdocument_bytes: config.output.max_subdocument_size,
            },
            fallback_by_default: config.fallback.enabled,
            tracker_retention: Duration::from_secs(config.memory.tracker_retention_secs),
            cleanup_interval: Duration::from_secs(config.memory.cleanup_interval_secs),
        }
    }
}
