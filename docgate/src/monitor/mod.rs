//! Resource monitor: memory sampling, budget back-pressure and cleanup.
//!
//! Before each render the executor samples process memory. When usage is
//! above the budget it waits, re-polling, until memory drops or the wait
//! limit passes, and then runs the job regardless. A job is never failed by
//! the budget.
//!
//! The monitor also owns the [`JobTracker`] and a periodic sweep that drops
//! snapshots older than the retention window.

mod probe;
mod tracker;

pub use probe::{FixedMemoryProbe, MemoryProbe, ProcessMemoryProbe};
pub use tracker::{JobSnapshot, JobTracker};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_TRACKER_RETENTION_SECS};

/// One memory reading. Taken fresh for every decision, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSample {
    pub heap_used_bytes: u64,
    pub sampled_at: DateTime<Utc>,
}

/// Parameters of the pre-render memory wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    pub ceiling_bytes: u64,
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

/// Outcome of [`ResourceMonitor::wait_for_budget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetWait {
    /// Usage was within budget at the first sample.
    Within { sample: ResourceSample },
    /// Usage dropped below the ceiling while waiting.
    Recovered {
        sample: ResourceSample,
        waited: Duration,
    },
    /// The wait limit passed with usage still over the ceiling.
    Expired {
        sample: ResourceSample,
        waited: Duration,
    },
    /// The wait was interrupted by cancellation.
    Cancelled,
}

/// Samples memory and keeps the job tracker tidy.
pub struct ResourceMonitor {
    probe: Arc<dyn MemoryProbe>,
    tracker: Arc<JobTracker>,
    retention: Duration,
    cleanup_interval: Duration,
}

impl ResourceMonitor {
    /// Creates a monitor with default retention and cleanup interval.
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            probe,
            tracker: Arc::new(JobTracker::new()),
            retention: Duration::from_secs(DEFAULT_TRACKER_RETENTION_SECS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
        }
    }

    /// Monitor backed by the process RSS.
    pub fn for_process() -> Self {
        Self::new(Arc::new(ProcessMemoryProbe))
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    /// Reads current memory usage.
    pub fn sample(&self) -> ResourceSample {
        ResourceSample {
            heap_used_bytes: self.probe.used_bytes(),
            sampled_at: Utc::now(),
        }
    }

    /// True when usage is strictly above the ceiling.
    pub fn is_over_budget(&self, sample: &ResourceSample, ceiling_bytes: u64) -> bool {
        sample.heap_used_bytes > ceiling_bytes
    }

    /// Waits until usage is within `budget` or its wait limit passes.
    pub async fn wait_for_budget(
        &self,
        budget: &MemoryBudget,
        cancel: &CancellationToken,
    ) -> BudgetWait {
        let sample = self.sample();
        if !self.is_over_budget(&sample, budget.ceiling_bytes) {
            return BudgetWait::Within { sample };
        }

        debug!(
            used_bytes = sample.heap_used_bytes,
            ceiling_bytes = budget.ceiling_bytes,
            "Memory over budget, waiting before render"
        );

        let start = Instant::now();
        loop {
            let waited = start.elapsed();
            if waited >= budget.max_wait {
                return BudgetWait::Expired {
                    sample: self.sample(),
                    waited,
                };
            }

            let pause = budget.poll_interval.min(budget.max_wait - waited);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return BudgetWait::Cancelled,
                _ = tokio::time::sleep(pause) => {}
            }

            let sample = self.sample();
            if !self.is_over_budget(&sample, budget.ceiling_bytes) {
                return BudgetWait::Recovered {
                    sample,
                    waited: start.elapsed(),
                };
            }
        }
    }

    /// Prunes stale tracker entries once. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let removed = self.tracker.prune_stale(self.retention);
        if removed > 0 {
            debug!(
                removed,
                remaining = self.tracker.len(),
                "Pruned stale job snapshots"
            );
        }
        removed
    }

    /// Runs the periodic sweep until cancelled.
    pub async fn run_cleanup(self: Arc<Self>, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.cleanup_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    self.sweep();
                }
            }
        }

        info!("Job tracker cleanup stopped");
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::for_process()
    }
}

impl std::fmt::Debug for ResourceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMonitor")
            .field("tracked_jobs", &self.tracker.len())
            .field("retention", &self.retention)
            .field("cleanup_interval", &self.cleanup_interval)
            .finish()
    }
}
