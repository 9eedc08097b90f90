//! Executor counters and state.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

/// What the drain loop is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ExecutorState {
    /// Not started, or shut down.
    Stopped = 0,
    /// Waiting for work.
    Idle = 1,
    /// Processing queued jobs.
    Draining = 2,
}

impl ExecutorState {
    /// Converts from u8 representation.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Stopped),
            1 => Some(Self::Idle),
            2 => Some(Self::Draining),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Idle => "idle",
            Self::Draining => "draining",
        }
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lock-free counters shared by the queue and the drain loop.
#[derive(Debug)]
pub(crate) struct ExecutorCounters {
    pub submitted: AtomicU64,
    pub succeeded: AtomicU64,
    pub failed: AtomicU64,
    pub degraded: AtomicU64,
    pub timed_out: AtomicU64,
    pub queue_depth: AtomicUsize,
    state: AtomicU8,
}

impl ExecutorCounters {
    pub fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            queue_depth: AtomicUsize::new(0),
            state: AtomicU8::new(ExecutorState::Stopped as u8),
        }
    }

    pub fn state(&self) -> ExecutorState {
        ExecutorState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(ExecutorState::Stopped)
    }

    pub fn set_state(&self, state: ExecutorState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Increments the queue depth and returns the new value.
    pub fn enqueued(&self) -> usize {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn dequeued(&self) {
        // Saturating: a send that raced with shutdown may never have counted.
        let _ = self
            .queue_depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| d.checked_sub(1));
    }

    pub fn snapshot(&self, running: usize, peak_running: usize) -> ExecutorStats {
        ExecutorStats {
            state: self.state(),
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::SeqCst),
            running,
            peak_running,
        }
    }
}

impl Default for ExecutorCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of executor statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    pub state: ExecutorState,
    /// Jobs admitted (lifetime)
    pub submitted: u64,
    /// Jobs rendered and validated
    pub succeeded: u64,
    /// Jobs answered with an error, including jobs abandoned at shutdown
    pub failed: u64,
    /// Jobs answered with fallback output
    pub degraded: u64,
    /// Jobs that missed their deadline (also counted as failed or degraded)
    pub timed_out: u64,
    /// Jobs waiting in the queue
    pub queue_depth: usize,
    /// Jobs currently rendering
    pub running: usize,
    /// Highest number of simultaneously rendering jobs
    pub peak_running: usize,
}

impl ExecutorStats {
    /// Jobs that reached a terminal outcome.
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.degraded
    }
}
