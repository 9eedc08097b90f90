//! Process memory probes.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current process memory usage.
pub trait MemoryProbe: Send + Sync {
    /// Bytes currently used by the process.
    fn used_bytes(&self) -> u64;
}

/// Reads the resident set size of the current process.
///
/// # Platform Support
///
/// - **Linux**: Parses `VmRSS` from `/proc/self/status`
/// - **Other platforms**: Reports 0, so the memory budget never blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemoryProbe;

impl MemoryProbe for ProcessMemoryProbe {
    #[cfg(target_os = "linux")]
    fn used_bytes(&self) -> u64 {
        match std::fs::read_to_string("/proc/self/status") {
            Ok(content) => parse_vm_rss(&content).unwrap_or(0),
            Err(e) => {
                tracing::trace!(error = %e, "Could not read /proc/self/status");
                0
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn used_bytes(&self) -> u64 {
        0
    }
}

/// Extracts `VmRSS` in bytes from the contents of `/proc/<pid>/status`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn parse_vm_rss(status: &str) -> Option<u64> {
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| {
            // Format: "VmRSS:     123456 kB"
            let mut parts = line.split_whitespace().skip(1);
            let kb: u64 = parts.next()?.parse().ok()?;
            kb.checked_mul(1024)
        })
}

/// Probe that reports a settable value.
///
/// Useful for tests and for hosts that measure memory themselves.
#[derive(Debug, Default)]
pub struct FixedMemoryProbe {
    bytes: AtomicU64,
}

impl FixedMemoryProbe {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes: AtomicU64::new(bytes),
        }
    }

    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::Relaxed);
    }
}

impl MemoryProbe for FixedMemoryProbe {
    fn used_bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}
