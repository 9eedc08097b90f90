//! Memory command - show current memory use against the job ceiling.

use docgate::config::format_size;
use docgate::monitor::ResourceMonitor;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Run the memory command.
pub fn run(runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("memory");

    let config = runner.executor_config();
    let monitor = ResourceMonitor::for_process();
    let sample = monitor.sample();
    let over = monitor.is_over_budget(&sample, config.memory_ceiling_per_job);

    println!("Memory");
    println!("======");
    println!(
        "  Used:        {} ({} bytes)",
        human_bytes(sample.heap_used_bytes),
        sample.heap_used_bytes
    );
    println!(
        "  Ceiling:     {}",
        format_size(config.memory_ceiling_per_job)
    );
    println!(
        "  Status:      {}",
        if over { "over budget" } else { "within budget" }
    );
    println!(
        "  Max wait:    {}s (poll every {}ms)",
        config.budget_max_wait.as_secs(),
        config.budget_poll_interval.as_millis()
    );
    println!("  Sampled at:  {}", sample.sampled_at.to_rfc3339());

    Ok(())
}

/// Approximate size with one decimal, for display only.
fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(1536), "1.5 KB");
        assert_eq!(human_bytes(100 * 1024 * 1024), "100.0 MB");
    }
}
