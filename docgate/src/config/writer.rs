//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[executor]
; Deadline for a single render in seconds (default: 30)
; A render that runs past it is abandoned and classified as a timeout
job_timeout_secs = {}
; Pause between consecutive jobs in milliseconds (default: 100)
inter_job_delay_ms = {}
; Renders in flight at once. Fixed at 1; other values are ignored
max_concurrency = {}

[memory]
; Memory ceiling per job (default: 100MB)
; Supports: KB, MB, GB suffixes (e.g., 64MB, 512MB, 1GB)
job_ceiling = {}
; How often memory is re-sampled while a job waits for headroom (default: 250)
budget_poll_ms = {}
; Longest a job waits for headroom before running anyway, in seconds (default: 10)
budget_max_wait_secs = {}
; How long finished job status stays queryable, in seconds (default: 300)
tracker_retention_secs = {}
; Interval of the stale job sweep, in seconds (default: 60)
cleanup_interval_secs = {}

[output]
; Largest accepted document (default: 100MB)
max_document_size = {}
; Largest accepted sub-document (default: 50MB)
max_subdocument_size = {}

[fallback]
; Produce a plain text document when rendering fails (default: true)
; Requests may override this individually
enabled = {}

[logging]
; Log file path (default: ~/.docgate/docgate.log)
file = {}
"#,
        config.executor.job_timeout_secs,
        config.executor.inter_job_delay_ms,
        config.executor.max_concurrency,
        format_size(config.memory.job_ceiling),
        config.memory.budget_poll_ms,
        config.memory.budget_max_wait_secs,
        config.memory.tracker_retention_secs,
        config.memory.cleanup_interval_secs,
        format_size(config.output.max_document_size),
        format_size(config.output.max_subdocument_size),
        config.fallback.enabled,
        path_to_string(&config.logging.file),
    )
}

/// Render a path for the INI file, collapsing the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(relative) = path.strip_prefix(&home) {
            return format!("~/{}", relative.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.executor.job_timeout_secs = 90;
        config.executor.inter_job_delay_ms = 5;
        config.memory.job_ceiling = 512 * 1024 * 1024;
        config.output.max_subdocument_size = 8 * 1024 * 1024;
        config.fallback.enabled = false;
        config.logging.file = temp_dir.path().join("out.log");

        config.save_to(&config_path).unwrap();

        let loaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/dir/config.ini");

        ConfigFile::default().save_to(&config_path).unwrap();
        let loaded = ConfigFile::load_from(&config_path).unwrap();

        assert_eq!(loaded, ConfigFile::default());
    }

    #[test]
    fn test_written_sizes_are_human_readable() {
        let text = to_config_string(&ConfigFile::default());
        assert!(text.contains("job_ceiling = 100MB"));
        assert!(text.contains("max_subdocument_size = 50MB"));
        assert!(text.contains("enabled = true"));
    }
}
