//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::defaults::clamp_concurrency;
use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [executor] section
    if let Some(section) = ini.section(Some("executor")) {
        if let Some(v) = section.get("job_timeout_secs") {
            let secs = parse_u64("executor", "job_timeout_secs", v)?;
            if secs == 0 {
                return Err(invalid(
                    "executor",
                    "job_timeout_secs",
                    v,
                    "must be greater than zero",
                ));
            }
            config.executor.job_timeout_secs = secs;
        }
        if let Some(v) = section.get("inter_job_delay_ms") {
            config.executor.inter_job_delay_ms = parse_u64("executor", "inter_job_delay_ms", v)?;
        }
        if let Some(v) = section.get("max_concurrency") {
            let requested: usize = v.trim().parse().map_err(|_| {
                invalid(
                    "executor",
                    "max_concurrency",
                    v,
                    "must be a positive integer",
                )
            })?;
            config.executor.max_concurrency = clamp_concurrency(requested);
        }
    }

    // [memory] section
    if let Some(section) = ini.section(Some("memory")) {
        if let Some(v) = section.get("job_ceiling") {
            config.memory.job_ceiling = parse_size(v).map_err(|_| {
                invalid(
                    "memory",
                    "job_ceiling",
                    v,
                    "expected format like '100MB', '512KB', or '1GB'",
                )
            })?;
        }
        if let Some(v) = section.get("budget_poll_ms") {
            let ms = parse_u64("memory", "budget_poll_ms", v)?;
            if ms == 0 {
                return Err(invalid(
                    "memory",
                    "budget_poll_ms",
                    v,
                    "must be greater than zero",
                ));
            }
            config.memory.budget_poll_ms = ms;
        }
        if let Some(v) = section.get("budget_max_wait_secs") {
            config.memory.budget_max_wait_secs = parse_u64("memory", "budget_max_wait_secs", v)?;
        }
        if let Some(v) = section.get("tracker_retention_secs") {
            config.memory.tracker_retention_secs =
                parse_u64("memory", "tracker_retention_secs", v)?;
        }
        if let Some(v) = section.get("cleanup_interval_secs") {
            let secs = parse_u64("memory", "cleanup_interval_secs", v)?;
            if secs == 0 {
                return Err(invalid(
                    "memory",
                    "cleanup_interval_secs",
                    v,
                    "must be greater than zero",
                ));
            }
            config.memory.cleanup_interval_secs = secs;
        }
    }

    // [output] section
    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = section.get("max_document_size") {
            config.output.max_document_size = parse_size(v).map_err(|_| {
                invalid(
                    "output",
                    "max_document_size",
                    v,
                    "expected format like '100MB', '512KB', or '1GB'",
                )
            })?;
        }
        if let Some(v) = section.get("max_subdocument_size") {
            config.output.max_subdocument_size = parse_size(v).map_err(|_| {
                invalid(
                    "output",
                    "max_subdocument_size",
                    v,
                    "expected format like '50MB', '512KB', or '1GB'",
                )
            })?;
        }
    }

    // [fallback] section
    if let Some(section) = ini.section(Some("fallback")) {
        if let Some(v) = section.get("enabled") {
            config.fallback.enabled = parse_bool(v);
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

fn parse_u64(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Parse a boolean value from config (accepts true/false, 1/0, yes/no, on/off).
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
