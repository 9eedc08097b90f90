//! Configuration management CLI commands.
//!
//! Provides `config path`, `config list`, and `config init` for locating,
//! viewing, and creating the configuration file.

use clap::Subcommand;
use docgate::config::{config_file_path, format_size, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// List all configuration settings
    List,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(),
        ConfigCommands::List => run_list(),
        ConfigCommands::Init { force } => run_init(force),
    }
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

/// List all configuration settings.
fn run_list() -> Result<(), CliError> {
    let config = ConfigFile::load()?;

    println!("Configuration Settings");
    println!("======================");

    for (section, entries) in settings(&config) {
        println!();
        println!("[{}]", section);
        for (key, value) in entries {
            println!("  {} = {}", key, value);
        }
    }

    Ok(())
}

/// Write the default configuration file.
fn run_init(force: bool) -> Result<(), CliError> {
    let path = config_file_path();

    if path.exists() && !force {
        println!("Configuration already exists at {}", path.display());
        println!("Use --force to overwrite it with defaults.");
        return Ok(());
    }

    ConfigFile::default().save_to(&path)?;
    println!("Created configuration: {}", path.display());
    Ok(())
}

type Section = (&'static str, Vec<(&'static str, String)>);

/// Settings grouped by INI section, in file order.
fn settings(config: &ConfigFile) -> Vec<Section> {
    vec![
        (
            "executor",
            vec![
                ("job_timeout_secs", config.executor.job_timeout_secs.to_string()),
                ("inter_job_delay_ms", config.executor.inter_job_delay_ms.to_string()),
                ("max_concurrency", config.executor.max_concurrency.to_string()),
            ],
        ),
        (
            "memory",
            vec![
                ("job_ceiling", format_size(config.memory.job_ceiling)),
                ("budget_poll_ms", config.memory.budget_poll_ms.to_string()),
                ("budget_max_wait_secs", config.memory.budget_max_wait_secs.to_string()),
                ("tracker_retention_secs", config.memory.tracker_retention_secs.to_string()),
                ("cleanup_interval_secs", config.memory.cleanup_interval_secs.to_string()),
            ],
        ),
        (
            "output",
            vec![
                ("max_document_size", format_size(config.output.max_document_size)),
                ("max_subdocument_size", format_size(config.output.max_subdocument_size)),
            ],
        ),
        (
            "fallback",
            vec![("enabled", config.fallback.enabled.to_string())],
        ),
        (
            "logging",
            vec![("file", config.logging.file.display().to_string())],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_cover_every_section() {
        let sections: Vec<&str> = settings(&ConfigFile::default())
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(
            sections,
            vec!["executor", "memory", "output", "fallback", "logging"]
        );
    }

    #[test]
    fn test_settings_show_default_sizes() {
        let all = settings(&ConfigFile::default());
        let memory = &all[1].1;
        assert!(memory.contains(&("job_ceiling", "100MB".to_string())));
    }
}
