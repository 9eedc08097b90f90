//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use docgate::classify::ErrorKind;
use docgate::config::ConfigFileError;
use docgate::executor::{GenerateError, ServiceError};
use std::fmt;
use std::path::PathBuf;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Configuration file could not be read or written
    ConfigFile(ConfigFileError),
    /// Failed to build the async runtime
    Runtime(std::io::Error),
    /// Failed to start the generation service
    Service(ServiceError),
    /// Failed to read an input file
    FileRead { path: PathBuf, error: std::io::Error },
    /// Input file is not a usable record
    InvalidRecord { path: PathBuf, reason: String },
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
    /// The document could not be generated
    Generation(GenerateError),
    /// Some documents in a batch could not be generated
    BatchFailed { failed: usize, total: usize },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Generation(e) => {
                if let Some(info) = e.info() {
                    eprintln!();
                    eprintln!("{}", info.user_message);
                    match info.kind {
                        ErrorKind::DataAccess => {
                            eprintln!("Check that files referenced by the record exist and are readable.");
                        }
                        ErrorKind::Memory | ErrorKind::Timeout => {
                            eprintln!("Retry later, or raise the limits in the [executor] and [memory] sections.");
                            eprintln!("Use 'docgate config path' to locate the configuration file.");
                        }
                        _ => {}
                    }
                    if info.fallback_eligible {
                        eprintln!("Pass --fallback to receive a simplified text document instead.");
                    }
                }
            }
            CliError::ConfigFile(_) => {
                eprintln!();
                eprintln!("Fix the value in the configuration file, or recreate it with:");
                eprintln!("  docgate config init --force");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Configuration error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Service(e) => write!(f, "Failed to start generation service: {}", e),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path.display(), error)
            }
            CliError::InvalidRecord { path, reason } => {
                write!(f, "Invalid record '{}': {}", path.display(), reason)
            }
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
            CliError::Generation(e) => write!(f, "{}", e),
            CliError::BatchFailed { failed, total } => {
                write!(f, "{} of {} documents could not be generated", failed, total)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Service(e) => Some(e),
            CliError::FileRead { error, .. } => Some(error),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::Generation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ServiceError> for CliError {
    fn from(e: ServiceError) -> Self {
        CliError::Service(e)
    }
}

impl From<GenerateError> for CliError {
    fn from(e: GenerateError) -> Self {
        CliError::Generation(e)
    }
}
