//! Configuration for the document generation service.
//!
//! User settings are read from `~/.docgate/config.ini`. Missing files and
//! missing keys fall back to the defaults in [`defaults`]; malformed values
//! are reported as [`ConfigFileError::InvalidValue`].
//!
//! # Example
//!
//! ```
//! use docgate::config::{ConfigFile, DEFAULT_JOB_TIMEOUT_SECS};
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.executor.job_timeout_secs, DEFAULT_JOB_TIMEOUT_SECS);
//! assert_eq!(config.executor.max_concurrency, 1);
//! ```

pub mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, ExecutorSettings, FallbackSettings, LoggingSettings, MemorySettings,
    OutputSettings,
};
pub use size::{format_size, parse_size, SizeParseError};
