//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`batch`] - Render every record in a directory through one queue
//! - [`classify`] - Show how a failure message is classified
//! - [`config`] - Configuration management (path, list, init)
//! - [`fallback`] - Print the simplified text document for a record
//! - [`generate`] - Render a single record to a file
//! - [`memory`] - Show current memory use against the job ceiling

pub mod batch;
pub mod classify;
pub mod common;
pub mod config;
pub mod fallback;
pub mod generate;
pub mod memory;
