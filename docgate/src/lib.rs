//! docgate - serialized document generation
//!
//! This library runs document renderers one job at a time behind a FIFO
//! admission queue, waits for memory headroom before each render, enforces a
//! per-job deadline and output size limits, and turns every failure into a
//! classified [`classify::ErrorInfo`]. Fallback-eligible failures can be
//! answered with deterministic plain-text output instead of an error.
//!
//! # High-Level API
//!
//! ```ignore
//! use docgate::document::{DocumentType, RenderOptions};
//! use docgate::executor::{ExecutorConfig, GenerationService};
//! use docgate::render::{BlockingRenderer, RendererRegistry};
//!
//! let renderers = RendererRegistry::new()
//!     .with(DocumentType::Report, BlockingRenderer::new("report", render_report));
//! let service = GenerationService::new(ExecutorConfig::default(), renderers);
//! service.start()?;
//!
//! let document = service
//!     .generate(DocumentType::Report, record, RenderOptions::new().with_title("Q3"))
//!     .await?;
//! ```

pub mod classify;
pub mod config;
pub mod document;
pub mod executor;
pub mod logging;
pub mod monitor;
pub mod render;

/// Version of the docgate library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
