//! Renderer contract and adapters.
//!
//! The service does not know how a document is drawn. It hands each job to
//! the [`Renderer`] registered for its [`DocumentType`] and gets bytes back.
//!
//! # Example
//!
//! ```
//! use docgate::document::DocumentType;
//! use docgate::render::{BlockingRenderer, RendererRegistry};
//!
//! let registry = RendererRegistry::new().with(
//!     DocumentType::Report,
//!     BlockingRenderer::new("plain", |ctx| Ok(ctx.record.to_string().into_bytes())),
//! );
//! assert!(registry.get(DocumentType::Report).is_some());
//! ```

mod blocking;
mod embed;
mod registry;

pub use blocking::BlockingRenderer;
pub use embed::{embedded_file, EmbeddedFile};
pub use registry::RendererRegistry;

use crate::document::{DocumentType, RenderOptions};
use crate::executor::JobId;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Boxed future returned by [`Renderer::render`].
pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, RenderError>> + Send + 'a>>;

/// Errors a renderer reports back to the executor.
///
/// The messages are worded so the error classifier can map them onto the
/// failure taxonomy.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render failed: {0}")]
    Failed(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("source data unavailable: {0}")]
    DataAccess(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("render cancelled")]
    Cancelled,
}

/// Everything a renderer sees about one job.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub job_id: JobId,
    pub document_type: DocumentType,
    pub record: Arc<Value>,
    pub options: Arc<RenderOptions>,
    /// Fires when the job times out or the service shuts down.
    pub cancellation: CancellationToken,
}

impl RenderContext {
    /// Returns true once the executor has given up on this job.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns `Err(RenderError::Cancelled)` if the job was cancelled.
    pub fn check_cancelled(&self) -> Result<(), RenderError> {
        if self.is_cancelled() {
            Err(RenderError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Produces document bytes for one document type.
///
/// Implementations should be free of side effects apart from reading files
/// referenced by the record.
///
/// # Cancellation
///
/// On timeout the executor drops the returned future and cancels
/// [`RenderContext::cancellation`]. Dropping stops async work at its next
/// await point, but work handed to threads or the blocking pool keeps going
/// and overlaps the next job. Such work must check
/// [`RenderContext::is_cancelled`] between expensive steps and return
/// [`RenderError::Cancelled`] once it is set.
pub trait Renderer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Render the document described by `ctx`.
    fn render<'a>(&'a self, ctx: &'a RenderContext) -> RenderFuture<'a>;
}

/// Extracts the message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
