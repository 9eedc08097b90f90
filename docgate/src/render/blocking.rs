//! Adapter that runs a synchronous render function on the blocking pool.

use super::{panic_message, RenderContext, RenderError, RenderFuture, Renderer};
use std::sync::Arc;

/// Wraps a synchronous render function as a [`Renderer`].
///
/// The function runs under `tokio::task::spawn_blocking` so CPU-heavy layout
/// work does not stall the runtime. A panic inside the function becomes a
/// [`RenderError::Failed`].
///
/// A blocking task cannot be aborted. When the deadline passes the executor
/// moves on to the next job while the function keeps running, so the two
/// renders overlap until the function returns. Functions must poll
/// [`RenderContext::check_cancelled`] between steps to stop early.
pub struct BlockingRenderer<F> {
    name: String,
    func: Arc<F>,
}

impl<F> BlockingRenderer<F>
where
    F: Fn(&RenderContext) -> Result<Vec<u8>, RenderError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl<F> Renderer for BlockingRenderer<F>
where
    F: Fn(&RenderContext) -> Result<Vec<u8>, RenderError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render<'a>(&'a self, ctx: &'a RenderContext) -> RenderFuture<'a> {
        let func = Arc::clone(&self.func);
        let ctx = ctx.clone();
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || func(&ctx)).await {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(RenderError::Failed(format!(
                    "renderer panicked: {}",
                    panic_message(e.into_panic().as_ref())
                ))),
                Err(e) => Err(RenderError::Failed(format!("render task aborted: {}", e))),
            }
        })
    }
}

impl<F> std::fmt::Debug for BlockingRenderer<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingRenderer")
            .field("name", &self.name)
            .finish()
    }
}
