use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::OwnedSemaphorePermit;
use uuid::Uuid;

use super::engine::{BrowserEngine, BrowserInstance};
use crate::core::{BrowserConfig, PdfOptions, RenderError};

/// One browser process owned by one request.
///
/// The process is released exactly once: by [`RenderSession::close`], or by
/// `Drop` on any early return or unwind.
pub struct RenderSession {
    id: Uuid,
    instance: Option<Box<dyn BrowserInstance>>,
}

impl RenderSession {
    pub fn launch(engine: &dyn BrowserEngine) -> Result<Self, RenderError> {
        let id = Uuid::new_v4();
        let instance = engine.launch()?;
        tracing::debug!(session = %id, "browser launched");

        Ok(RenderSession {
            id,
            instance: Some(instance),
        })
    }

    /// Opens a page, loads `markup`, waits for network quiescence and prints.
    pub fn render(
        &mut self,
        markup: &str,
        options: &PdfOptions,
        config: &BrowserConfig,
        deadline: Instant,
    ) -> Result<Vec<u8>, RenderError> {
        let session_ms = config.session_timeout.as_millis() as u64;
        let instance = self
            .instance
            .as_mut()
            .ok_or_else(|| RenderError::Launch("session already released".to_string()))?;

        let mut page = instance.new_page()?;

        let idle_timeout = remaining(deadline, session_ms)?.min(config.idle_timeout);
        page.load(markup, idle_timeout)?;
        tracing::debug!(session = %self.id, "content loaded and network idle");

        let pdf = page.print(options, remaining(deadline, session_ms)?)?;
        if pdf.is_empty() {
            return Err(RenderError::Print(
                "browser returned an empty document".to_string(),
            ));
        }

        Ok(pdf)
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut instance) = self.instance.take() {
            instance.close();
            tracing::debug!(session = %self.id, "browser released");
        }
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        self.release();
    }
}

fn remaining(deadline: Instant, session_ms: u64) -> Result<Duration, RenderError> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or(RenderError::Timeout(session_ms))
}

/// Runs the full launch → load → print → release sequence on the current
/// thread.
pub fn render_blocking(
    engine: &dyn BrowserEngine,
    markup: &str,
    options: &PdfOptions,
    config: &BrowserConfig,
) -> Result<Vec<u8>, RenderError> {
    if let Some(limit) = engine.max_markup_bytes() {
        if markup.len() > limit {
            return Err(RenderError::Navigation(format!(
                "bound markup is {} bytes, the browser accepts at most {}",
                markup.len(),
                limit
            )));
        }
    }

    let deadline = Instant::now() + config.session_timeout;

    let mut session = RenderSession::launch(engine)?;
    let result = session.render(markup, options, config, deadline);
    session.close();

    result
}

/// Renders `markup` to PDF on the blocking pool so the browser round-trips
/// never stall the async workers.
///
/// `permit`, when given, is held by the blocking task and released only once
/// the browser is gone, even if this future has already given up waiting.
pub async fn render_pdf(
    engine: Arc<dyn BrowserEngine>,
    markup: String,
    options: PdfOptions,
    config: BrowserConfig,
    permit: Option<OwnedSemaphorePermit>,
) -> Result<Vec<u8>, RenderError> {
    let session_timeout = config.session_timeout;
    let wait = session_timeout + config.teardown_grace;
    let task = tokio::task::spawn_blocking(move || {
        let result = render_blocking(engine.as_ref(), &markup, &options, &config);
        drop(permit);
        result
    });

    // On expiry the blocking task keeps running until its own deadline trips,
    // and the session guard releases the browser then.
    match tokio::time::timeout(wait, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(RenderError::Aborted(join_error.to_string())),
        Err(_) => Err(RenderError::Timeout(session_timeout.as_millis() as u64)),
    }
}
