use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::core::{BrowserConfig, PipelineResult, RenderError};
use crate::models::{PdfDocument, RenderRequest};
use crate::pdf::{render_pdf, BrowserEngine};
use crate::storage::TemplateStore;
use crate::templates::TemplateBinder;

/// Per-request pipeline: fetch the template, bind the data, print it.
///
/// Holds no per-request state; one instance serves every request.
pub struct PdfGenerator {
    store: Arc<dyn TemplateStore>,
    binder: TemplateBinder,
    engine: Arc<dyn BrowserEngine>,
    bucket: String,
    browser: BrowserConfig,
    render_permits: Option<Arc<Semaphore>>,
}

impl PdfGenerator {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        engine: Arc<dyn BrowserEngine>,
        bucket: impl Into<String>,
        browser: BrowserConfig,
    ) -> Self {
        PdfGenerator {
            store,
            binder: TemplateBinder::new(),
            engine,
            bucket: bucket.into(),
            browser,
            render_permits: None,
        }
    }

    /// Caps how many browser sessions may run at once. `0` leaves it unbounded.
    pub fn with_max_concurrent_renders(mut self, limit: usize) -> Self {
        self.render_permits = (limit > 0).then(|| Arc::new(Semaphore::new(limit)));
        self
    }

    pub async fn generate(&self, request: &RenderRequest) -> PipelineResult<PdfDocument> {
        let start = Instant::now();

        let template = self.store.fetch(&self.bucket, &request.template_name).await?;
        tracing::debug!(
            request_id = %request.id,
            template = %template.key,
            bytes = template.content.len(),
            "template fetched"
        );

        let markup = self.binder.bind(&template.content, &request.data)?;
        tracing::debug!(request_id = %request.id, bytes = markup.len(), "template bound");

        let permit = match &self.render_permits {
            Some(permits) => Some(
                permits
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| RenderError::Aborted(e.to_string()))?,
            ),
            None => None,
        };

        let bytes = render_pdf(
            self.engine.clone(),
            markup,
            request.options.clone(),
            self.browser.clone(),
            permit,
        )
        .await?;

        let document = PdfDocument {
            bytes,
            format: request.options.format,
            margin: request.options.margin,
        };
        if !document.has_pdf_signature() {
            let err = RenderError::Print("browser output is not a PDF document".to_string());
            return Err(err.into());
        }

        tracing::info!(
            request_id = %request.id,
            template = %request.template_name,
            bytes = document.bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pdf generated"
        );

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PdfOptions, PipelineError};
    use crate::models::GenerateRequest;
    use crate::pdf::{BrowserInstance, BrowserPage};
    use crate::storage::MemoryStore;
    use std::time::Duration;

    struct StaticEngine(&'static [u8]);
    struct StaticInstance(&'static [u8]);
    struct StaticPage(&'static [u8]);

    impl BrowserEngine for StaticEngine {
        fn launch(&self) -> Result<Box<dyn BrowserInstance>, RenderError> {
            Ok(Box::new(StaticInstance(self.0)))
        }
    }

    impl BrowserInstance for StaticInstance {
        fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, RenderError> {
            Ok(Box::new(StaticPage(self.0)))
        }

        fn close(&mut self) {}
    }

    impl BrowserPage for StaticPage {
        fn load(&mut self, _markup: &str, _timeout: Duration) -> Result<(), RenderError> {
            Ok(())
        }

        fn print(
            &mut self,
            _options: &PdfOptions,
            _timeout: Duration,
        ) -> Result<Vec<u8>, RenderError> {
            Ok(self.0.to_vec())
        }
    }

    fn generator(output: &'static [u8]) -> PdfGenerator {
        let store = MemoryStore::new().with_template("bucket", "t.html", "<p>{{ name }}</p>");
        PdfGenerator::new(
            Arc::new(store),
            Arc::new(StaticEngine(output)),
            "bucket",
            BrowserConfig::default(),
        )
        .with_max_concurrent_renders(1)
    }

    fn request() -> RenderRequest {
        let wire: GenerateRequest =
            serde_json::from_value(serde_json::json!({"templateName": "t.html"})).unwrap();
        RenderRequest::from_wire(wire, &PdfOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn produces_a_signed_pdf_document() {
        let document = generator(b"%PDF-1.7\n%%EOF").generate(&request()).await.unwrap();
        assert!(document.has_pdf_signature());
        assert_eq!(document.format, PdfOptions::default().format);
    }

    #[tokio::test]
    async fn non_pdf_output_is_a_print_error() {
        let err = generator(b"<html>").generate(&request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Render(RenderError::Print(_))));
    }
}
