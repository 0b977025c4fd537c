use std::sync::Arc;

use crate::core::AppConfig;
use crate::generators::PdfGenerator;
use crate::pdf::{BrowserEngine, ChromeEngine};
use crate::storage::{S3Client, TemplateStore};

use super::metrics::Metrics;

#[derive(Clone)]
pub struct ApiState {
    pub generator: Arc<PdfGenerator>,
    pub metrics: Arc<Metrics>,
    pub config: Arc<AppConfig>,
}

impl ApiState {
    /// Production wiring: S3-compatible template storage and headless Chrome.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(S3Client::new(&config.storage).await);
        let engine = Arc::new(ChromeEngine::new(&config.browser));

        Self::with_components(config, store, engine)
    }

    pub fn with_components(
        config: AppConfig,
        store: Arc<dyn TemplateStore>,
        engine: Arc<dyn BrowserEngine>,
    ) -> anyhow::Result<Self> {
        let generator = PdfGenerator::new(
            store,
            engine,
            config.storage.bucket.clone(),
            config.browser.clone(),
        )
        .with_max_concurrent_renders(config.max_concurrent_renders);

        Ok(ApiState {
            generator: Arc::new(generator),
            metrics: Arc::new(Metrics::new()?),
            config: Arc::new(config),
        })
    }
}
