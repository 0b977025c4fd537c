pub mod api;
pub mod core;
pub mod generators;
pub mod models;
pub mod pdf;
pub mod storage;
pub mod templates;

// Re-export commonly used types
pub use crate::core::{AppConfig, PdfOptions, PipelineError};
pub use generators::PdfGenerator;
pub use models::{GenerateRequest, PdfDocument, RenderRequest};
pub use pdf::{BrowserEngine, ChromeEngine, RenderSession};
pub use storage::{MemoryStore, S3Client, TemplateStore};
pub use templates::TemplateBinder;
