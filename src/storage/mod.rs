pub mod memory;
pub mod s3;

use async_trait::async_trait;

use crate::core::StorageError;

pub use memory::MemoryStore;
pub use s3::S3Client;

/// Raw template markup as it came out of the bucket.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    pub key: String,
    pub content: String,
}

/// Read-only access to stored templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<TemplateDocument, StorageError>;
}
