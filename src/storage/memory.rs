use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{TemplateDocument, TemplateStore};
use crate::core::StorageError;

/// Template store backed by a map of `(bucket, key)` to markup. Used for local
/// runs and tests.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<(String, String), String>>,
    fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(self, bucket: &str, key: &str, content: &str) -> Self {
        self.insert(bucket, key, content);
        self
    }

    pub fn insert(&self, bucket: &str, key: &str, content: &str) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert((bucket.to_string(), key.to_string()), content.to_string());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<TemplateDocument, StorageError> {
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|content| TemplateDocument {
                key: key.to_string(),
                content: content.clone(),
            })
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}
