use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;

use super::{TemplateDocument, TemplateStore};
use crate::core::{StorageConfig, StorageError};

/// Template store over any S3-compatible object storage.
///
/// Built once at startup and shared read-only between requests.
pub struct S3Client {
    client: Client,
}

impl S3Client {
    pub async fn new(config: &StorageConfig) -> Self {
        let region_provider = RegionProviderChain::default_provider()
            .or_else("us-east-1");

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        S3Client {
            client: Client::from_conf(builder.build()),
        }
    }

    pub fn from_client(client: Client) -> Self {
        S3Client { client }
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<String, StorageError> {
        let response = self.client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let missing = err
                    .as_service_error()
                    .map(|e| e.is_no_such_key())
                    .unwrap_or(false)
                    || err
                        .raw_response()
                        .map(|r| r.status().as_u16() == 404)
                        .unwrap_or(false);

                if missing {
                    StorageError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Access {
                        key: key.to_string(),
                        message: DisplayErrorContext(&err).to_string(),
                    }
                }
            })?;

        let data = response.body.collect().await.map_err(|e| StorageError::Access {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        String::from_utf8(data.to_vec()).map_err(|e| StorageError::Access {
            key: key.to_string(),
            message: format!("template is not valid UTF-8: {}", e),
        })
    }
}

#[async_trait]
impl TemplateStore for S3Client {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<TemplateDocument, StorageError> {
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }

        tracing::debug!(bucket, key, "fetching template");
        let content = self.get_object(bucket, key).await?;

        Ok(TemplateDocument {
            key: key.to_string(),
            content,
        })
    }
}
