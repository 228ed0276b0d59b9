//! [`ObjectStorage`] over the `object_store` crate.
//!
//! MinIO speaks the S3 protocol, so production uses
//! [`AmazonS3Builder`] with path-style requests. The builder's own retry
//! layer is switched off: the fetch stage owns the retry schedule and must
//! see every connection failure to apply it.

use std::error::Error as StdError;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as StorePath;
use object_store::{ObjectMeta, ObjectStore, RetryConfig};
use tracing::debug;

use super::{ObjectStorage, StorageError};
use crate::config::StorageConfig;

pub struct ObjectStoreStorage {
    inner: Arc<dyn ObjectStore>,
}

impl ObjectStoreStorage {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner }
    }

    /// Connect to an S3-compatible endpoint (MinIO) using `config`.
    ///
    /// No network traffic happens here; a bad endpoint shows up on the
    /// first `list`.
    pub fn s3(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config.endpoint_url();
        debug!("Configuring S3 storage at {} (bucket {})", endpoint, config.bucket);

        let store = AmazonS3Builder::new()
            .with_endpoint(&endpoint)
            .with_allow_http(endpoint.starts_with("http://"))
            .with_virtual_hosted_style_request(false)
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_access_key_id(&config.access_key)
            .with_secret_access_key(&config.secret_key)
            .with_retry(RetryConfig {
                max_retries: 0,
                ..Default::default()
            })
            .build()
            .map_err(|e| StorageError::Other(format!("invalid storage configuration: {e}")))?;

        Ok(Self::new(Arc::new(store)))
    }
}

#[async_trait]
impl ObjectStorage for ObjectStoreStorage {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = StorePath::from(prefix);
        let prefix = if prefix.as_ref().is_empty() {
            None
        } else {
            Some(&prefix)
        };

        let metas: Vec<ObjectMeta> = self
            .inner
            .list(prefix)
            .try_collect()
            .await
            .map_err(classify)?;

        Ok(metas.into_iter().map(|m| m.location.to_string()).collect())
    }

    async fn get(&self, object_name: &str) -> Result<Vec<u8>, StorageError> {
        let location = StorePath::from(object_name);
        let result = self.inner.get(&location).await.map_err(classify)?;
        let bytes = result.bytes().await.map_err(classify)?;
        Ok(bytes.to_vec())
    }

    async fn health_check(&self) -> bool {
        match self.inner.list_with_delimiter(None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Storage health check failed: {}", e);
                false
            }
        }
    }
}

/// Sort an `object_store` error into not-found / connection / other.
fn classify(err: object_store::Error) -> StorageError {
    if let object_store::Error::NotFound { path, .. } = &err {
        return StorageError::NotFound(path.clone());
    }

    let message = err.to_string();
    if message.contains("NoSuchKey") || message.contains("NoSuchBucket") {
        return StorageError::NotFound(message);
    }
    if is_connection_error(&err) {
        return StorageError::Connection(message);
    }
    StorageError::Other(message)
}

/// Walk the source chain looking for a transport-level failure.
fn is_connection_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(re) = e.downcast_ref::<reqwest::Error>() {
            if re.is_connect() || re.is_timeout() {
                return true;
            }
        }
        if let Some(io) = e.downcast_ref::<io::Error>() {
            if matches!(
                io.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::TimedOut
            ) {
                return true;
            }
        }
        current = e.source();
    }

    let lower = err.to_string().to_lowercase();
    lower.contains("connect") || lower.contains("timed out") || lower.contains("dns error")
}
