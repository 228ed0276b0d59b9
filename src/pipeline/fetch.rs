//! Document fetch: locate and read a document's PDF in object storage.
//!
//! Documents are stored under a per-owner prefix,
//! `owners/{owner_id}/documents/{document_id}/{filename}`, so the file name
//! is not known up front. The fetcher lists the prefix, takes the first
//! object and reads it in full.
//!
//! ## Retry Strategy
//!
//! Only storage connection failures are retried, with the shared
//! exponential schedule (`retry_delay * 2^attempt`). A missing document is
//! a definitive answer and is returned immediately.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::DocMetaError;
use crate::retry::{retry_with_backoff, RetryAction, RetryError, RetryPolicy, Sleeper};
use crate::storage::{ObjectStorage, StorageError};

/// Identifies one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    owner_id: String,
    document_id: String,
}

impl DocumentKey {
    pub fn new(owner_id: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            document_id: document_id.into(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Storage prefix holding this document's object.
    pub fn prefix(&self) -> String {
        format!("owners/{}/documents/{}/", self.owner_id, self.document_id)
    }

    fn not_found(&self) -> DocMetaError {
        DocMetaError::NotFound {
            owner_id: self.owner_id.clone(),
            document_id: self.document_id.clone(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.document_id)
    }
}

/// Reads raw document bytes from storage, retrying connection failures.
pub struct DocumentFetcher {
    storage: Arc<dyn ObjectStorage>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl DocumentFetcher {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            storage,
            policy,
            sleeper,
        }
    }

    /// Fetch the document's content.
    ///
    /// # Errors
    /// - [`DocMetaError::NotFound`]: nothing under the prefix (never retried)
    /// - [`DocMetaError::StorageConnection`]: storage unreachable on every attempt
    /// - [`DocMetaError::Storage`]: any other storage fault (never retried)
    pub async fn fetch(&self, key: &DocumentKey) -> Result<Vec<u8>, DocMetaError> {
        let prefix = key.prefix();
        let prefix = prefix.as_str();
        debug!("Fetching document with prefix: {}", prefix);

        let outcome = retry_with_backoff(
            &self.policy,
            self.sleeper.as_ref(),
            "Storage fetch",
            move |_| self.fetch_once(key, prefix),
            |e: &DocMetaError| {
                if e.is_retryable() {
                    RetryAction::Retry { multiplier: 1 }
                } else {
                    RetryAction::Fail
                }
            },
        )
        .await;

        match outcome {
            Ok(bytes) => Ok(bytes),
            Err(RetryError::Fatal(e)) | Err(RetryError::Exhausted(e)) => Err(e),
            Err(RetryError::NoAttempts) => {
                Err(DocMetaError::Storage("Maximum retries exceeded".into()))
            }
        }
    }

    async fn fetch_once(&self, key: &DocumentKey, prefix: &str) -> Result<Vec<u8>, DocMetaError> {
        let objects = self
            .storage
            .list(prefix)
            .await
            .map_err(|e| storage_error(e, key))?;

        let Some(object_name) = objects.first() else {
            warn!("Document not found: {}", key);
            return Err(key.not_found());
        };
        if objects.len() > 1 {
            debug!(
                "{} objects under {}, using the first: {}",
                objects.len(),
                prefix,
                object_name
            );
        } else {
            debug!("Found object: {}", object_name);
        }

        let content = self
            .storage
            .get(object_name)
            .await
            .map_err(|e| storage_error(e, key))?;

        info!(
            "Fetched document {} ({} bytes)",
            key.document_id(),
            content.len()
        );
        Ok(content)
    }
}

fn storage_error(e: StorageError, key: &DocumentKey) -> DocMetaError {
    match e {
        StorageError::NotFound(_) => key.not_found(),
        StorageError::Connection(msg) => DocMetaError::StorageConnection(msg),
        StorageError::Other(msg) => DocMetaError::Storage(msg),
    }
}
