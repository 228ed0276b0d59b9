//! Object storage port.
//!
//! The fetch stage only needs two calls from storage (list a key prefix and
//! read one object) and it needs "not found" and "connection" failures to
//! stay distinguishable so it can decide whether to retry. [`ObjectStorage`]
//! captures exactly that; [`s3::ObjectStoreStorage`] implements it over any
//! `object_store` backend (S3 / MinIO in production, in-memory in tests).

pub mod s3;

pub use s3::ObjectStoreStorage;

use async_trait::async_trait;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Object names under `prefix`, in listing order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Full content of one object.
    async fn get(&self, object_name: &str) -> Result<Vec<u8>, StorageError>;

    /// `true` when the configured bucket answers a listing.
    async fn health_check(&self) -> bool {
        self.list("").await.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("{0}")]
    Other(String),
}
