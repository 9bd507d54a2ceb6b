//! Object storage trait definition

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

use super::entity::UploadRequest;

/// Byte-level object storage used to persist documents
///
/// Keys are full paths of the form `{bucket}/{path}`. Implementations decide
/// how the bucket segment maps onto their backend.
#[async_trait]
pub trait ObjectStorage: Send + Sync + Debug {
    /// Lists the keys of all objects whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>, DomainError>;

    /// Downloads an object body, failing with `NotFound` when the key is absent
    async fn download(&self, key: &str) -> Result<Vec<u8>, DomainError>;

    /// Uploads an object, replacing any existing object under the same key
    async fn upload(&self, request: UploadRequest) -> Result<(), DomainError>;

    /// Checks whether an object exists
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        match self.download(key).await {
            Ok(_) => Ok(true),
            Err(DomainError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
