//! In-memory object storage implementation

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::storage::{ObjectStorage, ObjectVisibility, StoredObject, UploadRequest};

/// Thread-safe in-memory object storage
///
/// Useful for testing and development. Data is lost when the process terminates.
/// Listings are returned in key order.
#[derive(Debug, Default)]
pub struct InMemoryObjectStorage {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl InMemoryObjectStorage {
    /// Creates a new empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub fn len(&self) -> Result<usize, DomainError> {
        let objects = self.objects.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(objects.len())
    }

    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len()? == 0)
    }

    /// Visibility of a stored object, if present
    pub fn visibility(&self, key: &str) -> Result<Option<ObjectVisibility>, DomainError> {
        let objects = self.objects.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(objects.get(key).map(|object| object.visibility))
    }

    /// Content type of a stored object, if present
    pub fn content_type(&self, key: &str) -> Result<Option<String>, DomainError> {
        let objects = self.objects.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(objects.get(key).map(|object| object.content_type.clone()))
    }
}

#[async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, DomainError> {
        let objects = self.objects.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, DomainError> {
        let objects = self.objects.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        objects
            .get(key)
            .map(|object| object.body.clone())
            .ok_or_else(|| DomainError::not_found(format!("Object '{}' not found", key)))
    }

    async fn upload(&self, request: UploadRequest) -> Result<(), DomainError> {
        let mut objects = self.objects.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        objects.insert(request.key.clone(), request.into());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let objects = self.objects.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(objects.contains_key(key))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
