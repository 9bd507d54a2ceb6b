//! Storage factory for runtime backend selection

use std::sync::Arc;

use tracing::info;

use crate::config::StorageSettings;
use crate::domain::DomainError;
use crate::domain::storage::ObjectStorage;

use super::in_memory::InMemoryObjectStorage;
use super::s3::{S3Client, S3ObjectStorage};

/// Supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// AWS S3 or an S3-compatible endpoint
    S3,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "s3" | "aws" => Some(Self::S3),
            _ => None,
        }
    }
}

/// Factory for creating object storage instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the object storage selected by the settings
    pub async fn create(settings: &StorageSettings) -> Result<Arc<dyn ObjectStorage>, DomainError> {
        let storage_type = StorageType::from_str(&settings.backend).ok_or_else(|| {
            DomainError::configuration(format!(
                "Unknown storage backend '{}'",
                settings.backend
            ))
        })?;

        info!(backend = ?storage_type, bucket = %settings.bucket, "Creating object storage");

        match storage_type {
            StorageType::InMemory => Ok(Self::create_in_memory()),
            StorageType::S3 => {
                let client = S3Client::from_settings(&settings.s3).await;
                let storage = match &settings.s3.kms_key_id {
                    Some(kms_key_id) => S3ObjectStorage::new(client).with_kms_key_id(kms_key_id),
                    None => S3ObjectStorage::new(client),
                };
                Ok(Arc::new(storage))
            }
        }
    }

    /// Creates an in-memory storage
    pub fn create_in_memory() -> Arc<InMemoryObjectStorage> {
        Arc::new(InMemoryObjectStorage::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!(StorageType::from_str("memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("in-memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("IN_MEMORY"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("s3"), Some(StorageType::S3));
        assert_eq!(StorageType::from_str("S3"), Some(StorageType::S3));
        assert_eq!(StorageType::from_str("postgres"), None);
    }

    #[tokio::test]
    async fn test_create_in_memory_backend() {
        let settings = StorageSettings {
            backend: "memory".to_string(),
            ..StorageSettings::default()
        };

        let storage = StorageFactory::create(&settings).await.unwrap();
        assert_eq!(storage.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_unknown_backend_is_configuration_error() {
        let settings = StorageSettings {
            backend: "ftp".to_string(),
            ..StorageSettings::default()
        };

        let result = StorageFactory::create(&settings).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
