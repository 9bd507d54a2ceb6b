//! Storage infrastructure - Object storage implementations

mod document_client;
mod factory;
mod in_memory;
mod s3;

pub use document_client::DocumentObjectClient;
pub use factory::{StorageFactory, StorageType};
pub use in_memory::InMemoryObjectStorage;
pub use s3::{S3Client, S3ClientTrait, S3ListPage, S3ObjectStorage, S3PutObject};

#[cfg(test)]
pub use s3::MockS3ClientTrait;
