//! Storage domain - Object storage abstraction layer

mod entity;
mod repository;

pub use entity::{ObjectVisibility, StoredObject, UploadRequest};
pub use repository::ObjectStorage;

#[cfg(test)]
pub use repository::mock;
