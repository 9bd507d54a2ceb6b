//! Domain layer - Core business logic and entities

pub mod conversion;
pub mod error;
pub mod storage;

pub use conversion::{
    ConversionDocument, DataSource, DocumentCodec, DocumentFormat, DocumentId, DocumentParts,
    SourceRecord, StoreLocation, TypedDataSource,
};
pub use error::DomainError;
pub use storage::{ObjectStorage, ObjectVisibility, StoredObject, UploadRequest};
