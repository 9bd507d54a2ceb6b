//! Conversion Store
//!
//! Records of data conversion runs and their persistence:
//! - Conversion documents holding named, typed data sources
//! - JSON and XML document codecs
//! - A document store over S3 or in-memory object storage

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::DomainError;
pub use domain::conversion::{ConversionDocument, DocumentFormat, DocumentId, SourceRecord};
pub use infrastructure::services::ConversionStore;
