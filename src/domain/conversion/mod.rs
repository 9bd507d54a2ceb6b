//! Conversion domain - Documents and their typed data sources

mod codec;
mod data_source;
mod document;
mod format;
mod key;
mod record;

pub use codec::DocumentCodec;
pub use data_source::{DataSource, TypedDataSource};
pub use document::{ConversionDocument, DocumentId, DocumentParts};
pub use format::DocumentFormat;
pub use key::StoreLocation;
pub use record::SourceRecord;
