//! Document codec trait

use std::fmt::Debug;

use super::document::ConversionDocument;
use super::format::DocumentFormat;
use crate::domain::DomainError;

/// Converts conversion documents to and from their stored bytes
///
/// Every codec reproduces the same document shape field for field.
pub trait DocumentCodec: Send + Sync + Debug {
    /// The format this codec reads and writes
    fn format(&self) -> DocumentFormat;

    /// Encode a document
    fn encode(&self, document: &ConversionDocument) -> Result<Vec<u8>, DomainError>;

    /// Decode a document, validating its invariants
    fn decode(&self, bytes: &[u8]) -> Result<ConversionDocument, DomainError>;
}
