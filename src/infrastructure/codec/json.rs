//! JSON document codec

use crate::domain::DomainError;
use crate::domain::conversion::{ConversionDocument, DocumentCodec, DocumentFormat};

/// Codec for the JSON object notation
#[derive(Debug, Clone, Default)]
pub struct JsonDocumentCodec {
    pretty: bool,
}

impl JsonDocumentCodec {
    /// Create a compact JSON codec
    pub fn new() -> Self {
        Self::default()
    }

    /// Write indented JSON
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl DocumentCodec for JsonDocumentCodec {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Json
    }

    fn encode(&self, document: &ConversionDocument) -> Result<Vec<u8>, DomainError> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(document)
        } else {
            serde_json::to_vec(document)
        };

        encoded.map_err(|e| DomainError::serialization(format!("Failed to encode JSON: {}", e)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ConversionDocument, DomainError> {
        serde_json::from_slice(bytes)
            .map_err(|e| DomainError::serialization(format!("Invalid JSON document: {}", e)))
    }
}
