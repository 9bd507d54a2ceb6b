//! Factory for creating document codecs

use std::sync::Arc;

use crate::domain::conversion::{DocumentCodec, DocumentFormat};

use super::json::JsonDocumentCodec;
use super::xml::XmlDocumentCodec;

/// Factory for creating document codecs
#[derive(Debug, Default)]
pub struct CodecFactory;

impl CodecFactory {
    /// Create the codec for the given format
    pub fn create(format: DocumentFormat) -> Arc<dyn DocumentCodec> {
        match format {
            DocumentFormat::Json => Arc::new(JsonDocumentCodec::new()),
            DocumentFormat::Xml => Arc::new(XmlDocumentCodec::new()),
        }
    }

    /// Detect the format from an object key extension
    pub fn detect_from_key(key: &str) -> Option<DocumentFormat> {
        key.rsplit_once('.')
            .and_then(|(_, extension)| DocumentFormat::from_name(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_matches_format() {
        assert_eq!(
            CodecFactory::create(DocumentFormat::Json).format(),
            DocumentFormat::Json
        );
        assert_eq!(
            CodecFactory::create(DocumentFormat::Xml).format(),
            DocumentFormat::Xml
        );
    }

    #[test]
    fn test_detect_from_key() {
        assert_eq!(
            CodecFactory::detect_from_key("bucket/p/1.json"),
            Some(DocumentFormat::Json)
        );
        assert_eq!(
            CodecFactory::detect_from_key("bucket/p/1-v2.xml"),
            Some(DocumentFormat::Xml)
        );
        assert_eq!(CodecFactory::detect_from_key("bucket/p/1.txt"), None);
        assert_eq!(CodecFactory::detect_from_key("bucket"), None);
    }
}
