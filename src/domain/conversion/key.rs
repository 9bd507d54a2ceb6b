//! Object key scheme for conversion documents

use once_cell::sync::Lazy;
use regex::Regex;

use super::document::DocumentId;
use super::format::DocumentFormat;
use crate::domain::DomainError;

/// Characters allowed in a single key segment (S3 safe characters)
static SEGMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9!_.*'()-]+$").unwrap());

/// Bucket and prefix under which a store keeps its documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    bucket: String,
    prefix: String,
}

impl StoreLocation {
    /// Create a validated location
    ///
    /// Leading and trailing slashes are trimmed from the prefix.
    pub fn new(bucket: impl Into<String>, prefix: impl AsRef<str>) -> Result<Self, DomainError> {
        let bucket = bucket.into();
        validate_segment("bucket name", &bucket)?;

        Ok(Self {
            bucket,
            prefix: normalize_prefix(prefix.as_ref())?,
        })
    }

    /// Same bucket, different prefix
    pub fn with_prefix(&self, prefix: impl AsRef<str>) -> Result<Self, DomainError> {
        Ok(Self {
            bucket: self.bucket.clone(),
            prefix: normalize_prefix(prefix.as_ref())?,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key prefix shared by every document at this location, ending in `/`
    pub fn listing_prefix(&self) -> String {
        if self.prefix.is_empty() {
            format!("{}/", self.bucket)
        } else {
            format!("{}/{}/", self.bucket, self.prefix)
        }
    }

    /// Whether a listed key names an object directly at this location
    ///
    /// Keys under nested prefixes and folder placeholders ending in `/` do not.
    pub fn is_document_key(&self, key: &str) -> bool {
        key.strip_prefix(self.listing_prefix().as_str())
            .is_some_and(|name| !name.is_empty() && !name.contains('/'))
    }

    /// Object key for a document: `{bucket}/{prefix}/{id}[-{suffix}].{ext}`
    ///
    /// Empty or whitespace-only suffixes are ignored.
    pub fn document_key(
        &self,
        id: &DocumentId,
        suffix: Option<&str>,
        format: DocumentFormat,
    ) -> Result<String, DomainError> {
        let object_name = match normalize_suffix(suffix) {
            Some(suffix) => {
                validate_segment("object name suffix", suffix)?;
                format!("{}-{}.{}", id, suffix, format.extension())
            }
            None => format!("{}.{}", id, format.extension()),
        };

        Ok(format!("{}{}", self.listing_prefix(), object_name))
    }
}

fn normalize_suffix(suffix: Option<&str>) -> Option<&str> {
    suffix.filter(|s| !s.trim().is_empty())
}

fn normalize_prefix(prefix: &str) -> Result<String, DomainError> {
    let prefix = prefix.trim_matches('/');

    if !prefix.is_empty() {
        for segment in prefix.split('/') {
            validate_segment("bucket prefix segment", segment)?;
        }
    }

    Ok(prefix.to_string())
}

fn validate_segment(what: &str, value: &str) -> Result<(), DomainError> {
    if value.is_empty() {
        return Err(DomainError::validation(format!("The {} cannot be empty", what)));
    }

    if !SEGMENT_PATTERN.is_match(value) {
        return Err(DomainError::validation(format!(
            "Invalid {} '{}': only letters, digits and !-_.*'() are allowed",
            what, value
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_id() -> DocumentId {
        DocumentId::new("11111111-1111-1111-1111-111111111111").unwrap()
    }

    #[test]
    fn test_document_key_without_suffix() {
        let location = StoreLocation::new("bucket", "conversions").unwrap();
        let key = location
            .document_key(&fixed_id(), None, DocumentFormat::Json)
            .unwrap();

        assert_eq!(
            key,
            "bucket/conversions/11111111-1111-1111-1111-111111111111.json"
        );
    }

    #[test]
    fn test_is_document_key() {
        let location = StoreLocation::new("bucket", "conversions").unwrap();

        assert!(location.is_document_key("bucket/conversions/1.json"));
        assert!(location.is_document_key("bucket/conversions/1-v2.xml"));
        assert!(!location.is_document_key("bucket/conversions/archive/1.json"));
        assert!(!location.is_document_key("bucket/conversions/"));
        assert!(!location.is_document_key("bucket/conversions-old/1.json"));
        assert!(!location.is_document_key("other/conversions/1.json"));

        let root = StoreLocation::new("bucket", "").unwrap();
        assert!(root.is_document_key("bucket/1.json"));
        assert!(!root.is_document_key("bucket/conversions/1.json"));
    }

    #[test]
    fn test_document_key_with_suffix() {
        let location = StoreLocation::new("bucket", "conversions").unwrap();
        let key = location
            .document_key(&fixed_id(), Some("v2"), DocumentFormat::Json)
            .unwrap();

        assert_eq!(
            key,
            "bucket/conversions/11111111-1111-1111-1111-111111111111-v2.json"
        );
        assert!(!key.contains('$'));
    }

    #[test]
    fn test_blank_suffix_is_ignored() {
        let location = StoreLocation::new("bucket", "conversions").unwrap();

        for suffix in ["", "   "] {
            let key = location
                .document_key(&fixed_id(), Some(suffix), DocumentFormat::Json)
                .unwrap();
            assert!(key.ends_with("11111111-1111-1111-1111-111111111111.json"));
        }
    }

    #[test]
    fn test_invalid_suffix_is_rejected() {
        let location = StoreLocation::new("bucket", "conversions").unwrap();

        let result = location.document_key(&fixed_id(), Some("a/b"), DocumentFormat::Json);
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_xml_format_uses_xml_extension() {
        let location = StoreLocation::new("bucket", "conversions").unwrap();
        let key = location
            .document_key(&fixed_id(), None, DocumentFormat::Xml)
            .unwrap();

        assert!(key.ends_with(".xml"));
    }

    #[test]
    fn test_prefix_normalization() {
        let location = StoreLocation::new("bucket", "/nested/prefix/").unwrap();
        assert_eq!(location.prefix(), "nested/prefix");
        assert_eq!(location.listing_prefix(), "bucket/nested/prefix/");

        let root = StoreLocation::new("bucket", "").unwrap();
        assert_eq!(root.listing_prefix(), "bucket/");
        assert_eq!(
            root.document_key(&fixed_id(), None, DocumentFormat::Json)
                .unwrap(),
            "bucket/11111111-1111-1111-1111-111111111111.json"
        );
    }

    #[test]
    fn test_invalid_location() {
        assert!(StoreLocation::new("", "prefix").is_err());
        assert!(StoreLocation::new("bucket", "a//b").is_err());
        assert!(StoreLocation::new("bucket", "with space").is_err());
    }

    #[test]
    fn test_with_prefix_keeps_bucket() {
        let location = StoreLocation::new("bucket", "a").unwrap();
        let moved = location.with_prefix("b").unwrap();

        assert_eq!(moved.bucket(), "bucket");
        assert_eq!(moved.prefix(), "b");
        assert_eq!(location.prefix(), "a");
    }
}
