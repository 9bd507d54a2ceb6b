//! Document-level client over object storage

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, instrument};

use crate::domain::DomainError;
use crate::domain::conversion::{ConversionDocument, DocumentCodec, DocumentFormat};
use crate::domain::storage::{ObjectStorage, ObjectVisibility, UploadRequest};
use crate::infrastructure::codec::CodecFactory;

/// Downloads in flight at once while loading a listing
const DOWNLOAD_CONCURRENCY: usize = 16;

/// Moves conversion documents through an [`ObjectStorage`] backend
///
/// Uploads always use the configured codec. Downloads pick the codec from the
/// key extension and fall back to the configured one.
#[derive(Debug, Clone)]
pub struct DocumentObjectClient {
    storage: Arc<dyn ObjectStorage>,
    codec: Arc<dyn DocumentCodec>,
}

impl DocumentObjectClient {
    pub fn new(storage: Arc<dyn ObjectStorage>, codec: Arc<dyn DocumentCodec>) -> Self {
        Self { storage, codec }
    }

    /// Client using the codec for the given format
    pub fn with_format(storage: Arc<dyn ObjectStorage>, format: DocumentFormat) -> Self {
        Self::new(storage, CodecFactory::create(format))
    }

    pub fn format(&self) -> DocumentFormat {
        self.codec.format()
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    fn codec_for_key(&self, key: &str) -> Arc<dyn DocumentCodec> {
        match CodecFactory::detect_from_key(key) {
            Some(format) if format != self.codec.format() => CodecFactory::create(format),
            _ => self.codec.clone(),
        }
    }

    /// Keys under the prefix that hold documents, in listing order
    ///
    /// Folder placeholders (keys ending in `/`) and objects without a
    /// document extension are skipped.
    #[instrument(skip(self), fields(backend = self.storage.backend_name()))]
    pub async fn list_document_keys(&self, prefix: &str) -> Result<Vec<String>, DomainError> {
        let listed = self.storage.list(prefix).await?;
        let total = listed.len();

        let keys: Vec<String> = listed
            .into_iter()
            .filter(|key| !key.ends_with('/') && CodecFactory::detect_from_key(key).is_some())
            .collect();

        if keys.len() != total {
            debug!(skipped = total - keys.len(), "Skipped non-document objects");
        }
        Ok(keys)
    }

    /// Download and decode the given documents, preserving their order
    pub async fn download_documents(
        &self,
        keys: &[String],
    ) -> Result<Vec<ConversionDocument>, DomainError> {
        debug!(count = keys.len(), "Downloading documents");

        stream::iter(keys.iter().map(|key| self.download_document(key)))
            .buffered(DOWNLOAD_CONCURRENCY)
            .try_collect()
            .await
    }

    /// Download and decode every document under the prefix, in listing order
    pub async fn list_documents(&self, prefix: &str) -> Result<Vec<ConversionDocument>, DomainError> {
        let keys = self.list_document_keys(prefix).await?;
        self.download_documents(&keys).await
    }

    #[instrument(skip(self), fields(backend = self.storage.backend_name()))]
    pub async fn download_document(&self, key: &str) -> Result<ConversionDocument, DomainError> {
        let body = self.storage.download(key).await?;

        self.codec_for_key(key).decode(&body).map_err(|e| {
            DomainError::serialization(format!("Failed to decode document '{}': {}", key, e))
        })
    }

    #[instrument(skip(self, document), fields(backend = self.storage.backend_name()))]
    pub async fn upload_document(
        &self,
        key: &str,
        document: &ConversionDocument,
        visibility: ObjectVisibility,
    ) -> Result<(), DomainError> {
        let body = self.codec.encode(document)?;
        let size = body.len();

        let request = UploadRequest::new(key, body)
            .with_content_type(self.codec.format().content_type())
            .with_visibility(visibility);

        self.storage.upload(request).await?;
        debug!(size, "Uploaded document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryObjectStorage;

    fn sample(name: &str) -> ConversionDocument {
        ConversionDocument::new()
            .with_data_source(name, vec![1i64, 2, 3])
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_and_download_json() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        let client = DocumentObjectClient::with_format(storage.clone(), DocumentFormat::Json);

        let document = sample("numbers");
        client
            .upload_document("bucket/p/a.json", &document, ObjectVisibility::Private)
            .await
            .unwrap();

        assert_eq!(
            storage.content_type("bucket/p/a.json").unwrap().as_deref(),
            Some("application/json")
        );
        assert_eq!(
            storage.visibility("bucket/p/a.json").unwrap(),
            Some(ObjectVisibility::Private)
        );

        let loaded = client.download_document("bucket/p/a.json").await.unwrap();
        assert_eq!(loaded, document);
    }

    #[tokio::test]
    async fn test_download_picks_codec_from_extension() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        let xml_client = DocumentObjectClient::with_format(storage.clone(), DocumentFormat::Xml);
        let json_client = DocumentObjectClient::with_format(storage, DocumentFormat::Json);

        let document = sample("numbers");
        xml_client
            .upload_document("bucket/p/a.xml", &document, ObjectVisibility::Private)
            .await
            .unwrap();

        let loaded = json_client.download_document("bucket/p/a.xml").await.unwrap();
        assert_eq!(loaded, document);
    }

    #[tokio::test]
    async fn test_list_documents_preserves_order() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        let client = DocumentObjectClient::with_format(storage, DocumentFormat::Json);

        for (key, name) in [("bucket/p/1.json", "first"), ("bucket/p/2.json", "second")] {
            client
                .upload_document(key, &sample(name), ObjectVisibility::Private)
                .await
                .unwrap();
        }
        client
            .upload_document("bucket/q/3.json", &sample("other"), ObjectVisibility::Private)
            .await
            .unwrap();

        let documents = client.list_documents("bucket/p/").await.unwrap();
        let names: Vec<_> = documents
            .iter()
            .map(|d| d.data_source_names()[0].to_string())
            .collect();

        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_list_skips_folder_placeholders() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        storage
            .upload(UploadRequest::new("bucket/p/", Vec::new()))
            .await
            .unwrap();

        let client = DocumentObjectClient::with_format(storage, DocumentFormat::Json);
        client
            .upload_document("bucket/p/1.json", &sample("first"), ObjectVisibility::Private)
            .await
            .unwrap();

        assert_eq!(
            client.list_document_keys("bucket/p/").await.unwrap(),
            vec!["bucket/p/1.json"]
        );
        assert_eq!(client.list_documents("bucket/p/").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_skips_unknown_extensions() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        for key in ["bucket/p/notes.txt", "bucket/p/README", "bucket/p/.DS_Store"] {
            storage
                .upload(UploadRequest::new(key, b"not a document".to_vec()))
                .await
                .unwrap();
        }

        let client = DocumentObjectClient::with_format(storage, DocumentFormat::Json);
        client
            .upload_document("bucket/p/1.json", &sample("first"), ObjectVisibility::Private)
            .await
            .unwrap();

        assert_eq!(
            client.list_document_keys("bucket/p/").await.unwrap(),
            vec!["bucket/p/1.json"]
        );

        let documents = client.list_documents("bucket/p/").await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].data_source_names(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_list_documents_beyond_concurrency_limit() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        let client = DocumentObjectClient::with_format(storage, DocumentFormat::Json);

        let count = DOWNLOAD_CONCURRENCY * 2 + 3;
        for index in 0..count {
            client
                .upload_document(
                    &format!("bucket/p/{:03}.json", index),
                    &sample(&format!("source{}", index)),
                    ObjectVisibility::Private,
                )
                .await
                .unwrap();
        }

        let documents = client.list_documents("bucket/p/").await.unwrap();
        let names: Vec<String> = documents
            .iter()
            .map(|d| d.data_source_names()[0].to_string())
            .collect();
        let expected: Vec<String> = (0..count).map(|index| format!("source{}", index)).collect();

        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_serialization_error() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        storage
            .upload(UploadRequest::new("bucket/p/bad.json", b"not json".to_vec()))
            .await
            .unwrap();

        let client = DocumentObjectClient::with_format(storage, DocumentFormat::Json);
        let result = client.download_document("bucket/p/bad.json").await;

        assert!(matches!(result, Err(DomainError::Serialization { .. })));
    }

    #[tokio::test]
    async fn test_missing_document_is_not_found() {
        let storage = Arc::new(InMemoryObjectStorage::new());
        let client = DocumentObjectClient::with_format(storage, DocumentFormat::Json);

        let result = client.download_document("bucket/p/none.json").await;
        assert!(matches!(result, Err(DomainError::NotFound { .. })));
    }
}
