//! Conversion store - history, read and write of conversion documents

use chrono::Utc;
use tracing::{Span, debug, info, instrument};

use crate::config::StorageSettings;
use crate::domain::DomainError;
use crate::domain::conversion::{ConversionDocument, DocumentId, StoreLocation};
use crate::domain::storage::ObjectVisibility;
use crate::infrastructure::storage::{DocumentObjectClient, StorageFactory};

/// Persists conversion documents under `{bucket}/{prefix}/`
///
/// The location is fixed per instance; [`with_bucket_prefix`](Self::with_bucket_prefix)
/// returns a store bound to another prefix.
#[derive(Debug, Clone)]
pub struct ConversionStore {
    client: DocumentObjectClient,
    location: StoreLocation,
}

impl ConversionStore {
    pub fn new(client: DocumentObjectClient, location: StoreLocation) -> Self {
        Self { client, location }
    }

    /// Build a store from storage settings
    pub async fn from_settings(settings: &StorageSettings) -> Result<Self, DomainError> {
        let location = StoreLocation::new(&settings.bucket, &settings.prefix)?;
        let storage = StorageFactory::create(settings).await?;
        let client = DocumentObjectClient::with_format(storage, settings.format);

        Ok(Self::new(client, location))
    }

    /// Rebind the store to another prefix within the same bucket
    pub fn with_bucket_prefix(mut self, prefix: impl AsRef<str>) -> Result<Self, DomainError> {
        self.location = self.location.with_prefix(prefix)?;
        Ok(self)
    }

    pub fn bucket(&self) -> &str {
        self.location.bucket()
    }

    pub fn prefix(&self) -> &str {
        self.location.prefix()
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn client(&self) -> &DocumentObjectClient {
        &self.client
    }

    /// Every document stored directly under the current prefix, in listing order
    ///
    /// Documents under nested prefixes belong to other stores and are skipped.
    #[instrument(skip(self), fields(bucket = self.bucket(), prefix = self.prefix()))]
    pub async fn history(&self) -> Result<Vec<ConversionDocument>, DomainError> {
        let keys: Vec<String> = self
            .client
            .list_document_keys(&self.location.listing_prefix())
            .await?
            .into_iter()
            .filter(|key| self.location.is_document_key(key))
            .collect();

        let documents = self.client.download_documents(&keys).await?;

        debug!(count = documents.len(), "Loaded conversion history");
        Ok(documents)
    }

    /// Read one document by ID and optional suffix
    #[instrument(skip(self, document_id), fields(document_id = %document_id))]
    pub async fn read(
        &self,
        document_id: &DocumentId,
        suffix: Option<&str>,
    ) -> Result<ConversionDocument, DomainError> {
        let key = self
            .location
            .document_key(document_id, suffix, self.client.format())?;

        self.client.download_document(&key).await
    }

    /// Persist a document, assigning an ID on first write
    ///
    /// The caller's document is only stamped once the upload has succeeded.
    #[instrument(skip(self, document), fields(document_id))]
    pub async fn write<'a>(
        &self,
        document: &'a mut ConversionDocument,
        suffix: Option<&str>,
    ) -> Result<&'a ConversionDocument, DomainError> {
        let first_write = !document.is_persisted();

        let mut stamped = document.clone();
        let id = stamped.stamp_persisted(Utc::now());
        Span::current().record("document_id", tracing::field::display(&id));

        let key = self
            .location
            .document_key(&id, suffix, self.client.format())?;

        self.client
            .upload_document(&key, &stamped, ObjectVisibility::Private)
            .await?;

        info!(key = %key, first_write, "Conversion document written");

        *document = stamped;
        Ok(document)
    }
}
