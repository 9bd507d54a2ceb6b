//! Conversion document entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::data_source::{DataSource, TypedDataSource, names_match, validate_name};
use super::record::SourceRecord;
use crate::domain::DomainError;

/// Unique document identifier (UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Parse a document ID from its canonical string form
    pub fn new(id: &str) -> Result<Self, DomainError> {
        let uuid = Uuid::parse_str(id.trim()).map_err(|e| {
            DomainError::invalid_id(format!("Invalid document ID '{}': {}", id, e))
        })?;

        if uuid.is_nil() {
            return Err(DomainError::invalid_id("Document ID cannot be nil"));
        }

        Ok(Self(uuid))
    }

    /// Generate a new random document ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for DocumentId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

impl FromStr for DocumentId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Raw document fields, validated on conversion into a [`ConversionDocument`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentParts {
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,

    #[serde(default)]
    pub data_sources: Vec<DataSource>,

    #[serde(default)]
    pub finished: Option<DateTime<Utc>>,

    #[serde(default)]
    pub id: Option<DocumentId>,

    #[serde(default)]
    pub started: Option<DateTime<Utc>>,

    #[serde(default = "Utc::now")]
    pub updated: DateTime<Utc>,
}

/// The persisted record of one conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DocumentParts")]
pub struct ConversionDocument {
    /// When the document was first persisted
    created: DateTime<Utc>,

    /// Named data sources, unique by case-insensitive name
    data_sources: Vec<DataSource>,

    /// When the conversion finished
    finished: Option<DateTime<Utc>>,

    /// Assigned on first persistence, then immutable
    id: Option<DocumentId>,

    /// When the conversion started
    started: Option<DateTime<Utc>>,

    /// When the document was last persisted
    updated: DateTime<Utc>,
}

impl Default for ConversionDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionDocument {
    /// Create an empty, unpersisted document
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            data_sources: Vec::new(),
            finished: None,
            id: None,
            started: None,
            updated: now,
        }
    }

    // Getters

    pub fn id(&self) -> Option<&DocumentId> {
        self.id.as_ref()
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.started
    }

    pub fn finished(&self) -> Option<DateTime<Utc>> {
        self.finished
    }

    pub fn data_sources(&self) -> &[DataSource] {
        &self.data_sources
    }

    pub fn data_source_names(&self) -> Vec<&str> {
        self.data_sources.iter().map(|d| d.name()).collect()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    // Conversion lifecycle

    pub fn set_started(&mut self, started: Option<DateTime<Utc>>) -> &mut Self {
        self.started = started;
        self
    }

    pub fn set_finished(&mut self, finished: Option<DateTime<Utc>>) -> &mut Self {
        self.finished = finished;
        self
    }

    pub fn mark_started(&mut self) -> &mut Self {
        self.set_started(Some(Utc::now()))
    }

    pub fn mark_finished(&mut self) -> &mut Self {
        self.set_finished(Some(Utc::now()))
    }

    // Data sources

    /// Add a data source, replacing any source with the same name (ignoring case)
    pub fn add_data_source<T: SourceRecord>(
        &mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Result<&mut Self, DomainError> {
        let source = DataSource::new(name, values)?;
        self.data_sources.retain(|d| !d.matches_name(source.name()));
        self.data_sources.push(source);
        Ok(self)
    }

    /// Builder form of [`add_data_source`](Self::add_data_source)
    pub fn with_data_source<T: SourceRecord>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Self, DomainError> {
        self.add_data_source(name, values)?;
        Ok(self)
    }

    /// Append a record to an existing data source of element type `T`
    ///
    /// Fails with `DataSourceNotFound` for an unknown name and
    /// `ElementTypeMismatch` when the source holds another type. The document
    /// is left unchanged on failure.
    pub fn add_data_source_record<T: SourceRecord>(
        &mut self,
        name: &str,
        value: T,
    ) -> Result<&mut Self, DomainError> {
        let source = self
            .data_sources
            .iter_mut()
            .find(|d| d.matches_name(name))
            .ok_or_else(|| DomainError::data_source_not_found(name))?;

        source.push(value)?;
        Ok(self)
    }

    /// View a data source with element type `T`
    ///
    /// Returns `None` when no source has this name or its element type is not `T`.
    pub fn get_data_source<T: SourceRecord>(&self, name: &str) -> Option<TypedDataSource<T>> {
        self.data_source(name).and_then(|d| d.typed::<T>())
    }

    /// Untyped access to a data source
    pub fn data_source(&self, name: &str) -> Option<&DataSource> {
        self.data_sources.iter().find(|d| d.matches_name(name))
    }

    pub fn has_data_source(&self, name: &str) -> bool {
        self.data_source(name).is_some()
    }

    /// Remove a data source, returns true if one was removed
    pub fn remove_data_source(&mut self, name: &str) -> bool {
        let before = self.data_sources.len();
        self.data_sources.retain(|d| !d.matches_name(name));
        self.data_sources.len() != before
    }

    /// Check the data source invariants
    pub fn validate(&self) -> Result<(), DomainError> {
        for (index, source) in self.data_sources.iter().enumerate() {
            validate_name(source.name())?;

            if self.data_sources[..index]
                .iter()
                .any(|other| names_match(other.name(), source.name()))
            {
                return Err(DomainError::validation(format!(
                    "Duplicate data source name '{}'",
                    source.name()
                )));
            }
        }

        Ok(())
    }

    /// Stamp the document for persistence at `at`
    ///
    /// Assigns an ID and creation time on first persistence and always
    /// refreshes the update time.
    pub(crate) fn stamp_persisted(&mut self, at: DateTime<Utc>) -> DocumentId {
        let id = match self.id {
            Some(id) => id,
            None => {
                let id = DocumentId::generate();
                self.id = Some(id);
                self.created = at;
                id
            }
        };

        self.updated = at;
        id
    }
}

impl TryFrom<DocumentParts> for ConversionDocument {
    type Error = DomainError;

    fn try_from(parts: DocumentParts) -> Result<Self, Self::Error> {
        let document = Self {
            created: parts.created,
            data_sources: parts.data_sources,
            finished: parts.finished,
            id: parts.id,
            started: parts.started,
            updated: parts.updated,
        };

        document.validate()?;
        Ok(document)
    }
}
