//! Named, typed collections of source records

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::record::SourceRecord;
use crate::domain::DomainError;

/// Case-insensitive data source name comparison
pub(crate) fn names_match(left: &str, right: &str) -> bool {
    left == right || left.to_lowercase() == right.to_lowercase()
}

/// A named data source embedded in a conversion document
///
/// Records are held as untyped values next to the element type tag they were
/// built from, so the original type survives serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    name: String,

    #[serde(default)]
    element_type: Option<String>,

    #[serde(default)]
    source: Vec<Value>,
}

impl DataSource {
    /// Build a data source from same-typed records
    pub fn new<T: SourceRecord>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        validate_name(&name)?;

        let source = values
            .into_iter()
            .map(|value| encode_record(&name, &value))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            element_type: Some(T::ELEMENT_TYPE.to_string()),
            source,
        })
    }

    /// Rebuild a data source from decoded parts
    pub fn from_parts(name: impl Into<String>, element_type: Option<String>, source: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            element_type,
            source,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The element type tag, absent for sources written without one
    pub fn element_type(&self) -> Option<&str> {
        self.element_type.as_deref()
    }

    /// Untyped record payloads
    pub fn records(&self) -> &[Value] {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn matches_name(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }

    /// Check whether the records can be viewed as `T`
    ///
    /// Untagged sources accept `T` when every record decodes as `T`.
    pub fn accepts<T: SourceRecord>(&self) -> bool {
        match &self.element_type {
            Some(tag) => tag == T::ELEMENT_TYPE,
            None => self
                .source
                .iter()
                .all(|value| T::deserialize(value).is_ok()),
        }
    }

    /// Append a record of the source's element type
    pub fn push<T: SourceRecord>(&mut self, value: T) -> Result<(), DomainError> {
        if !self.accepts::<T>() {
            return Err(DomainError::element_type_mismatch(
                &self.name,
                T::ELEMENT_TYPE,
                self.element_type().unwrap_or("untyped"),
            ));
        }

        let value = encode_record(&self.name, &value)?;
        self.element_type
            .get_or_insert_with(|| T::ELEMENT_TYPE.to_string());
        self.source.push(value);
        Ok(())
    }

    /// View the records as `T`, or `None` when the element type differs
    pub fn typed<T: SourceRecord>(&self) -> Option<TypedDataSource<T>> {
        if !self.accepts::<T>() {
            return None;
        }

        let records = self
            .source
            .iter()
            .map(|value| T::deserialize(value))
            .collect::<Result<Vec<_>, _>>();

        match records {
            Ok(records) => Some(TypedDataSource {
                name: self.name.clone(),
                records,
            }),
            Err(e) => {
                warn!(
                    data_source = %self.name,
                    element_type = T::ELEMENT_TYPE,
                    error = %e,
                    "Data source records do not decode as their element type"
                );
                None
            }
        }
    }
}

/// A data source viewed with a concrete element type
#[derive(Debug, Clone, PartialEq)]
pub struct TypedDataSource<T> {
    name: String,
    records: Vec<T>,
}

impl<T> TypedDataSource<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("Data source name cannot be empty"));
    }
    Ok(())
}

fn encode_record<T: SourceRecord>(name: &str, value: &T) -> Result<Value, DomainError> {
    serde_json::to_value(value).map_err(|e| {
        DomainError::serialization(format!(
            "Failed to encode record for data source '{}': {}",
            name, e
        ))
    })
}
