use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Data source '{name}' not found")]
    DataSourceNotFound { name: String },

    #[error("Data source '{name}' holds '{actual}' records, not '{expected}'")]
    ElementTypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn data_source_not_found(name: impl Into<String>) -> Self {
        Self::DataSourceNotFound { name: name.into() }
    }

    pub fn element_type_mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ElementTypeMismatch {
            name: name.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Returns true when the error reports a missing object or data source
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::DataSourceNotFound { .. })
    }
}
