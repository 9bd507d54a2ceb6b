//! Object storage entity types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Access level applied to an uploaded object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectVisibility {
    /// Readable only by the bucket owner
    #[default]
    Private,

    /// Readable by anyone
    PublicRead,
}

impl fmt::Display for ObjectVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::PublicRead => write!(f, "public-read"),
        }
    }
}

/// A single object upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Full object key, `{bucket}/{path}`
    pub key: String,

    /// Encoded object body
    pub body: Vec<u8>,

    /// MIME type of the body
    pub content_type: String,

    /// Access level for the object
    pub visibility: ObjectVisibility,
}

impl UploadRequest {
    pub fn new(key: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            body,
            content_type: "application/octet-stream".to_string(),
            visibility: ObjectVisibility::default(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_visibility(mut self, visibility: ObjectVisibility) -> Self {
        self.visibility = visibility;
        self
    }
}

/// An object as held by a storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub visibility: ObjectVisibility,
}

impl From<UploadRequest> for StoredObject {
    fn from(request: UploadRequest) -> Self {
        Self {
            body: request.body,
            content_type: request.content_type,
            visibility: request.visibility,
        }
    }
}
