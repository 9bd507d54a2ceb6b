//! AWS S3 object storage implementation

use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, ServerSideEncryption};
use tracing::debug;

use crate::config::S3Settings;
use crate::domain::DomainError;
use crate::domain::storage::{ObjectStorage, ObjectVisibility, UploadRequest};

#[cfg(test)]
use mockall::automock;

/// One page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct S3ListPage {
    /// Object keys relative to the bucket
    pub keys: Vec<String>,
    pub next_continuation_token: Option<String>,
}

/// Upload passed to the S3 client
#[derive(Debug, Clone, PartialEq)]
pub struct S3PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub visibility: ObjectVisibility,
    pub kms_key_id: Option<String>,
}

/// S3 client trait for dependency injection
#[cfg_attr(test, automock)]
#[async_trait]
pub trait S3ClientTrait: Send + Sync {
    async fn list_object_keys(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<S3ListPage, DomainError>;

    /// Object body, or `None` when the key does not exist
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, DomainError>;

    async fn put_object(&self, request: S3PutObject) -> Result<(), DomainError>;
}

/// Object storage backed by S3
///
/// Keys are `{bucket}/{object key}`; the first path segment names the bucket.
pub struct S3ObjectStorage<C: S3ClientTrait> {
    client: C,
    kms_key_id: Option<String>,
}

impl<C: S3ClientTrait> S3ObjectStorage<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            kms_key_id: None,
        }
    }

    /// Encrypt uploads with the given KMS key
    pub fn with_kms_key_id(mut self, kms_key_id: impl Into<String>) -> Self {
        self.kms_key_id = Some(kms_key_id.into());
        self
    }
}

impl<C: S3ClientTrait> fmt::Debug for S3ObjectStorage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ObjectStorage")
            .field("kms_key_id", &self.kms_key_id)
            .finish_non_exhaustive()
    }
}

/// Split a full key into bucket and object key
fn split_key(key: &str) -> Result<(&str, &str), DomainError> {
    match key.split_once('/') {
        Some((bucket, object_key)) if !bucket.is_empty() && !object_key.is_empty() => {
            Ok((bucket, object_key))
        }
        _ => Err(DomainError::validation(format!(
            "Object key '{}' must be of the form '{{bucket}}/{{key}}'",
            key
        ))),
    }
}

/// Split a listing prefix into bucket and key prefix
fn split_prefix(prefix: &str) -> Result<(&str, &str), DomainError> {
    let (bucket, key_prefix) = prefix.split_once('/').unwrap_or((prefix, ""));

    if bucket.is_empty() {
        return Err(DomainError::validation(format!(
            "Listing prefix '{}' does not name a bucket",
            prefix
        )));
    }

    Ok((bucket, key_prefix))
}

#[async_trait]
impl<C: S3ClientTrait> ObjectStorage for S3ObjectStorage<C> {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, DomainError> {
        let (bucket, key_prefix) = split_prefix(prefix)?;
        let mut keys = Vec::new();
        let mut token = None;

        loop {
            let page = self
                .client
                .list_object_keys(bucket, key_prefix, token)
                .await?;

            keys.extend(
                page.keys
                    .into_iter()
                    .map(|key| format!("{}/{}", bucket, key)),
            );

            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        debug!(bucket, prefix = key_prefix, count = keys.len(), "Listed S3 objects");
        Ok(keys)
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, DomainError> {
        let (bucket, object_key) = split_key(key)?;

        self.client
            .get_object(bucket, object_key)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Object '{}' not found", key)))
    }

    async fn upload(&self, request: UploadRequest) -> Result<(), DomainError> {
        let (bucket, object_key) = split_key(&request.key)?;

        let put = S3PutObject {
            bucket: bucket.to_string(),
            key: object_key.to_string(),
            body: request.body,
            content_type: request.content_type,
            visibility: request.visibility,
            kms_key_id: self.kms_key_id.clone(),
        };

        self.client.put_object(put).await
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

/// Real S3 client wrapper
#[derive(Debug, Clone)]
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    /// Build a client from the default AWS provider chain and the S3 settings
    pub async fn from_settings(settings: &S3Settings) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style);
        if let Some(endpoint_url) = &settings.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        }
    }

    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

fn canned_acl(visibility: ObjectVisibility) -> ObjectCannedAcl {
    match visibility {
        ObjectVisibility::Private => ObjectCannedAcl::Private,
        ObjectVisibility::PublicRead => ObjectCannedAcl::PublicRead,
    }
}

#[async_trait]
impl S3ClientTrait for S3Client {
    async fn list_object_keys(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<S3ListPage, DomainError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(|e| {
                DomainError::storage(format!("S3 list error: {}", DisplayErrorContext(&e)))
            })?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();

        let next_continuation_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(S3ListPage {
            keys,
            next_continuation_token,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, DomainError> {
        let response = self.client.get_object().bucket(bucket).key(key).send().await;

        let output = match response {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(DomainError::storage(format!(
                    "S3 download error: {}",
                    DisplayErrorContext(&e)
                )));
            }
        };

        let body = output.body.collect().await.map_err(|e| {
            DomainError::storage(format!("Failed to read S3 object body: {}", e))
        })?;

        Ok(Some(body.into_bytes().to_vec()))
    }

    async fn put_object(&self, request: S3PutObject) -> Result<(), DomainError> {
        let mut put = self
            .client
            .put_object()
            .bucket(request.bucket)
            .key(request.key)
            .body(ByteStream::from(request.body))
            .content_type(request.content_type)
            .acl(canned_acl(request.visibility));

        if let Some(kms_key_id) = request.kms_key_id {
            put = put
                .server_side_encryption(ServerSideEncryption::AwsKms)
                .ssekms_key_id(kms_key_id);
        }

        put.send().await.map_err(|e| {
            DomainError::storage(format!("S3 upload error: {}", DisplayErrorContext(&e)))
        })?;

        Ok(())
    }
}
