//! Object-storage seam. The pipeline talks to `ObjectStore` so tests can
//! substitute an in-memory fake; production wires in `S3Store` (MinIO local,
//! AWS in production).

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("storage error: {0}")]
    Other(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Public URL for a stored object. Purely syntactic — does not check
    /// that the object exists.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// S3-backed store. `endpoint` is the externally reachable base URL used to
/// build public links (MinIO endpoint locally, CDN/base URL in production).
pub struct S3Store {
    client: S3Client,
    endpoint: String,
}

impl S3Store {
    pub fn new(client: S3Client, endpoint: String) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StoreError::Other(format!("put {bucket}/{key}: {e}")))?;
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    StoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StoreError::Other(format!("get {bucket}/{key}: {service_err}"))
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Other(format!("read body {bucket}/{key}: {e}")))?;
        Ok(data.into_bytes().to_vec())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key)
    }
}
