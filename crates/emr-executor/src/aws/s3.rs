use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use emr_core::storage::{ObjectStore, S3Location};
use emr_core::{Error, Result};
use std::path::Path;
use tracing::debug;

use super::describe;

/// Object store backed by Amazon S3.
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(config: &SdkConfig) -> Self {
        Self::with_client(Client::new(config))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_object(&self, uri: &str) -> Result<Bytes> {
        let location: S3Location = uri.parse()?;
        let response = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    Error::ObjectNotFound(uri.to_string())
                } else {
                    Error::Remote(format!("failed to read {}: {}", uri, describe(e)))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Remote(format!("failed to read body of {}: {}", uri, e)))?
            .into_bytes();
        debug!(uri, size = data.len(), "Downloaded object");
        Ok(data)
    }

    async fn object_exists(&self, uri: &str) -> Result<bool> {
        let location: S3Location = uri.parse()?;
        match self
            .client
            .head_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(Error::Remote(format!("failed to check {}: {}", uri, describe(e)))),
        }
    }

    async fn put_file(&self, local: &Path, uri: &str) -> Result<()> {
        let location: S3Location = uri.parse()?;
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| Error::Io(std::io::Error::other(format!("{}: {}", local.display(), e))))?;

        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("failed to upload {}: {}", uri, describe(e))))?;
        Ok(())
    }
}
