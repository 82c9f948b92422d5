//! Object storage abstractions.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use url::Url;

use crate::{Error, Result};

/// Bucket and key addressed by an `s3://bucket/key` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

impl std::str::FromStr for S3Location {
    type Err = Error;

    fn from_str(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| Error::Configuration(format!("invalid S3 URI {}: {}", uri, e)))?;
        if !matches!(url.scheme(), "s3" | "s3n" | "s3a") {
            return Err(Error::Configuration(format!(
                "expected an s3:// URI, got {}",
                uri
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::Configuration(format!("S3 URI has no bucket: {}", uri)));
        }

        // Keys are taken verbatim: no percent-encoding and no `#` fragment.
        let rest = uri
            .split_once("://")
            .map(|(_, rest)| rest)
            .ok_or_else(|| Error::Configuration(format!("invalid S3 URI {}", uri)))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.trim_matches('/').to_string(),
        })
    }
}

/// Join path segments onto a base URI with exactly one `/` between them.
pub fn join_uri(base: &str, segments: &[&str]) -> String {
    let mut uri = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        uri.push('/');
        uri.push_str(segment);
    }
    uri
}

/// Remote object store holding code artifacts and job logs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download an object. Fails with [`Error::ObjectNotFound`] if it does not exist.
    async fn get_object(&self, uri: &str) -> Result<Bytes>;

    async fn object_exists(&self, uri: &str) -> Result<bool>;

    /// Upload a local file to `uri`.
    async fn put_file(&self, local: &Path, uri: &str) -> Result<()>;
}
