//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from bm-core.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;

use bm_core::{Error, ListPage, ObjectStore, Result};

use crate::multipart::{MULTIPART_THRESHOLD, upload_parts};

/// How to reach one S3-compatible endpoint
#[derive(Debug, Clone)]
pub struct Connection {
    /// Endpoint URL, e.g. `http://localhost:9000`
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// Region identifier
    pub region: String,

    /// Use path-style bucket addressing
    pub path_style: bool,
}

/// S3 gateway: the ObjectStore implementation bm runs against
pub struct S3Gateway {
    inner: aws_sdk_s3::Client,
}

impl S3Gateway {
    /// Build a client for the given endpoint and credentials.
    pub async fn connect(conn: &Connection) -> Result<Self> {
        // Reject malformed endpoints before the SDK buries them in a
        // dispatch error on the first call.
        url::Url::parse(&conn.endpoint)?;

        let credentials = aws_credential_types::Credentials::new(
            conn.access_key.clone(),
            conn.secret_key.clone(),
            None, // session token
            None, // expiry
            "bm-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(conn.region.clone()))
            .endpoint_url(&conn.endpoint)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(conn.path_style)
            .build();

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

#[async_trait]
impl ObjectStore for S3Gateway {
    async fn list_page(&self, bucket: &str, token: Option<String>) -> Result<ListPage> {
        let mut request = self.inner.list_objects_v2().bucket(bucket);
        if let Some(token) = token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_owned))
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_owned)
        } else {
            None
        };

        Ok(ListPage { keys, next_token })
    }

    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<u64> {
        let size = tokio::fs::metadata(path).await?.len();

        let content_type: Option<String> = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());

        if size >= MULTIPART_THRESHOLD {
            upload_parts(&self.inner, bucket, key, path, size, content_type.as_deref()).await?;
            return Ok(size);
        }

        // Reading through tokio::fs keeps the io::ErrorKind intact, which is
        // what the upload worker's transient classification runs on.
        let data = tokio::fs::read(path).await?;

        let mut request = self
            .inner
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type.as_deref() {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(size)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_malformed_endpoint() {
        let conn = Connection {
            endpoint: "not a url".into(),
            access_key: "ak".into(),
            secret_key: "sk".into(),
            region: "us-east-1".into(),
            path_style: true,
        };
        let result = S3Gateway::connect(&conn).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_connect_accepts_custom_endpoint() {
        let conn = Connection {
            endpoint: "http://localhost:9000".into(),
            access_key: "ak".into(),
            secret_key: "sk".into(),
            region: "us-east-1".into(),
            path_style: true,
        };
        // No network traffic happens until a request is sent.
        assert!(S3Gateway::connect(&conn).await.is_ok());
    }
}
