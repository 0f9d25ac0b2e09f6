/// Presigned uploads and object management
use crate::{config::S3Config, S3Error};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// A signed PUT the client performs directly against object storage
#[derive(Debug, Clone, Serialize)]
pub struct PresignedUpload {
    pub upload_url: String,
    pub public_url: String,
    pub key: String,
    pub expires_in_secs: u64,
}

#[derive(Clone)]
pub struct S3Operations {
    client: Arc<Client>,
    config: S3Config,
}

impl S3Operations {
    pub fn new(client: Arc<Client>, config: S3Config) -> Self {
        Self { client, config }
    }

    /// Generate a presigned PUT for `key`.
    ///
    /// Content type and length are part of the signature, so the upload must
    /// match them exactly.
    pub async fn presigned_upload(
        &self,
        key: &str,
        content_type: &str,
        content_length: u64,
    ) -> Result<PresignedUpload, S3Error> {
        let expires_in = self.config.presigned_url_expiration_secs;
        let presigning = PresigningConfig::builder()
            .expires_in(Duration::from_secs(expires_in))
            .build()
            .map_err(|e| S3Error::Presign(e.to_string()))?;

        let request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(content_length as i64)
            .presigned(presigning)
            .await
            .map_err(|e| S3Error::Presign(e.to_string()))?;

        tracing::debug!(key = %key, content_type = %content_type, "Generated presigned upload");

        Ok(PresignedUpload {
            upload_url: request.uri().to_string(),
            public_url: self.config.public_url(key),
            key: key.to_string(),
            expires_in_secs: expires_in,
        })
    }
}

