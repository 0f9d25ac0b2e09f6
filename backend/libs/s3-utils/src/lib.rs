/// Object storage helpers for vocl services
///
/// Wraps the AWS SDK client with the bucket configuration and exposes the
/// presigned-upload flow used for media.
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use std::sync::Arc;
use thiserror::Error;

pub mod config;
pub mod operations;

pub use config::S3Config;
pub use operations::{PresignedUpload, S3Operations};

#[derive(Debug, Error)]
pub enum S3Error {
    #[error("Failed to presign request: {0}")]
    Presign(String),
}

/// Shared S3 client wrapper
#[derive(Clone)]
pub struct S3Client {
    client: Arc<Client>,
    config: S3Config,
}

impl S3Client {
    /// Create a client for `config`, using credentials from the environment
    pub async fn new(config: S3Config) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self {
            client: Arc::new(Client::from_conf(builder.build())),
            config,
        }
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    pub fn operations(&self) -> S3Operations {
        S3Operations::new(self.client.clone(), self.config.clone())
    }
}
