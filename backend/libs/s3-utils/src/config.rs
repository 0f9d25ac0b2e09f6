/// Object storage configuration
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    /// Bucket name
    pub bucket: String,
    /// AWS region (or any value accepted by an S3-compatible store)
    pub region: String,
    /// Custom endpoint for S3-compatible stores (R2, MinIO); forces path-style URLs
    pub endpoint: Option<String>,
    /// Base URL objects are served from once uploaded
    pub public_base_url: String,
    /// Presigned URL expiration in seconds
    pub presigned_url_expiration_secs: u64,
}

impl S3Config {
    /// Load storage configuration from environment variables
    pub fn from_env() -> Self {
        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "vocl-media".to_string());
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let endpoint = std::env::var("S3_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let public_base_url = std::env::var("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("https://{}.s3.{}.amazonaws.com", bucket, region));

        Self {
            bucket,
            region,
            endpoint,
            public_base_url,
            presigned_url_expiration_secs: std::env::var("S3_PRESIGNED_URL_EXPIRATION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
        }
    }

    /// Public URL of an object once uploaded
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            key.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str) -> S3Config {
        S3Config {
            bucket: "test-bucket".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            public_base_url: base.to_string(),
            presigned_url_expiration_secs: 600,
        }
    }

    #[test]
    fn test_public_url_joins_without_double_slash() {
        let cfg = config("https://media.vocl.test/");
        assert_eq!(
            cfg.public_url("/user/abc.png"),
            "https://media.vocl.test/user/abc.png"
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_defaults() {
        for key in ["S3_BUCKET", "AWS_REGION", "S3_ENDPOINT", "S3_PUBLIC_BASE_URL", "S3_PRESIGNED_URL_EXPIRATION"] {
            std::env::remove_var(key);
        }

        let cfg = S3Config::from_env();
        assert_eq!(cfg.bucket, "vocl-media");
        assert_eq!(cfg.endpoint, None);
        assert_eq!(cfg.public_base_url, "https://vocl-media.s3.us-east-1.amazonaws.com");
        assert_eq!(cfg.presigned_url_expiration_secs, 600);
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_blank_endpoint_is_none() {
        std::env::set_var("S3_ENDPOINT", "  ");
        assert_eq!(S3Config::from_env().endpoint, None);
        std::env::remove_var("S3_ENDPOINT");
    }
}
