use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request for a presigned media upload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UploadUrlRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(length(min = 1, max = 100))]
    pub content_type: String,
    /// Size in bytes
    #[validate(range(min = 1))]
    pub size: u64,
}
