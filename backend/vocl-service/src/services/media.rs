/// Media service - presigned uploads to object storage
use actix_middleware::{RateLimitConfig, RateLimiter};
use s3_utils::{PresignedUpload, S3Operations};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::UploadUrlRequest;
use crate::services::enforce_rate_limit;

const MIB: u64 = 1024 * 1024;
pub const MAX_IMAGE_SIZE: u64 = 10 * MIB;
pub const MAX_AUDIO_SIZE: u64 = 50 * MIB;
pub const MAX_VIDEO_SIZE: u64 = 100 * MIB;

/// Allowed MIME types and the extension used for their object keys
const ALLOWED_CONTENT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("audio/mpeg", "mp3"),
    ("audio/mp4", "m4a"),
    ("audio/wav", "wav"),
    ("audio/ogg", "ogg"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn max_size(self) -> u64 {
        match self {
            MediaKind::Image => MAX_IMAGE_SIZE,
            MediaKind::Audio => MAX_AUDIO_SIZE,
            MediaKind::Video => MAX_VIDEO_SIZE,
        }
    }
}

/// Validated upload, ready to be presigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub key: String,
    pub content_type: String,
    pub kind: MediaKind,
    pub size: u64,
}

/// Check type and size and pick an object key `{user_id}/{uuid}.{ext}`
pub fn plan_upload(user_id: Uuid, content_type: &str, size: u64) -> Result<UploadPlan> {
    let content_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = ALLOWED_CONTENT_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| AppError::BadRequest("File type not allowed".into()))?;

    let kind = match content_type.split('/').next() {
        Some("video") => MediaKind::Video,
        Some("audio") => MediaKind::Audio,
        _ => MediaKind::Image,
    };

    if size == 0 {
        return Err(AppError::BadRequest("File is empty".into()));
    }
    if size > kind.max_size() {
        return Err(AppError::BadRequest(format!(
            "File too large: maximum is {} MB",
            kind.max_size() / MIB
        )));
    }

    Ok(UploadPlan {
        key: format!("{}/{}.{}", user_id, Uuid::new_v4(), ext),
        content_type,
        kind,
        size,
    })
}

#[derive(Clone)]
pub struct MediaService {
    storage: Option<S3Operations>,
    limiter: RateLimiter,
}

impl MediaService {
    /// `storage` is `None` when object storage is not configured
    pub fn new(storage: Option<S3Operations>, limiter: RateLimiter) -> Self {
        Self { storage, limiter }
    }

    pub async fn request_upload(&self, user_id: Uuid, req: &UploadUrlRequest) -> Result<PresignedUpload> {
        req.validate()?;
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| AppError::ExternalService("Media storage is not configured".into()))?;

        enforce_rate_limit(&self.limiter, "upload", user_id, &RateLimitConfig::upload())?;
        let plan = plan_upload(user_id, &req.content_type, req.size)?;

        let upload = storage
            .presigned_upload(&plan.key, &plan.content_type, plan.size)
            .await?;

        tracing::info!(
            user_id = %user_id,
            key = %plan.key,
            size = plan.size,
            "Issued presigned upload"
        );
        Ok(upload)
    }
}
