/// Business logic for vocl-service
///
/// Services own a pool handle plus the collaborators they need and are built
/// once at startup into `AppState`.
pub mod email;
pub mod engagement;
pub mod gifs;
pub mod media;
pub mod moderation;
pub mod music;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod reports;

pub use email::{Mailer, NoopMailer, SmtpMailer};
pub use engagement::EngagementService;
pub use gifs::GifClient;
pub use media::MediaService;
pub use moderation::{ModerationGate, ModerationProvider, ModerationVerdict};
pub use music::MusicClient;
pub use notifications::NotificationService;
pub use posts::PostService;
pub use profiles::ProfileService;
pub use reports::ReportService;

use actix_middleware::rate_limit::RATE_LIMIT_REJECTIONS;
use actix_middleware::{RateLimitConfig, RateLimiter};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::profile_repo;
use crate::error::{AppError, Result};
use crate::models::Profile;

/// Load the caller's profile and refuse banned accounts
pub async fn load_active_profile(pool: &PgPool, user_id: Uuid) -> Result<Profile> {
    let profile = profile_repo::find_by_id(pool, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Profile not found".into()))?;

    if profile.is_banned {
        return Err(AppError::Forbidden("Account is banned".into()));
    }
    Ok(profile)
}

/// Per-user limit for one action; the key namespace is `bucket`
pub fn enforce_rate_limit(
    limiter: &RateLimiter,
    bucket: &'static str,
    user_id: Uuid,
    config: &RateLimitConfig,
) -> Result<()> {
    let key = format!("{}:user:{}", bucket, user_id);
    let decision = limiter.check(&key, config);
    if decision.allowed {
        return Ok(());
    }

    RATE_LIMIT_REJECTIONS.with_label_values(&[bucket]).inc();
    tracing::warn!(user_id = %user_id, bucket = bucket, "Action rate limit exceeded");
    Err(AppError::RateLimited {
        retry_after_secs: decision.reset_after.as_secs().max(1),
    })
}
