/// Profile service - public profiles, self-service edits, username checks
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::db::profile_repo::{self, ProfileChanges};
use crate::error::{AppError, Result};
use crate::models::{Profile, ProfileResponse, UpdateProfileRequest, UsernameAvailability};
use crate::services::load_active_profile;
use crate::services::moderation::{ModerationGate, CONTENT_VIOLATION};
use crate::utils::text::{validate_bio, validate_display_name};
use crate::utils::username::{normalize_username, validate_username};

pub const USERNAME_TAKEN: &str = "Username is taken";

/// An http(s) image URL, or `""` to clear the current one
fn image_url_change(raw: &str, field: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(AppError::Validation(format!("{} must be an http(s) URL", field))),
    }
}

/// Validate and normalize the fields of an update request.
///
/// Uniqueness and moderation need the database and run afterwards.
pub fn prepare_changes(req: &UpdateProfileRequest) -> Result<ProfileChanges> {
    req.validate()?;

    let username = match &req.username {
        Some(raw) => {
            let normalized = normalize_username(raw);
            validate_username(&normalized).map_err(|e| AppError::BadRequest(e.to_string()))?;
            Some(normalized)
        }
        None => None,
    };

    Ok(ProfileChanges {
        username,
        display_name: req.display_name.as_deref().map(validate_display_name).transpose()?,
        bio: req.bio.as_deref().map(validate_bio).transpose()?,
        avatar_url: req
            .avatar_url
            .as_deref()
            .map(|u| image_url_change(u, "avatar_url"))
            .transpose()?,
        header_url: req
            .header_url
            .as_deref()
            .map(|u| image_url_change(u, "header_url"))
            .transpose()?,
        email_notifications: req.email_notifications,
    })
}

#[derive(Clone)]
pub struct ProfileService {
    pool: PgPool,
    moderation: ModerationGate,
}

impl ProfileService {
    pub fn new(pool: PgPool, moderation: ModerationGate) -> Self {
        Self { pool, moderation }
    }

    async fn with_counts(&self, profile: Profile, viewer: Option<Uuid>) -> Result<ProfileResponse> {
        let (follower_count, following_count, post_count, viewer_follows) =
            profile_repo::profile_counts(&self.pool, profile.id, viewer).await?;

        Ok(ProfileResponse {
            profile,
            follower_count,
            following_count,
            post_count,
            viewer_follows,
        })
    }

    /// Public profile by username; banned accounts are hidden
    pub async fn get_profile(&self, username: &str, viewer: Option<Uuid>) -> Result<ProfileResponse> {
        let profile = profile_repo::find_by_username(&self.pool, &normalize_username(username))
            .await?
            .filter(|p| !p.is_banned || Some(p.id) == viewer)
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

        self.with_counts(profile, viewer).await
    }

    pub async fn me(&self, user_id: Uuid) -> Result<ProfileResponse> {
        let profile = profile_repo::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Profile not found".into()))?;

        self.with_counts(profile, Some(user_id)).await
    }

    pub async fn update_profile(&self, user_id: Uuid, req: &UpdateProfileRequest) -> Result<Profile> {
        let current = load_active_profile(&self.pool, user_id).await?;
        let mut changes = prepare_changes(req)?;

        if changes.username.as_deref() == Some(current.username.as_str()) {
            changes.username = None;
        }
        if let Some(username) = &changes.username {
            if profile_repo::username_taken(&self.pool, username, Some(user_id)).await? {
                return Err(AppError::Conflict(USERNAME_TAKEN.into()));
            }
        }

        if let Some(bio) = &changes.bio {
            let verdict = self.moderation.check(bio).await;
            if verdict.flagged {
                tracing::info!(user_id = %user_id, "Bio rejected by moderation");
                return Err(AppError::BadRequest(CONTENT_VIOLATION.into()));
            }
        }

        let updated = profile_repo::update_profile(&self.pool, user_id, &changes)
            .await
            .map_err(|e| match AppError::from(e) {
                // Lost a race with another signup for the same name
                AppError::Conflict(_) => AppError::Conflict(USERNAME_TAKEN.into()),
                other => other,
            })?;

        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(updated)
    }

    /// Whether `raw` could be claimed by `viewer` (or anyone, when `None`)
    pub async fn check_username_availability(
        &self,
        raw: &str,
        viewer: Option<Uuid>,
    ) -> Result<UsernameAvailability> {
        let username = normalize_username(raw);
        if let Err(e) = validate_username(&username) {
            return Ok(UsernameAvailability {
                available: false,
                reason: Some(e.to_string()),
            });
        }

        if profile_repo::username_taken(&self.pool, &username, viewer).await? {
            return Ok(UsernameAvailability {
                available: false,
                reason: Some(USERNAME_TAKEN.into()),
            });
        }

        Ok(UsernameAvailability {
            available: true,
            reason: None,
        })
    }
}
