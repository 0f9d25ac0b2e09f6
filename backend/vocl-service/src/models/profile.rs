use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::Role;

/// Profile database entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub header_url: Option<String>,
    #[serde(skip_serializing)]
    pub email: Option<String>,
    pub email_notifications: bool,
    pub role: i16,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn role(&self) -> Role {
        Role::from_level(self.role)
    }
}

/// Author fields attached to posts, comments and notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Public profile with follow counts
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    pub viewer_follows: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    /// An empty string clears the image
    pub avatar_url: Option<String>,
    pub header_url: Option<String>,
    pub email_notifications: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsernameAvailability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
