use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::AuthorSummary;

/// Comment database entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing, default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Comment joined with its author
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentRow {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: AuthorSummary,
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        Self {
            author: AuthorSummary {
                id: row.comment.author_id,
                username: row.author_username,
                display_name: row.author_display_name,
                avatar_url: row.author_avatar_url,
            },
            comment: row.comment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000))]
    pub body: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReblogRequest {
    #[validate(length(max = 5000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FollowResponse {
    pub following: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentQuery {
    pub cursor: Option<DateTime<Utc>>,
    /// Id of the last item seen; breaks ties between equal timestamps
    pub cursor_id: Option<Uuid>,
    pub limit: Option<i64>,
}
