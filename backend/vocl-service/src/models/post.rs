use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use super::AuthorSummary;

pub const MAX_MEDIA_PER_POST: usize = 10;

/// Post kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Text,
    Image,
    Video,
    Link,
    Audio,
    Gif,
    Reblog,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Link => "link",
            Self::Audio => "audio",
            Self::Gif => "gif",
            Self::Reblog => "reblog",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "link" => Some(Self::Link),
            "audio" => Some(Self::Audio),
            "gif" => Some(Self::Gif),
            "reblog" => Some(Self::Reblog),
            _ => None,
        }
    }
}

/// Post status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Published,
    Scheduled,
    Draft,
    Deleted,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Scheduled => "scheduled",
            Self::Draft => "draft",
            Self::Deleted => "deleted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "published" => Some(Self::Published),
            "scheduled" => Some(Self::Scheduled),
            "draft" => Some(Self::Draft),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Post database entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub kind: String,
    pub body: Option<String>,
    pub media_urls: Json<Vec<String>>,
    pub video_embed: Option<String>,
    pub link_url: Option<String>,
    pub reblog_of: Option<Uuid>,
    pub status: String,
    /// Moderation state; never sent to clients
    #[serde(skip_serializing, default)]
    pub is_flagged: bool,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing, default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn get_kind(&self) -> PostKind {
        PostKind::from_str(&self.kind).unwrap_or(PostKind::Text)
    }

    pub fn get_status(&self) -> PostStatus {
        PostStatus::from_str(&self.status).unwrap_or(PostStatus::Draft)
    }

    pub fn is_visible(&self) -> bool {
        self.deleted_at.is_none() && self.get_status() == PostStatus::Published
    }
}

/// Post row joined with its author's profile
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    #[sqlx(flatten)]
    pub post: Post,
    pub author_username: String,
    pub author_display_name: Option<String>,
    pub author_avatar_url: Option<String>,
}

impl PostRow {
    pub fn author(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.post.author_id,
            username: self.author_username.clone(),
            display_name: self.author_display_name.clone(),
            avatar_url: self.author_avatar_url.clone(),
        }
    }
}

/// Engagement counters and the viewer's own state for one post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostStats {
    pub like_count: i64,
    pub comment_count: i64,
    pub reblog_count: i64,
    pub viewer_liked: bool,
    pub viewer_reblogged: bool,
}

/// Post as returned by feed and detail endpoints
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorSummary,
    pub tags: Vec<String>,
    pub stats: PostStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    /// Pass back as `cursor` and `cursor_id` to fetch the next page
    pub next_cursor: Option<DateTime<Utc>>,
    pub next_cursor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedQuery {
    pub cursor: Option<DateTime<Utc>>,
    /// Id of the last item seen; breaks ties between equal timestamps
    pub cursor_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreatePostRequest {
    pub kind: String,
    #[validate(length(max = 5000))]
    pub body: Option<String>,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub media_urls: Vec<String>,
    pub video_url: Option<String>,
    #[validate(url)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_item_hides_moderation_fields() {
        let now = Utc::now();
        let item = FeedItem {
            post: Post {
                id: Uuid::new_v4(),
                author_id: Uuid::new_v4(),
                kind: "text".into(),
                body: Some("hello".into()),
                media_urls: Json(Vec::new()),
                video_embed: None,
                link_url: None,
                reblog_of: None,
                status: "published".into(),
                is_flagged: true,
                scheduled_for: None,
                published_at: Some(now),
                created_at: now,
                deleted_at: None,
            },
            author: AuthorSummary {
                id: Uuid::new_v4(),
                username: "alice".into(),
                display_name: None,
                avatar_url: None,
            },
            tags: vec!["jazz".into()],
            stats: PostStats::default(),
        };

        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("is_flagged").is_none());
        assert!(json.get("deleted_at").is_none());
        assert_eq!(json["body"], "hello");
        assert_eq!(json["author"]["username"], "alice");
        assert_eq!(json["stats"]["like_count"], 0);
    }
}
