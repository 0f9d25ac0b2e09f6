use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Reblog,
    Follow,
    Mention,
    Message,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Reblog => "reblog",
            Self::Follow => "follow",
            Self::Mention => "mention",
            Self::Message => "message",
            Self::System => "system",
        }
    }
}

/// Notification database entity
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub kind: String,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub message: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification joined with the acting profile, if any
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct NotificationView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub notification: Notification,
    pub actor_username: Option<String>,
    pub actor_avatar_url: Option<String>,
}

/// Fields of a notification to insert
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub message: Option<String>,
}

impl NewNotification {
    pub fn new(recipient_id: Uuid, actor_id: Option<Uuid>, kind: NotificationKind) -> Self {
        Self {
            recipient_id,
            actor_id,
            kind,
            post_id: None,
            comment_id: None,
            message: None,
        }
    }

    pub fn with_post(mut self, post_id: Uuid) -> Self {
        self.post_id = Some(post_id);
        self
    }

    pub fn with_comment(mut self, comment_id: Option<Uuid>) -> Self {
        self.comment_id = comment_id;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Nobody is notified about their own actions
    pub fn is_self_notification(&self) -> bool {
        self.actor_id == Some(self.recipient_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub cursor: Option<DateTime<Utc>>,
    /// Id of the last item seen; breaks ties between equal timestamps
    pub cursor_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MarkReadRequest {
    #[validate(length(min = 1, max = 100))]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MessageNotificationRequest {
    pub recipient_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub preview: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: i64,
}
