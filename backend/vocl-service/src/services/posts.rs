/// Post service - creation, retrieval, deletion, feeds and scheduled publishing
use actix_middleware::{RateLimitConfig, RateLimiter};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::db::{audit_repo, post_repo, stats_repo, tag_repo};
use crate::db::post_repo::{FeedCursor, NewPost};
use crate::error::{AppError, Result};
use crate::metrics::SCHEDULED_POSTS_PUBLISHED;
use crate::middleware::check_content_removal;
use crate::models::{
    AuthorSummary, CreatePostRequest, FeedItem, FeedPage, FeedQuery, PostKind, PostRow, PostStatus,
};
use crate::services::moderation::ModerationGate;
use crate::services::notifications::NotificationService;
use crate::services::{enforce_rate_limit, load_active_profile};
use crate::utils::clamp_limit;
use crate::utils::embeds::parse_video_url;
use crate::utils::text::{normalize_tags, validate_post_body};

/// A validated post ready to insert, with its normalized tags
#[derive(Debug, Clone)]
pub struct PreparedPost {
    pub post: NewPost,
    pub tags: Vec<String>,
}

fn parse_media_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(AppError::Validation(format!("Invalid media URL: {}", trimmed))),
    }
}

/// Validate a create request and decide its kind-specific fields and status
pub fn prepare_post(author_id: Uuid, req: &CreatePostRequest, now: DateTime<Utc>) -> Result<PreparedPost> {
    let kind = PostKind::from_str(req.kind.trim().to_ascii_lowercase().as_str())
        .ok_or_else(|| AppError::Validation(format!("Invalid post kind: {}", req.kind)))?;

    let body = req
        .body
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string);
    if let Some(body) = &body {
        validate_post_body(body)?;
    }

    let media_urls = req
        .media_urls
        .iter()
        .map(|u| parse_media_url(u))
        .collect::<Result<Vec<_>>>()?;

    let mut video_embed = None;
    let mut link_url = None;
    match kind {
        PostKind::Text => {
            if body.is_none() {
                return Err(AppError::Validation("Text posts need a body".into()));
            }
        }
        PostKind::Image | PostKind::Audio | PostKind::Gif => {
            if media_urls.is_empty() {
                return Err(AppError::Validation(format!(
                    "{} posts need at least one media URL",
                    kind.as_str()
                )));
            }
        }
        PostKind::Video => match req.video_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => {
                let embed = parse_video_url(url)
                    .ok_or_else(|| AppError::Validation("Unsupported video link".into()))?;
                video_embed = Some(embed.embed_url);
            }
            None if media_urls.is_empty() => {
                return Err(AppError::Validation(
                    "Video posts need a video link or an uploaded video".into(),
                ));
            }
            None => {}
        },
        PostKind::Link => {
            let url = req
                .link_url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .ok_or_else(|| AppError::Validation("Link posts need a URL".into()))?;
            link_url = Some(parse_media_url(url)?);
        }
        PostKind::Reblog => {
            return Err(AppError::Validation(
                "Reblogs are created from the original post".into(),
            ))
        }
    }

    let tags = normalize_tags(&req.tags)?;

    let (status, scheduled_for) = match req.scheduled_for {
        Some(at) if at > now => (PostStatus::Scheduled, Some(at)),
        _ => (PostStatus::Published, None),
    };

    Ok(PreparedPost {
        post: NewPost {
            author_id,
            kind: kind.as_str().to_string(),
            body,
            media_urls,
            video_embed,
            link_url,
            reblog_of: None,
            status: status.as_str().to_string(),
            scheduled_for,
        },
        tags,
    })
}

/// Cursor for the next page: the last item's publish time and id, if the page was full
fn next_cursor(items: &[FeedItem], limit: i64) -> Option<(DateTime<Utc>, Uuid)> {
    if (items.len() as i64) < limit {
        return None;
    }
    items
        .last()
        .and_then(|item| item.post.published_at.map(|at| (at, item.post.id)))
}

fn feed_cursor(query: &FeedQuery) -> FeedCursor {
    FeedCursor {
        at: query.cursor,
        id: query.cursor_id,
    }
}

#[derive(Clone)]
pub struct PostService {
    pool: PgPool,
    moderation: ModerationGate,
    notifications: NotificationService,
    limiter: RateLimiter,
}

impl PostService {
    pub fn new(
        pool: PgPool,
        moderation: ModerationGate,
        notifications: NotificationService,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            pool,
            moderation,
            notifications,
            limiter,
        }
    }

    /// Create a post, published now or scheduled for later
    pub async fn create_post(&self, author_id: Uuid, req: &CreatePostRequest) -> Result<FeedItem> {
        req.validate()?;
        let author = load_active_profile(&self.pool, author_id).await?;
        enforce_rate_limit(&self.limiter, "post_create", author_id, &RateLimitConfig::post_create())?;

        let prepared = prepare_post(author_id, req, Utc::now())?;

        let mut tx = self.pool.begin().await?;
        let mut post = post_repo::insert_post(&mut *tx, &prepared.post).await?;
        tag_repo::attach_tags(&mut *tx, post.id, &prepared.tags).await?;
        tx.commit().await?;

        tracing::info!(
            post_id = %post.id,
            author_id = %author_id,
            kind = %post.kind,
            status = %post.status,
            "Post created"
        );

        if post.get_status() == PostStatus::Published {
            let text = post.body.clone().unwrap_or_default();
            if self.after_publish(author_id, post.id, &text).await {
                post.is_flagged = true;
            }
        }

        Ok(FeedItem {
            author: AuthorSummary {
                id: author.id,
                username: author.username,
                display_name: author.display_name,
                avatar_url: author.avatar_url,
            },
            post,
            tags: prepared.tags,
            stats: Default::default(),
        })
    }

    /// Moderation review and mention fan-out for a just-published post.
    /// Returns whether the post was flagged.
    async fn after_publish(&self, author_id: Uuid, post_id: Uuid, text: &str) -> bool {
        let flagged = match self
            .moderation
            .review_post(&self.pool, author_id, post_id, text)
            .await
        {
            Ok(verdict) => verdict.flagged,
            Err(e) => {
                tracing::warn!(post_id = %post_id, error = %e, "Failed to record moderation review");
                false
            }
        };

        if let Err(e) = self
            .notifications
            .notify_mentions(author_id, post_id, None, text)
            .await
        {
            tracing::warn!(post_id = %post_id, error = %e, "Mention fan-out failed");
        }

        flagged
    }

    /// Get a post with author, tags and stats.
    ///
    /// Scheduled and draft posts are only visible to their author.
    pub async fn get_post(&self, post_id: Uuid, viewer: Option<Uuid>) -> Result<FeedItem> {
        let row = post_repo::find_post_row(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

        let owner_preview = row.post.deleted_at.is_none() && viewer == Some(row.post.author_id);
        if !row.post.is_visible() && !owner_preview {
            return Err(AppError::NotFound("Post not found".into()));
        }

        let mut items = self.assemble(vec![row], viewer).await?;
        items
            .pop()
            .ok_or_else(|| AppError::NotFound("Post not found".into()))
    }

    /// Soft delete by the author or a moderator; moderator removals are audited
    pub async fn delete_post(&self, actor_id: Uuid, post_id: Uuid) -> Result<()> {
        let actor = crate::db::profile_repo::find_by_id(&self.pool, actor_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Profile not found".into()))?;
        let post = post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".into()))?;

        check_content_removal(actor_id, post.author_id, actor.role())?;

        let mut tx = self.pool.begin().await?;
        if !post_repo::soft_delete_post(&mut *tx, post_id).await? {
            return Err(AppError::NotFound("Post not found".into()));
        }
        if actor_id != post.author_id {
            audit_repo::insert_audit_log(
                &mut *tx,
                actor_id,
                "post.delete",
                "post",
                Some(post_id),
                serde_json::json!({ "author_id": post.author_id }),
            )
            .await?;
        }
        tx.commit().await?;

        tracing::info!(post_id = %post_id, actor_id = %actor_id, "Post deleted");
        Ok(())
    }

    /// Home feed: own posts plus followed accounts, newest first
    pub async fn feed(&self, viewer: Uuid, query: &FeedQuery) -> Result<FeedPage> {
        let limit = clamp_limit(query.limit);
        let rows = post_repo::home_feed(&self.pool, viewer, feed_cursor(query), limit).await?;
        self.page(rows, Some(viewer), limit).await
    }

    pub async fn explore(&self, viewer: Option<Uuid>, query: &FeedQuery) -> Result<FeedPage> {
        let limit = clamp_limit(query.limit);
        let rows = post_repo::explore_feed(&self.pool, feed_cursor(query), limit).await?;
        self.page(rows, viewer, limit).await
    }

    pub async fn tag_feed(&self, tag: &str, viewer: Option<Uuid>, query: &FeedQuery) -> Result<FeedPage> {
        let tag = crate::utils::text::normalize_tag(tag);
        if tag.is_empty() {
            return Err(AppError::Validation("Invalid tag".into()));
        }
        let limit = clamp_limit(query.limit);
        let rows = post_repo::tag_feed(&self.pool, &tag, feed_cursor(query), limit).await?;
        self.page(rows, viewer, limit).await
    }

    pub async fn user_posts(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        query: &FeedQuery,
    ) -> Result<FeedPage> {
        let username = crate::utils::username::normalize_username(username);
        let author = crate::db::profile_repo::find_by_username(&self.pool, &username)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

        let limit = clamp_limit(query.limit);
        let rows = post_repo::author_feed(&self.pool, author.id, feed_cursor(query), limit).await?;
        self.page(rows, viewer, limit).await
    }

    async fn page(&self, rows: Vec<PostRow>, viewer: Option<Uuid>, limit: i64) -> Result<FeedPage> {
        let items = self.assemble(rows, viewer).await?;
        let next = next_cursor(&items, limit);
        Ok(FeedPage {
            items,
            next_cursor: next.map(|(at, _)| at),
            next_cursor_id: next.map(|(_, id)| id),
        })
    }

    /// Attach tags and batched stats to a page of rows, preserving order
    async fn assemble(&self, rows: Vec<PostRow>, viewer: Option<Uuid>) -> Result<Vec<FeedItem>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.post.id).collect();
        let (mut stats, mut tags) = tokio::try_join!(
            stats_repo::fetch_post_stats(&self.pool, &ids, viewer),
            tag_repo::tags_for_posts(&self.pool, &ids),
        )?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.post.id;
                FeedItem {
                    author: row.author(),
                    post: row.post,
                    tags: tags.remove(&id).unwrap_or_default(),
                    stats: stats.remove(&id).unwrap_or_default(),
                }
            })
            .collect())
    }

    /// Publish every scheduled post due at `now`; returns their ids
    pub async fn publish_due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let posts = post_repo::publish_due(&self.pool, now).await?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        SCHEDULED_POSTS_PUBLISHED.inc_by(posts.len() as u64);
        tracing::info!(count = posts.len(), "Published scheduled posts");

        for post in &posts {
            let text = post.body.as_deref().unwrap_or_default();
            self.after_publish(post.author_id, post.id, text).await;
        }

        Ok(posts.into_iter().map(|p| p.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(kind: &str) -> CreatePostRequest {
        CreatePostRequest {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_text_post_requires_body() {
        let author = Uuid::new_v4();
        assert!(prepare_post(author, &request("text"), Utc::now()).is_err());

        let req = CreatePostRequest {
            body: Some("  hello #world  ".into()),
            ..request("text")
        };
        let prepared = prepare_post(author, &req, Utc::now()).unwrap();
        assert_eq!(prepared.post.body.as_deref(), Some("hello #world"));
        assert_eq!(prepared.post.status, "published");
        assert!(prepared.post.scheduled_for.is_none());
    }

    #[test]
    fn test_unknown_and_reblog_kinds_rejected() {
        let author = Uuid::new_v4();
        assert!(prepare_post(author, &request("story"), Utc::now()).is_err());

        let req = CreatePostRequest {
            body: Some("x".into()),
            ..request("reblog")
        };
        assert!(prepare_post(author, &req, Utc::now()).is_err());
    }

    #[test]
    fn test_image_post_needs_valid_media() {
        let author = Uuid::new_v4();
        assert!(prepare_post(author, &request("image"), Utc::now()).is_err());

        let bad = CreatePostRequest {
            media_urls: vec!["javascript:alert(1)".into()],
            ..request("image")
        };
        assert!(prepare_post(author, &bad, Utc::now()).is_err());

        let good = CreatePostRequest {
            media_urls: vec!["https://cdn.bevocl.app/u/1.png".into()],
            ..request("IMAGE")
        };
        assert_eq!(prepare_post(author, &good, Utc::now()).unwrap().post.kind, "image");
    }

    #[test]
    fn test_video_link_is_canonicalized() {
        let req = CreatePostRequest {
            video_url: Some("https://youtu.be/dQw4w9WgXcQ".into()),
            ..request("video")
        };
        let prepared = prepare_post(Uuid::new_v4(), &req, Utc::now()).unwrap();
        assert_eq!(
            prepared.post.video_embed.as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );

        let unsupported = CreatePostRequest {
            video_url: Some("https://example.com/video".into()),
            ..request("video")
        };
        assert!(prepare_post(Uuid::new_v4(), &unsupported, Utc::now()).is_err());
    }

    #[test]
    fn test_link_post() {
        let req = CreatePostRequest {
            link_url: Some("https://example.com/article".into()),
            ..request("link")
        };
        let prepared = prepare_post(Uuid::new_v4(), &req, Utc::now()).unwrap();
        assert_eq!(prepared.post.link_url.as_deref(), Some("https://example.com/article"));
        assert!(prepare_post(Uuid::new_v4(), &request("link"), Utc::now()).is_err());
    }

    #[test]
    fn test_future_schedule_sets_scheduled_status() {
        let now = Utc::now();
        let later = now + Duration::hours(2);
        let req = CreatePostRequest {
            body: Some("soon".into()),
            scheduled_for: Some(later),
            ..request("text")
        };
        let prepared = prepare_post(Uuid::new_v4(), &req, now).unwrap();
        assert_eq!(prepared.post.status, "scheduled");
        assert_eq!(prepared.post.scheduled_for, Some(later));

        let past = CreatePostRequest {
            scheduled_for: Some(now - Duration::minutes(5)),
            ..req
        };
        let prepared = prepare_post(Uuid::new_v4(), &past, now).unwrap();
        assert_eq!(prepared.post.status, "published");
        assert!(prepared.post.scheduled_for.is_none());
    }

    #[test]
    fn test_tags_are_normalized() {
        let req = CreatePostRequest {
            body: Some("hi".into()),
            tags: vec!["#Lo Fi".into(), "lo-fi".into(), "Jazz".into()],
            ..request("text")
        };
        let prepared = prepare_post(Uuid::new_v4(), &req, Utc::now()).unwrap();
        assert_eq!(prepared.tags, vec!["lo-fi", "jazz"]);
    }

    fn item_at(at: DateTime<Utc>) -> FeedItem {
        let id = Uuid::new_v4();
        FeedItem {
            post: crate::models::Post {
                id,
                author_id: Uuid::new_v4(),
                kind: "text".into(),
                body: Some("tie".into()),
                media_urls: sqlx::types::Json(Vec::new()),
                video_embed: None,
                link_url: None,
                reblog_of: None,
                status: "published".into(),
                is_flagged: false,
                scheduled_for: Some(at),
                published_at: Some(at),
                created_at: at,
                deleted_at: None,
            },
            author: AuthorSummary {
                id: Uuid::new_v4(),
                username: "tie".into(),
                display_name: None,
                avatar_url: None,
            },
            tags: Vec::new(),
            stats: Default::default(),
        }
    }

    #[test]
    fn test_next_cursor_carries_last_id() {
        let at = Utc::now();
        let items = vec![item_at(at), item_at(at)];

        let (cursor_at, cursor_id) = next_cursor(&items, 2).unwrap();
        assert_eq!(cursor_at, at);
        assert_eq!(cursor_id, items[1].post.id);

        // A short page is the last page
        assert!(next_cursor(&items, 3).is_none());
    }
}
