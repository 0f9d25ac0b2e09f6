/// Engagement service - likes, comments, reblogs and follows
use actix_middleware::{RateLimitConfig, RateLimiter};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::db::engagement_repo::LikeToggle;
use crate::db::post_repo::NewPost;
use crate::db::{audit_repo, engagement_repo, post_repo, profile_repo};
use crate::error::{AppError, Result};
use crate::middleware::is_moderator;
use crate::models::{
    AuthorSummary, CommentQuery, CommentView, CreateCommentRequest, FollowResponse, LikeResponse,
    NewNotification, NotificationKind, Post, PostKind, PostStatus, ReblogRequest,
};
use crate::services::moderation::{ModerationGate, CONTENT_VIOLATION};
use crate::services::notifications::NotificationService;
use crate::services::{enforce_rate_limit, load_active_profile};
use crate::utils::clamp_limit;
use crate::utils::text::{validate_comment, validate_post_body};
use crate::utils::username::normalize_username;

/// Who may remove a comment: its author, the post's author, or a moderator
pub fn can_delete_comment(
    actor_id: Uuid,
    comment_author: Uuid,
    post_author: Option<Uuid>,
    actor_is_moderator: bool,
) -> bool {
    actor_id == comment_author || post_author == Some(actor_id) || actor_is_moderator
}

/// The post a reblog points at: reblogs of reblogs target the original
pub fn reblog_source(post: &Post) -> Uuid {
    post.reblog_of.unwrap_or(post.id)
}

/// Own posts cannot be reblogged, and each user reblogs a post at most once
pub fn check_reblog(user_id: Uuid, original_author: Uuid, already_reblogged: bool) -> Result<()> {
    if original_author == user_id {
        return Err(AppError::BadRequest("You cannot reblog your own post".into()));
    }
    if already_reblogged {
        return Err(AppError::Conflict("Already reblogged".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct EngagementService {
    pool: PgPool,
    moderation: ModerationGate,
    notifications: NotificationService,
    limiter: RateLimiter,
}

impl EngagementService {
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

    async fn visible_post(&self, post_id: Uuid) -> Result<Post> {
        post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .filter(|p| p.is_visible())
            .ok_or_else(|| AppError::NotFound("Post not found".into()))
    }

    /// Like or unlike a post
    pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeResponse> {
        load_active_profile(&self.pool, user_id).await?;
        let post = self.visible_post(post_id).await?;
        enforce_rate_limit(&self.limiter, "like", user_id, &RateLimitConfig::like())?;

        let outcome = engagement_repo::toggle_like(&self.pool, user_id, post_id).await?;
        let like_count = engagement_repo::count_likes(&self.pool, post_id).await?;

        if outcome == LikeToggle::Added {
            self.notifications
                .create_best_effort(
                    NewNotification::new(post.author_id, Some(user_id), NotificationKind::Like)
                        .with_post(post_id),
                )
                .await;
        }

        Ok(LikeResponse {
            liked: outcome.liked(),
            like_count,
        })
    }

    /// Comment on a post; flagged text is rejected outright
    pub async fn add_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        req: &CreateCommentRequest,
    ) -> Result<CommentView> {
        req.validate()?;
        let author = load_active_profile(&self.pool, user_id).await?;
        let body = validate_comment(&req.body)?;
        let post = self.visible_post(post_id).await?;
        enforce_rate_limit(
            &self.limiter,
            "comment_create",
            user_id,
            &RateLimitConfig::comment_create(),
        )?;

        let verdict = self.moderation.check(&body).await;
        if verdict.flagged {
            tracing::info!(
                user_id = %user_id,
                post_id = %post_id,
                reason = verdict.reason.as_deref().unwrap_or(""),
                "Comment rejected by moderation"
            );
            return Err(AppError::BadRequest(CONTENT_VIOLATION.into()));
        }

        let comment = engagement_repo::insert_comment(&self.pool, post_id, user_id, &body).await?;

        self.notifications
            .create_best_effort(
                NewNotification::new(post.author_id, Some(user_id), NotificationKind::Comment)
                    .with_post(post_id)
                    .with_comment(Some(comment.id)),
            )
            .await;
        if let Err(e) = self
            .notifications
            .notify_mentions(user_id, post_id, Some(comment.id), &body)
            .await
        {
            tracing::warn!(comment_id = %comment.id, error = %e, "Mention fan-out failed");
        }

        Ok(CommentView {
            comment,
            author: AuthorSummary {
                id: author.id,
                username: author.username,
                display_name: author.display_name,
                avatar_url: author.avatar_url,
            },
        })
    }

    /// Comments on a post, oldest first
    pub async fn list_comments(&self, post_id: Uuid, query: &CommentQuery) -> Result<Vec<CommentView>> {
        self.visible_post(post_id).await?;
        let rows = engagement_repo::list_comments(
            &self.pool,
            post_id,
            query.cursor,
            query.cursor_id,
            clamp_limit(query.limit),
        )
        .await?;
        Ok(rows.into_iter().map(CommentView::from).collect())
    }

    pub async fn delete_comment(&self, actor_id: Uuid, comment_id: Uuid) -> Result<()> {
        let actor = profile_repo::find_by_id(&self.pool, actor_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Profile not found".into()))?;
        let comment = engagement_repo::find_comment(&self.pool, comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;
        let post_author = post_repo::find_post_by_id(&self.pool, comment.post_id)
            .await?
            .map(|p| p.author_id);

        let moderator = is_moderator(actor.role());
        if !can_delete_comment(actor_id, comment.author_id, post_author, moderator) {
            return Err(AppError::Forbidden(
                "You don't have permission to delete this comment".into(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        engagement_repo::soft_delete_comment(&mut *tx, comment_id).await?;
        let owner = actor_id == comment.author_id || post_author == Some(actor_id);
        if !owner {
            audit_repo::insert_audit_log(
                &mut *tx,
                actor_id,
                "comment.delete",
                "comment",
                Some(comment_id),
                serde_json::json!({ "author_id": comment.author_id, "post_id": comment.post_id }),
            )
            .await?;
        }
        tx.commit().await?;

        tracing::info!(comment_id = %comment_id, actor_id = %actor_id, "Comment deleted");
        Ok(())
    }

    /// Reblog a post as a new `reblog` post.
    ///
    /// Reblogging a reblog targets the original post.
    pub async fn reblog(&self, user_id: Uuid, post_id: Uuid, req: &ReblogRequest) -> Result<Post> {
        req.validate()?;
        load_active_profile(&self.pool, user_id).await?;

        let target = self.visible_post(post_id).await?;
        let source_id = reblog_source(&target);
        let original = if source_id == target.id {
            target
        } else {
            self.visible_post(source_id).await?
        };

        let already = post_repo::has_reblogged(&self.pool, user_id, original.id).await?;
        check_reblog(user_id, original.author_id, already)?;

        let comment = req
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        if let Some(c) = &comment {
            validate_post_body(c)?;
        }
        enforce_rate_limit(&self.limiter, "post_create", user_id, &RateLimitConfig::post_create())?;

        let new_post = NewPost {
            author_id: user_id,
            kind: PostKind::Reblog.as_str().to_string(),
            body: comment.clone(),
            media_urls: Vec::new(),
            video_embed: None,
            link_url: None,
            reblog_of: Some(original.id),
            status: PostStatus::Published.as_str().to_string(),
            scheduled_for: None,
        };
        let mut conn = self.pool.acquire().await?;
        let reblog = post_repo::insert_post(&mut conn, &new_post).await?;
        drop(conn);

        tracing::info!(post_id = %reblog.id, reblog_of = %original.id, user_id = %user_id, "Post reblogged");

        self.notifications
            .create_best_effort(
                NewNotification::new(original.author_id, Some(user_id), NotificationKind::Reblog)
                    .with_post(original.id),
            )
            .await;
        if let Some(c) = &comment {
            if let Err(e) = self
                .notifications
                .notify_mentions(user_id, reblog.id, None, c)
                .await
            {
                tracing::warn!(post_id = %reblog.id, error = %e, "Mention fan-out failed");
            }
        }

        Ok(reblog)
    }

    pub async fn follow(&self, user_id: Uuid, username: &str) -> Result<FollowResponse> {
        load_active_profile(&self.pool, user_id).await?;
        let target = profile_repo::find_by_username(&self.pool, &normalize_username(username))
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

        if target.id == user_id {
            return Err(AppError::BadRequest("You cannot follow yourself".into()));
        }

        if engagement_repo::follow(&self.pool, user_id, target.id).await? {
            self.notifications
                .create_best_effort(NewNotification::new(
                    target.id,
                    Some(user_id),
                    NotificationKind::Follow,
                ))
                .await;
        }

        Ok(FollowResponse { following: true })
    }

    pub async fn unfollow(&self, user_id: Uuid, username: &str) -> Result<FollowResponse> {
        let target = profile_repo::find_by_username(&self.pool, &normalize_username(username))
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

        engagement_repo::unfollow(&self.pool, user_id, target.id).await?;
        Ok(FollowResponse { following: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_deletion_rights() {
        let commenter = Uuid::new_v4();
        let post_author = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        assert!(can_delete_comment(commenter, commenter, Some(post_author), false));
        assert!(can_delete_comment(post_author, commenter, Some(post_author), false));
        assert!(!can_delete_comment(stranger, commenter, Some(post_author), false));
        assert!(can_delete_comment(stranger, commenter, Some(post_author), true));
        assert!(!can_delete_comment(stranger, commenter, None, false));
    }

    fn post(author_id: Uuid, reblog_of: Option<Uuid>) -> Post {
        let now = chrono::Utc::now();
        Post {
            id: Uuid::new_v4(),
            author_id,
            kind: (if reblog_of.is_some() { "reblog" } else { "text" }).into(),
            body: None,
            media_urls: sqlx::types::Json(Vec::new()),
            video_embed: None,
            link_url: None,
            reblog_of,
            status: "published".into(),
            is_flagged: false,
            scheduled_for: None,
            published_at: Some(now),
            created_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_reblog_of_reblog_targets_original() {
        let original = post(Uuid::new_v4(), None);
        let reblog = post(Uuid::new_v4(), Some(original.id));

        assert_eq!(reblog_source(&original), original.id);
        assert_eq!(reblog_source(&reblog), original.id);
    }

    #[test]
    fn test_reblog_rules() {
        let author = Uuid::new_v4();
        let fan = Uuid::new_v4();

        assert!(check_reblog(fan, author, false).is_ok());
        assert!(matches!(check_reblog(author, author, false), Err(AppError::BadRequest(_))));
        assert!(matches!(check_reblog(fan, author, true), Err(AppError::Conflict(_))));
        // Own-post rule wins over the duplicate rule
        assert!(matches!(check_reblog(author, author, true), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_like_toggle_state() {
        assert!(LikeToggle::Added.liked());
        assert!(LikeToggle::AlreadyLiked.liked());
        assert!(!LikeToggle::Removed.liked());
    }
}
