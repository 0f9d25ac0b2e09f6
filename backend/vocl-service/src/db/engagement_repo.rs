/// Likes, comments and follows
use crate::models::{Comment, CommentRow};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::MAX_UUID;

const COMMENT_COLUMNS: &str = "id, post_id, author_id, body, created_at, deleted_at";

/// Outcome of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Added,
    Removed,
    /// A concurrent request inserted the like first
    AlreadyLiked,
}

impl LikeToggle {
    pub fn liked(self) -> bool {
        !matches!(self, Self::Removed)
    }
}

/// Remove the like if present, otherwise add it
pub async fn toggle_like(pool: &PgPool, user_id: Uuid, post_id: Uuid) -> Result<LikeToggle, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let outcome = if removed > 0 {
        LikeToggle::Removed
    } else {
        let inserted = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO likes (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            RETURNING post_id
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        if inserted.is_some() {
            LikeToggle::Added
        } else {
            LikeToggle::AlreadyLiked
        }
    };

    tx.commit().await?;
    Ok(outcome)
}

pub async fn count_likes(pool: &PgPool, post_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = $1")
        .bind(post_id)
        .fetch_one(pool)
        .await
}

pub async fn insert_comment(
    pool: &PgPool,
    post_id: Uuid,
    author_id: Uuid,
    body: &str,
) -> Result<Comment, sqlx::Error> {
    let sql = format!(
        "INSERT INTO comments (post_id, author_id, body) VALUES ($1, $2, $3) RETURNING {}",
        COMMENT_COLUMNS
    );
    sqlx::query_as::<_, Comment>(&sql)
        .bind(post_id)
        .bind(author_id)
        .bind(body)
        .fetch_one(pool)
        .await
}

/// Find a comment by ID (excluding soft-deleted comments)
pub async fn find_comment(pool: &PgPool, comment_id: Uuid) -> Result<Option<Comment>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM comments WHERE id = $1 AND deleted_at IS NULL",
        COMMENT_COLUMNS
    );
    sqlx::query_as::<_, Comment>(&sql)
        .bind(comment_id)
        .fetch_optional(pool)
        .await
}

/// Author of a comment, including soft-deleted ones
pub async fn find_comment_author_including_deleted(
    pool: &PgPool,
    comment_id: Uuid,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(pool)
        .await
}

/// Comments on a post, oldest first, after the `(created_at, id)` cursor
pub async fn list_comments(
    pool: &PgPool,
    post_id: Uuid,
    cursor: Option<DateTime<Utc>>,
    cursor_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<CommentRow>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT c.id, c.post_id, c.author_id, c.body, c.created_at, c.deleted_at,
               pr.username AS author_username,
               pr.display_name AS author_display_name,
               pr.avatar_url AS author_avatar_url
        FROM comments c
        JOIN profiles pr ON pr.id = c.author_id
        WHERE c.post_id = $1
          AND c.deleted_at IS NULL
          AND ($2::timestamptz IS NULL OR (c.created_at, c.id) > ($2, COALESCE($3, {})))
        ORDER BY c.created_at ASC, c.id ASC
        LIMIT $4
        "#,
        MAX_UUID
    );
    sqlx::query_as::<_, CommentRow>(&sql)
        .bind(post_id)
        .bind(cursor)
        .bind(cursor_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn soft_delete_comment(
    executor: impl PgExecutor<'_>,
    comment_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE comments SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(comment_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns false if the follow already existed
pub async fn follow(pool: &PgPool, follower_id: Uuid, followee_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO follows (follower_id, followee_id)
        VALUES ($1, $2)
        ON CONFLICT (follower_id, followee_id) DO NOTHING
        "#,
    )
    .bind(follower_id)
    .bind(followee_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn unfollow(pool: &PgPool, follower_id: Uuid, followee_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
        .bind(follower_id)
        .bind(followee_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
