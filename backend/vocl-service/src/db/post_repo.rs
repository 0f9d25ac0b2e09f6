use crate::models::{Post, PostRow};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::NIL_UUID;

const POST_COLUMNS: &str = "id, author_id, kind, body, media_urls, video_embed, link_url, \
     reblog_of, status, is_flagged, scheduled_for, published_at, created_at, deleted_at";

/// Post columns plus author fields; callers append WHERE/ORDER clauses
const POST_ROW_SELECT: &str = r#"
    SELECT p.id, p.author_id, p.kind, p.body, p.media_urls, p.video_embed, p.link_url,
           p.reblog_of, p.status, p.is_flagged, p.scheduled_for, p.published_at,
           p.created_at, p.deleted_at,
           pr.username AS author_username,
           pr.display_name AS author_display_name,
           pr.avatar_url AS author_avatar_url
    FROM posts p
    JOIN profiles pr ON pr.id = p.author_id
"#;

/// Posts visible to readers: published, not deleted, author not banned
const VISIBLE: &str = "p.status = 'published' AND p.deleted_at IS NULL AND pr.is_banned = FALSE";

/// Validated fields for a new post row
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub kind: String,
    pub body: Option<String>,
    pub media_urls: Vec<String>,
    pub video_embed: Option<String>,
    pub link_url: Option<String>,
    pub reblog_of: Option<Uuid>,
    pub status: String,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Insert a post; `published_at` is set when the status is `published`
pub async fn insert_post(conn: &mut PgConnection, post: &NewPost) -> Result<Post, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO posts (author_id, kind, body, media_urls, video_embed, link_url,
                           reblog_of, status, scheduled_for, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9,
                CASE WHEN $8 = 'published' THEN NOW() ELSE NULL END)
        RETURNING {}
        "#,
        POST_COLUMNS
    );
    sqlx::query_as::<_, Post>(&sql)
        .bind(post.author_id)
        .bind(&post.kind)
        .bind(&post.body)
        .bind(Json(&post.media_urls))
        .bind(&post.video_embed)
        .bind(&post.link_url)
        .bind(post.reblog_of)
        .bind(&post.status)
        .bind(post.scheduled_for)
        .fetch_one(conn)
        .await
}

/// Find a post by ID (excluding soft-deleted posts)
pub async fn find_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM posts WHERE id = $1 AND deleted_at IS NULL",
        POST_COLUMNS
    );
    sqlx::query_as::<_, Post>(&sql)
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

/// Author of a post, including soft-deleted ones
pub async fn find_post_author_including_deleted(
    pool: &PgPool,
    post_id: Uuid,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

/// Find a post with its author (excluding soft-deleted posts)
pub async fn find_post_row(pool: &PgPool, post_id: Uuid) -> Result<Option<PostRow>, sqlx::Error> {
    let sql = format!("{} WHERE p.id = $1 AND p.deleted_at IS NULL", POST_ROW_SELECT);
    sqlx::query_as::<_, PostRow>(&sql)
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

/// Soft delete; returns false if the post was already gone
pub async fn soft_delete_post(
    executor: impl PgExecutor<'_>,
    post_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE posts SET status = 'deleted', deleted_at = NOW()
        WHERE id = $1 AND deleted_at IS NULL
        "#,
    )
    .bind(post_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Mark a post for moderator review
pub async fn set_flagged(executor: impl PgExecutor<'_>, post_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET is_flagged = TRUE WHERE id = $1")
        .bind(post_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Keyset position in a feed: `published_at` and id of the last item served
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedCursor {
    pub at: Option<DateTime<Utc>>,
    pub id: Option<Uuid>,
}

/// Rows strictly after the cursor in `(published_at DESC, id DESC)` order
fn before_cursor(at: u8, id: u8) -> String {
    format!(
        "(${at}::timestamptz IS NULL OR (p.published_at, p.id) < (${at}, COALESCE(${id}, {nil})))",
        at = at,
        id = id,
        nil = NIL_UUID
    )
}

/// Home feed: the viewer's own posts and posts from accounts they follow
pub async fn home_feed(
    pool: &PgPool,
    viewer: Uuid,
    cursor: FeedCursor,
    limit: i64,
) -> Result<Vec<PostRow>, sqlx::Error> {
    let sql = format!(
        r#"{}
        WHERE {}
          AND (p.author_id = $1
               OR p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = $1))
          AND {}
        ORDER BY p.published_at DESC, p.id DESC
        LIMIT $4
        "#,
        POST_ROW_SELECT,
        VISIBLE,
        before_cursor(2, 3)
    );
    sqlx::query_as::<_, PostRow>(&sql)
        .bind(viewer)
        .bind(cursor.at)
        .bind(cursor.id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Every visible post, newest first
pub async fn explore_feed(
    pool: &PgPool,
    cursor: FeedCursor,
    limit: i64,
) -> Result<Vec<PostRow>, sqlx::Error> {
    let sql = format!(
        r#"{}
        WHERE {}
          AND {}
        ORDER BY p.published_at DESC, p.id DESC
        LIMIT $3
        "#,
        POST_ROW_SELECT,
        VISIBLE,
        before_cursor(1, 2)
    );
    sqlx::query_as::<_, PostRow>(&sql)
        .bind(cursor.at)
        .bind(cursor.id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn tag_feed(
    pool: &PgPool,
    tag: &str,
    cursor: FeedCursor,
    limit: i64,
) -> Result<Vec<PostRow>, sqlx::Error> {
    let sql = format!(
        r#"{}
        JOIN post_tags pt ON pt.post_id = p.id
        JOIN tags t ON t.id = pt.tag_id
        WHERE {}
          AND t.name = $1
          AND {}
        ORDER BY p.published_at DESC, p.id DESC
        LIMIT $4
        "#,
        POST_ROW_SELECT,
        VISIBLE,
        before_cursor(2, 3)
    );
    sqlx::query_as::<_, PostRow>(&sql)
        .bind(tag)
        .bind(cursor.at)
        .bind(cursor.id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn author_feed(
    pool: &PgPool,
    author_id: Uuid,
    cursor: FeedCursor,
    limit: i64,
) -> Result<Vec<PostRow>, sqlx::Error> {
    let sql = format!(
        r#"{}
        WHERE {}
          AND p.author_id = $1
          AND {}
        ORDER BY p.published_at DESC, p.id DESC
        LIMIT $4
        "#,
        POST_ROW_SELECT,
        VISIBLE,
        before_cursor(2, 3)
    );
    sqlx::query_as::<_, PostRow>(&sql)
        .bind(author_id)
        .bind(cursor.at)
        .bind(cursor.id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Publish scheduled posts that are due; `published_at` takes the scheduled time
pub async fn publish_due(pool: &PgPool, now: DateTime<Utc>) -> Result<Vec<Post>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE posts
        SET status = 'published', published_at = scheduled_for
        WHERE status = 'scheduled'
          AND deleted_at IS NULL
          AND scheduled_for <= $1
        RETURNING {}
        "#,
        POST_COLUMNS
    );
    sqlx::query_as::<_, Post>(&sql)
        .bind(now)
        .fetch_all(pool)
        .await
}

/// Whether `user_id` already has a live reblog of `post_id`
pub async fn has_reblogged(pool: &PgPool, user_id: Uuid, post_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM posts
            WHERE author_id = $1 AND reblog_of = $2 AND deleted_at IS NULL
        )
        "#,
    )
    .bind(user_id)
    .bind(post_id)
    .fetch_one(pool)
    .await
}
