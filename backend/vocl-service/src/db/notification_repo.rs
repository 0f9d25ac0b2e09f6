use crate::models::{NewNotification, Notification, NotificationView};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::NIL_UUID;

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, actor_id, kind, post_id, comment_id, message, is_read, created_at";

pub async fn insert_notification(
    pool: &PgPool,
    n: &NewNotification,
) -> Result<Notification, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO notifications (recipient_id, actor_id, kind, post_id, comment_id, message)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        NOTIFICATION_COLUMNS
    );
    sqlx::query_as::<_, Notification>(&sql)
        .bind(n.recipient_id)
        .bind(n.actor_id)
        .bind(n.kind.as_str())
        .bind(n.post_id)
        .bind(n.comment_id)
        .bind(&n.message)
        .fetch_one(pool)
        .await
}

/// Insert the same notification for many recipients in one statement
pub async fn insert_for_recipients(
    pool: &PgPool,
    template: &NewNotification,
    recipients: &[Uuid],
) -> Result<u64, sqlx::Error> {
    if recipients.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        INSERT INTO notifications (recipient_id, actor_id, kind, post_id, comment_id, message)
        SELECT r, $2, $3, $4, $5, $6 FROM UNNEST($1::uuid[]) AS r
        "#,
    )
    .bind(recipients)
    .bind(template.actor_id)
    .bind(template.kind.as_str())
    .bind(template.post_id)
    .bind(template.comment_id)
    .bind(&template.message)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Newest first, older than the `(created_at, id)` cursor
pub async fn list_notifications(
    pool: &PgPool,
    user_id: Uuid,
    unread_only: bool,
    cursor: Option<DateTime<Utc>>,
    cursor_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<NotificationView>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT n.id, n.recipient_id, n.actor_id, n.kind, n.post_id, n.comment_id,
               n.message, n.is_read, n.created_at,
               a.username AS actor_username,
               a.avatar_url AS actor_avatar_url
        FROM notifications n
        LEFT JOIN profiles a ON a.id = n.actor_id
        WHERE n.recipient_id = $1
          AND ($2 = FALSE OR n.is_read = FALSE)
          AND ($3::timestamptz IS NULL OR (n.created_at, n.id) < ($3, COALESCE($4, {})))
        ORDER BY n.created_at DESC, n.id DESC
        LIMIT $5
        "#,
        NIL_UUID
    );
    sqlx::query_as::<_, NotificationView>(&sql)
        .bind(user_id)
        .bind(unread_only)
        .bind(cursor)
        .bind(cursor_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Only the recipient's own notifications are touched
pub async fn mark_read(pool: &PgPool, user_id: Uuid, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE notifications SET is_read = TRUE
        WHERE recipient_id = $1 AND id = ANY($2) AND is_read = FALSE
        "#,
    )
    .bind(user_id)
    .bind(ids)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
