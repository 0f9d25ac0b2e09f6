use crate::models::AuditLog;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::NIL_UUID;

const AUDIT_COLUMNS: &str = "id, actor_id, action, target_type, target_id, details, created_at";

/// Record a moderator or admin action
pub async fn insert_audit_log(
    executor: impl PgExecutor<'_>,
    actor_id: Uuid,
    action: &str,
    target_type: &str,
    target_id: Option<Uuid>,
    details: serde_json::Value,
) -> Result<AuditLog, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO audit_logs (actor_id, action, target_type, target_id, details)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {}
        "#,
        AUDIT_COLUMNS
    );
    sqlx::query_as::<_, AuditLog>(&sql)
        .bind(actor_id)
        .bind(action)
        .bind(target_type)
        .bind(target_id)
        .bind(Json(details))
        .fetch_one(executor)
        .await
}

pub async fn list_audit_logs(
    pool: &PgPool,
    cursor: Option<DateTime<Utc>>,
    cursor_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<AuditLog>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {} FROM audit_logs
        WHERE ($1::timestamptz IS NULL OR (created_at, id) < ($1, COALESCE($2, {})))
        ORDER BY created_at DESC, id DESC
        LIMIT $3
        "#,
        AUDIT_COLUMNS, NIL_UUID
    );
    sqlx::query_as::<_, AuditLog>(&sql)
        .bind(cursor)
        .bind(cursor_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}
