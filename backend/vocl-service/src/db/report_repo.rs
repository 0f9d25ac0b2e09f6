/// Database operations for reports
use crate::models::Report;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::NIL_UUID;

const REPORT_COLUMNS: &str = "id, reporter_id, target_type, target_id, reason, details, status, \
     resolved_by, resolved_at, resolution_note, created_at";

/// Create a new report; `reporter_id` is `None` for automatic reports
pub async fn create_report(
    executor: impl PgExecutor<'_>,
    reporter_id: Option<Uuid>,
    target_type: &str,
    target_id: Uuid,
    reason: &str,
    details: Option<&str>,
) -> Result<Report, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO reports (reporter_id, target_type, target_id, reason, details, status)
        VALUES ($1, $2, $3, $4, $5, 'pending')
        RETURNING {}
        "#,
        REPORT_COLUMNS
    );
    sqlx::query_as::<_, Report>(&sql)
        .bind(reporter_id)
        .bind(target_type)
        .bind(target_id)
        .bind(reason)
        .bind(details)
        .fetch_one(executor)
        .await
}

pub async fn find_report(pool: &PgPool, id: Uuid) -> Result<Option<Report>, sqlx::Error> {
    let sql = format!("SELECT {} FROM reports WHERE id = $1", REPORT_COLUMNS);
    sqlx::query_as::<_, Report>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Reports newest first, optionally filtered by status
pub async fn list_reports(
    pool: &PgPool,
    status: Option<&str>,
    cursor: Option<DateTime<Utc>>,
    cursor_id: Option<Uuid>,
    limit: i64,
) -> Result<Vec<Report>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {} FROM reports
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, COALESCE($3, {})))
        ORDER BY created_at DESC, id DESC
        LIMIT $4
        "#,
        REPORT_COLUMNS, NIL_UUID
    );
    sqlx::query_as::<_, Report>(&sql)
        .bind(status)
        .bind(cursor)
        .bind(cursor_id)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Close a pending report. Returns `None` if it was already closed.
pub async fn resolve_report(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    status: &str,
    resolved_by: Uuid,
    note: Option<&str>,
) -> Result<Option<Report>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE reports
        SET status = $2, resolved_by = $3, resolved_at = NOW(), resolution_note = $4
        WHERE id = $1 AND status = 'pending'
        RETURNING {}
        "#,
        REPORT_COLUMNS
    );
    sqlx::query_as::<_, Report>(&sql)
        .bind(id)
        .bind(status)
        .bind(resolved_by)
        .bind(note)
        .fetch_optional(executor)
        .await
}
