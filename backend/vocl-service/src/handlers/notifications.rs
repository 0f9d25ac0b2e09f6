/// Notification inbox handlers
use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{MarkReadRequest, MessageNotificationRequest, NotificationQuery, UnreadCount};
use crate::state::AppState;
use crate::utils::clamp_limit;

pub async fn list_notifications(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse> {
    let items = state
        .notifications
        .list(
            user.0,
            query.unread_only,
            query.cursor,
            query.cursor_id,
            clamp_limit(query.limit),
        )
        .await?;
    Ok(HttpResponse::Ok().json(items))
}

pub async fn unread_count(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse> {
    let unread = state.notifications.unread_count(user.0).await?;
    Ok(HttpResponse::Ok().json(UnreadCount { unread }))
}

pub async fn mark_read(
    state: web::Data<AppState>,
    user: UserId,
    req: web::Json<MarkReadRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let updated = state.notifications.mark_read(user.0, &req.ids).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

pub async fn mark_all_read(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse> {
    let updated = state.notifications.mark_all_read(user.0).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "updated": updated })))
}

/// Raised by the messaging surface when a direct message is sent
pub async fn message_notification(
    state: web::Data<AppState>,
    user: UserId,
    req: web::Json<MessageNotificationRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let created = state
        .notifications
        .notify_message(user.0, req.recipient_id, &req.preview)
        .await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "created": created.is_some() })))
}
