use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::error::Result;
use crate::middleware::verify_cron_secret;
use crate::state::AppState;

/// POST /api/v1/cron/publish-scheduled
///
/// Authorized by `Authorization: Bearer <CRON_SECRET>`, not a user token.
pub async fn publish_scheduled(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    verify_cron_secret(&req, state.cron_secret.as_deref())?;

    let published = state.posts.publish_due_scheduled(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "published": published.len(),
        "post_ids": published,
    })))
}
