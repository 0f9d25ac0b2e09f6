use actix_web::{web, HttpResponse};

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::UploadUrlRequest;
use crate::state::AppState;

/// POST /api/v1/media/upload-url
pub async fn request_upload_url(
    state: web::Data<AppState>,
    user: UserId,
    req: web::Json<UploadUrlRequest>,
) -> Result<HttpResponse> {
    let upload = state.media.request_upload(user.0, &req).await?;
    Ok(HttpResponse::Ok().json(upload))
}
