/// Profile handlers
use actix_web::{web, HttpResponse};

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::UpdateProfileRequest;
use crate::state::AppState;

/// GET /api/v1/me
pub async fn me(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse> {
    let profile = state.profiles.me(user.0).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// PATCH /api/v1/me
pub async fn update_me(
    state: web::Data<AppState>,
    user: UserId,
    req: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let profile = state.profiles.update_profile(user.0, &req).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// GET /api/v1/users/{username}
pub async fn get_profile(
    state: web::Data<AppState>,
    user: UserId,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let profile = state.profiles.get_profile(&username, Some(user.0)).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// GET /api/v1/usernames/{username}/availability (public)
pub async fn username_availability(
    state: web::Data<AppState>,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let result = state
        .profiles
        .check_username_availability(&username, None)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
