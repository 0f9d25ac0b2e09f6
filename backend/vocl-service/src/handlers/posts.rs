/// Post and feed handlers
use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{CreatePostRequest, FeedQuery};
use crate::state::AppState;

/// POST /api/v1/posts
pub async fn create_post(
    state: web::Data<AppState>,
    user: UserId,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let item = state.posts.create_post(user.0, &req).await?;
    Ok(HttpResponse::Created().json(item))
}

/// GET /api/v1/posts/{post_id}
pub async fn get_post(
    state: web::Data<AppState>,
    user: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let item = state.posts.get_post(*post_id, Some(user.0)).await?;
    Ok(HttpResponse::Ok().json(item))
}

/// DELETE /api/v1/posts/{post_id}
pub async fn delete_post(
    state: web::Data<AppState>,
    user: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.posts.delete_post(user.0, *post_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/feed
pub async fn home_feed(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse> {
    let page = state.posts.feed(user.0, &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/v1/explore
pub async fn explore(
    state: web::Data<AppState>,
    user: UserId,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse> {
    let page = state.posts.explore(Some(user.0), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/v1/tags/{tag}
pub async fn tag_feed(
    state: web::Data<AppState>,
    user: UserId,
    tag: web::Path<String>,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse> {
    let page = state.posts.tag_feed(&tag, Some(user.0), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}

/// GET /api/v1/users/{username}/posts
pub async fn user_posts(
    state: web::Data<AppState>,
    user: UserId,
    username: web::Path<String>,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse> {
    let page = state.posts.user_posts(&username, Some(user.0), &query).await?;
    Ok(HttpResponse::Ok().json(page))
}
