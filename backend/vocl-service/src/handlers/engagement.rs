/// Likes, comments, reblogs and follows
use actix_web::{web, HttpResponse};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{CommentQuery, CreateCommentRequest, ReblogRequest};
use crate::state::AppState;

pub async fn toggle_like(
    state: web::Data<AppState>,
    user: UserId,
    post_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let result = state.engagement.toggle_like(user.0, *post_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn list_comments(
    state: web::Data<AppState>,
    post_id: web::Path<Uuid>,
    query: web::Query<CommentQuery>,
) -> Result<HttpResponse> {
    let comments = state.engagement.list_comments(*post_id, &query).await?;
    Ok(HttpResponse::Ok().json(comments))
}

pub async fn add_comment(
    state: web::Data<AppState>,
    user: UserId,
    post_id: web::Path<Uuid>,
    req: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse> {
    let comment = state.engagement.add_comment(user.0, *post_id, &req).await?;
    Ok(HttpResponse::Created().json(comment))
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    user: UserId,
    comment_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.engagement.delete_comment(user.0, *comment_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Body is optional; an empty request reblogs without comment
pub async fn reblog(
    state: web::Data<AppState>,
    user: UserId,
    post_id: web::Path<Uuid>,
    req: Option<web::Json<ReblogRequest>>,
) -> Result<HttpResponse> {
    let req = req
        .map(web::Json::into_inner)
        .unwrap_or(ReblogRequest { comment: None });
    let post = state.engagement.reblog(user.0, *post_id, &req).await?;
    Ok(HttpResponse::Created().json(post))
}

pub async fn follow(
    state: web::Data<AppState>,
    user: UserId,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let result = state.engagement.follow(user.0, &username).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn unfollow(
    state: web::Data<AppState>,
    user: UserId,
    username: web::Path<String>,
) -> Result<HttpResponse> {
    let result = state.engagement.unfollow(user.0, &username).await?;
    Ok(HttpResponse::Ok().json(result))
}
