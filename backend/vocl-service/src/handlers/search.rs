/// Composer helpers: music and GIF search, video embed resolution
use actix_web::{web, HttpResponse};

use crate::error::{AppError, Result};
use crate::models::{EmbedQuery, SearchQuery, TrendingQuery};
use crate::state::AppState;
use crate::utils::embeds::parse_video_url;

/// GET /api/v1/search/music?q=
pub async fn search_music(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let tracks = state.music.search_tracks(&query.q, query.limit).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "tracks": tracks })))
}

/// GET /api/v1/search/gifs?q=
pub async fn search_gifs(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let gifs = state.gifs.search(&query.q, query.limit).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "gifs": gifs })))
}

/// GET /api/v1/gifs/trending
pub async fn trending_gifs(
    state: web::Data<AppState>,
    query: web::Query<TrendingQuery>,
) -> Result<HttpResponse> {
    let gifs = state.gifs.trending(query.limit).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "gifs": gifs })))
}

/// GET /api/v1/embeds/video?url=
pub async fn video_embed(query: web::Query<EmbedQuery>) -> Result<HttpResponse> {
    let embed = parse_video_url(&query.url)
        .ok_or_else(|| AppError::BadRequest("Unsupported video URL".into()))?;
    Ok(HttpResponse::Ok().json(embed))
}
