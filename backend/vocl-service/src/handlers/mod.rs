/// HTTP handlers for vocl-service
///
/// Handlers extract the caller and request body, delegate to a service on
/// `AppState`, and serialize the result. Errors convert through `AppError`.
pub mod cron;
pub mod engagement;
pub mod health;
pub mod media;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod reports;
pub mod search;

use actix_middleware::{RateLimitConfig, RateLimitMiddleware, RateLimiter};
use actix_web::web;
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::serve_metrics;
use crate::middleware::{JwtAuthMiddleware, JwtVerifier};

/// Register every route plus the extractor configs that turn malformed
/// bodies, queries and paths into JSON 400s.
///
/// Public endpoints sit outside the authenticated `/api/v1` scope and are
/// rate limited per client IP; everything else is limited per user.
pub fn configure_routes(
    cfg: &mut web::ServiceConfig,
    verifier: Arc<JwtVerifier>,
    limiter: RateLimiter,
    api_limit: RateLimitConfig,
) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(256 * 1024)
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| AppError::BadRequest(err.to_string()).into()),
    )
    .route("/metrics", web::get().to(serve_metrics))
    .route("/api/v1/metrics", web::get().to(serve_metrics))
    .route("/api/v1/health", web::get().to(health::health))
    .route("/api/v1/health/live", web::get().to(health::liveness))
    .route("/api/v1/health/ready", web::get().to(health::readiness))
    .service(
        web::resource("/api/v1/usernames/{username}/availability")
            .wrap(RateLimitMiddleware::new(limiter.clone(), api_limit, "public"))
            .route(web::get().to(profiles::username_availability)),
    )
    .service(
        web::resource("/api/v1/cron/publish-scheduled")
            .route(web::post().to(cron::publish_scheduled)),
    )
    .service(
        web::scope("/api/v1")
            .wrap(RateLimitMiddleware::new(limiter, api_limit, "api"))
            .wrap(JwtAuthMiddleware::new(verifier))
            .route("/feed", web::get().to(posts::home_feed))
            .route("/explore", web::get().to(posts::explore))
            .route("/tags/{tag}", web::get().to(posts::tag_feed))
            .route("/posts", web::post().to(posts::create_post))
            .service(
                web::resource("/posts/{post_id}")
                    .route(web::get().to(posts::get_post))
                    .route(web::delete().to(posts::delete_post)),
            )
            .route("/posts/{post_id}/like", web::post().to(engagement::toggle_like))
            .service(
                web::resource("/posts/{post_id}/comments")
                    .route(web::get().to(engagement::list_comments))
                    .route(web::post().to(engagement::add_comment)),
            )
            .route("/posts/{post_id}/reblog", web::post().to(engagement::reblog))
            .route("/comments/{comment_id}", web::delete().to(engagement::delete_comment))
            .route("/users/{username}", web::get().to(profiles::get_profile))
            .route("/users/{username}/posts", web::get().to(posts::user_posts))
            .service(
                web::resource("/users/{username}/follow")
                    .route(web::post().to(engagement::follow))
                    .route(web::delete().to(engagement::unfollow)),
            )
            .service(
                web::resource("/me")
                    .route(web::get().to(profiles::me))
                    .route(web::patch().to(profiles::update_me)),
            )
            .route("/notifications", web::get().to(notifications::list_notifications))
            .route(
                "/notifications/unread-count",
                web::get().to(notifications::unread_count),
            )
            .route("/notifications/read", web::post().to(notifications::mark_read))
            .route(
                "/notifications/read-all",
                web::post().to(notifications::mark_all_read),
            )
            .route(
                "/notifications/message",
                web::post().to(notifications::message_notification),
            )
            .route("/reports", web::post().to(reports::create_report))
            .service(
                web::scope("/admin")
                    .route("/reports", web::get().to(reports::list_reports))
                    .route(
                        "/reports/{report_id}/resolve",
                        web::post().to(reports::resolve_report),
                    )
                    .route("/users/{user_id}/role", web::post().to(reports::set_role))
                    .route("/users/{user_id}/ban", web::post().to(reports::ban_user))
                    .route("/users/{user_id}/unban", web::post().to(reports::unban_user))
                    .route("/audit-logs", web::get().to(reports::list_audit_logs)),
            )
            .route("/media/upload-url", web::post().to(media::request_upload_url))
            .route("/search/music", web::get().to(search::search_music))
            .route("/search/gifs", web::get().to(search::search_gifs))
            .route("/gifs/trending", web::get().to(search::trending_gifs))
            .route("/embeds/video", web::get().to(search::video_embed)),
    );
}
