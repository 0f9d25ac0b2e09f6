//! Prometheus metrics for the vocl service.
//!
//! Collectors register with the default registry, which also carries the
//! rate limiter's rejection counter from `actix-middleware`.

use actix_web::HttpResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, TextEncoder};

lazy_static::lazy_static! {
    pub static ref MODERATION_OUTCOMES: IntCounterVec = prometheus::register_int_counter_vec!(
        "moderation_outcomes_total",
        "Moderation checks by outcome",
        &["outcome"]
    )
    .expect("moderation_outcomes_total metric registration");

    pub static ref NOTIFICATIONS_CREATED: IntCounterVec = prometheus::register_int_counter_vec!(
        "notifications_created_total",
        "Notifications inserted by kind",
        &["kind"]
    )
    .expect("notifications_created_total metric registration");

    pub static ref SCHEDULED_POSTS_PUBLISHED: IntCounter = prometheus::register_int_counter!(
        "scheduled_posts_published_total",
        "Scheduled posts moved to published"
    )
    .expect("scheduled_posts_published_total metric registration");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
