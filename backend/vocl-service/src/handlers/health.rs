/// Liveness and readiness probes
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use std::time::Instant;

use crate::state::AppState;

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    database: &'static str,
    latency_ms: u64,
    timestamp: String,
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "vocl-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "service": "vocl-service"
            }))
        }
    }
}

pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "alive": true }))
}

pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    let start = Instant::now();
    let result = sqlx::query("SELECT 1").execute(&state.pool).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    if let Err(e) = &result {
        tracing::warn!(error = %e, "Readiness check failed");
    }
    let ready = result.is_ok();
    let response = ReadinessResponse {
        ready,
        database: if ready { "healthy" } else { "unhealthy" },
        latency_ms,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
