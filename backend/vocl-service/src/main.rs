use actix_cors::Cors;
use anyhow::Context;
use actix_middleware::{RateLimitConfig, RateLimiter};
use actix_web::{web, App, HttpServer};
use db_pool::{create_pool, DbConfig};
use s3_utils::{S3Client, S3Config};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vocl_service::handlers::configure_routes;
use vocl_service::jobs::start_scheduled_post_publisher;
use vocl_service::middleware::JwtVerifier;
use vocl_service::services::{Mailer, ModerationGate, NoopMailer, SmtpMailer};
use vocl_service::{error, AppState, Config};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_mailer(config: &Config) -> Arc<dyn Mailer> {
    if !config.email.enabled() {
        tracing::info!("SMTP not configured; emails are disabled");
        return Arc::new(NoopMailer);
    }
    match SmtpMailer::new(&config.email) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            tracing::warn!(error = %e, "SMTP transport unavailable; emails are disabled");
            Arc::new(NoopMailer)
        }
    }
}

fn build_cors(allowed_origins: &str) -> Cors {
    let mut cors = Cors::default();
    for origin in allowed_origins.split(',') {
        let origin = origin.trim();
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else if !origin.is_empty() {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method().allow_any_header().max_age(3600)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting vocl-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);
    error::set_production_mode(config.app.is_production());
    config.log_integrations();

    let db_cfg = DbConfig::from_env("vocl-service").unwrap_or_else(|_| {
        DbConfig::for_url("vocl-service", &config.database.url, config.database.max_connections)
    });
    db_cfg.log_config();
    let pool = create_pool(db_cfg)
        .await
        .context("Failed to create database pool")?;

    let storage = if config.storage.enabled {
        let s3 = S3Client::new(S3Config::from_env()).await;
        tracing::info!(bucket = %s3.config().bucket, "Object storage enabled");
        Some(s3.operations())
    } else {
        tracing::info!("S3_BUCKET not set; media uploads are disabled");
        None
    };

    let limiter = RateLimiter::new();
    let _sweeper = limiter.spawn_sweeper(Duration::from_secs(config.rate_limit.sweep_interval_secs.max(1)));
    let api_limit = RateLimitConfig::new(
        config.rate_limit.api_requests_per_minute,
        Duration::from_secs(60),
    );

    let state = AppState::new(
        pool,
        &config,
        build_mailer(&config),
        ModerationGate::from_config(&config.moderation),
        storage,
        limiter.clone(),
    );
    let _publisher =
        start_scheduled_post_publisher(state.posts.clone(), config.cron.scheduler_interval_secs);

    let verifier = Arc::new(JwtVerifier::new(
        &config.auth.jwt_secret,
        config.auth.jwt_audience.as_deref(),
    ));
    let state = web::Data::new(state);
    let allowed_origins = config.cors.allowed_origins.clone();

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    HttpServer::new(move || {
        let verifier = verifier.clone();
        let limiter = limiter.clone();
        App::new()
            .app_data(state.clone())
            .wrap(build_cors(&allowed_origins))
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(move |cfg| configure_routes(cfg, verifier, limiter, api_limit))
    })
    .workers(config.app.workers.max(1))
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await
    .context("HTTP server terminated with an error")
}
