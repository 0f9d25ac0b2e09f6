/// Shared application state handed to every handler as `web::Data<AppState>`
use actix_middleware::RateLimiter;
use s3_utils::S3Operations;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    EngagementService, GifClient, Mailer, MediaService, ModerationGate, MusicClient,
    NotificationService, PostService, ProfileService, ReportService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub posts: PostService,
    pub engagement: EngagementService,
    pub notifications: NotificationService,
    pub profiles: ProfileService,
    pub reports: ReportService,
    pub media: MediaService,
    pub music: MusicClient,
    pub gifs: GifClient,
    pub cron_secret: Option<String>,
}

impl AppState {
    /// Wire every service from its collaborators.
    ///
    /// `storage` is `None` when object storage is disabled.
    pub fn new(
        pool: PgPool,
        config: &Config,
        mailer: Arc<dyn Mailer>,
        moderation: ModerationGate,
        storage: Option<S3Operations>,
        limiter: RateLimiter,
    ) -> Self {
        let notifications =
            NotificationService::new(pool.clone(), mailer, config.app.frontend_url.clone());

        Self {
            posts: PostService::new(
                pool.clone(),
                moderation.clone(),
                notifications.clone(),
                limiter.clone(),
            ),
            engagement: EngagementService::new(
                pool.clone(),
                moderation.clone(),
                notifications.clone(),
                limiter.clone(),
            ),
            profiles: ProfileService::new(pool.clone(), moderation),
            reports: ReportService::new(pool.clone(), limiter.clone()),
            media: MediaService::new(storage, limiter),
            music: MusicClient::new(config.music.clone()),
            gifs: GifClient::new(config.gifs.clone()),
            cron_secret: config.cron.secret.clone(),
            notifications,
            pool,
        }
    }
}
