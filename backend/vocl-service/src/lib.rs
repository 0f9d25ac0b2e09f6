/// be.vocl backend library
///
/// REST API for the be.vocl social platform: posts and feeds, engagement,
/// notifications, profiles, moderation and the admin console.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route table
/// - `services`: business logic and third-party integrations
/// - `db`: PostgreSQL repositories
/// - `models`: database entities and request/response types
/// - `middleware`: JWT authentication and role checks
/// - `jobs`: in-process background jobs
/// - `utils`: text validation, mentions, usernames, video embeds
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
