/// Configuration management for the vocl service
///
/// Everything is read from environment variables. Optional integrations
/// (moderation, email, music search, GIF search, object storage) are switched
/// off when their credentials are absent.
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitSettings,
    pub moderation: ModerationConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub music: MusicConfig,
    pub gifs: GifConfig,
    pub cron: CronConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    /// Public web app URL, used for links in emails
    pub frontend_url: String,
    pub workers: usize,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Bearer token verification for the hosted auth provider
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret shared with the auth provider
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    /// Expected `aud` claim, if any
    pub jwt_audience: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_audience", &self.jwt_audience)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Requests per minute per caller across the whole API
    pub api_requests_per_minute: u32,
    /// How often expired windows are swept
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl ModerationConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Presigned uploads are only offered when a bucket is configured
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: String,
    #[serde(skip_serializing)]
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

impl EmailConfig {
    pub fn enabled(&self) -> bool {
        self.smtp_host.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicConfig {
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub token_url: String,
    pub api_base_url: String,
}

impl MusicConfig {
    pub fn enabled(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GifConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub rating: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    #[serde(skip_serializing)]
    pub secret: Option<String>,
    /// In-process scheduled-post publishing interval; 0 disables the job
    pub scheduler_interval_secs: u64,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(val) => val
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        None => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = env_or("APP_ENV", "development");
        let production = app_env.eq_ignore_ascii_case("production");

        let cors = {
            let allowed_origins = match env_opt("CORS_ALLOWED_ORIGINS") {
                Some(value) => value,
                None if production => {
                    return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                }
                None => "http://localhost:3000".to_string(),
            };

            if production && allowed_origins.trim() == "*" {
                return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
            }

            CorsConfig { allowed_origins }
        };

        let auth = {
            let jwt_secret = match env_opt("JWT_SECRET") {
                Some(secret) => secret,
                None if production => return Err("JWT_SECRET must be set in production".to_string()),
                None => "dev-only-jwt-secret".to_string(),
            };
            AuthConfig {
                jwt_secret,
                jwt_audience: env_opt("JWT_AUDIENCE"),
            }
        };

        let cron = {
            let secret = env_opt("CRON_SECRET");
            if production && secret.is_none() {
                return Err("CRON_SECRET must be set in production".to_string());
            }
            CronConfig {
                secret,
                scheduler_interval_secs: parse_env_or_default("SCHEDULER_INTERVAL_SECS", 0)?,
            }
        };

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: env_or("VOCL_SERVICE_HOST", "0.0.0.0"),
                port: parse_env_or_default("VOCL_SERVICE_PORT", 8080)?,
                frontend_url: env_or("FRONTEND_URL", "http://localhost:3000"),
                workers: parse_env_or_default("HTTP_WORKERS", 4)?,
            },
            cors,
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "postgresql://localhost/vocl"),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            auth,
            rate_limit: RateLimitSettings {
                api_requests_per_minute: parse_env_or_default("RATE_LIMIT_API_PER_MINUTE", 100)?,
                sweep_interval_secs: parse_env_or_default("RATE_LIMIT_SWEEP_INTERVAL_SECS", 60)?,
            },
            moderation: ModerationConfig {
                endpoint: env_or("MODERATION_API_URL", "https://api.openai.com/v1/moderations"),
                api_key: env_opt("MODERATION_API_KEY"),
                timeout_ms: parse_env_or_default("MODERATION_TIMEOUT_MS", 5_000)?,
            },
            storage: StorageConfig {
                enabled: env_opt("S3_BUCKET").is_some(),
            },
            email: EmailConfig {
                smtp_host: env_opt("SMTP_HOST"),
                smtp_port: parse_env_or_default("SMTP_PORT", 587)?,
                smtp_username: env_or("SMTP_USERNAME", ""),
                smtp_password: env_or("SMTP_PASSWORD", ""),
                from_email: env_or("FROM_EMAIL", "notifications@bevocl.app"),
                from_name: env_or("FROM_NAME", "be.vocl"),
            },
            music: MusicConfig {
                client_id: env_opt("SPOTIFY_CLIENT_ID"),
                client_secret: env_opt("SPOTIFY_CLIENT_SECRET"),
                token_url: env_or("SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token"),
                api_base_url: env_or("SPOTIFY_API_BASE_URL", "https://api.spotify.com/v1"),
            },
            gifs: GifConfig {
                api_key: env_opt("GIPHY_API_KEY"),
                api_base_url: env_or("GIPHY_API_BASE_URL", "https://api.giphy.com/v1"),
                rating: env_or("GIPHY_RATING", "pg-13"),
            },
            cron,
        })
    }

    /// Log which optional integrations are active
    pub fn log_integrations(&self) {
        tracing::info!(
            moderation = self.moderation.enabled(),
            email = self.email.enabled(),
            storage = self.storage.enabled,
            music = self.music.enabled(),
            gifs = self.gifs.api_key.is_some(),
            "Integration status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: &[&str] = &[
        "APP_ENV",
        "CORS_ALLOWED_ORIGINS",
        "JWT_SECRET",
        "CRON_SECRET",
        "VOCL_SERVICE_PORT",
        "SMTP_HOST",
        "MODERATION_API_KEY",
        "SPOTIFY_CLIENT_ID",
        "SPOTIFY_CLIENT_SECRET",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_development_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();

        assert!(!config.app.is_production());
        assert_eq!(config.app.port, 8080);
        assert_eq!(config.cors.allowed_origins, "http://localhost:3000");
        assert!(!config.moderation.enabled());
        assert!(!config.email.enabled());
        assert!(!config.music.enabled());
        assert_eq!(config.cron.scheduler_interval_secs, 0);
    }

    #[test]
    #[serial_test::serial]
    fn test_production_requires_secrets() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://bevocl.app");

        let err = Config::from_env().unwrap_err();
        assert!(err.contains("JWT_SECRET"));

        std::env::set_var("JWT_SECRET", "s3cret");
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("CRON_SECRET"));

        std::env::set_var("CRON_SECRET", "cron");
        assert!(Config::from_env().unwrap().app.is_production());
        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_production_rejects_wildcard_cors() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "*");

        let err = Config::from_env().unwrap_err();
        assert!(err.contains("cannot be '*'"));
        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_number_is_reported() {
        clear_env();
        std::env::set_var("VOCL_SERVICE_PORT", "eighty");

        let err = Config::from_env().unwrap_err();
        assert!(err.contains("VOCL_SERVICE_PORT"));
        clear_env();
    }

    #[test]
    fn test_auth_debug_redacts_secret() {
        let auth = AuthConfig {
            jwt_secret: "super-secret".to_string(),
            jwt_audience: None,
        };
        assert!(!format!("{:?}", auth).contains("super-secret"));
    }
}
