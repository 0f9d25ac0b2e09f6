//! Database connection pool management
//!
//! Builds the PostgreSQL pool the vocl services share with the hosted database.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info};

/// Database connection pool configuration
#[derive(Clone)]
pub struct DbConfig {
    /// Service name used in log fields
    pub service_name: String,
    /// PostgreSQL connection URL
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Timeout for the initial `SELECT 1` verification
    pub connect_timeout_secs: u64,
    /// Timeout for acquiring a connection from the pool
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("service_name", &self.service_name)
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            service_name: String::from("unknown"),
            database_url: String::new(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 5,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl DbConfig {
    /// Create a new DbConfig from environment variables
    pub fn from_env(service_name: &str) -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable not set".to_string())?;
        let defaults = Self::default();

        Ok(Self {
            service_name: service_name.to_string(),
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout_secs),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs),
        })
    }

    /// Config for an explicit URL with default pool sizing
    pub fn for_url(service_name: &str, database_url: &str, max_connections: u32) -> Self {
        Self {
            service_name: service_name.to_string(),
            database_url: database_url.to_string(),
            max_connections,
            min_connections: Self::default().min_connections.min(max_connections),
            ..Self::default()
        }
    }

    pub fn log_config(&self) {
        info!(
            service = %self.service_name,
            max_connections = self.max_connections,
            min_connections = self.min_connections,
            acquire_timeout_secs = self.acquire_timeout_secs,
            idle_timeout_secs = self.idle_timeout_secs,
            max_lifetime_secs = self.max_lifetime_secs,
            "Database pool configuration"
        );
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections.min(self.max_connections))
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
            .test_before_acquire(true)
    }
}

/// Run `SELECT 1`, bounded by `timeout`
async fn verify(pool: &PgPool, timeout: Duration) -> Result<(), sqlx::Error> {
    match tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(pool)).await {
        Ok(result) => result.map(|_| ()),
        Err(_) => Err(sqlx::Error::PoolTimedOut),
    }
}

/// Create a PostgreSQL connection pool and verify it with `SELECT 1`
pub async fn create_pool(config: DbConfig) -> Result<PgPool, sqlx::Error> {
    debug!(service = %config.service_name, "Connecting database pool");
    let pool = config.pool_options().connect(&config.database_url).await?;

    if let Err(e) = verify(&pool, Duration::from_secs(config.connect_timeout_secs)).await {
        error!(service = %config.service_name, error = %e, "Database verification failed");
        pool.close().await;
        return Err(e);
    }

    info!(service = %config.service_name, "Database pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_overrides() {
        for key in [
            "DB_MAX_CONNECTIONS",
            "DB_MIN_CONNECTIONS",
            "DB_CONNECT_TIMEOUT_SECS",
            "DB_ACQUIRE_TIMEOUT_SECS",
            "DB_IDLE_TIMEOUT_SECS",
            "DB_MAX_LIFETIME_SECS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.acquire_timeout_secs, 10);
    }

    #[test]
    #[serial_test::serial]
    fn test_config_from_env_without_override() {
        clear_overrides();
        std::env::set_var("DATABASE_URL", "postgres://localhost/test");

        let config = DbConfig::from_env("vocl-service").unwrap();
        assert_eq!(config.service_name, "vocl-service");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.idle_timeout_secs, 600);

        std::env::remove_var("DATABASE_URL");
    }

    #[test]
    #[serial_test::serial]
    fn test_config_from_env_with_override() {
        clear_overrides();
        std::env::set_var("DATABASE_URL", "postgres://localhost/test");
        std::env::set_var("DB_MAX_CONNECTIONS", "32");
        std::env::set_var("DB_MIN_CONNECTIONS", "not-a-number");

        let config = DbConfig::from_env("vocl-service").unwrap();
        assert_eq!(config.max_connections, 32);
        assert_eq!(config.min_connections, 2);

        clear_overrides();
        std::env::remove_var("DATABASE_URL");
    }

    #[test]
    #[serial_test::serial]
    fn test_config_requires_database_url() {
        std::env::remove_var("DATABASE_URL");
        assert!(DbConfig::from_env("vocl-service").is_err());
    }

    #[test]
    fn test_for_url_keeps_min_below_max() {
        let config = DbConfig::for_url("vocl-service", "postgres://localhost/vocl", 1);
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.idle_timeout_secs, DbConfig::default().idle_timeout_secs);
    }

    #[test]
    fn test_debug_redacts_url() {
        let config = DbConfig {
            database_url: "postgres://user:hunter2@db/vocl".to_string(),
            ..DbConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
