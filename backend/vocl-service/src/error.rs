/// Error types for the vocl service
///
/// Errors are converted to JSON HTTP responses. In production the message is
/// sanitized so database and upstream details never reach the client.
use actix_web::{
    error::ResponseError,
    http::{header::RETRY_AFTER, StatusCode},
    HttpResponse,
};
use error_types::ErrorResponse;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

static PRODUCTION_MODE: AtomicBool = AtomicBool::new(false);

/// Toggle sanitized error messages for every response built by this process
pub fn set_production_mode(enabled: bool) {
    PRODUCTION_MODE.store(enabled, Ordering::Relaxed);
}

pub fn production_mode() -> bool {
    PRODUCTION_MODE.load(Ordering::Relaxed)
}

/// Result type for vocl-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds.")]
    RateLimited { retry_after_secs: u64 },

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse::sanitized(&self.to_string(), status.as_u16(), production_mode());
        let mut builder = HttpResponse::build(status);
        if let AppError::RateLimited { retry_after_secs } = self {
            builder.insert_header((RETRY_AFTER, retry_after_secs.to_string()));
        }
        builder.json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Not found".to_string()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                AppError::Conflict(format!("Already exists: {}", db.message()))
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalService(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<s3_utils::S3Error> for AppError {
    fn from(err: s3_utils::S3Error) -> Self {
        AppError::ExternalService(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::RateLimited { retry_after_secs: 5 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::ExternalService("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn test_rate_limited_sets_retry_after() {
        let resp = AppError::RateLimited { retry_after_secs: 42 }.error_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers().get(RETRY_AFTER).unwrap(), "42");
    }

    #[actix_web::test]
    #[serial_test::serial]
    async fn test_production_hides_database_details() {
        set_production_mode(true);
        let resp = AppError::Database("relation \"posts\" does not exist".into()).error_response();
        set_production_mode(false);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], error_types::GENERIC_ERROR_MESSAGE);
        assert_eq!(json["status"], 500);
    }

    #[actix_web::test]
    #[serial_test::serial]
    async fn test_production_keeps_safe_messages() {
        set_production_mode(true);
        let resp = AppError::Forbidden("Moderator role required".into()).error_response();
        set_production_mode(false);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Forbidden: Moderator role required");
    }
}
