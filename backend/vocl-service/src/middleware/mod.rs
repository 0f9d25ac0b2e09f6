/// HTTP middleware for vocl-service
///
/// Bearer JWT authentication and the role checks used by handlers. Rate
/// limiting lives in the shared `actix-middleware` crate.
pub mod permissions;

pub use permissions::*;

use actix_middleware::RateLimitIdentity;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;

/// Extracted user identifier stored in request extensions after auth.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

/// Claims issued by the hosted auth provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// HS256 verification keyed by the provider's shared secret
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify a token and return the profile id in `sub`
    pub fn verify(&self, token: &str) -> Result<Uuid, AppError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user ID".into()))
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Actix middleware that validates a Bearer token.
///
/// On success the caller's id is stored as [`UserId`] and as the
/// [`RateLimitIdentity`] so per-user rate limits apply downstream.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    verifier: Arc<JwtVerifier>,
}

impl JwtAuthMiddleware {
    pub fn new(verifier: Arc<JwtVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    verifier: Arc<JwtVerifier>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let verifier = self.verifier.clone();

        Box::pin(async move {
            let token = bearer_token(req.request())
                .ok_or_else(|| AppError::Unauthorized("Missing bearer token".into()))?;

            let user_id = verifier.verify(token)?;

            req.extensions_mut().insert(UserId(user_id));
            req.extensions_mut()
                .insert(RateLimitIdentity(user_id.to_string()));

            service.call(req).await
        })
    }
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .copied()
                .ok_or_else(|| AppError::Unauthorized("You must be logged in".into()).into()),
        )
    }
}

/// Check `Authorization: Bearer <secret>` for cron callers.
///
/// With no secret configured the endpoint is closed.
pub fn verify_cron_secret(req: &HttpRequest, secret: Option<&str>) -> Result<(), AppError> {
    let expected = secret.ok_or_else(|| AppError::Unauthorized("Cron is not configured".into()))?;
    match bearer_token(req) {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err(AppError::Unauthorized("Invalid cron secret".into())),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
