//! In-memory fixed-window rate limiting.
//!
//! Each key owns a counter and the instant its window closes. The first call
//! in a window opens it; calls are admitted until `max_requests` is reached
//! and rejected afterwards until the window closes, at which point the
//! counter starts over. Expired windows are dropped by a periodic sweep.
//!
//! Counters live in process memory, so limits are per instance. Running more
//! than one replica multiplies the effective limit; a shared store would be
//! required for a global limit.
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue, RETRY_AFTER},
    Error, HttpMessage, HttpResponse,
};
use dashmap::DashMap;
use error_types::ErrorResponse;
use futures::future::LocalBoxFuture;
use prometheus::IntCounterVec;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

lazy_static::lazy_static! {
    pub static ref RATE_LIMIT_REJECTIONS: IntCounterVec = prometheus::register_int_counter_vec!(
        "rate_limit_rejections_total",
        "Requests rejected by the in-memory rate limiter",
        &["bucket"]
    )
    .expect("rate_limit_rejections_total metric registration");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::api()
    }
}

impl RateLimitConfig {
    pub const fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// General API traffic: 100 requests per minute
    pub const fn api() -> Self {
        Self::new(100, Duration::from_secs(60))
    }

    pub const fn post_create() -> Self {
        Self::new(10, Duration::from_secs(60))
    }

    pub const fn comment_create() -> Self {
        Self::new(20, Duration::from_secs(60))
    }

    pub const fn like() -> Self {
        Self::new(60, Duration::from_secs(60))
    }

    /// Reports are expensive for moderators: 5 per hour
    pub const fn report() -> Self {
        Self::new(5, Duration::from_secs(3600))
    }

    pub const fn upload() -> Self {
        Self::new(20, Duration::from_secs(3600))
    }

    pub const fn auth_strict() -> Self {
        Self::new(5, Duration::from_secs(60))
    }
}

/// Outcome of a single rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes
    pub reset_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    count: u32,
    reset_at: Instant,
}

/// Shared fixed-window counter store. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    windows: Arc<DashMap<String, WindowEntry>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitDecision {
        self.check_at(key, config, Instant::now())
    }

    /// Count one call for `key` at `now`.
    ///
    /// Rejected calls do not extend the window or bump the counter.
    pub fn check_at(&self, key: &str, config: &RateLimitConfig, now: Instant) -> RateLimitDecision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                reset_at: now + config.window,
            });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + config.window;
        }

        let reset_after = entry.reset_at.saturating_duration_since(now);

        if entry.count >= config.max_requests {
            return RateLimitDecision {
                allowed: false,
                limit: config.max_requests,
                remaining: 0,
                reset_after,
            };
        }

        entry.count += 1;

        RateLimitDecision {
            allowed: true,
            limit: config.max_requests,
            remaining: config.max_requests.saturating_sub(entry.count),
            reset_after,
        }
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Drop every window that has closed by `now`, returning how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, entry| entry.reset_at > now);
        before.saturating_sub(self.windows.len())
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Run [`RateLimiter::sweep`] every `interval` on the current tokio runtime.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.len(), "Swept expired rate-limit windows");
                }
            }
        })
    }
}

/// Caller identity used for rate-limit keys.
///
/// Authentication middleware inserts this into request extensions; requests
/// without it are keyed by client IP.
#[derive(Debug, Clone)]
pub struct RateLimitIdentity(pub String);

/// Actix middleware applying one [`RateLimitConfig`] to every request it wraps
pub struct RateLimitMiddleware {
    limiter: RateLimiter,
    config: RateLimitConfig,
    bucket: &'static str,
}

impl RateLimitMiddleware {
    pub fn new(limiter: RateLimiter, config: RateLimitConfig, bucket: &'static str) -> Self {
        Self {
            limiter,
            config,
            bucket,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            config: self.config,
            bucket: self.bucket,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    limiter: RateLimiter,
    config: RateLimitConfig,
    bucket: &'static str,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let key = rate_limit_key(self.bucket, &req);
        let decision = self.limiter.check(&key, &self.config);
        let bucket = self.bucket;

        Box::pin(async move {
            if !decision.allowed {
                RATE_LIMIT_REJECTIONS.with_label_values(&[bucket]).inc();
                tracing::warn!(key = %key, "Rate limit exceeded");

                let retry_after = decision.reset_after.as_secs().max(1);
                let response = HttpResponse::TooManyRequests()
                    .insert_header((RETRY_AFTER, retry_after.to_string()))
                    .json(ErrorResponse::new("Rate limit exceeded. Please slow down.", 429));
                return Ok(req.into_response(response).map_into_right_body());
            }

            let mut res = service.call(req).await?;
            let headers = res.headers_mut();
            headers.insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(decision.limit),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(decision.remaining),
            );
            Ok(res.map_into_left_body())
        })
    }
}

fn rate_limit_key(bucket: &str, req: &ServiceRequest) -> String {
    if let Some(identity) = req.extensions().get::<RateLimitIdentity>() {
        return format!("{}:user:{}", bucket, identity.0);
    }

    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();
    format!("{}:ip:{}", bucket, ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max: u32, secs: u64) -> RateLimitConfig {
        RateLimitConfig::new(max, Duration::from_secs(secs))
    }

    #[test]
    fn test_rejects_call_past_limit_within_window() {
        let limiter = RateLimiter::new();
        let cfg = config(3, 60);
        let now = Instant::now();

        for i in 0..3 {
            let decision = limiter.check_at("post_create:user:1", &cfg, now);
            assert!(decision.allowed, "call {} should be allowed", i + 1);
        }

        let fourth = limiter.check_at("post_create:user:1", &cfg, now + Duration::from_secs(10));
        assert!(!fourth.allowed);
        assert_eq!(fourth.remaining, 0);
        assert_eq!(fourth.reset_after, Duration::from_secs(50));
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let limiter = RateLimiter::new();
        let cfg = config(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("k", &cfg, now).allowed);
        assert!(!limiter.check_at("k", &cfg, now + Duration::from_secs(59)).allowed);

        let after = limiter.check_at("k", &cfg, now + Duration::from_secs(60));
        assert!(after.allowed);
        assert_eq!(after.remaining, 0);
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = RateLimiter::new();
        let cfg = config(3, 60);
        let now = Instant::now();

        assert_eq!(limiter.check_at("k", &cfg, now).remaining, 2);
        assert_eq!(limiter.check_at("k", &cfg, now).remaining, 1);
        assert_eq!(limiter.check_at("k", &cfg, now).remaining, 0);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let cfg = config(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("like:user:a", &cfg, now).allowed);
        assert!(limiter.check_at("like:user:b", &cfg, now).allowed);
        assert!(!limiter.check_at("like:user:a", &cfg, now).allowed);
    }

    #[test]
    fn test_rejection_does_not_extend_window() {
        let limiter = RateLimiter::new();
        let cfg = config(1, 10);
        let now = Instant::now();

        limiter.check_at("k", &cfg, now);
        for s in 1..10 {
            assert!(!limiter.check_at("k", &cfg, now + Duration::from_secs(s)).allowed);
        }
        assert!(limiter.check_at("k", &cfg, now + Duration::from_secs(10)).allowed);
    }

    #[test]
    fn test_zero_limit_always_rejects() {
        let limiter = RateLimiter::new();
        let decision = limiter.check_at("k", &config(0, 60), Instant::now());
        assert!(!decision.allowed);
    }

    #[test]
    fn test_sweep_removes_only_expired_windows() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        limiter.check_at("short", &config(5, 1), now);
        limiter.check_at("long", &config(5, 3600), now);
        assert_eq!(limiter.len(), 2);

        let removed = limiter.sweep_at(now + Duration::from_secs(2));
        assert_eq!(removed, 1);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let limiter = RateLimiter::new();
        let other = limiter.clone();
        let cfg = config(1, 60);
        let now = Instant::now();

        assert!(limiter.check_at("k", &cfg, now).allowed);
        assert!(!other.check_at("k", &cfg, now).allowed);
    }

    #[test]
    fn test_presets() {
        assert_eq!(RateLimitConfig::api().max_requests, 100);
        assert_eq!(RateLimitConfig::report().window, Duration::from_secs(3600));
        assert_eq!(RateLimitConfig::post_create().max_requests, 10);
        assert_eq!(RateLimitConfig::default(), RateLimitConfig::api());
    }
}
