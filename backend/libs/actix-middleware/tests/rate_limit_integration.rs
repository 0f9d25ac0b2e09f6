use actix_middleware::{RateLimitConfig, RateLimitIdentity, RateLimitMiddleware, RateLimiter};
use actix_web::dev::Service;
use actix_web::{test, web, App, HttpMessage, HttpResponse};
use std::time::Duration;

/// Simple test handler
async fn test_handler() -> HttpResponse {
    HttpResponse::Ok().body("success")
}

#[actix_web::test]
async fn test_rate_limit_exceeded() {
    let config = RateLimitConfig::new(2, Duration::from_secs(10));

    let app = test::init_service(
        App::new()
            .wrap(RateLimitMiddleware::new(RateLimiter::new(), config, "test"))
            .route("/test", web::get().to(test_handler)),
    )
    .await;

    let req = test::TestRequest::get().uri("/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert_eq!(resp.headers().get("x-ratelimit-limit").unwrap(), "2");
    assert_eq!(resp.headers().get("x-ratelimit-remaining").unwrap(), "1");

    let req = test::TestRequest::get().uri("/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    // Third request should be rate limited
    let req = test::TestRequest::get().uri("/test").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().get("retry-after").is_some());

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 429);
}

#[actix_web::test]
async fn test_identity_keys_are_separate() {
    let config = RateLimitConfig::new(1, Duration::from_secs(60));

    let app = test::init_service(
        App::new()
            .wrap(RateLimitMiddleware::new(RateLimiter::new(), config, "test"))
            .route("/test", web::get().to(test_handler)),
    )
    .await;

    for user in ["alice", "bob"] {
        let req = test::TestRequest::get().uri("/test").to_request();
        req.extensions_mut()
            .insert(RateLimitIdentity(user.to_string()));
        let resp = app.call(req).await.unwrap();
        assert!(resp.status().is_success(), "{} should pass", user);
    }

    let req = test::TestRequest::get().uri("/test").to_request();
    req.extensions_mut()
        .insert(RateLimitIdentity("alice".to_string()));
    let resp = app.call(req).await.unwrap();
    assert_eq!(resp.status(), 429);
}

#[actix_web::test]
async fn test_shared_limiter_across_scopes() {
    let limiter = RateLimiter::new();
    let config = RateLimitConfig::new(1, Duration::from_secs(60));

    let app = test::init_service(
        App::new()
            .service(
                web::scope("/a")
                    .wrap(RateLimitMiddleware::new(limiter.clone(), config, "shared"))
                    .route("", web::get().to(test_handler)),
            )
            .service(
                web::scope("/b")
                    .wrap(RateLimitMiddleware::new(limiter.clone(), config, "shared"))
                    .route("", web::get().to(test_handler)),
            ),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/a").to_request()).await;
    assert!(resp.status().is_success());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/b").to_request()).await;
    assert_eq!(resp.status(), 429);
    assert_eq!(limiter.len(), 1);
}
