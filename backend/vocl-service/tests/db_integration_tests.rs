//! Service flows against a real Postgres
//!
//! Environment variables:
//! - TEST_DATABASE_URL: PostgreSQL connection string. When unset every test
//!   here returns early, so `cargo test` stays green without a database.
//!
//! Migrations are applied on connect; every test seeds its own profiles.

use actix_middleware::RateLimiter;
use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use vocl_service::jobs::scheduled_posts::run_once;
use vocl_service::models::{
    CreateCommentRequest, CreatePostRequest, CreateReportRequest, FeedQuery, ReblogRequest,
    ReportTarget, ResolveAction, ResolveReportRequest,
};
use vocl_service::services::{ModerationGate, NoopMailer};
use vocl_service::{AppError, AppState, Config};

async fn setup() -> Option<(PgPool, AppState)> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping database test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");

    std::env::remove_var("APP_ENV");
    let config = Config::from_env().expect("development config");
    let state = AppState::new(
        pool.clone(),
        &config,
        Arc::new(NoopMailer),
        ModerationGate::disabled(),
        None,
        RateLimiter::new(),
    );
    Some((pool, state))
}

async fn seed_profile(pool: &PgPool, role: i16) -> (Uuid, String) {
    let id = Uuid::new_v4();
    let username = format!("u{}", &id.simple().to_string()[..12]);
    sqlx::query("INSERT INTO profiles (id, username, role) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(&username)
        .bind(role)
        .execute(pool)
        .await
        .expect("seed profile");
    (id, username)
}

fn report_of(target_type: ReportTarget, target_id: Uuid) -> CreateReportRequest {
    CreateReportRequest {
        target_type,
        target_id,
        reason: "abuse".into(),
        details: None,
    }
}

fn page(cursor: Option<(chrono::DateTime<Utc>, Uuid)>, limit: i64) -> FeedQuery {
    FeedQuery {
        cursor: cursor.map(|(at, _)| at),
        cursor_id: cursor.map(|(_, id)| id),
        limit: Some(limit),
    }
}

fn text_post(body: &str) -> CreatePostRequest {
    CreatePostRequest {
        kind: "text".into(),
        body: Some(body.into()),
        tags: vec!["Test".into()],
        ..Default::default()
    }
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_post_like_comment_reblog_flow() {
    let Some((_pool, state)) = setup().await else { return };
    let (author, _) = seed_profile(&state.pool, 0).await;
    let (fan, _) = seed_profile(&state.pool, 0).await;

    let item = state
        .posts
        .create_post(author, &text_post("hello #world"))
        .await
        .unwrap();
    assert_eq!(item.post.status, "published");
    assert_eq!(item.tags, vec!["test"]);

    let like = state.engagement.toggle_like(fan, item.post.id).await.unwrap();
    assert!(like.liked);
    assert_eq!(like.like_count, 1);

    let unlike = state.engagement.toggle_like(fan, item.post.id).await.unwrap();
    assert!(!unlike.liked);
    assert_eq!(unlike.like_count, 0);

    state
        .engagement
        .add_comment(fan, item.post.id, &CreateCommentRequest { body: "nice".into() })
        .await
        .unwrap();

    let reblog = state
        .engagement
        .reblog(fan, item.post.id, &ReblogRequest::default())
        .await
        .unwrap();
    assert_eq!(reblog.reblog_of, Some(item.post.id));

    // Reblogging the reblog targets the original, which is already reblogged
    let err = state
        .engagement
        .reblog(fan, reblog.id, &ReblogRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let own = state
        .engagement
        .reblog(author, item.post.id, &ReblogRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(own, AppError::BadRequest(_)));

    let view = state.posts.get_post(item.post.id, Some(fan)).await.unwrap();
    assert_eq!(view.stats.comment_count, 1);
    assert_eq!(view.stats.reblog_count, 1);
    assert!(view.stats.viewer_reblogged);

    // like + comment + reblog
    assert!(state.notifications.unread_count(author).await.unwrap() >= 3);
    state.notifications.mark_all_read(author).await.unwrap();
    assert_eq!(state.notifications.unread_count(author).await.unwrap(), 0);
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_scheduled_post_hidden_until_published() {
    let Some((_pool, state)) = setup().await else { return };
    let (author, _) = seed_profile(&state.pool, 0).await;
    let (reader, _) = seed_profile(&state.pool, 0).await;

    let req = CreatePostRequest {
        scheduled_for: Some(Utc::now() + Duration::hours(1)),
        ..text_post("later")
    };
    let item = state.posts.create_post(author, &req).await.unwrap();
    assert_eq!(item.post.status, "scheduled");

    let hidden = state.posts.get_post(item.post.id, Some(reader)).await;
    assert!(matches!(hidden, Err(AppError::NotFound(_))));
    assert!(state.posts.get_post(item.post.id, Some(author)).await.is_ok());

    let published = state
        .posts
        .publish_due_scheduled(Utc::now() + Duration::hours(2))
        .await
        .unwrap();
    assert!(published.contains(&item.post.id));

    let visible = state.posts.get_post(item.post.id, Some(reader)).await.unwrap();
    assert_eq!(visible.post.status, "published");
    assert!(visible.post.published_at.is_some());

    // Nothing left to publish for this post
    run_once(&state.posts).await;
    let again = state
        .posts
        .publish_due_scheduled(Utc::now() + Duration::hours(2))
        .await
        .unwrap();
    assert!(!again.contains(&item.post.id));
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_report_resolution_removes_content_and_audits() {
    let Some((pool, state)) = setup().await else { return };
    let (author, _) = seed_profile(&pool, 0).await;
    let (reporter, _) = seed_profile(&pool, 0).await;
    let (moderator, _) = seed_profile(&pool, 1).await;

    let item = state.posts.create_post(author, &text_post("spam")).await.unwrap();

    let self_report = state
        .reports
        .create_report(
            author,
            &CreateReportRequest {
                target_type: ReportTarget::Post,
                target_id: item.post.id,
                reason: "spam".into(),
                details: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(self_report, AppError::BadRequest(_)));

    let report = state
        .reports
        .create_report(
            reporter,
            &CreateReportRequest {
                target_type: ReportTarget::Post,
                target_id: item.post.id,
                reason: "spam".into(),
                details: Some("repeated links".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(report.status, "pending");

    let resolve = ResolveReportRequest {
        action: ResolveAction::RemoveContent,
        note: Some("confirmed".into()),
    };

    let forbidden = state
        .reports
        .resolve_report(reporter, report.id, &resolve)
        .await
        .unwrap_err();
    assert!(matches!(forbidden, AppError::Forbidden(_)));

    let resolved = state
        .reports
        .resolve_report(moderator, report.id, &resolve)
        .await
        .unwrap();
    assert_eq!(resolved.status, "resolved");
    assert_eq!(resolved.resolved_by, Some(moderator));

    let removed = state.posts.get_post(item.post.id, Some(reporter)).await;
    assert!(matches!(removed, Err(AppError::NotFound(_))));

    let (audits,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM audit_logs WHERE actor_id = $1 AND action = 'report.resolve'",
    )
    .bind(moderator)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(audits, 1);
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_follow_rules() {
    let Some((pool, state)) = setup().await else { return };
    let (alice, alice_name) = seed_profile(&pool, 0).await;
    let (bob, bob_name) = seed_profile(&pool, 0).await;

    let err = state.engagement.follow(alice, &alice_name).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    assert!(state.engagement.follow(alice, &bob_name).await.unwrap().following);
    // Following twice is idempotent
    assert!(state.engagement.follow(alice, &bob_name).await.unwrap().following);
    assert!(state.notifications.unread_count(bob).await.unwrap() >= 1);

    assert!(!state.engagement.unfollow(alice, &bob_name).await.unwrap().following);
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_ban_from_report_after_author_deletes_post() {
    let Some((pool, state)) = setup().await else { return };
    let (author, _) = seed_profile(&pool, 0).await;
    let (reporter, _) = seed_profile(&pool, 0).await;
    let (moderator, _) = seed_profile(&pool, 1).await;

    let item = state.posts.create_post(author, &text_post("abuse")).await.unwrap();
    let report = state
        .reports
        .create_report(reporter, &report_of(ReportTarget::Post, item.post.id))
        .await
        .unwrap();

    // Author removes the evidence before a moderator gets to it
    state.posts.delete_post(author, item.post.id).await.unwrap();

    let resolved = state
        .reports
        .resolve_report(
            moderator,
            report.id,
            &ResolveReportRequest {
                action: ResolveAction::BanUser,
                note: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(resolved.status, "resolved");

    let (banned,): (bool,) = sqlx::query_as("SELECT is_banned FROM profiles WHERE id = $1")
        .bind(author)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(banned);

    // New reports still need visible content
    let err = state
        .reports
        .create_report(reporter, &report_of(ReportTarget::Post, item.post.id))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_feed_pages_through_equal_timestamps() {
    let Some((pool, state)) = setup().await else { return };
    let (author, username) = seed_profile(&pool, 0).await;

    let mut created = Vec::new();
    for i in 0..3 {
        let item = state
            .posts
            .create_post(author, &text_post(&format!("same minute {}", i)))
            .await
            .unwrap();
        created.push(item.post.id);
    }
    let minute = Utc::now() - Duration::minutes(5);
    sqlx::query("UPDATE posts SET published_at = $2 WHERE author_id = $1")
        .bind(author)
        .bind(minute)
        .execute(&pool)
        .await
        .unwrap();

    let first = state.posts.user_posts(&username, None, &page(None, 2)).await.unwrap();
    assert_eq!(first.items.len(), 2);
    let cursor = first.next_cursor.zip(first.next_cursor_id);
    assert!(cursor.is_some());

    let second = state.posts.user_posts(&username, None, &page(cursor, 2)).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert!(second.next_cursor.is_none());

    let mut served: Vec<Uuid> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|i| i.post.id)
        .collect();
    served.sort();
    created.sort();
    assert_eq!(served, created);
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_banned_author_disappears_from_feeds() {
    let Some((pool, state)) = setup().await else { return };
    let (author, author_name) = seed_profile(&pool, 0).await;
    let (reader, _) = seed_profile(&pool, 0).await;

    state.engagement.follow(reader, &author_name).await.unwrap();
    let item = state.posts.create_post(author, &text_post("visible")).await.unwrap();

    let feed = state.posts.feed(reader, &page(None, 50)).await.unwrap();
    assert!(feed.items.iter().any(|i| i.post.id == item.post.id));

    sqlx::query("UPDATE profiles SET is_banned = TRUE WHERE id = $1")
        .bind(author)
        .execute(&pool)
        .await
        .unwrap();

    let feed = state.posts.feed(reader, &page(None, 50)).await.unwrap();
    assert!(feed.items.iter().all(|i| i.post.id != item.post.id));
    let posts = state.posts.user_posts(&author_name, Some(reader), &page(None, 50)).await.unwrap();
    assert!(posts.items.is_empty());
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_concurrent_likes_notify_once() {
    let Some((pool, state)) = setup().await else { return };
    let (author, _) = seed_profile(&pool, 0).await;
    let (fan, _) = seed_profile(&pool, 0).await;

    let item = state.posts.create_post(author, &text_post("like me")).await.unwrap();
    let (a, b) = tokio::join!(
        state.engagement.toggle_like(fan, item.post.id),
        state.engagement.toggle_like(fan, item.post.id),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a.like_count <= 1 && b.like_count <= 1);

    let (likes,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND kind = 'like'",
    )
    .bind(author)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(likes <= 1);
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_moderator_post_delete_is_audited() {
    let Some((pool, state)) = setup().await else { return };
    let (author, _) = seed_profile(&pool, 0).await;
    let (moderator, _) = seed_profile(&pool, 1).await;

    let own = state.posts.create_post(author, &text_post("mine")).await.unwrap();
    state.posts.delete_post(author, own.post.id).await.unwrap();

    let other = state.posts.create_post(author, &text_post("rule breaking")).await.unwrap();
    state.posts.delete_post(moderator, other.post.id).await.unwrap();

    let (own_audits,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM audit_logs WHERE target_id = $1")
            .bind(own.post.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(own_audits, 0);

    let (mod_audits,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM audit_logs WHERE target_id = $1 AND action = 'post.delete'",
    )
    .bind(other.post.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(mod_audits, 1);
}

#[actix_rt::test]
#[serial_test::serial]
async fn test_rejected_reports_do_not_spend_quota() {
    let Some((pool, state)) = setup().await else { return };
    let (author, _) = seed_profile(&pool, 0).await;
    let (other, _) = seed_profile(&pool, 0).await;

    let own = state.posts.create_post(author, &text_post("mine")).await.unwrap();
    // More self-reports than the hourly report budget
    for _ in 0..6 {
        let err = state
            .reports
            .create_report(author, &report_of(ReportTarget::Post, own.post.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    let theirs = state.posts.create_post(other, &text_post("theirs")).await.unwrap();
    let report = state
        .reports
        .create_report(author, &report_of(ReportTarget::Post, theirs.post.id))
        .await
        .unwrap();
    assert_eq!(report.status, "pending");
}
