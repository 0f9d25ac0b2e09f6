use crate::models::Profile;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id, username, display_name, bio, avatar_url, header_url, email, \
     email_notifications, role, is_banned, created_at";

/// Find a profile by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    let sql = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
    sqlx::query_as::<_, Profile>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Find a profile by its (lowercase) username
pub async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<Profile>, sqlx::Error> {
    let sql = format!("SELECT {} FROM profiles WHERE username = $1", PROFILE_COLUMNS);
    sqlx::query_as::<_, Profile>(&sql)
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Resolve many usernames in one round trip; unknown names are skipped
pub async fn find_by_usernames(
    pool: &PgPool,
    usernames: &[String],
) -> Result<Vec<Profile>, sqlx::Error> {
    if usernames.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {} FROM profiles WHERE username = ANY($1) AND is_banned = FALSE",
        PROFILE_COLUMNS
    );
    sqlx::query_as::<_, Profile>(&sql)
        .bind(usernames)
        .fetch_all(pool)
        .await
}

/// Whether `username` belongs to someone other than `exclude`
pub async fn username_taken(
    pool: &PgPool,
    username: &str,
    exclude: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM profiles
            WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(username)
    .bind(exclude)
    .fetch_one(pool)
    .await
}

/// Validated profile changes; `None` leaves a column untouched and an empty
/// image URL clears it
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub header_url: Option<String>,
    pub email_notifications: Option<bool>,
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    changes: &ProfileChanges,
) -> Result<Profile, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE profiles SET
            username = COALESCE($2, username),
            display_name = COALESCE($3, display_name),
            bio = COALESCE($4, bio),
            avatar_url = CASE WHEN $5::text IS NULL THEN avatar_url ELSE NULLIF($5, '') END,
            header_url = CASE WHEN $6::text IS NULL THEN header_url ELSE NULLIF($6, '') END,
            email_notifications = COALESCE($7, email_notifications)
        WHERE id = $1
        RETURNING {}
        "#,
        PROFILE_COLUMNS
    );
    sqlx::query_as::<_, Profile>(&sql)
        .bind(id)
        .bind(&changes.username)
        .bind(&changes.display_name)
        .bind(&changes.bio)
        .bind(&changes.avatar_url)
        .bind(&changes.header_url)
        .bind(changes.email_notifications)
        .fetch_one(pool)
        .await
}

pub async fn set_role(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    level: i16,
) -> Result<Profile, sqlx::Error> {
    let sql = format!(
        "UPDATE profiles SET role = $2 WHERE id = $1 RETURNING {}",
        PROFILE_COLUMNS
    );
    sqlx::query_as::<_, Profile>(&sql)
        .bind(id)
        .bind(level)
        .fetch_one(executor)
        .await
}

pub async fn set_banned(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    banned: bool,
) -> Result<Profile, sqlx::Error> {
    let sql = format!(
        "UPDATE profiles SET is_banned = $2 WHERE id = $1 RETURNING {}",
        PROFILE_COLUMNS
    );
    sqlx::query_as::<_, Profile>(&sql)
        .bind(id)
        .bind(banned)
        .fetch_one(executor)
        .await
}

/// Follower, following and post counts plus whether `viewer` follows `id`
pub async fn profile_counts(
    pool: &PgPool,
    id: Uuid,
    viewer: Option<Uuid>,
) -> Result<(i64, i64, i64, bool), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64, i64, bool)>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM follows WHERE followee_id = $1),
            (SELECT COUNT(*) FROM follows WHERE follower_id = $1),
            (SELECT COUNT(*) FROM posts
                WHERE author_id = $1 AND status = 'published' AND deleted_at IS NULL),
            EXISTS(SELECT 1 FROM follows WHERE follower_id = $2 AND followee_id = $1)
        "#,
    )
    .bind(id)
    .bind(viewer)
    .fetch_one(pool)
    .await
}
