//! Batched engagement counters for feed pages
//!
//! One page of posts needs like, comment and reblog counts plus the viewer's
//! own like/reblog state. Each is a single grouped query over the whole page,
//! and the queries run concurrently.

use crate::models::PostStats;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

type Counts = Vec<(Uuid, i64)>;

async fn like_counts(pool: &PgPool, post_ids: &[Uuid]) -> Result<Counts, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, i64)>(
        "SELECT post_id, COUNT(*) FROM likes WHERE post_id = ANY($1) GROUP BY post_id",
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await
}

async fn comment_counts(pool: &PgPool, post_ids: &[Uuid]) -> Result<Counts, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, i64)>(
        r#"
        SELECT post_id, COUNT(*) FROM comments
        WHERE post_id = ANY($1) AND deleted_at IS NULL
        GROUP BY post_id
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await
}

async fn reblog_counts(pool: &PgPool, post_ids: &[Uuid]) -> Result<Counts, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, i64)>(
        r#"
        SELECT reblog_of, COUNT(*) FROM posts
        WHERE reblog_of = ANY($1) AND deleted_at IS NULL
        GROUP BY reblog_of
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await
}

async fn viewer_likes(
    pool: &PgPool,
    post_ids: &[Uuid],
    viewer: Option<Uuid>,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let Some(viewer) = viewer else {
        return Ok(Vec::new());
    };
    sqlx::query_scalar::<_, Uuid>(
        "SELECT post_id FROM likes WHERE user_id = $1 AND post_id = ANY($2)",
    )
    .bind(viewer)
    .bind(post_ids)
    .fetch_all(pool)
    .await
}

async fn viewer_reblogs(
    pool: &PgPool,
    post_ids: &[Uuid],
    viewer: Option<Uuid>,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let Some(viewer) = viewer else {
        return Ok(Vec::new());
    };
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT reblog_of FROM posts
        WHERE author_id = $1 AND reblog_of = ANY($2) AND deleted_at IS NULL
        "#,
    )
    .bind(viewer)
    .bind(post_ids)
    .fetch_all(pool)
    .await
}

/// Counters for every id in `post_ids`; ids without rows get zeroes
pub async fn fetch_post_stats(
    pool: &PgPool,
    post_ids: &[Uuid],
    viewer: Option<Uuid>,
) -> Result<HashMap<Uuid, PostStats>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let (likes, comments, reblogs, liked, reblogged) = tokio::try_join!(
        like_counts(pool, post_ids),
        comment_counts(pool, post_ids),
        reblog_counts(pool, post_ids),
        viewer_likes(pool, post_ids, viewer),
        viewer_reblogs(pool, post_ids, viewer),
    )?;

    Ok(merge_stats(post_ids, likes, comments, reblogs, liked, reblogged))
}

/// Fold the per-query results into one `PostStats` per requested id
pub fn merge_stats(
    post_ids: &[Uuid],
    likes: Counts,
    comments: Counts,
    reblogs: Counts,
    liked: Vec<Uuid>,
    reblogged: Vec<Uuid>,
) -> HashMap<Uuid, PostStats> {
    let mut stats: HashMap<Uuid, PostStats> = post_ids
        .iter()
        .map(|id| (*id, PostStats::default()))
        .collect();

    for (id, count) in likes {
        if let Some(s) = stats.get_mut(&id) {
            s.like_count = count;
        }
    }
    for (id, count) in comments {
        if let Some(s) = stats.get_mut(&id) {
            s.comment_count = count;
        }
    }
    for (id, count) in reblogs {
        if let Some(s) = stats.get_mut(&id) {
            s.reblog_count = count;
        }
    }

    let liked: HashSet<Uuid> = liked.into_iter().collect();
    let reblogged: HashSet<Uuid> = reblogged.into_iter().collect();
    for (id, s) in stats.iter_mut() {
        s.viewer_liked = liked.contains(id);
        s.viewer_reblogged = reblogged.contains(id);
    }

    stats
}
