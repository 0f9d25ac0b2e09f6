use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

/// Upsert `tags` and link them to the post
pub async fn attach_tags(
    conn: &mut PgConnection,
    post_id: Uuid,
    tags: &[String],
) -> Result<(), sqlx::Error> {
    if tags.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO tags (name)
        SELECT UNNEST($1::text[])
        ON CONFLICT (name) DO NOTHING
        "#,
    )
    .bind(tags)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO post_tags (post_id, tag_id)
        SELECT $1, id FROM tags WHERE name = ANY($2)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(post_id)
    .bind(tags)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Tag names for a batch of posts, alphabetical per post
pub async fn tags_for_posts(
    pool: &PgPool,
    post_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<String>>, sqlx::Error> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, (Uuid, String)>(
        r#"
        SELECT pt.post_id, t.name
        FROM post_tags pt
        JOIN tags t ON t.id = pt.tag_id
        WHERE pt.post_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (post_id, name) in rows {
        map.entry(post_id).or_default().push(name);
    }
    Ok(map)
}
