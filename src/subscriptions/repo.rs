use sqlx::PgConnection;
use uuid::Uuid;

use super::repo_types::{FollowedRow, PreviewRow};
use crate::error::{AppError, AppResult};

const FOLLOWED_COLUMNS: &str = r#"
    SELECT u.id, u.email, u.username, u.first_name, u.last_name,
           (SELECT COUNT(*) FROM recipes r WHERE r.author_id = u.id) AS recipes_count
      FROM subscriptions s
      JOIN users u ON u.id = s.followed_id
     WHERE s.follower_id = $1
"#;

pub async fn fetch_followed(
    conn: &mut PgConnection,
    follower_id: Uuid,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<FollowedRow>> {
    let rows = sqlx::query_as::<_, FollowedRow>(&format!(
        "{FOLLOWED_COLUMNS} ORDER BY u.username, u.id LIMIT $2 OFFSET $3"
    ))
    .bind(follower_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn get_followed(
    conn: &mut PgConnection,
    follower_id: Uuid,
    followed_id: Uuid,
) -> AppResult<FollowedRow> {
    sqlx::query_as::<_, FollowedRow>(&format!("{FOLLOWED_COLUMNS} AND u.id = $2"))
        .bind(follower_id)
        .bind(followed_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::not_found("not subscribed"))
}

/// Newest recipes of each author, at most `per_author` each (all when `None`).
pub async fn fetch_previews(
    conn: &mut PgConnection,
    author_ids: &[Uuid],
    per_author: Option<i64>,
) -> AppResult<Vec<PreviewRow>> {
    let rows = sqlx::query_as::<_, PreviewRow>(
        r#"
        SELECT author_id, id, name, image_key, cooking_time
          FROM (
                SELECT r.author_id, r.id, r.name, r.image_key, r.cooking_time,
                       ROW_NUMBER() OVER (
                           PARTITION BY r.author_id
                           ORDER BY r.created_at DESC, r.id
                       ) AS rn
                  FROM recipes r
                 WHERE r.author_id = ANY($1)
               ) ranked
         WHERE $2::BIGINT IS NULL OR rn <= $2
         ORDER BY author_id, rn
        "#,
    )
    .bind(author_ids)
    .bind(per_author)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
