use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{LineRow, RecipeRow, RecipeShortRow, RecipeTagRow};
use crate::{
    error::{AppError, AppResult},
    users::repo_types::UserSummary,
};

/// Scalar fields of a recipe as written to the `recipes` table.
pub struct RecipeFields<'a> {
    pub name: &'a str,
    pub text: &'a str,
    pub cooking_time: i32,
    pub image_key: Option<&'a str>,
}

const RECIPE_COLUMNS: &str = r#"
    SELECT r.id, r.author_id, r.name, r.image_key, r.text, r.cooking_time, r.created_at,
           EXISTS (SELECT 1 FROM favorites f
                    WHERE f.recipe_id = r.id AND f.user_id = $1) AS is_favorited,
           EXISTS (SELECT 1 FROM cart_entries c
                    WHERE c.recipe_id = r.id AND c.user_id = $1) AS is_in_shopping_cart
      FROM recipes r
"#;

// ---- Writes ----

pub async fn insert_recipe(
    conn: &mut PgConnection,
    author_id: Uuid,
    fields: &RecipeFields<'_>,
) -> AppResult<(Uuid, OffsetDateTime)> {
    let row: (Uuid, OffsetDateTime) = sqlx::query_as(
        r#"
        INSERT INTO recipes (author_id, name, text, cooking_time, image_key)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, created_at
        "#,
    )
    .bind(author_id)
    .bind(fields.name)
    .bind(fields.text)
    .bind(fields.cooking_time)
    .bind(fields.image_key)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Locks the author's recipe for the rest of the transaction and returns its
/// current image key.
pub async fn lock_owned(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    author_id: Uuid,
) -> AppResult<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as(
        "SELECT image_key FROM recipes WHERE id = $1 AND author_id = $2 FOR UPDATE",
    )
    .bind(recipe_id)
    .bind(author_id)
    .fetch_optional(conn)
    .await?;
    row.map(|(key,)| key)
        .ok_or_else(|| AppError::not_found("recipe not found"))
}

/// Overwrites the scalar fields given; `None` keeps the stored value.
pub async fn update_fields(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    name: Option<&str>,
    text: Option<&str>,
    cooking_time: Option<i32>,
    image_key: Option<&str>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE recipes
           SET name = COALESCE($2, name),
               text = COALESCE($3, text),
               cooking_time = COALESCE($4, cooking_time),
               image_key = COALESCE($5, image_key)
         WHERE id = $1
        "#,
    )
    .bind(recipe_id)
    .bind(name)
    .bind(text)
    .bind(cooking_time)
    .bind(image_key)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_tags(conn: &mut PgConnection, recipe_id: Uuid, tag_ids: &[Uuid]) -> AppResult<()> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, t.tag_id FROM UNNEST($2::uuid[]) AS t(tag_id)
        "#,
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(conn)
    .await?;
    Ok(())
}

/// Bulk insert of ingredient lines; `ingredient_ids` and `amounts` are parallel.
pub async fn insert_lines(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    ingredient_ids: &[Uuid],
    amounts: &[i32],
) -> AppResult<()> {
    debug_assert_eq!(ingredient_ids.len(), amounts.len());
    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, l.ingredient_id, l.amount
          FROM UNNEST($2::uuid[], $3::int4[]) AS l(ingredient_id, amount)
        "#,
    )
    .bind(recipe_id)
    .bind(ingredient_ids)
    .bind(amounts)
    .execute(conn)
    .await?;
    Ok(())
}

/// Drops every tag link and ingredient line of the recipe.
pub async fn clear_associations(conn: &mut PgConnection, recipe_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Deletes the author's recipe; returns the image key it held.
pub async fn delete_owned(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    author_id: Uuid,
) -> AppResult<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as(
        "DELETE FROM recipes WHERE id = $1 AND author_id = $2 RETURNING image_key",
    )
    .bind(recipe_id)
    .bind(author_id)
    .fetch_optional(conn)
    .await?;
    row.map(|(key,)| key)
        .ok_or_else(|| AppError::not_found("recipe not found"))
}

// ---- Queries ----

pub async fn get_short(conn: &mut PgConnection, recipe_id: Uuid) -> AppResult<RecipeShortRow> {
    sqlx::query_as::<_, RecipeShortRow>(
        "SELECT id, name, image_key, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(recipe_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found("recipe not found"))
}

pub async fn fetch_by_ids(
    conn: &mut PgConnection,
    viewer: Option<Uuid>,
    ids: &[Uuid],
) -> AppResult<Vec<RecipeRow>> {
    let rows = sqlx::query_as::<_, RecipeRow>(&format!(
        "{RECIPE_COLUMNS} WHERE r.id = ANY($2) ORDER BY r.created_at DESC"
    ))
    .bind(viewer)
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn fetch_page(
    conn: &mut PgConnection,
    viewer: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<RecipeRow>> {
    let rows = sqlx::query_as::<_, RecipeRow>(&format!(
        "{RECIPE_COLUMNS} ORDER BY r.created_at DESC, r.id LIMIT $2 OFFSET $3"
    ))
    .bind(viewer)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn fetch_lines(conn: &mut PgConnection, recipe_ids: &[Uuid]) -> AppResult<Vec<LineRow>> {
    let rows = sqlx::query_as::<_, LineRow>(
        r#"
        SELECT ri.recipe_id, ri.ingredient_id, i.name, u.name AS measurement_unit, ri.amount
          FROM recipe_ingredients ri
          JOIN ingredients i ON i.id = ri.ingredient_id
          JOIN units u ON u.id = i.unit_id
         WHERE ri.recipe_id = ANY($1)
         ORDER BY i.name
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn fetch_tags(conn: &mut PgConnection, recipe_ids: &[Uuid]) -> AppResult<Vec<RecipeTagRow>> {
    let rows = sqlx::query_as::<_, RecipeTagRow>(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.slug, t.color
          FROM recipe_tags rt
          JOIN tags t ON t.id = rt.tag_id
         WHERE rt.recipe_id = ANY($1)
         ORDER BY t.name, t.color
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn fetch_authors(
    conn: &mut PgConnection,
    viewer: Option<Uuid>,
    author_ids: &[Uuid],
) -> AppResult<Vec<UserSummary>> {
    let rows = sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
               EXISTS (
                   SELECT 1 FROM subscriptions s
                    WHERE s.follower_id = $1 AND s.followed_id = u.id
               ) AS is_subscribed
          FROM users u
         WHERE u.id = ANY($2)
        "#,
    )
    .bind(viewer)
    .bind(author_ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
