use std::collections::HashSet;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::repo_types::{Ingredient, Tag, Unit};
use crate::error::{AppError, AppResult};

const INGREDIENT_COLUMNS: &str = r#"
    SELECT i.id, i.name, i.unit_id, u.name AS measurement_unit
      FROM ingredients i
      JOIN units u ON u.id = i.unit_id
"#;

pub async fn get_unit(db: &PgPool, id: Uuid) -> AppResult<Unit> {
    sqlx::query_as::<_, Unit>("SELECT id, name, slug FROM units WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("unit not found"))
}

pub async fn list_units(db: &PgPool) -> AppResult<Vec<Unit>> {
    let rows = sqlx::query_as::<_, Unit>("SELECT id, name, slug FROM units ORDER BY name")
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn insert_unit(conn: &mut PgConnection, name: &str, slug: &str) -> AppResult<Unit> {
    let unit = sqlx::query_as::<_, Unit>(
        "INSERT INTO units (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
    )
    .bind(name)
    .bind(slug)
    .fetch_one(conn)
    .await?;
    Ok(unit)
}

pub async fn get_ingredient(db: &PgPool, id: Uuid) -> AppResult<Ingredient> {
    sqlx::query_as::<_, Ingredient>(&format!("{INGREDIENT_COLUMNS} WHERE i.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("ingredient not found"))
}

pub async fn list_ingredients(db: &PgPool) -> AppResult<Vec<Ingredient>> {
    let rows = sqlx::query_as::<_, Ingredient>(&format!("{INGREDIENT_COLUMNS} ORDER BY i.name, u.name"))
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn insert_ingredient(
    conn: &mut PgConnection,
    name: &str,
    unit_id: Uuid,
) -> AppResult<Ingredient> {
    let id: (Uuid,) = sqlx::query_as(
        "INSERT INTO ingredients (name, unit_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(unit_id)
    .fetch_one(&mut *conn)
    .await?;

    let ingredient = sqlx::query_as::<_, Ingredient>(&format!("{INGREDIENT_COLUMNS} WHERE i.id = $1"))
        .bind(id.0)
        .fetch_one(&mut *conn)
        .await?;
    Ok(ingredient)
}

pub async fn get_tag(db: &PgPool, id: Uuid) -> AppResult<Tag> {
    sqlx::query_as::<_, Tag>("SELECT id, name, slug, color FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("tag not found"))
}

pub async fn list_tags(db: &PgPool) -> AppResult<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>("SELECT id, name, slug, color FROM tags ORDER BY name, color")
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn insert_tag(
    conn: &mut PgConnection,
    name: &str,
    slug: &str,
    color: &str,
) -> AppResult<Tag> {
    let tag = sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (name, slug, color)
        VALUES ($1, $2, $3)
        RETURNING id, name, slug, color
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(color)
    .fetch_one(conn)
    .await?;
    Ok(tag)
}

/// Fails with `NotFound` naming the first id missing from `table`.
async fn ensure_all_exist(
    conn: &mut PgConnection,
    table: &'static str,
    what: &'static str,
    ids: &[Uuid],
) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    // FOR KEY SHARE keeps the rows from vanishing before the caller's inserts commit.
    let found: Vec<(Uuid,)> = sqlx::query_as(&format!(
        "SELECT id FROM {table} WHERE id = ANY($1) FOR KEY SHARE"
    ))
    .bind(ids)
    .fetch_all(conn)
    .await?;
    let found: HashSet<Uuid> = found.into_iter().map(|(id,)| id).collect();
    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(AppError::NotFound(format!("{what} {missing} not found"))),
        None => Ok(()),
    }
}

/// Locks the unit against deletion for the rest of the transaction.
pub async fn ensure_unit_exists(conn: &mut PgConnection, id: Uuid) -> AppResult<()> {
    let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM units WHERE id = $1 FOR KEY SHARE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("unit not found"))
}

pub async fn ensure_ingredients_exist(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<()> {
    ensure_all_exist(conn, "ingredients", "ingredient", ids).await
}

pub async fn ensure_tags_exist(conn: &mut PgConnection, ids: &[Uuid]) -> AppResult<()> {
    ensure_all_exist(conn, "tags", "tag", ids).await
}
