use std::collections::{HashMap, HashSet};

use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{IngredientLineRead, IngredientLineWrite, Pagination, RecipePatch, RecipeRead, RecipeShort, RecipeWrite},
    repo::{self, RecipeFields},
    repo_types::{LineRow, RecipeRow, RecipeShortRow, RecipeTagRow},
};
use crate::{
    catalog::{self, repo_types::Tag},
    db::{begin_snapshot, with_retry},
    error::{AppError, AppResult},
    images::services as images,
    state::AppState,
    users::repo_types::UserSummary,
};

const MAX_NAME_LEN: usize = 200;

/// Ingredient lines split into parallel columns, ready for bulk insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLines {
    pub ingredient_ids: Vec<Uuid>,
    pub amounts: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub tag_ids: Vec<Uuid>,
    pub lines: ValidatedLines,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPatch {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub tag_ids: Vec<Uuid>,
    pub lines: ValidatedLines,
}

/// Checks the ingredient list: non-empty, no repeated ingredient, every
/// amount and the cooking time at least 1.
pub fn validate_lines(
    lines: &[IngredientLineWrite],
    cooking_time: Option<i32>,
) -> AppResult<ValidatedLines> {
    if lines.is_empty() {
        return Err(AppError::validation("ingredients required"));
    }
    let mut seen = HashSet::with_capacity(lines.len());
    if !lines.iter().all(|l| seen.insert(l.id)) {
        return Err(AppError::validation("duplicate ingredient"));
    }
    if lines.iter().any(|l| l.amount < 1) || cooking_time.is_some_and(|t| t < 1) {
        return Err(AppError::validation("invalid amount"));
    }
    Ok(ValidatedLines {
        ingredient_ids: lines.iter().map(|l| l.id).collect(),
        amounts: lines.iter().map(|l| l.amount).collect(),
    })
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation("name too long"));
    }
    Ok(name.to_string())
}

fn validate_text(text: &str) -> AppResult<String> {
    if text.trim().is_empty() {
        return Err(AppError::validation("text required"));
    }
    Ok(text.to_string())
}

/// Tags form a set; repeated ids collapse, first occurrence wins the order.
pub fn dedup_tags(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

pub fn validate_create(input: &RecipeWrite) -> AppResult<ValidatedRecipe> {
    let lines = validate_lines(&input.ingredients, Some(input.cooking_time))?;
    Ok(ValidatedRecipe {
        name: validate_name(&input.name)?,
        text: validate_text(&input.text)?,
        cooking_time: input.cooking_time,
        tag_ids: dedup_tags(&input.tags),
        lines,
    })
}

pub fn validate_patch(input: &RecipePatch) -> AppResult<ValidatedPatch> {
    let lines = input
        .ingredients
        .as_deref()
        .ok_or_else(|| AppError::validation("ingredients required"))?;
    let lines = validate_lines(lines, input.cooking_time)?;
    let tags = input
        .tags
        .as_deref()
        .ok_or_else(|| AppError::validation("tags required"))?;
    Ok(ValidatedPatch {
        name: input.name.as_deref().map(validate_name).transpose()?,
        text: input.text.as_deref().map(validate_text).transpose()?,
        cooking_time: input.cooking_time,
        tag_ids: dedup_tags(tags),
        lines,
    })
}

/// Referenced catalog rows must exist; runs inside the write transaction.
async fn ensure_references(
    conn: &mut PgConnection,
    tag_ids: &[Uuid],
    lines: &ValidatedLines,
) -> AppResult<()> {
    catalog::repo::ensure_tags_exist(&mut *conn, tag_ids).await?;
    catalog::repo::ensure_ingredients_exist(&mut *conn, &lines.ingredient_ids).await?;
    Ok(())
}

/// Decodes and uploads the image, if any, before the transaction starts.
async fn store_image(st: &AppState, author_id: Uuid, image: Option<&str>) -> AppResult<Option<String>> {
    let Some(raw) = image else {
        return Ok(None);
    };
    let item = images::decode_data_uri(raw)?;
    let key = images::upload_recipe_image(st, author_id, item).await?;
    Ok(Some(key))
}

pub async fn create_recipe(st: &AppState, author_id: Uuid, input: RecipeWrite) -> AppResult<RecipeRead> {
    let valid = validate_create(&input)?;
    let image_key = store_image(st, author_id, input.image.as_deref()).await?;

    let db = &st.db;
    let (valid_ref, key_ref) = (&valid, image_key.as_deref());
    let written = with_retry(st.tx_attempts(), move || async move {
        let mut tx = db.begin().await?;
        ensure_references(&mut tx, &valid_ref.tag_ids, &valid_ref.lines).await?;
        let fields = RecipeFields {
            name: &valid_ref.name,
            text: &valid_ref.text,
            cooking_time: valid_ref.cooking_time,
            image_key: key_ref,
        };
        let (id, _created_at) = repo::insert_recipe(&mut tx, author_id, &fields).await?;
        repo::insert_tags(&mut tx, id, &valid_ref.tag_ids).await?;
        repo::insert_lines(&mut tx, id, &valid_ref.lines.ingredient_ids, &valid_ref.lines.amounts).await?;
        tx.commit().await?;
        Ok(id)
    })
    .await;

    let id = match written {
        Ok(id) => id,
        Err(e) => {
            if let Some(key) = image_key.as_deref() {
                images::discard(st, key).await;
            }
            return Err(e);
        }
    };

    info!(recipe_id = %id, %author_id, lines = valid.lines.amounts.len(), "recipe created");
    get_recipe(st, id, Some(author_id)).await
}

/// Replaces scalars given in the patch and fully replaces tags and lines.
pub async fn update_recipe(
    st: &AppState,
    author_id: Uuid,
    recipe_id: Uuid,
    input: RecipePatch,
) -> AppResult<RecipeRead> {
    let valid = validate_patch(&input)?;
    let new_key = store_image(st, author_id, input.image.as_deref()).await?;

    let db = &st.db;
    let (valid_ref, key_ref) = (&valid, new_key.as_deref());
    let written = with_retry(st.tx_attempts(), move || async move {
        let mut tx = db.begin().await?;
        let old_key = repo::lock_owned(&mut tx, recipe_id, author_id).await?;
        ensure_references(&mut tx, &valid_ref.tag_ids, &valid_ref.lines).await?;
        repo::update_fields(
            &mut tx,
            recipe_id,
            valid_ref.name.as_deref(),
            valid_ref.text.as_deref(),
            valid_ref.cooking_time,
            key_ref,
        )
        .await?;
        repo::clear_associations(&mut tx, recipe_id).await?;
        repo::insert_tags(&mut tx, recipe_id, &valid_ref.tag_ids).await?;
        repo::insert_lines(&mut tx, recipe_id, &valid_ref.lines.ingredient_ids, &valid_ref.lines.amounts).await?;
        tx.commit().await?;
        Ok(old_key)
    })
    .await;

    match written {
        Ok(old_key) => {
            // The previous image is unreferenced only once a new one was committed.
            if let (Some(old), Some(_)) = (old_key.as_deref(), new_key.as_deref()) {
                images::discard(st, old).await;
            }
        }
        Err(e) => {
            if let Some(key) = new_key.as_deref() {
                images::discard(st, key).await;
            }
            return Err(e);
        }
    }

    info!(%recipe_id, %author_id, "recipe updated");
    get_recipe(st, recipe_id, Some(author_id)).await
}

pub async fn delete_recipe(st: &AppState, author_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
    let db = &st.db;
    let image_key = with_retry(st.tx_attempts(), move || async move {
        let mut tx = db.begin().await?;
        let key = repo::delete_owned(&mut tx, recipe_id, author_id).await?;
        tx.commit().await?;
        Ok(key)
    })
    .await?;

    if let Some(key) = image_key.as_deref() {
        images::discard(st, key).await;
    }
    info!(%recipe_id, %author_id, "recipe deleted");
    Ok(())
}

pub async fn get_recipe(st: &AppState, recipe_id: Uuid, viewer: Option<Uuid>) -> AppResult<RecipeRead> {
    let mut tx = begin_snapshot(&st.db).await?;
    let rows = repo::fetch_by_ids(&mut tx, viewer, &[recipe_id]).await?;
    if rows.is_empty() {
        return Err(AppError::not_found("recipe not found"));
    }
    let mut out = load_aggregates(st, &mut tx, viewer, rows).await?;
    tx.commit().await?;
    out.pop().ok_or_else(|| AppError::not_found("recipe not found"))
}

pub async fn list_recipes(
    st: &AppState,
    viewer: Option<Uuid>,
    page: &Pagination,
) -> AppResult<Vec<RecipeRead>> {
    if page.limit < 0 || page.offset < 0 {
        return Err(AppError::validation("invalid pagination"));
    }
    let mut tx = begin_snapshot(&st.db).await?;
    let rows = repo::fetch_page(&mut tx, viewer, page.limit, page.offset).await?;
    let out = load_aggregates(st, &mut tx, viewer, rows).await?;
    tx.commit().await?;
    Ok(out)
}

/// Loads tags, lines and authors for `rows` and presigns their images.
async fn load_aggregates(
    st: &AppState,
    conn: &mut PgConnection,
    viewer: Option<Uuid>,
    rows: Vec<RecipeRow>,
) -> AppResult<Vec<RecipeRead>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let author_ids: Vec<Uuid> = rows
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let tags = repo::fetch_tags(&mut *conn, &ids).await?;
    let lines = repo::fetch_lines(&mut *conn, &ids).await?;
    let authors = repo::fetch_authors(&mut *conn, viewer, &author_ids).await?;

    let mut image_urls = HashMap::new();
    for row in &rows {
        if let Some(key) = row.image_key.as_deref() {
            image_urls.insert(row.id, images::presign(st, key).await?);
        }
    }

    assemble(rows, tags, lines, authors, image_urls)
}

/// Joins the separately fetched pieces into read models, keeping `rows` order.
pub fn assemble(
    rows: Vec<RecipeRow>,
    tags: Vec<RecipeTagRow>,
    lines: Vec<LineRow>,
    authors: Vec<UserSummary>,
    mut image_urls: HashMap<Uuid, String>,
) -> AppResult<Vec<RecipeRead>> {
    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for t in tags {
        tags_by_recipe.entry(t.recipe_id).or_default().push(Tag {
            id: t.id,
            name: t.name,
            slug: t.slug,
            color: t.color,
        });
    }

    let mut lines_by_recipe: HashMap<Uuid, Vec<IngredientLineRead>> = HashMap::new();
    for l in lines {
        lines_by_recipe
            .entry(l.recipe_id)
            .or_default()
            .push(IngredientLineRead {
                id: l.ingredient_id,
                name: l.name,
                measurement_unit: l.measurement_unit,
                amount: l.amount,
            });
    }

    let authors: HashMap<Uuid, UserSummary> = authors.into_iter().map(|a| (a.id, a)).collect();

    rows.into_iter()
        .map(|r| {
            let author = authors.get(&r.author_id).cloned().ok_or_else(|| {
                warn!(recipe_id = %r.id, author_id = %r.author_id, "recipe author missing");
                AppError::not_found("author not found")
            })?;
            Ok(RecipeRead {
                id: r.id,
                author,
                name: r.name,
                image: image_urls.remove(&r.id),
                text: r.text,
                cooking_time: r.cooking_time,
                created_at: r.created_at,
                tags: tags_by_recipe.remove(&r.id).unwrap_or_default(),
                ingredients: lines_by_recipe.remove(&r.id).unwrap_or_default(),
                is_favorited: r.is_favorited,
                is_in_shopping_cart: r.is_in_shopping_cart,
            })
        })
        .collect()
}

pub async fn to_short(st: &AppState, row: RecipeShortRow) -> AppResult<RecipeShort> {
    let image = images::presign_opt(st, row.image_key.as_deref()).await?;
    Ok(RecipeShort {
        id: row.id,
        name: row.name,
        image,
        cooking_time: row.cooking_time,
    })
}
