use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use super::{
    dto::{NewIngredient, NewTag, NewUnit},
    repo,
    repo_types::{Ingredient, Tag, Unit},
};
use crate::{
    db::with_retry,
    error::{AppError, AppResult},
};

/// Unit names are stored trimmed, lower-cased and with single inner spaces,
/// so " Tea  Spoon" and "tea spoon" are the same unit.
pub fn normalize_unit_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// ASCII slug: lower-case alphanumerics separated by single dashes.
pub fn slugify(raw: &str) -> String {
    lazy_static! {
        static ref NON_SLUG_RE: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    }
    NON_SLUG_RE
        .replace_all(&raw.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

pub(crate) fn is_valid_color(color: &str) -> bool {
    lazy_static! {
        static ref COLOR_RE: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
    }
    COLOR_RE.is_match(color)
}

fn resolve_slug(explicit: Option<&str>, name: &str) -> AppResult<String> {
    let slug = match explicit {
        Some(s) if !s.trim().is_empty() => slugify(s),
        _ => slugify(name),
    };
    if slug.is_empty() {
        return Err(AppError::validation("invalid slug"));
    }
    Ok(slug)
}

pub async fn create_unit(db: &PgPool, attempts: u32, input: NewUnit) -> AppResult<Unit> {
    let name = normalize_unit_name(&input.name);
    if name.is_empty() {
        return Err(AppError::validation("name required"));
    }
    let slug = resolve_slug(input.slug.as_deref(), &name)?;
    let (name, slug) = (name.as_str(), slug.as_str());

    let unit = with_retry(attempts, move || async move {
        let mut tx = db.begin().await?;
        let unit = repo::insert_unit(&mut tx, name, slug).await?;
        tx.commit().await?;
        Ok(unit)
    })
    .await?;
    info!(unit_id = %unit.id, name = %unit.name, "unit created");
    Ok(unit)
}

pub async fn create_ingredient(
    db: &PgPool,
    attempts: u32,
    input: NewIngredient,
) -> AppResult<Ingredient> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name required"));
    }
    let unit_id = input.unit;

    let ingredient = with_retry(attempts, move || async move {
        let mut tx = db.begin().await?;
        repo::ensure_unit_exists(&mut tx, unit_id).await?;
        let ingredient = repo::insert_ingredient(&mut tx, name, unit_id).await?;
        tx.commit().await?;
        Ok(ingredient)
    })
    .await?;
    info!(ingredient_id = %ingredient.id, name = %ingredient.name, "ingredient created");
    Ok(ingredient)
}

pub async fn create_tag(db: &PgPool, attempts: u32, input: NewTag) -> AppResult<Tag> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name required"));
    }
    if !is_valid_color(&input.color) {
        warn!(color = %input.color, "invalid tag color");
        return Err(AppError::validation("invalid color"));
    }
    let slug = resolve_slug(input.slug.as_deref(), name)?;
    let (slug, color) = (slug.as_str(), input.color.as_str());

    let tag = with_retry(attempts, move || async move {
        let mut tx = db.begin().await?;
        let tag = repo::insert_tag(&mut tx, name, slug, color).await?;
        tx.commit().await?;
        Ok(tag)
    })
    .await?;
    info!(tag_id = %tag.id, slug = %tag.slug, "tag created");
    Ok(tag)
}
