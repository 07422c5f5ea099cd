use std::collections::HashMap;

use sqlx::PgConnection;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{SubscriptionQuery, SubscriptionView},
    repo,
    repo_types::{FollowedRow, PreviewRow},
};
use crate::{
    db::{begin_snapshot, with_retry},
    error::{AppError, AppResult},
    images::services as images,
    recipes::dto::RecipeShort,
    relations::SubscriptionStore,
    state::AppState,
    users::repo as users_repo,
};

pub fn validate_follow(follower_id: Uuid, followed_id: Uuid) -> AppResult<()> {
    if follower_id == followed_id {
        return Err(AppError::validation("self-follow"));
    }
    Ok(())
}

pub fn validate_recipes_limit(limit: Option<i64>) -> AppResult<()> {
    match limit {
        Some(n) if n < 0 => Err(AppError::validation("invalid recipes_limit")),
        _ => Ok(()),
    }
}

/// Subscribes `follower_id` to `followed_id` and returns the followed
/// user's view with a recipe preview.
pub async fn follow(
    st: &AppState,
    follower_id: Uuid,
    followed_id: Uuid,
    recipes_limit: Option<i64>,
) -> AppResult<SubscriptionView> {
    if let Err(e) = validate_follow(follower_id, followed_id) {
        warn!(%follower_id, "self-follow rejected");
        return Err(e);
    }
    validate_recipes_limit(recipes_limit)?;

    let db = &st.db;
    let (row, previews) = with_retry(st.tx_attempts(), move || async move {
        let mut tx = db.begin().await?;
        users_repo::ensure_exists(&mut tx, followed_id).await?;
        SubscriptionStore::add(&mut tx, follower_id, followed_id).await?;
        let row = repo::get_followed(&mut tx, follower_id, followed_id).await?;
        let previews = repo::fetch_previews(&mut tx, &[followed_id], recipes_limit).await?;
        tx.commit().await?;
        Ok((row, previews))
    })
    .await?;
    info!(%follower_id, %followed_id, "subscribed");

    build_views(st, vec![row], previews)
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub async fn unfollow(st: &AppState, follower_id: Uuid, followed_id: Uuid) -> AppResult<()> {
    let db = &st.db;
    with_retry(st.tx_attempts(), move || async move {
        let mut tx = db.begin().await?;
        SubscriptionStore::remove(&mut tx, follower_id, followed_id).await?;
        tx.commit().await?;
        Ok(())
    })
    .await?;
    info!(%follower_id, %followed_id, "unsubscribed");
    Ok(())
}

/// Users followed by `follower_id`, each with their recipe count and newest
/// recipes capped at `recipes_limit`.
pub async fn list_subscriptions(
    st: &AppState,
    follower_id: Uuid,
    q: &SubscriptionQuery,
) -> AppResult<Vec<SubscriptionView>> {
    validate_recipes_limit(q.recipes_limit)?;
    if q.limit < 0 || q.offset < 0 {
        return Err(AppError::validation("invalid pagination"));
    }

    let mut tx = begin_snapshot(&st.db).await?;
    let rows = repo::fetch_followed(&mut tx, follower_id, q.limit, q.offset).await?;
    let previews = load_previews(&mut tx, &rows, q.recipes_limit).await?;
    tx.commit().await?;

    build_views(st, rows, previews).await
}

async fn load_previews(
    conn: &mut PgConnection,
    rows: &[FollowedRow],
    recipes_limit: Option<i64>,
) -> AppResult<Vec<PreviewRow>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    repo::fetch_previews(conn, &ids, recipes_limit).await
}

/// Buckets preview rows by author, keeping their order within each author.
pub fn group_previews(previews: Vec<PreviewRow>) -> HashMap<Uuid, Vec<PreviewRow>> {
    let mut by_author: HashMap<Uuid, Vec<PreviewRow>> = HashMap::new();
    for p in previews {
        by_author.entry(p.author_id).or_default().push(p);
    }
    by_author
}

async fn build_views(
    st: &AppState,
    rows: Vec<FollowedRow>,
    previews: Vec<PreviewRow>,
) -> AppResult<Vec<SubscriptionView>> {
    let mut by_author = group_previews(previews);
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut recipes = Vec::new();
        for p in by_author.remove(&row.id).unwrap_or_default() {
            recipes.push(RecipeShort {
                id: p.id,
                name: p.name,
                image: images::presign_opt(st, p.image_key.as_deref()).await?,
                cooking_time: p.cooking_time,
            });
        }
        out.push(SubscriptionView {
            user: row.summary(),
            recipes,
            recipes_count: row.recipes_count,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn followed(id: Uuid, count: i64) -> FollowedRow {
        FollowedRow {
            id,
            email: format!("{id}@example.com"),
            username: id.to_string(),
            first_name: "F".into(),
            last_name: "L".into(),
            recipes_count: count,
        }
    }

    fn preview(author_id: Uuid, name: &str, image: Option<&str>) -> PreviewRow {
        PreviewRow {
            author_id,
            id: Uuid::new_v4(),
            name: name.into(),
            image_key: image.map(Into::into),
            cooking_time: 10,
        }
    }

    #[tokio::test]
    async fn self_follow_fails_before_touching_the_store() {
        let state = AppState::fake();
        let me = Uuid::new_v4();
        let err = follow(&state, me, me, None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "self-follow"));
    }

    #[tokio::test]
    async fn negative_recipes_limit_is_rejected() {
        let state = AppState::fake();
        let q = SubscriptionQuery {
            recipes_limit: Some(-1),
            limit: 20,
            offset: 0,
        };
        let err = list_subscriptions(&state, Uuid::new_v4(), &q).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "invalid recipes_limit"));

        let err = follow(&state, Uuid::new_v4(), Uuid::new_v4(), Some(-5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn zero_and_absent_limits_are_valid() {
        assert!(validate_recipes_limit(None).is_ok());
        assert!(validate_recipes_limit(Some(0)).is_ok());
        assert!(validate_recipes_limit(Some(3)).is_ok());
    }

    #[test]
    fn previews_are_grouped_per_author_in_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let grouped = group_previews(vec![
            preview(a, "newest", None),
            preview(b, "only", None),
            preview(a, "older", None),
        ]);
        let names: Vec<_> = grouped[&a].iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["newest", "older"]);
        assert_eq!(grouped[&b].len(), 1);
    }

    #[tokio::test]
    async fn views_keep_row_order_and_presign_images() {
        let state = AppState::fake();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let views = build_views(
            &state,
            vec![followed(a, 2), followed(b, 0)],
            vec![preview(a, "soup", Some("recipes/a/soup.png")), preview(a, "stew", None)],
        )
        .await
        .unwrap();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].user.id, a);
        assert!(views[0].user.is_subscribed);
        assert_eq!(views[0].recipes_count, 2);
        assert_eq!(
            views[0].recipes[0].image.as_deref(),
            Some("https://fake.local/recipes/a/soup.png")
        );
        assert_eq!(views[0].recipes[1].image, None);
        assert!(views[1].recipes.is_empty());
    }
}
