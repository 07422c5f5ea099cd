use tracing::info;
use uuid::Uuid;

use super::{Relation, RelationStore};
use crate::{
    db::with_retry,
    error::AppResult,
    recipes::{dto::RecipeShort, repo as recipes_repo, services::to_short},
    state::AppState,
};

/// Puts `recipe_id` into the user's relation `R` (favorites or cart).
pub async fn add_recipe<R: Relation>(st: &AppState, user_id: Uuid, recipe_id: Uuid) -> AppResult<RecipeShort> {
    let db = &st.db;
    let row = with_retry(st.tx_attempts(), move || async move {
        let mut tx = db.begin().await?;
        let row = recipes_repo::get_short(&mut tx, recipe_id).await?;
        RelationStore::<R>::add(&mut tx, user_id, recipe_id).await?;
        tx.commit().await?;
        Ok(row)
    })
    .await?;
    info!(relation = R::TABLE, %user_id, %recipe_id, "relation added");
    to_short(st, row).await
}

pub async fn remove_recipe<R: Relation>(st: &AppState, user_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
    let db = &st.db;
    with_retry(st.tx_attempts(), move || async move {
        let mut tx = db.begin().await?;
        recipes_repo::get_short(&mut tx, recipe_id).await?;
        RelationStore::<R>::remove(&mut tx, user_id, recipe_id).await?;
        tx.commit().await?;
        Ok(())
    })
    .await?;
    info!(relation = R::TABLE, %user_id, %recipe_id, "relation removed");
    Ok(())
}
