use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{NewIngredient, NewTag, NewUnit},
    repo,
    repo_types::{Ingredient, Tag, Unit},
    services,
};
use crate::{
    auth::AuthUser,
    error::AppResult,
    extract::{AppJson, AppPath},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/units", get(list_units).post(create_unit))
        .route("/units/:id", get(get_unit))
        .route("/ingredients", get(list_ingredients).post(create_ingredient))
        .route("/ingredients/:id", get(get_ingredient))
        .route("/tags", get(list_tags).post(create_tag))
        .route("/tags/:id", get(get_tag))
}

#[instrument(skip(state))]
pub async fn list_units(State(state): State<AppState>) -> AppResult<Json<Vec<Unit>>> {
    Ok(Json(repo::list_units(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_unit(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Unit>> {
    Ok(Json(repo::get_unit(&state.db, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_unit(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    AppJson(payload): AppJson<NewUnit>,
) -> AppResult<(StatusCode, Json<Unit>)> {
    let unit = services::create_unit(&state.db, state.tx_attempts(), payload).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

#[instrument(skip(state))]
pub async fn list_ingredients(State(state): State<AppState>) -> AppResult<Json<Vec<Ingredient>>> {
    Ok(Json(repo::list_ingredients(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_ingredient(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Ingredient>> {
    Ok(Json(repo::get_ingredient(&state.db, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    AppJson(payload): AppJson<NewIngredient>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    let ingredient = services::create_ingredient(&state.db, state.tx_attempts(), payload).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

#[instrument(skip(state))]
pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(repo::list_tags(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn get_tag(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> AppResult<Json<Tag>> {
    Ok(Json(repo::get_tag(&state.db, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    AppJson(payload): AppJson<NewTag>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    let tag = services::create_tag(&state.db, state.tx_attempts(), payload).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}
