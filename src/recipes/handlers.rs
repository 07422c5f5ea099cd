use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{Pagination, RecipePatch, RecipeRead, RecipeWrite},
    services,
};
use crate::{
    auth::{AuthUser, MaybeUser},
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
}

pub fn write_routes(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/recipes", axum::routing::post(create_recipe))
        .route(
            "/recipes/:id",
            axum::routing::patch(update_recipe).delete(delete_recipe),
        )
        // base64 images inflate request bodies
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    AppQuery(p): AppQuery<Pagination>,
) -> AppResult<Json<Vec<RecipeRead>>> {
    Ok(Json(services::list_recipes(&state, viewer, &p).await?))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<RecipeRead>> {
    Ok(Json(services::get_recipe(&state, id, viewer).await?))
}

/// POST /recipes { name, text, cooking_time, image?, tags: [id], ingredients: [{id, amount}] }
#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<RecipeWrite>,
) -> AppResult<(StatusCode, HeaderMap, Json<RecipeRead>)> {
    let recipe = services::create_recipe(&state, user_id, payload).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/recipes/{}", recipe.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((StatusCode::CREATED, headers, Json(recipe)))
}

#[instrument(skip(state, payload))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<RecipePatch>,
) -> AppResult<Json<RecipeRead>> {
    Ok(Json(services::update_recipe(&state, user_id, id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_recipe(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
