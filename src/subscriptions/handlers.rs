use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{PreviewQuery, SubscriptionQuery, SubscriptionView},
    services,
};
use crate::{
    auth::AuthUser,
    error::AppResult,
    extract::{AppPath, AppQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/subscriptions", get(list_subscriptions))
        .route("/users/:id/subscribe", post(follow).delete(unfollow))
}

#[instrument(skip(state))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppQuery(q): AppQuery<SubscriptionQuery>,
) -> AppResult<Json<Vec<SubscriptionView>>> {
    Ok(Json(services::list_subscriptions(&state, user_id, &q).await?))
}

#[instrument(skip(state))]
pub async fn follow(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppQuery(q): AppQuery<PreviewQuery>,
) -> AppResult<(StatusCode, Json<SubscriptionView>)> {
    let view = services::follow(&state, user_id, id, q.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state))]
pub async fn unfollow(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<StatusCode> {
    services::unfollow(&state, user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
