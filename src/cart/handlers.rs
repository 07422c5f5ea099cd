use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::instrument;

use super::services;
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub const REPORT_FILENAME: &str = "shopping_cart.txt";

pub fn routes() -> Router<AppState> {
    Router::new().route("/recipes/download_shopping_cart", get(download_shopping_cart))
}

/// Plain-text body delivered as a file download.
pub struct Attachment {
    pub filename: &'static str,
    pub body: String,
}

impl IntoResponse for Attachment {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={}", self.filename),
                ),
            ],
            self.body,
        )
            .into_response()
    }
}

#[instrument(skip(state))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Attachment> {
    let body = services::build_shopping_list(&state, user_id).await?;
    Ok(Attachment {
        filename: REPORT_FILENAME,
        body,
    })
}
