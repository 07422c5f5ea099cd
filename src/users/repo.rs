use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Fails with `NotFound` unless the user row exists.
pub async fn ensure_exists(conn: &mut PgConnection, user_id: Uuid) -> AppResult<()> {
    let found: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| AppError::not_found("user not found"))
}
