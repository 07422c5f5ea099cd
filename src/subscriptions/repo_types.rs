use sqlx::FromRow;
use uuid::Uuid;

use crate::users::repo_types::UserSummary;

/// A followed user with the number of recipes they authored.
#[derive(Debug, Clone, FromRow)]
pub struct FollowedRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub recipes_count: i64,
}

impl FollowedRow {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_subscribed: true,
        }
    }
}

/// One preview recipe, tagged with its author.
#[derive(Debug, Clone, FromRow)]
pub struct PreviewRow {
    pub author_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub image_key: Option<String>,
    pub cooking_time: i32,
}
