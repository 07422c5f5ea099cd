use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Public view of a user as embedded in recipes and subscription listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the viewer follows this user; false for anonymous viewers.
    pub is_subscribed: bool,
}
