//! Many-to-many relation tables with a uniqueness constraint on the pair.
//! One generic store, instantiated for favorites, cart entries and
//! subscriptions.

pub mod handlers;
pub mod services;

use std::marker::PhantomData;

use axum::Router;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    handlers::routes()
}

/// Describes one relation table: `(subject, object)` with a unique pair.
pub trait Relation: Send + Sync + 'static {
    const TABLE: &'static str;
    const SUBJECT: &'static str;
    const OBJECT: &'static str;
    /// Message for adding a pair that already exists.
    const ALREADY_PRESENT: &'static str;
    /// Message for removing a pair that does not exist.
    const NOT_PRESENT: &'static str;
}

pub enum Favorites {}

impl Relation for Favorites {
    const TABLE: &'static str = "favorites";
    const SUBJECT: &'static str = "user_id";
    const OBJECT: &'static str = "recipe_id";
    const ALREADY_PRESENT: &'static str = "recipe already in favorites";
    const NOT_PRESENT: &'static str = "recipe is not in favorites";
}

pub enum CartEntries {}

impl Relation for CartEntries {
    const TABLE: &'static str = "cart_entries";
    const SUBJECT: &'static str = "user_id";
    const OBJECT: &'static str = "recipe_id";
    const ALREADY_PRESENT: &'static str = "recipe already in shopping cart";
    const NOT_PRESENT: &'static str = "recipe is not in shopping cart";
}

pub enum Subscriptions {}

impl Relation for Subscriptions {
    const TABLE: &'static str = "subscriptions";
    const SUBJECT: &'static str = "follower_id";
    const OBJECT: &'static str = "followed_id";
    const ALREADY_PRESENT: &'static str = "already subscribed";
    const NOT_PRESENT: &'static str = "not subscribed";
}

/// Strict toggles over a relation table: adding a present pair and removing
/// an absent one both fail.
pub struct RelationStore<R: Relation>(PhantomData<R>);

pub type FavoriteStore = RelationStore<Favorites>;
pub type CartStore = RelationStore<CartEntries>;
pub type SubscriptionStore = RelationStore<Subscriptions>;

impl<R: Relation> RelationStore<R> {
    fn insert_sql() -> String {
        format!(
            "INSERT INTO {t} ({s}, {o}) VALUES ($1, $2) ON CONFLICT ({s}, {o}) DO NOTHING",
            t = R::TABLE,
            s = R::SUBJECT,
            o = R::OBJECT
        )
    }

    fn delete_sql() -> String {
        format!(
            "DELETE FROM {t} WHERE {s} = $1 AND {o} = $2",
            t = R::TABLE,
            s = R::SUBJECT,
            o = R::OBJECT
        )
    }

    /// Inserts the pair. A concurrent insert of the same pair makes exactly
    /// one caller win; the other sees `Conflict`.
    pub async fn add(conn: &mut PgConnection, subject: Uuid, object: Uuid) -> AppResult<()> {
        let done = sqlx::query(&Self::insert_sql())
            .bind(subject)
            .bind(object)
            .execute(conn)
            .await?;
        if done.rows_affected() == 0 {
            return Err(AppError::conflict(R::ALREADY_PRESENT));
        }
        Ok(())
    }

    pub async fn remove(conn: &mut PgConnection, subject: Uuid, object: Uuid) -> AppResult<()> {
        let done = sqlx::query(&Self::delete_sql())
            .bind(subject)
            .bind(object)
            .execute(conn)
            .await?;
        if done.rows_affected() == 0 {
            return Err(AppError::not_found(R::NOT_PRESENT));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_is_built_from_the_relation() {
        assert_eq!(
            CartStore::insert_sql(),
            "INSERT INTO cart_entries (user_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, recipe_id) DO NOTHING"
        );
        assert_eq!(
            SubscriptionStore::delete_sql(),
            "DELETE FROM subscriptions WHERE follower_id = $1 AND followed_id = $2"
        );
        assert!(FavoriteStore::insert_sql().starts_with("INSERT INTO favorites (user_id, recipe_id)"));
    }
}
