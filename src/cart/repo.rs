use sqlx::PgConnection;
use uuid::Uuid;

use super::services::CartLine;
use crate::error::AppResult;

/// Every ingredient line of every recipe in the user's cart, with the
/// ingredient and unit names it aggregates on.
pub async fn fetch_cart_lines(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Vec<CartLine>> {
    let rows = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT i.name AS name, u.name AS unit, ri.amount::BIGINT AS amount
          FROM cart_entries c
          JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
          JOIN ingredients i ON i.id = ri.ingredient_id
          JOIN units u ON u.id = i.unit_id
         WHERE c.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
