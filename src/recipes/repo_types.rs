use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Recipe row plus per-viewer flags.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub image_key: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    pub created_at: OffsetDateTime,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct LineRow {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeTagRow {
    pub recipe_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub color: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct RecipeShortRow {
    pub id: Uuid,
    pub name: String,
    pub image_key: Option<String>,
    pub cooking_time: i32,
}
