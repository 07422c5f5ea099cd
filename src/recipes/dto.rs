use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{catalog::repo_types::Tag, users::repo_types::UserSummary};

/// One `(ingredient, amount)` line of a recipe as the client writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngredientLineWrite {
    /// Ingredient id.
    pub id: Uuid,
    pub amount: i32,
}

/// Write model for recipe creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeWrite {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    /// `data:image/<type>;base64,<payload>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    #[serde(default)]
    pub ingredients: Vec<IngredientLineWrite>,
}

/// Write model for recipe updates. Scalars are optional; tags and
/// ingredients must be sent in full on every update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<IngredientLineWrite>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngredientLineRead {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Read model of the recipe aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeRead {
    pub id: Uuid,
    pub author: UserSummary,
    pub name: String,
    /// Presigned URL of the image, if any.
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<IngredientLineRead>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeRead {
    /// Maps the read model back onto the write model. The image is not
    /// carried over: the read side only knows a URL, not the payload.
    pub fn to_write(&self) -> RecipeWrite {
        RecipeWrite {
            name: self.name.clone(),
            text: self.text.clone(),
            cooking_time: self.cooking_time,
            image: None,
            tags: self.tags.iter().map(|t| t.id).collect(),
            ingredients: self
                .ingredients
                .iter()
                .map(|l| IngredientLineWrite {
                    id: l.id,
                    amount: l.amount,
                })
                .collect(),
        }
    }
}

/// Short recipe view returned by favorite/cart toggles and subscription previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeShort {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_page_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// Page size used when a listing does not ask for one.
pub fn default_page_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn sample() -> RecipeRead {
        RecipeRead {
            id: Uuid::new_v4(),
            author: UserSummary {
                id: Uuid::new_v4(),
                email: "cook@example.com".into(),
                username: "cook".into(),
                first_name: "Ada".into(),
                last_name: "Cook".into(),
                is_subscribed: false,
            },
            name: "Pancakes".into(),
            image: Some("https://fake.local/recipes/a/b.png".into()),
            text: "Mix and fry.".into(),
            cooking_time: 20,
            created_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            tags: vec![
                Tag {
                    id: Uuid::new_v4(),
                    name: "Breakfast".into(),
                    slug: "breakfast".into(),
                    color: "#E26C2D".into(),
                },
                Tag {
                    id: Uuid::new_v4(),
                    name: "Sweet".into(),
                    slug: "sweet".into(),
                    color: "#49B64E".into(),
                },
            ],
            ingredients: vec![
                IngredientLineRead {
                    id: Uuid::new_v4(),
                    name: "flour".into(),
                    measurement_unit: "g".into(),
                    amount: 200,
                },
                IngredientLineRead {
                    id: Uuid::new_v4(),
                    name: "eggs".into(),
                    measurement_unit: "pcs".into(),
                    amount: 2,
                },
            ],
            is_favorited: true,
            is_in_shopping_cart: false,
        }
    }

    #[test]
    fn wire_round_trip_preserves_lines_and_tags() {
        let recipe = sample();
        let json = serde_json::to_string(&recipe).unwrap();
        let parsed: RecipeRead = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, recipe);

        let write = parsed.to_write();
        let lines: HashSet<_> = write.ingredients.iter().copied().collect();
        let expected: HashSet<_> = recipe
            .ingredients
            .iter()
            .map(|l| IngredientLineWrite { id: l.id, amount: l.amount })
            .collect();
        assert_eq!(lines, expected);

        let tags: HashSet<_> = write.tags.into_iter().collect();
        let expected: HashSet<_> = recipe.tags.iter().map(|t| t.id).collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn created_at_is_rfc3339_on_the_wire() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["created_at"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn write_model_defaults_missing_collections() {
        let w: RecipeWrite =
            serde_json::from_str(r#"{"name":"Tea","text":"Steep.","cooking_time":3}"#).unwrap();
        assert!(w.ingredients.is_empty());
        assert!(w.tags.is_empty());
        assert!(w.image.is_none());
    }

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit, default_page_limit());
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn patch_distinguishes_missing_from_empty() {
        let p: RecipePatch = serde_json::from_str(r#"{"tags":[]}"#).unwrap();
        assert_eq!(p.tags, Some(vec![]));
        assert!(p.ingredients.is_none());
        assert!(p.name.is_none());
    }
}
