use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct NewUnit {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    /// Unit id.
    pub unit: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct NewTag {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub color: String,
}
