use serde::{Deserialize, Serialize};

use crate::{recipes::dto::RecipeShort, users::repo_types::UserSummary};

/// A followed author with their newest recipes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserSummary,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    /// Cap on preview recipes per author; absent means all of them.
    pub recipes_limit: Option<i64>,
    #[serde(default = "crate::recipes::dto::default_page_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    pub recipes_limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn view_flattens_the_user() {
        let view = SubscriptionView {
            user: UserSummary {
                id: Uuid::nil(),
                email: "chef@example.com".into(),
                username: "chef".into(),
                first_name: "Sam".into(),
                last_name: "Chef".into(),
                is_subscribed: true,
            },
            recipes: vec![],
            recipes_count: 3,
        };
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["username"], "chef");
        assert_eq!(v["is_subscribed"], true);
        assert_eq!(v["recipes_count"], 3);
        assert!(v.get("user").is_none());
    }

    #[test]
    fn query_defaults() {
        let q: SubscriptionQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.recipes_limit, None);
        assert_eq!(q.limit, crate::recipes::dto::default_page_limit());
        assert_eq!(q.offset, 0);
    }
}
