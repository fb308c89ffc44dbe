use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>, // storage key
    pub created_at: OffsetDateTime,
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A recipe together with the ids of its associations.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRecord {
    pub recipe: Recipe,
    pub tag_ids: Vec<Uuid>,
    pub ingredient_ids: Vec<Uuid>,
}

/// Validated writable columns; associations replace the existing sets.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeFields {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tag_ids: Vec<Uuid>,
    pub ingredient_ids: Vec<Uuid>,
}

/// A recipe matches when it carries any of the listed ids; empty lists do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tag_ids: Vec<Uuid>,
    pub ingredient_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_str_is_title() {
        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Steak and mushroom sauce".into(),
            time_minutes: 5,
            price: Decimal::new(500, 2),
            link: String::new(),
            image: None,
            created_at: OffsetDateTime::now_utc(),
        };
        assert_eq!(recipe.to_string(), recipe.title);
    }
}
