//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Name;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: Name, image: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), name: name.into_inner(), image: image.into(), created_at: now, updated_at: now }
    }

    pub fn rename(&mut self, name: Name) { self.name = name.into_inner(); self.touch(); }
    pub fn set_image(&mut self, image: impl Into<String>) { self.image = image.into(); self.touch(); }

    /// Case-insensitive name comparison used for the uniqueness rule.
    pub fn same_name(&self, other: &str) -> bool { self.name.to_lowercase() == other.trim().to_lowercase() }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names_compare_case_insensitively() {
        let c = Category::create(Name::new(" Dairy ").unwrap(), "https://cdn.example.com/dairy.png");
        assert_eq!(c.name, "Dairy");
        assert!(c.same_name("dairy  "));
        assert!(!c.same_name("Bakery"));
    }
}
