//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{Category, Product};
use crate::domain::value_objects::Quantity;
use crate::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// Starts a new line after checking `qty` against the product's stock.
    pub fn open(user_id: Uuid, product: &Product, qty: Quantity) -> Result<Self> {
        product.ensure_available(qty)?;
        Ok(Self { id: Uuid::now_v7(), user_id, product_id: product.id, quantity: qty.value(), created_at: Utc::now() })
    }

    pub fn quantity(&self) -> Result<Quantity> { Quantity::new(self.quantity) }

    /// Adds `qty` to the line. The combined quantity must fit the stock.
    pub fn merge(&mut self, product: &Product, qty: Quantity) -> Result<()> {
        let combined = self.quantity()?.add(qty)?;
        product.ensure_available(combined)?;
        self.quantity = combined.value();
        Ok(())
    }

    /// Replaces the quantity; no automatic removal at zero.
    pub fn set_quantity(&mut self, product: &Product, qty: Quantity) -> Result<()> {
        product.ensure_available(qty)?;
        self.quantity = qty.value();
        Ok(())
    }
}

/// Product joined with its categories.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithCategories {
    #[serde(flatten)]
    pub product: Product,
    pub categories: Vec<Category>,
}

/// Cart line as returned to the client.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub product: ProductWithCategories,
}

impl CartLine {
    pub fn new(item: CartItem, product: Product, categories: Vec<Category>) -> Self {
        Self {
            id: item.id,
            user_id: item.user_id,
            quantity: item.quantity,
            created_at: item.created_at,
            product: ProductWithCategories { product, categories },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;
    use crate::EcommerceError;
    use rust_decimal::Decimal;

    #[test]
    fn test_cart_merge() {
        let product = sample("Widget", 5, Decimal::new(10, 0));
        let mut item = CartItem::open(Uuid::new_v4(), &product, Quantity::new(2).unwrap()).unwrap();
        item.merge(&product, Quantity::new(1).unwrap()).unwrap();
        assert_eq!(item.quantity, 3); // Merged
    }

    #[test]
    fn test_merge_over_stock_leaves_quantity() {
        let product = sample("Widget", 5, Decimal::new(10, 0));
        let mut item = CartItem::open(Uuid::new_v4(), &product, Quantity::new(3).unwrap()).unwrap();
        let err = item.merge(&product, Quantity::new(3).unwrap()).unwrap_err();
        assert!(matches!(err, EcommerceError::InsufficientStock { requested: 6, available: 5, .. }));
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn test_open_and_set_check_stock() {
        let product = sample("Widget", 2, Decimal::new(10, 0));
        assert!(CartItem::open(Uuid::new_v4(), &product, Quantity::new(3).unwrap()).is_err());
        let mut item = CartItem::open(Uuid::new_v4(), &product, Quantity::new(1).unwrap()).unwrap();
        assert!(item.set_quantity(&product, Quantity::new(4).unwrap()).is_err());
        assert_eq!(item.quantity, 1);
        item.set_quantity(&product, Quantity::new(2).unwrap()).unwrap();
        assert_eq!(item.quantity, 2);
    }
}
