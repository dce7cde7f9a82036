//! Cart management for the authenticated user.

use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{CartItem, CartLine};
use crate::domain::value_objects::Quantity;
use crate::store::Store;
use crate::{EcommerceError, Result};

/// Adds `quantity` of a published product, merging into an existing line.
pub async fn add_item(store: &dyn Store, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartItem> {
    let qty = Quantity::new(quantity)?;
    store
        .get_product(product_id)
        .await?
        .filter(|p| p.publish)
        .ok_or(EcommerceError::NotFound("Product"))?;
    let item = store.add_to_cart(user_id, product_id, qty).await?;
    info!(%user_id, %product_id, quantity = item.quantity, "cart line saved");
    Ok(item)
}

/// Cart lines with product and category data, newest first.
pub async fn list_items(store: &dyn Store, user_id: Uuid) -> Result<Vec<CartLine>> {
    let items = store.cart_items(user_id).await?;
    let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let mut products: HashMap<Uuid, _> = store
        .products_by_ids(&product_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let mut category_ids: Vec<Uuid> = products.values().flat_map(|p| p.category.iter().copied()).collect();
    category_ids.sort();
    category_ids.dedup();
    let categories: HashMap<Uuid, _> = store
        .categories_by_ids(&category_ids)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(items
        .into_iter()
        .filter_map(|item| {
            let product = products.remove(&item.product_id)?;
            let joined = product.category.iter().filter_map(|id| categories.get(id).cloned()).collect();
            Some(CartLine::new(item, product, joined))
        })
        .collect())
}

pub async fn update_quantity(store: &dyn Store, user_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartItem> {
    let qty = Quantity::new(quantity)?;
    store.set_cart_quantity(user_id, item_id, qty).await
}

pub async fn remove_item(store: &dyn Store, user_id: Uuid, item_id: Uuid) -> Result<()> {
    if !store.remove_cart_item(user_id, item_id).await? {
        return Err(EcommerceError::NotFound("Cart item"));
    }
    Ok(())
}

pub async fn clear(store: &dyn Store, user_id: Uuid) -> Result<u64> {
    store.clear_cart(user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Category, ProductPatch};
    use crate::domain::value_objects::Name;
    use crate::service::testing::{product, user};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_add_then_list_yields_one_line() {
        let store = MemoryStore::new();
        let apple = product(&store, "Apple", 10, Decimal::ONE).await;
        let u = user();
        add_item(&store, u, apple.id, 4).await.unwrap();
        let lines = list_items(&store, u).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 4);
        assert_eq!(lines[0].product.product.id, apple.id);
    }

    #[tokio::test]
    async fn test_adding_twice_merges() {
        let store = MemoryStore::new();
        let apple = product(&store, "Apple", 10, Decimal::ONE).await;
        let u = user();
        let first = add_item(&store, u, apple.id, 2).await.unwrap();
        let second = add_item(&store, u, apple.id, 5).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 7);
        assert_eq!(store.cart_items(u).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_add_over_stock_fails_and_keeps_quantity() {
        let store = MemoryStore::new();
        let p = product(&store, "Pear", 5, Decimal::ONE).await;
        let u = user();
        add_item(&store, u, p.id, 3).await.unwrap();
        let err = add_item(&store, u, p.id, 3).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InsufficientStock { requested: 6, available: 5, .. }));
        assert_eq!(store.cart_items(u).await.unwrap()[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_unknown_or_unpublished_product_is_not_found() {
        let store = MemoryStore::new();
        let hidden = product(&store, "Hidden", 5, Decimal::ONE).await;
        store.update_product(hidden.id, ProductPatch { publish: Some(false), ..Default::default() }).await.unwrap();
        assert!(matches!(add_item(&store, user(), Uuid::new_v4(), 1).await, Err(EcommerceError::NotFound(_))));
        assert!(matches!(add_item(&store, user(), hidden.id, 1).await, Err(EcommerceError::NotFound(_))));
        assert!(matches!(add_item(&store, user(), hidden.id, 0).await, Err(EcommerceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_quantity_rules() {
        let store = MemoryStore::new();
        let p = product(&store, "Plum", 5, Decimal::ONE).await;
        let u = user();
        let item = add_item(&store, u, p.id, 1).await.unwrap();

        let err = update_quantity(&store, u, item.id, 6).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InsufficientStock { .. }));
        assert_eq!(store.cart_items(u).await.unwrap()[0].quantity, 1);

        assert!(matches!(update_quantity(&store, u, item.id, 0).await, Err(EcommerceError::Validation(_))));
        assert!(matches!(update_quantity(&store, user(), item.id, 2).await, Err(EcommerceError::NotFound(_))));
        assert_eq!(update_quantity(&store, u, item.id, 5).await.unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_remove_is_owner_scoped_and_clear_empties() {
        let store = MemoryStore::new();
        let a = product(&store, "A", 5, Decimal::ONE).await;
        let b = product(&store, "B", 5, Decimal::ONE).await;
        let u = user();
        let item = add_item(&store, u, a.id, 1).await.unwrap();
        add_item(&store, u, b.id, 1).await.unwrap();

        assert!(matches!(remove_item(&store, user(), item.id).await, Err(EcommerceError::NotFound(_))));
        remove_item(&store, u, item.id).await.unwrap();
        assert!(matches!(remove_item(&store, u, item.id).await, Err(EcommerceError::NotFound(_))));
        assert_eq!(clear(&store, u).await.unwrap(), 1);
        assert!(list_items(&store, u).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_listing_joins_categories_newest_first() {
        let store = MemoryStore::new();
        let fruit = store
            .insert_category(Category::create(Name::new("Fruit").unwrap(), "https://cdn.example.com/fruit.png"))
            .await
            .unwrap();
        let apple = product(&store, "Apple", 5, Decimal::ONE).await;
        store.update_product(apple.id, ProductPatch { category: Some(vec![fruit.id]), ..Default::default() }).await.unwrap();
        let kiwi = product(&store, "Kiwi", 5, Decimal::ONE).await;

        let u = user();
        add_item(&store, u, apple.id, 1).await.unwrap();
        add_item(&store, u, kiwi.id, 1).await.unwrap();
        let lines = list_items(&store, u).await.unwrap();
        assert_eq!(lines[0].product.product.name, "Kiwi");
        assert_eq!(lines[1].product.categories, vec![fruit]);
    }
}
