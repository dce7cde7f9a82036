//! Checkout: turns the cart (or an explicit item list) into orders.
//!
//! Every line becomes its own order. Stock is checked up front for a clear
//! error, then the store commits all orders, the stock decrements and the cart
//! clear in one transaction, re-checking stock conditionally.

use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{AddressFields, LineItem, Order, PaymentMethod};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Quantity;
use crate::publisher::EventPublisher;
use crate::store::{Placement, Store};
use crate::{EcommerceError, Result};

/// Either a saved address of the caller or an inline one.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DeliveryAddress {
    Saved(Uuid),
    Inline(AddressFields),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct CheckoutRequest {
    pub delivery_address: Option<DeliveryAddress>,
    /// Buys these instead of the cart; the cart is then left alone.
    pub items: Option<Vec<CheckoutItem>>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

async fn resolve_address(store: &dyn Store, user_id: Uuid, address: DeliveryAddress) -> Result<AddressFields> {
    match address {
        DeliveryAddress::Saved(id) => Ok(store
            .get_address(user_id, id)
            .await?
            .ok_or(EcommerceError::NotFound("Address"))?
            .fields),
        DeliveryAddress::Inline(fields) => fields.normalized(),
    }
}

#[instrument(skip(store, events, request))]
pub async fn checkout(store: &dyn Store, events: &EventPublisher, user_id: Uuid, request: CheckoutRequest) -> Result<Vec<Order>> {
    let address = request
        .delivery_address
        .ok_or_else(|| EcommerceError::validation("delivery_address is required"))?;
    let address = resolve_address(store, user_id, address).await?;

    let (wanted, from_cart) = match request.items {
        Some(items) if items.is_empty() => return Err(EcommerceError::validation("items must not be empty")),
        Some(items) => (items.into_iter().map(|i| (i.product_id, i.quantity)).collect::<Vec<_>>(), false),
        None => {
            let cart = store.cart_items(user_id).await?;
            if cart.is_empty() { return Err(EcommerceError::EmptyCart); }
            (cart.into_iter().map(|i| (i.product_id, i.quantity)).collect(), true)
        }
    };

    let mut orders = Vec::with_capacity(wanted.len());
    for (product_id, quantity) in wanted {
        let qty = Quantity::new(quantity)?;
        let product = store
            .get_product(product_id)
            .await?
            .filter(|p| p.publish)
            .ok_or(EcommerceError::NotFound("Product"))?;
        product.ensure_available(qty)?;
        let line = LineItem::price(&product, qty)?;
        orders.push(Order::place(user_id, vec![line], address.clone(), request.payment_method)?);
    }

    let placed = store.place_orders(Placement { user_id, orders, clear_cart: from_cart }).await?;
    info!(%user_id, orders = placed.len(), from_cart, "checkout committed");

    for order in &placed {
        events.publish(DomainEvent::order_placed(order)).await;
        events.publish_all(DomainEvent::stock_changes(order, -1)).await;
    }
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::address::sample_fields;
    use crate::domain::aggregates::{Address, DeliveryStatus, PaymentStatus, ProductPatch};
    use crate::service::cart;
    use crate::service::testing::{product, user};
    use crate::store::{MemoryStore, OrderFilter};
    use crate::domain::value_objects::PageRequest;
    use rust_decimal::Decimal;

    fn inline() -> Option<DeliveryAddress> { Some(DeliveryAddress::Inline(sample_fields())) }

    async fn stock(store: &MemoryStore, id: Uuid) -> i32 { store.get_product(id).await.unwrap().unwrap().stock }

    async fn order_count(store: &MemoryStore) -> u64 {
        store.list_orders(&OrderFilter::default(), PageRequest::default()).await.unwrap().total
    }

    #[tokio::test]
    async fn test_cart_checkout_creates_one_order_per_line() {
        let store = MemoryStore::new();
        let a = product(&store, "Apple", 10, Decimal::new(250, 2)).await;
        let b = product(&store, "Bread", 3, Decimal::new(40, 0)).await;
        let u = user();
        cart::add_item(&store, u, a.id, 4).await.unwrap();
        cart::add_item(&store, u, b.id, 3).await.unwrap();

        let orders = checkout(&store, &EventPublisher::noop(), u, CheckoutRequest { delivery_address: inline(), ..Default::default() })
            .await
            .unwrap();

        assert_eq!(orders.len(), 2);
        for o in &orders {
            assert_eq!(o.total_amt, o.items.iter().map(|i| i.sub_total).sum::<Decimal>());
            assert_eq!(o.payment_status, PaymentStatus::Pending);
            assert_eq!(o.delivery_status, DeliveryStatus::Placed);
        }
        assert_ne!(orders[0].order_id, orders[1].order_id);
        assert_eq!(stock(&store, a.id).await, 6);
        assert_eq!(stock(&store, b.id).await, 0);
        assert!(cart::list_items(&store, u).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_on_later_item_commits_nothing() {
        let store = MemoryStore::new();
        let a = product(&store, "Apple", 10, Decimal::ONE).await;
        let b = product(&store, "Bread", 2, Decimal::ONE).await;
        let u = user();
        cart::add_item(&store, u, a.id, 5).await.unwrap();
        let item = cart::add_item(&store, u, b.id, 2).await.unwrap();

        // Stock drops after the item went into the cart.
        store.update_product(b.id, ProductPatch { stock: Some(1), ..Default::default() }).await.unwrap();

        let err = checkout(&store, &EventPublisher::noop(), u, CheckoutRequest { delivery_address: inline(), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, EcommerceError::InsufficientStock { .. }), "{err}");
        assert_eq!(stock(&store, a.id).await, 10);
        assert_eq!(order_count(&store).await, 0);
        assert_eq!(store.cart_items(u).await.unwrap().iter().find(|i| i.id == item.id).map(|i| i.quantity), Some(2));
    }

    #[tokio::test]
    async fn test_missing_address_mutates_nothing() {
        let store = MemoryStore::new();
        let a = product(&store, "Apple", 10, Decimal::ONE).await;
        let u = user();
        cart::add_item(&store, u, a.id, 1).await.unwrap();
        let err = checkout(&store, &EventPublisher::noop(), u, CheckoutRequest::default()).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(_)));
        assert_eq!(order_count(&store).await, 0);
        assert_eq!(stock(&store, a.id).await, 10);
        assert_eq!(store.cart_items(u).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_and_empty_items() {
        let store = MemoryStore::new();
        let err = checkout(&store, &EventPublisher::noop(), user(), CheckoutRequest { delivery_address: inline(), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, EcommerceError::EmptyCart));
        let req = CheckoutRequest { delivery_address: inline(), items: Some(vec![]), ..Default::default() };
        assert!(matches!(checkout(&store, &EventPublisher::noop(), user(), req).await, Err(EcommerceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_explicit_items_leave_cart_and_snapshot_saved_address() {
        let store = MemoryStore::new();
        let a = product(&store, "Apple", 10, Decimal::new(3, 0)).await;
        let u = user();
        cart::add_item(&store, u, a.id, 1).await.unwrap();
        let saved = store.insert_address(Address::create(u, sample_fields()).unwrap()).await.unwrap();

        let req = CheckoutRequest {
            delivery_address: Some(DeliveryAddress::Saved(saved.id)),
            items: Some(vec![CheckoutItem { product_id: a.id, quantity: 2 }]),
            payment_method: PaymentMethod::Card,
        };
        let orders = checkout(&store, &EventPublisher::noop(), u, req).await.unwrap();
        assert_eq!(orders[0].delivery_address, saved.fields);
        assert_eq!(orders[0].total_amt, Decimal::new(6, 0));
        assert_eq!(orders[0].payment_method, PaymentMethod::Card);
        assert_eq!(store.cart_items(u).await.unwrap().len(), 1);
        assert_eq!(stock(&store, a.id).await, 8);

        let foreign = CheckoutRequest {
            delivery_address: Some(DeliveryAddress::Saved(saved.id)),
            items: Some(vec![CheckoutItem { product_id: a.id, quantity: 1 }]),
            ..Default::default()
        };
        assert!(matches!(checkout(&store, &EventPublisher::noop(), user(), foreign).await, Err(EcommerceError::NotFound("Address"))));
    }

    #[tokio::test]
    async fn test_duplicate_lines_are_checked_against_combined_stock() {
        let store = MemoryStore::new();
        let a = product(&store, "Apple", 3, Decimal::ONE).await;
        let req = CheckoutRequest {
            delivery_address: inline(),
            items: Some(vec![CheckoutItem { product_id: a.id, quantity: 2 }, CheckoutItem { product_id: a.id, quantity: 2 }]),
            ..Default::default()
        };
        assert!(matches!(checkout(&store, &EventPublisher::noop(), user(), req).await, Err(EcommerceError::InsufficientStock { .. })));
        assert_eq!(stock(&store, a.id).await, 3);
    }

    #[tokio::test]
    async fn test_combined_quantity_overflow_is_rejected() {
        let store = MemoryStore::new();
        let a = product(&store, "Apple", i32::MAX, Decimal::ONE).await;
        let req = CheckoutRequest {
            delivery_address: inline(),
            items: Some(vec![
                CheckoutItem { product_id: a.id, quantity: 2_000_000_000 },
                CheckoutItem { product_id: a.id, quantity: 2_000_000_000 },
            ]),
            ..Default::default()
        };
        let err = checkout(&store, &EventPublisher::noop(), user(), req).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(_)), "{err}");
        assert_eq!(stock(&store, a.id).await, i32::MAX);
        assert_eq!(order_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_line_total_overflow_is_rejected() {
        let store = MemoryStore::new();
        let a = product(&store, "Yacht", 10, Decimal::MAX).await;
        let req = CheckoutRequest {
            delivery_address: inline(),
            items: Some(vec![CheckoutItem { product_id: a.id, quantity: 10 }]),
            ..Default::default()
        };
        let err = checkout(&store, &EventPublisher::noop(), user(), req).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(_)), "{err}");
        assert_eq!(stock(&store, a.id).await, 10);
    }

    #[test]
    fn test_request_accepts_saved_or_inline_address() {
        let id = Uuid::new_v4();
        let saved: CheckoutRequest = serde_json::from_value(serde_json::json!({ "delivery_address": id })).unwrap();
        assert_eq!(saved.delivery_address, Some(DeliveryAddress::Saved(id)));
        let inline: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "delivery_address": serde_json::to_value(sample_fields()).unwrap(),
            "payment_method": "online"
        }))
        .unwrap();
        assert!(matches!(inline.delivery_address, Some(DeliveryAddress::Inline(_))));
        assert_eq!(inline.payment_method, PaymentMethod::Online);
    }
}
