//! Order queries and the admin status lifecycle.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderStats, StatusUpdate};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Page, PageRequest};
use crate::publisher::EventPublisher;
use crate::service::Principal;
use crate::store::{OrderFilter, OrderState, Store};
use crate::{EcommerceError, Result};

/// Customers see their own orders; admins see every order.
pub async fn list_orders(store: &dyn Store, principal: &Principal, mut filter: OrderFilter, page: PageRequest) -> Result<Page<Order>> {
    if let (Some(from), Some(to)) = (filter.from, filter.to) {
        if from > to { return Err(EcommerceError::validation("from must not be after to")); }
    }
    filter.user_id = if principal.is_admin() { None } else { Some(principal.user_id) };
    store.list_orders(&filter, page).await
}

/// Orders of other customers read as missing.
pub async fn get_order(store: &dyn Store, principal: &Principal, id: Uuid) -> Result<Order> {
    store
        .get_order(id)
        .await?
        .filter(|o| principal.is_admin() || o.is_owned_by(principal.user_id))
        .ok_or(EcommerceError::NotFound("Order"))
}

#[instrument(skip(store, events, update))]
pub async fn update_status(store: &dyn Store, events: &EventPublisher, id: Uuid, update: StatusUpdate) -> Result<Order> {
    let mut order = store.get_order(id).await?.ok_or(EcommerceError::NotFound("Order"))?;
    let expected = OrderState::of(&order);
    let cancelled = order.apply(update)?;

    let saved = store
        .update_order_status(order, expected, cancelled)
        .await?
        .ok_or_else(|| EcommerceError::Conflict("order was modified concurrently, retry".into()))?;
    info!(order_id = %saved.order_id, delivery = %saved.delivery_status, payment = %saved.payment_status, "order status updated");

    events.publish(DomainEvent::order_status_changed(&saved)).await;
    if cancelled {
        events.publish_all(DomainEvent::stock_changes(&saved, 1)).await;
    }
    Ok(saved)
}

pub async fn delete_order(store: &dyn Store, events: &EventPublisher, id: Uuid) -> Result<()> {
    let order = store.get_order(id).await?.ok_or(EcommerceError::NotFound("Order"))?;
    if !store.delete_order(id).await? {
        return Err(EcommerceError::NotFound("Order"));
    }
    info!(order_id = %order.order_id, "order deleted");
    events.publish(DomainEvent::Order(OrderEvent::Deleted { order_id: order.order_id })).await;
    Ok(())
}

pub async fn stats(store: &dyn Store) -> Result<OrderStats> {
    store.order_stats().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::address::sample_fields;
    use crate::domain::aggregates::{DeliveryStatus, PaymentStatus, Role};
    use crate::service::checkout::{checkout, CheckoutItem, CheckoutRequest, DeliveryAddress};
    use crate::service::testing::{product, user};
    use crate::store::MemoryStore;
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    async fn place(store: &MemoryStore, user_id: Uuid, product_id: Uuid, quantity: i32) -> Order {
        let req = CheckoutRequest {
            delivery_address: Some(DeliveryAddress::Inline(sample_fields())),
            items: Some(vec![CheckoutItem { product_id, quantity }]),
            ..Default::default()
        };
        checkout(store, &EventPublisher::noop(), user_id, req).await.unwrap().remove(0)
    }

    fn delivery(status: DeliveryStatus) -> StatusUpdate {
        StatusUpdate { delivery_status: Some(status), ..Default::default() }
    }

    #[tokio::test]
    async fn test_listing_is_scoped_to_the_caller() {
        let store = MemoryStore::new();
        let p = product(&store, "Apple", 10, Decimal::ONE).await;
        let (alice, bob) = (user(), user());
        place(&store, alice, p.id, 1).await;
        place(&store, alice, p.id, 1).await;
        let bobs = place(&store, bob, p.id, 1).await;

        let mine = list_orders(&store, &Principal::new(alice, Role::User), OrderFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(mine.total, 2);
        let all = list_orders(&store, &Principal::new(user(), Role::Admin), OrderFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(all.total, 3);

        let search = OrderFilter { search: Some(bobs.order_id[20..].to_lowercase()), ..Default::default() };
        let found = list_orders(&store, &Principal::new(bob, Role::User), search, PageRequest::default()).await.unwrap();
        assert_eq!(found.items[0].id, bobs.id);
    }

    #[tokio::test]
    async fn test_date_and_status_filters() {
        let store = MemoryStore::new();
        let p = product(&store, "Apple", 10, Decimal::ONE).await;
        let u = user();
        let order = place(&store, u, p.id, 1).await;
        let principal = Principal::new(u, Role::User);

        let future = OrderFilter { from: Some(Utc::now() + Duration::hours(1)), ..Default::default() };
        assert_eq!(list_orders(&store, &principal, future, PageRequest::default()).await.unwrap().total, 0);
        let window = OrderFilter { from: Some(order.created_at - Duration::seconds(1)), to: Some(Utc::now()), ..Default::default() };
        assert_eq!(list_orders(&store, &principal, window, PageRequest::default()).await.unwrap().total, 1);
        let shipped = OrderFilter { delivery_status: Some(DeliveryStatus::InTransit), ..Default::default() };
        assert_eq!(list_orders(&store, &principal, shipped, PageRequest::default()).await.unwrap().total, 0);

        let backwards = OrderFilter { from: Some(Utc::now()), to: Some(Utc::now() - Duration::days(1)), ..Default::default() };
        assert!(list_orders(&store, &principal, backwards, PageRequest::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_get_order_hides_foreign_orders() {
        let store = MemoryStore::new();
        let p = product(&store, "Apple", 10, Decimal::ONE).await;
        let owner = user();
        let order = place(&store, owner, p.id, 1).await;
        assert!(get_order(&store, &Principal::new(owner, Role::User), order.id).await.is_ok());
        assert!(get_order(&store, &Principal::new(user(), Role::Admin), order.id).await.is_ok());
        assert!(matches!(get_order(&store, &Principal::new(user(), Role::User), order.id).await, Err(EcommerceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let store = MemoryStore::new();
        let p = product(&store, "Apple", 10, Decimal::ONE).await;
        let order = place(&store, user(), p.id, 4).await;
        assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 6);

        let events = EventPublisher::noop();
        let saved = update_status(&store, &events, order.id, delivery(DeliveryStatus::Cancelled)).await.unwrap();
        assert_eq!(saved.delivery_status, DeliveryStatus::Cancelled);
        assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 10);

        update_status(&store, &events, order.id, delivery(DeliveryStatus::Cancelled)).await.unwrap();
        assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 10);
        assert!(matches!(
            update_status(&store, &events, order.id, delivery(DeliveryStatus::InTransit)).await,
            Err(EcommerceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_lifecycle_and_stats() {
        let store = MemoryStore::new();
        let p = product(&store, "Apple", 10, Decimal::new(5, 0)).await;
        let events = EventPublisher::noop();
        let a = place(&store, user(), p.id, 2).await;
        place(&store, user(), p.id, 1).await;

        update_status(&store, &events, a.id, delivery(DeliveryStatus::InTransit)).await.unwrap();
        let paid = StatusUpdate {
            delivery_status: Some(DeliveryStatus::Delivered),
            payment_status: Some(PaymentStatus::Completed),
            payment_id: Some("pay_123".into()),
            invoice_receipt: Some("https://cdn.example.com/invoice.pdf".into()),
        };
        let done = update_status(&store, &events, a.id, paid).await.unwrap();
        assert_eq!(done.payment_id.as_deref(), Some("pay_123"));

        let stats = stats(&store).await.unwrap();
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.placed, 1);
        assert_eq!(stats.pending_payments, 1);
        assert_eq!(stats.total_revenue, Decimal::new(10, 0));
    }

    #[tokio::test]
    async fn test_stale_payment_update_is_rejected() {
        let store = MemoryStore::new();
        let p = product(&store, "Apple", 10, Decimal::ONE).await;
        let order = place(&store, user(), p.id, 1).await;
        let payment = |status| StatusUpdate { payment_status: Some(status), ..Default::default() };

        // Two admins read the same pending order.
        let (mut first, mut second) = (order.clone(), order.clone());
        let expected = OrderState::of(&order);
        first.apply(payment(PaymentStatus::Completed)).unwrap();
        second.apply(payment(PaymentStatus::Failed)).unwrap();

        assert!(store.update_order_status(first, expected, false).await.unwrap().is_some());
        assert!(store.update_order_status(second, expected, false).await.unwrap().is_none());
        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Completed);

        let err = update_status(&store, &EventPublisher::noop(), order.id, payment(PaymentStatus::Failed)).await.unwrap_err();
        assert!(matches!(err, EcommerceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_order() {
        let store = MemoryStore::new();
        let p = product(&store, "Apple", 10, Decimal::ONE).await;
        let order = place(&store, user(), p.id, 1).await;
        let events = EventPublisher::noop();
        delete_order(&store, &events, order.id).await.unwrap();
        assert!(matches!(delete_order(&store, &events, order.id).await, Err(EcommerceError::NotFound(_))));
        assert!(matches!(update_status(&store, &events, order.id, delivery(DeliveryStatus::InTransit)).await, Err(EcommerceError::NotFound(_))));
    }
}
