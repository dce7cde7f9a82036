//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{DeliveryStatus, Order, PaymentStatus};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Product(ProductEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: String, user_id: Uuid, total: Decimal },
    StatusChanged { order_id: String, delivery_status: DeliveryStatus, payment_status: PaymentStatus },
    Deleted { order_id: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    StockChanged { product_id: Uuid, delta: i32 },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "storefront.order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "storefront.order.status_changed",
            Self::Order(OrderEvent::Deleted { .. }) => "storefront.order.deleted",
            Self::Product(ProductEvent::StockChanged { .. }) => "storefront.product.stock_changed",
        }
    }

    pub fn order_placed(order: &Order) -> Self {
        Self::Order(OrderEvent::Placed { order_id: order.order_id.clone(), user_id: order.user_id, total: order.total_amt })
    }

    pub fn order_status_changed(order: &Order) -> Self {
        Self::Order(OrderEvent::StatusChanged {
            order_id: order.order_id.clone(),
            delivery_status: order.delivery_status,
            payment_status: order.payment_status,
        })
    }

    /// One stock event per order line; `sign` is -1 for checkout and 1 for restock.
    pub fn stock_changes(order: &Order, sign: i32) -> Vec<Self> {
        order
            .items
            .iter()
            .map(|i| Self::Product(ProductEvent::StockChanged { product_id: i.product_id, delta: sign * i.quantity }))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        let event = DomainEvent::Order(OrderEvent::Deleted { order_id: "ORD-1".into() });
        assert_eq!(event.subject(), "storefront.order.deleted");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order");
        assert_eq!(json["event"], "deleted");
    }
}
