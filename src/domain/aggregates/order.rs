//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::aggregates::{AddressFields, Product, ProductSnapshot};
use crate::domain::value_objects::{OrderNumber, Quantity};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: String,
    pub items: Vec<LineItem>,
    #[serde(rename = "delivery_address")]
    pub delivery_address: AddressFields,
    #[serde(rename = "payment_method")]
    pub payment_method: PaymentMethod,
    #[serde(rename = "payment_id")]
    pub payment_id: Option<String>,
    #[serde(rename = "invoice_receipt")]
    pub invoice_receipt: Option<String>,
    #[serde(rename = "payment_status")]
    pub payment_status: PaymentStatus,
    #[serde(rename = "delivery_status")]
    pub delivery_status: DeliveryStatus,
    pub sub_total_amt: Decimal,
    pub total_amt: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: Uuid,
    #[serde(rename = "product_details")]
    pub product_details: ProductSnapshot,
    pub quantity: i32,
    pub price: Decimal,
    pub sub_total: Decimal,
}

impl LineItem {
    /// Prices `qty` units of `product` at its current price.
    pub fn price(product: &Product, qty: Quantity) -> Result<Self> {
        let price = product.unit_price()?;
        Ok(Self {
            product_id: product.id,
            product_details: product.snapshot(),
            quantity: qty.value(),
            price: price.amount(),
            sub_total: price.multiply(qty)?,
        })
    }

    pub fn quantity(&self) -> Result<Quantity> { Quantity::new(self.quantity) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    Card,
    Online,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryStatus {
    #[default]
    Placed,
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placed => "Placed",
            Self::InTransit => "In Transit",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (Self::Placed, Self::InTransit) | (Self::Placed, Self::Cancelled) | (Self::InTransit, Self::Delivered)
        )
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!((self, next), (Self::Pending, _) | (Self::Completed, Self::Refunded))
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cash_on_delivery",
            Self::Card => "card",
            Self::Online => "online",
        }
    }
}

macro_rules! parse_by_name {
    ($ty:ty, [$($variant:expr),+ $(,)?]) => {
        impl FromStr for $ty {
            type Err = EcommerceError;
            fn from_str(s: &str) -> Result<Self> {
                [$($variant),+]
                    .into_iter()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| EcommerceError::validation(format!("unknown {}: {s}", stringify!($ty))))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }
    };
}

parse_by_name!(DeliveryStatus, [DeliveryStatus::Placed, DeliveryStatus::InTransit, DeliveryStatus::Delivered, DeliveryStatus::Cancelled]);
parse_by_name!(PaymentStatus, [PaymentStatus::Pending, PaymentStatus::Completed, PaymentStatus::Failed, PaymentStatus::Cancelled, PaymentStatus::Refunded]);
parse_by_name!(PaymentMethod, [PaymentMethod::CashOnDelivery, PaymentMethod::Card, PaymentMethod::Online]);

/// Admin status update; `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct StatusUpdate {
    pub delivery_status: Option<DeliveryStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_id: Option<String>,
    pub invoice_receipt: Option<String>,
}

impl StatusUpdate {
    pub fn is_empty(&self) -> bool {
        self.delivery_status.is_none() && self.payment_status.is_none() && self.payment_id.is_none() && self.invoice_receipt.is_none()
    }
}

impl Order {
    pub fn place(user_id: Uuid, items: Vec<LineItem>, delivery_address: AddressFields, payment_method: PaymentMethod) -> Result<Self> {
        if items.is_empty() { return Err(EcommerceError::validation("order must contain at least one item")); }
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), user_id, order_id: OrderNumber::generate().into_inner(), items,
            delivery_address, payment_method, payment_id: None, invoice_receipt: None,
            payment_status: PaymentStatus::Pending, delivery_status: DeliveryStatus::Placed,
            sub_total_amt: Decimal::ZERO, total_amt: Decimal::ZERO, created_at: now, updated_at: now,
        };
        order.recalculate()?;
        Ok(order)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool { self.user_id == user_id }

    /// Applies an admin update. Returns true when the order moved into `Cancelled`.
    pub fn apply(&mut self, update: StatusUpdate) -> Result<bool> {
        if update.is_empty() { return Err(EcommerceError::validation("nothing to update")); }
        let mut cancelled = false;
        if let Some(next) = update.delivery_status {
            if next != self.delivery_status {
                if !self.delivery_status.can_transition_to(next) {
                    return Err(EcommerceError::validation(format!("cannot move order from {} to {}", self.delivery_status, next)));
                }
                cancelled = next == DeliveryStatus::Cancelled;
            }
        }
        if let Some(next) = update.payment_status {
            if next != self.payment_status && !self.payment_status.can_transition_to(next) {
                return Err(EcommerceError::validation(format!("cannot move payment from {} to {}", self.payment_status, next)));
            }
        }
        if let Some(next) = update.delivery_status { self.delivery_status = next; }
        if let Some(next) = update.payment_status { self.payment_status = next; }
        if let Some(payment_id) = update.payment_id { self.payment_id = Some(payment_id); }
        if let Some(invoice) = update.invoice_receipt { self.invoice_receipt = Some(invoice); }
        self.touch();
        Ok(cancelled)
    }

    fn recalculate(&mut self) -> Result<()> {
        self.sub_total_amt = self
            .items
            .iter()
            .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.sub_total))
            .ok_or_else(|| EcommerceError::validation("amount is too large"))?;
        // No tax or shipping surcharge.
        self.total_amt = self.sub_total_amt;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

/// Aggregate figures for the admin dashboard.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub total_orders: u64,
    pub placed: u64,
    pub in_transit: u64,
    pub delivered: u64,
    pub cancelled: u64,
    pub pending_payments: u64,
    pub total_revenue: Decimal,
}

impl OrderStats {
    pub fn record(&mut self, delivery: DeliveryStatus, payment: PaymentStatus, total: Decimal, count: u64) {
        self.total_orders += count;
        match delivery {
            DeliveryStatus::Placed => self.placed += count,
            DeliveryStatus::InTransit => self.in_transit += count,
            DeliveryStatus::Delivered => self.delivered += count,
            DeliveryStatus::Cancelled => self.cancelled += count,
        }
        match payment {
            PaymentStatus::Pending => self.pending_payments += count,
            PaymentStatus::Completed => self.total_revenue = self.total_revenue.saturating_add(total),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::address::sample_fields;
    use crate::domain::aggregates::product::sample;

    fn order() -> Order {
        let p = sample("Widget", 10, Decimal::new(10, 0));
        let line = LineItem::price(&p, Quantity::new(2).unwrap()).unwrap();
        Order::place(Uuid::new_v4(), vec![line], sample_fields(), PaymentMethod::default()).unwrap()
    }

    #[test]
    fn test_order_totals_match_lines() {
        let o = order();
        assert_eq!(o.items[0].sub_total, Decimal::new(20, 0));
        assert_eq!(o.total_amt, o.items.iter().map(|i| i.sub_total).sum::<Decimal>());
        assert_eq!(o.sub_total_amt, o.total_amt);
        assert_eq!(o.payment_status, PaymentStatus::Pending);
        assert_eq!(o.delivery_status, DeliveryStatus::Placed);
    }

    #[test]
    fn test_totals_that_overflow_are_rejected() {
        let p = sample("Yacht", 10, Decimal::MAX);
        assert!(matches!(LineItem::price(&p, Quantity::new(2).unwrap()), Err(EcommerceError::Validation(_))));
        let line = LineItem::price(&p, Quantity::new(1).unwrap()).unwrap();
        let placed = Order::place(Uuid::new_v4(), vec![line.clone(), line], sample_fields(), PaymentMethod::default());
        assert!(matches!(placed, Err(EcommerceError::Validation(_))));
    }

    #[test]
    fn test_order_workflow() {
        let mut o = order();
        let update = |d| StatusUpdate { delivery_status: Some(d), ..Default::default() };
        assert!(!o.apply(update(DeliveryStatus::InTransit)).unwrap());
        assert!(o.apply(update(DeliveryStatus::Cancelled)).is_err());
        assert!(!o.apply(update(DeliveryStatus::Delivered)).unwrap());
        assert_eq!(o.delivery_status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_cancel_only_from_placed() {
        let mut o = order();
        let cancelled = o.apply(StatusUpdate { delivery_status: Some(DeliveryStatus::Cancelled), ..Default::default() }).unwrap();
        assert!(cancelled);
        // Same state again is a no-op, not a second cancellation.
        let again = o.apply(StatusUpdate { delivery_status: Some(DeliveryStatus::Cancelled), ..Default::default() }).unwrap();
        assert!(!again);
    }

    #[test]
    fn test_payment_transitions() {
        let mut o = order();
        o.apply(StatusUpdate { payment_status: Some(PaymentStatus::Completed), payment_id: Some("pi_1".into()), ..Default::default() }).unwrap();
        assert_eq!(o.payment_id.as_deref(), Some("pi_1"));
        assert!(o.apply(StatusUpdate { payment_status: Some(PaymentStatus::Failed), ..Default::default() }).is_err());
        o.apply(StatusUpdate { payment_status: Some(PaymentStatus::Refunded), ..Default::default() }).unwrap();
        assert!(o.apply(StatusUpdate::default()).is_err());
    }

    #[test]
    fn test_status_names() {
        assert_eq!("in transit".parse::<DeliveryStatus>().unwrap(), DeliveryStatus::InTransit);
        assert_eq!(serde_json::to_value(DeliveryStatus::InTransit).unwrap(), "In Transit");
        assert_eq!(serde_json::to_value(PaymentStatus::Refunded).unwrap(), "refunded");
        assert!("shipped".parse::<DeliveryStatus>().is_err());
    }

    #[test]
    fn test_stats_count_revenue_from_completed_payments() {
        let mut stats = OrderStats::default();
        stats.record(DeliveryStatus::Placed, PaymentStatus::Pending, Decimal::new(5, 0), 1);
        stats.record(DeliveryStatus::Delivered, PaymentStatus::Completed, Decimal::new(7, 0), 1);
        assert_eq!(stats.total_orders, 2);
        assert_eq!(stats.pending_payments, 1);
        assert_eq!(stats.total_revenue, Decimal::new(7, 0));
        stats.record(DeliveryStatus::Delivered, PaymentStatus::Completed, Decimal::MAX, 1);
        assert_eq!(stats.total_revenue, Decimal::MAX);
    }
}
