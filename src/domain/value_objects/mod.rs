//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::{EcommerceError, Result};

const MAX_NAME_LEN: usize = 120;

/// Trimmed, non-empty display name (categories, products).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(EcommerceError::validation("name must not be empty")); }
        if value.chars().count() > MAX_NAME_LEN { return Err(EcommerceError::validation("name is too long")); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Unit price, strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub fn new(amount: Decimal) -> Result<Self> {
        if amount <= Decimal::ZERO { return Err(EcommerceError::validation("price must be greater than zero")); }
        Ok(Self(amount))
    }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn multiply(&self, qty: Quantity) -> Result<Decimal> {
        self.0.checked_mul(Decimal::from(qty.value())).ok_or_else(|| EcommerceError::validation("amount is too large"))
    }
}

/// Discount percentage in `0..=100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Discount(Decimal);

impl Discount {
    pub fn new(percent: Decimal) -> Result<Self> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(EcommerceError::validation("discount must be between 0 and 100"));
        }
        Ok(Self(percent))
    }
    pub fn percent(&self) -> Decimal { self.0 }
}

/// Line quantity, always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i32) -> Result<Self> {
        if value < 1 { return Err(EcommerceError::validation("quantity must be at least 1")); }
        Ok(Self(value))
    }
    pub fn value(&self) -> i32 { self.0 }

    pub fn add(&self, other: Quantity) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| EcommerceError::validation("quantity is too large"))
    }

    /// Fails with `InsufficientStock` when this quantity exceeds `stock`.
    pub fn ensure_within(&self, stock: i32, product: &str) -> Result<()> {
        if self.0 > stock { return Err(EcommerceError::insufficient_stock(product, self.0, stock)); }
        Ok(())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Human-readable, globally unique order reference (`ORD-` + UUIDv7).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate() -> Self {
        Self(format!("ORD-{}", Uuid::now_v7().simple().to_string().to_uppercase()))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Scalar attribute value for free-form product details.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
}

/// Admin-entered product attributes, kept in key order.
pub type MoreDetails = BTreeMap<String, DetailValue>;

// =============================================================================
// Pagination
// =============================================================================

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Offset pagination request, normalised to `page >= 1` and `1 <= limit <= 100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest { page: u32, limit: u32 }

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }
    pub fn page(&self) -> u32 { self.page }
    pub fn limit(&self) -> u32 { self.limit }
    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.limit) }
}

impl Default for PageRequest { fn default() -> Self { Self::new(None, None) } }

/// One page of results plus the total number of matches.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    /// Slices an already filtered and sorted collection.
    pub fn from_all(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .collect();
        Self { items, total, request }
    }

    pub fn total_pages(&self) -> u64 { self.total.div_ceil(u64::from(self.request.limit())) }
    pub fn has_next_page(&self) -> bool { u64::from(self.request.page()) < self.total_pages() }
    pub fn has_prev_page(&self) -> bool { self.request.page() > 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_trimmed() {
        let name = Name::new("  Fresh Fruit ").unwrap();
        assert_eq!(name.as_str(), "Fresh Fruit");
        assert!(Name::new("   ").is_err());
    }

    #[test]
    fn test_price_and_discount_bounds() {
        assert!(Price::new(Decimal::ZERO).is_err());
        assert!(Discount::new(Decimal::new(101, 0)).is_err());
        assert!(Discount::new(Decimal::ZERO).is_ok());
        let price = Price::new(Decimal::new(1250, 2)).unwrap();
        assert_eq!(price.multiply(Quantity::new(3).unwrap()).unwrap(), Decimal::new(3750, 2));
    }

    #[test]
    fn test_price_multiply_overflow_is_rejected() {
        let price = Price::new(Decimal::MAX).unwrap();
        assert!(matches!(price.multiply(Quantity::new(2).unwrap()), Err(EcommerceError::Validation(_))));
        assert_eq!(price.multiply(Quantity::new(1).unwrap()).unwrap(), Decimal::MAX);
    }

    #[test]
    fn test_quantity_rejects_zero_and_checks_stock() {
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::new(-2).is_err());
        let q = Quantity::new(3).unwrap().add(Quantity::new(3).unwrap()).unwrap();
        assert!(matches!(q.ensure_within(5, "apple"), Err(EcommerceError::InsufficientStock { requested: 6, available: 5, .. })));
        assert!(q.ensure_within(6, "apple").is_ok());
    }

    #[test]
    fn test_order_numbers_are_distinct() {
        let a = OrderNumber::generate();
        let b = OrderNumber::generate();
        assert!(a.as_str().starts_with("ORD-"));
        assert_eq!(a.as_str().len(), 36);
        assert_ne!(a, b);
    }

    #[test]
    fn test_page_arithmetic() {
        let page = Page::from_all((1..=25).collect::<Vec<_>>(), PageRequest::new(Some(3), Some(10)));
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total_pages(), 3);
        assert!(!page.has_next_page());
        assert!(page.has_prev_page());
        assert_eq!(PageRequest::new(Some(0), Some(1000)).limit(), MAX_PAGE_LIMIT);
        assert_eq!(PageRequest::new(Some(0), None).offset(), 0);
    }

    #[test]
    fn test_detail_values_keep_scalars() {
        let details: MoreDetails = serde_json::from_str(r#"{"origin":"Spain","organic":true,"weight":1.5}"#).unwrap();
        assert_eq!(details.get("organic"), Some(&DetailValue::Flag(true)));
        assert_eq!(details.keys().collect::<Vec<_>>(), vec!["organic", "origin", "weight"]);
    }
}
