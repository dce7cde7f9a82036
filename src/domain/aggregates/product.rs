//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Discount, MoreDetails, Name, Price, Quantity};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub image: Vec<String>,
    pub category: Vec<Uuid>,
    pub unit: String,
    pub stock: i32,
    pub price: Decimal,
    pub discount: Decimal,
    pub description: String,
    #[serde(rename = "more_details")]
    pub more_details: MoreDetails,
    pub publish: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new product.
#[derive(Clone, Debug)]
pub struct ProductDraft {
    pub name: Name,
    pub image: Vec<String>,
    pub category: Vec<Uuid>,
    pub unit: String,
    pub stock: i32,
    pub price: Price,
    pub discount: Discount,
    pub description: String,
    pub more_details: MoreDetails,
    pub publish: bool,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProductPatch {
    pub name: Option<Name>,
    pub image: Option<Vec<String>>,
    pub category: Option<Vec<Uuid>>,
    pub unit: Option<String>,
    pub stock: Option<i32>,
    pub price: Option<Price>,
    pub discount: Option<Discount>,
    pub description: Option<String>,
    pub more_details: Option<MoreDetails>,
    pub publish: Option<bool>,
}

/// Product data frozen into an order line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub image: Vec<String>,
}

fn check_stock(stock: i32) -> Result<i32> {
    if stock < 0 { return Err(EcommerceError::validation("stock must not be negative")); }
    Ok(stock)
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            name: draft.name.into_inner(),
            image: draft.image,
            category: dedup(draft.category),
            unit: draft.unit.trim().to_string(),
            stock: check_stock(draft.stock)?,
            price: draft.price.amount(),
            discount: draft.discount.percent(),
            description: draft.description,
            more_details: draft.more_details,
            publish: draft.publish,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, patch: ProductPatch) -> Result<()> {
        if let Some(stock) = patch.stock { self.stock = check_stock(stock)?; }
        if let Some(name) = patch.name { self.name = name.into_inner(); }
        if let Some(image) = patch.image { self.image = image; }
        if let Some(category) = patch.category { self.category = dedup(category); }
        if let Some(unit) = patch.unit { self.unit = unit.trim().to_string(); }
        if let Some(price) = patch.price { self.price = price.amount(); }
        if let Some(discount) = patch.discount { self.discount = discount.percent(); }
        if let Some(description) = patch.description { self.description = description; }
        if let Some(more_details) = patch.more_details { self.more_details = more_details; }
        if let Some(publish) = patch.publish { self.publish = publish; }
        self.touch();
        Ok(())
    }

    pub fn toggle_publish(&mut self) { self.publish = !self.publish; self.touch(); }

    pub fn unit_price(&self) -> Result<Price> { Price::new(self.price) }

    pub fn ensure_available(&self, qty: Quantity) -> Result<()> { qty.ensure_within(self.stock, &self.name) }

    pub fn remove_stock(&mut self, qty: Quantity) -> Result<()> {
        self.ensure_available(qty)?;
        self.stock -= qty.value();
        self.touch();
        Ok(())
    }

    pub fn restock(&mut self, qty: Quantity) {
        self.stock = self.stock.saturating_add(qty.value());
        self.touch();
    }

    pub fn in_category(&self, category_id: Uuid) -> bool { self.category.contains(&category_id) }

    pub fn snapshot(&self) -> ProductSnapshot { ProductSnapshot { name: self.name.clone(), image: self.image.clone() } }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn dedup(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(*id));
    ids
}

#[cfg(test)]
pub(crate) fn sample(name: &str, stock: i32, price: Decimal) -> Product {
    Product::create(ProductDraft {
        name: Name::new(name).unwrap(),
        image: vec![format!("https://cdn.example.com/{name}.png")],
        category: vec![],
        unit: "1 kg".into(),
        stock,
        price: Price::new(price).unwrap(),
        discount: Discount::new(Decimal::ZERO).unwrap(),
        description: String::new(),
        more_details: MoreDetails::new(),
        publish: true,
    })
    .unwrap()
}
