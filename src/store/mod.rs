//! Persistence port.
//!
//! Every method that reads and then writes (cart merge, quantity update,
//! checkout, cancellation) runs as one atomic unit inside the implementation,
//! so callers never hold a stale stock figure across a write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, CartItem, Category, DeliveryStatus, Order, OrderStats, PaymentStatus, Product, ProductPatch, Role, User, UserStats,
    UserStatus,
};
use crate::domain::value_objects::{Page, PageRequest, Quantity};
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Clone, Debug, Default)]
pub struct CategoryFilter {
    pub search: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub publish: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct OrderFilter {
    /// Restricts to one customer; `None` lists every order.
    pub user_id: Option<Uuid>,
    pub delivery_status: Option<DeliveryStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub search: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
}

/// Orders to commit in one checkout.
#[derive(Clone, Debug)]
pub struct Placement {
    pub user_id: Uuid,
    pub orders: Vec<Order>,
    /// Empty the user's cart in the same transaction.
    pub clear_cart: bool,
}

/// Status pair an order update is conditioned on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderState {
    pub delivery: DeliveryStatus,
    pub payment: PaymentStatus,
}

impl OrderState {
    pub fn of(order: &Order) -> Self {
        Self { delivery: order.delivery_status, payment: order.payment_status }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // Categories
    async fn insert_category(&self, category: Category) -> Result<Category>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>>;
    async fn categories_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>>;
    async fn list_categories(&self, filter: &CategoryFilter, page: PageRequest) -> Result<Page<Category>>;
    /// Fails with `Conflict` when the new name is taken.
    async fn update_category(&self, category: Category) -> Result<Option<Category>>;
    /// Fails with `Conflict` while products still reference the category.
    async fn delete_category(&self, id: Uuid) -> Result<bool>;

    // Products
    async fn insert_product(&self, product: Product) -> Result<Product>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>>;
    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>>;
    /// Applies `patch` to the stored row while holding it, so stock moved by a
    /// concurrent checkout or cancellation is never overwritten.
    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>>;
    async fn toggle_publish(&self, id: Uuid) -> Result<Option<Product>>;
    /// Also drops cart lines pointing at the product.
    async fn delete_product(&self, id: Uuid) -> Result<bool>;

    // Cart
    /// Most recently added first.
    async fn cart_items(&self, user_id: Uuid) -> Result<Vec<CartItem>>;
    /// Inserts or merges the line for `(user_id, product_id)` under a stock check.
    async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, qty: Quantity) -> Result<CartItem>;
    /// Replaces the quantity of a line owned by `user_id` under a stock check.
    async fn set_cart_quantity(&self, user_id: Uuid, item_id: Uuid, qty: Quantity) -> Result<CartItem>;
    async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool>;
    async fn clear_cart(&self, user_id: Uuid) -> Result<u64>;

    // Orders
    /// Decrements stock for every line, inserts the orders and optionally clears
    /// the cart; all or nothing.
    async fn place_orders(&self, placement: Placement) -> Result<Vec<Order>>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>>;
    /// Saves `order` if its stored delivery and payment statuses still equal
    /// `expected`, restoring stock for its lines when `restock` is set. `None`
    /// means the order is gone or changed underneath.
    async fn update_order_status(&self, order: Order, expected: OrderState, restock: bool) -> Result<Option<Order>>;
    async fn delete_order(&self, id: Uuid) -> Result<bool>;
    async fn order_stats(&self) -> Result<OrderStats>;

    // Addresses
    async fn insert_address(&self, address: Address) -> Result<Address>;
    async fn get_address(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>>;
    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>>;
    async fn update_address(&self, address: Address) -> Result<Option<Address>>;
    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<bool>;

    // Users
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>>;
    async fn user_stats(&self) -> Result<UserStats>;
    async fn update_user(&self, user: User) -> Result<Option<User>>;
    /// Removes the user's cart lines and addresses; orders are kept.
    async fn delete_user(&self, id: Uuid) -> Result<bool>;
}

/// Lower-cased, trimmed search needle; blank input means no filter.
pub(crate) fn needle(search: &Option<String>) -> Option<String> {
    search.as_ref().map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty())
}
