//! In-process store. Each operation takes the table lock once, which makes
//! every method atomic.

use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{needle, CategoryFilter, OrderFilter, OrderState, Placement, ProductFilter, Store, UserFilter};
use crate::domain::aggregates::{
    Address, CartItem, Category, Order, OrderStats, Product, ProductPatch, User, UserStats,
};
use crate::domain::value_objects::{Page, PageRequest, Quantity};
use crate::{EcommerceError, Result};

#[derive(Default)]
struct Tables {
    categories: HashMap<Uuid, Category>,
    products: HashMap<Uuid, Product>,
    cart: HashMap<Uuid, CartItem>,
    orders: HashMap<Uuid, Order>,
    addresses: HashMap<Uuid, Address>,
    users: HashMap<Uuid, User>,
}

impl Tables {
    fn category_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.categories.values().any(|c| Some(c.id) != except && c.same_name(name))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Users come from the auth service; this seeds them directly.
    pub async fn insert_user(&self, user: User) -> User {
        self.tables.write().await.users.insert(user.id, user.clone());
        user
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, Uuid)) {
    items.sort_by_key(|item| Reverse(key(item)));
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_category(&self, category: Category) -> Result<Category> {
        let mut t = self.tables.write().await;
        if t.category_name_taken(&category.name, None) {
            return Err(EcommerceError::Conflict(format!("category {} already exists", category.name)));
        }
        t.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn categories_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>> {
        let t = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| t.categories.get(id).cloned()).collect())
    }

    async fn list_categories(&self, filter: &CategoryFilter, page: PageRequest) -> Result<Page<Category>> {
        let search = needle(&filter.search);
        let t = self.tables.read().await;
        let mut all: Vec<Category> = t
            .categories
            .values()
            .filter(|c| search.as_ref().map_or(true, |s| c.name.to_lowercase().contains(s)))
            .cloned()
            .collect();
        all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(Page::from_all(all, page))
    }

    async fn update_category(&self, category: Category) -> Result<Option<Category>> {
        let mut t = self.tables.write().await;
        if !t.categories.contains_key(&category.id) { return Ok(None); }
        if t.category_name_taken(&category.name, Some(category.id)) {
            return Err(EcommerceError::Conflict(format!("category {} already exists", category.name)));
        }
        t.categories.insert(category.id, category.clone());
        Ok(Some(category))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        if !t.categories.contains_key(&id) { return Ok(false); }
        if t.products.values().any(|p| p.in_category(id)) {
            return Err(EcommerceError::Conflict("category is still used by products".into()));
        }
        Ok(t.categories.remove(&id).is_some())
    }

    async fn insert_product(&self, product: Product) -> Result<Product> {
        self.tables.write().await.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let t = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| t.products.get(id).cloned()).collect())
    }

    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>> {
        let search = needle(&filter.search);
        let t = self.tables.read().await;
        let mut all: Vec<Product> = t
            .products
            .values()
            .filter(|p| filter.category.map_or(true, |c| p.in_category(c)))
            .filter(|p| search.as_ref().map_or(true, |s| p.name.to_lowercase().contains(s)))
            .filter(|p| filter.min_price.map_or(true, |min| p.price >= min))
            .filter(|p| filter.max_price.map_or(true, |max| p.price <= max))
            .filter(|p| filter.publish.map_or(true, |publish| p.publish == publish))
            .cloned()
            .collect();
        newest_first(&mut all, |p| (p.created_at, p.id));
        Ok(Page::from_all(all, page))
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>> {
        let mut t = self.tables.write().await;
        let Some(slot) = t.products.get_mut(&id) else { return Ok(None) };
        let mut product = slot.clone();
        product.apply(patch)?;
        *slot = product.clone();
        Ok(Some(product))
    }

    async fn toggle_publish(&self, id: Uuid) -> Result<Option<Product>> {
        let mut t = self.tables.write().await;
        Ok(t.products.get_mut(&id).map(|product| {
            product.toggle_publish();
            product.clone()
        }))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        let removed = t.products.remove(&id).is_some();
        if removed { t.cart.retain(|_, item| item.product_id != id); }
        Ok(removed)
    }

    async fn cart_items(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
        let t = self.tables.read().await;
        let mut items: Vec<CartItem> = t.cart.values().filter(|i| i.user_id == user_id).cloned().collect();
        newest_first(&mut items, |i| (i.created_at, i.id));
        Ok(items)
    }

    async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, qty: Quantity) -> Result<CartItem> {
        let mut guard = self.tables.write().await;
        let t = &mut *guard;
        let product = t.products.get(&product_id).ok_or(EcommerceError::NotFound("Product"))?;
        if let Some(item) = t.cart.values_mut().find(|i| i.user_id == user_id && i.product_id == product_id) {
            item.merge(product, qty)?;
            return Ok(item.clone());
        }
        let item = CartItem::open(user_id, product, qty)?;
        t.cart.insert(item.id, item.clone());
        Ok(item)
    }

    async fn set_cart_quantity(&self, user_id: Uuid, item_id: Uuid, qty: Quantity) -> Result<CartItem> {
        let mut guard = self.tables.write().await;
        let t = &mut *guard;
        let item = t
            .cart
            .get_mut(&item_id)
            .filter(|i| i.user_id == user_id)
            .ok_or(EcommerceError::NotFound("Cart item"))?;
        let product = t.products.get(&item.product_id).ok_or(EcommerceError::NotFound("Product"))?;
        item.set_quantity(product, qty)?;
        Ok(item.clone())
    }

    async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        if t.cart.get(&item_id).map_or(false, |i| i.user_id == user_id) {
            t.cart.remove(&item_id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<u64> {
        let mut t = self.tables.write().await;
        let before = t.cart.len();
        t.cart.retain(|_, i| i.user_id != user_id);
        Ok((before - t.cart.len()) as u64)
    }

    async fn place_orders(&self, placement: Placement) -> Result<Vec<Order>> {
        let mut guard = self.tables.write().await;
        let t = &mut *guard;

        // Validate everything before the first write.
        let mut wanted: Vec<(Uuid, Quantity)> = Vec::new();
        for line in placement.orders.iter().flat_map(|o| o.items.iter()) {
            let qty = line.quantity()?;
            match wanted.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, total)) => *total = total.add(qty)?,
                None => wanted.push((line.product_id, qty)),
            }
        }
        for (product_id, total) in &wanted {
            let product = t.products.get(product_id).ok_or(EcommerceError::NotFound("Product"))?;
            total.ensure_within(product.stock, &product.name)?;
        }
        for order in &placement.orders {
            if t.orders.values().any(|o| o.order_id == order.order_id) {
                return Err(EcommerceError::Conflict(format!("order id {} already exists", order.order_id)));
            }
        }

        for (product_id, total) in wanted {
            if let Some(product) = t.products.get_mut(&product_id) {
                product.remove_stock(total)?;
            }
        }
        for order in &placement.orders {
            t.orders.insert(order.id, order.clone());
        }
        if placement.clear_cart {
            t.cart.retain(|_, i| i.user_id != placement.user_id);
        }
        Ok(placement.orders)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        let search = needle(&filter.search);
        let t = self.tables.read().await;
        let mut all: Vec<Order> = t
            .orders
            .values()
            .filter(|o| filter.user_id.map_or(true, |u| o.user_id == u))
            .filter(|o| filter.delivery_status.map_or(true, |s| o.delivery_status == s))
            .filter(|o| filter.payment_status.map_or(true, |s| o.payment_status == s))
            .filter(|o| filter.from.map_or(true, |from| o.created_at >= from))
            .filter(|o| filter.to.map_or(true, |to| o.created_at <= to))
            .filter(|o| search.as_ref().map_or(true, |s| o.order_id.to_lowercase().contains(s)))
            .cloned()
            .collect();
        newest_first(&mut all, |o| (o.created_at, o.id));
        Ok(Page::from_all(all, page))
    }

    async fn update_order_status(&self, order: Order, expected: OrderState, restock: bool) -> Result<Option<Order>> {
        let mut guard = self.tables.write().await;
        let t = &mut *guard;
        match t.orders.get(&order.id) {
            Some(stored) if OrderState::of(stored) == expected => {}
            _ => return Ok(None),
        }
        if restock {
            for line in &order.items {
                if let Some(product) = t.products.get_mut(&line.product_id) {
                    product.restock(line.quantity()?);
                }
            }
        }
        t.orders.insert(order.id, order.clone());
        Ok(Some(order))
    }

    async fn delete_order(&self, id: Uuid) -> Result<bool> {
        Ok(self.tables.write().await.orders.remove(&id).is_some())
    }

    async fn order_stats(&self) -> Result<OrderStats> {
        let t = self.tables.read().await;
        let mut stats = OrderStats::default();
        for o in t.orders.values() {
            stats.record(o.delivery_status, o.payment_status, o.total_amt, 1);
        }
        Ok(stats)
    }

    async fn insert_address(&self, address: Address) -> Result<Address> {
        self.tables.write().await.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn get_address(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>> {
        let t = self.tables.read().await;
        Ok(t.addresses.get(&id).filter(|a| a.is_owned_by(user_id)).cloned())
    }

    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
        let t = self.tables.read().await;
        let mut all: Vec<Address> = t.addresses.values().filter(|a| a.is_owned_by(user_id)).cloned().collect();
        newest_first(&mut all, |a| (a.created_at, a.id));
        Ok(all)
    }

    async fn update_address(&self, address: Address) -> Result<Option<Address>> {
        let mut t = self.tables.write().await;
        match t.addresses.get_mut(&address.id).filter(|a| a.is_owned_by(address.user_id)) {
            Some(slot) => {
                *slot = address.clone();
                Ok(Some(address))
            }
            None => Ok(None),
        }
    }

    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        if t.addresses.get(&id).map_or(false, |a| a.is_owned_by(user_id)) {
            t.addresses.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>> {
        let search = needle(&filter.search);
        let t = self.tables.read().await;
        let mut all: Vec<User> = t
            .users
            .values()
            .filter(|u| filter.role.map_or(true, |r| u.role == r))
            .filter(|u| filter.status.map_or(true, |s| u.status == s))
            .filter(|u| search.as_ref().map_or(true, |s| u.matches(s)))
            .cloned()
            .collect();
        newest_first(&mut all, |u| (u.created_at, u.id));
        Ok(Page::from_all(all, page))
    }

    async fn user_stats(&self) -> Result<UserStats> {
        let t = self.tables.read().await;
        let mut stats = UserStats::default();
        t.users.values().for_each(|u| stats.record(u));
        Ok(stats)
    }

    async fn update_user(&self, user: User) -> Result<Option<User>> {
        let mut t = self.tables.write().await;
        match t.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut t = self.tables.write().await;
        if t.users.remove(&id).is_none() { return Ok(false); }
        t.cart.retain(|_, i| i.user_id != id);
        t.addresses.retain(|_, a| a.user_id != id);
        Ok(true)
    }
}
