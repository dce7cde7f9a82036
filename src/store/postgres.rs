//! Postgres store on sqlx.
//!
//! Snapshots (`items`, `delivery_address`) and `more_details` live in JSONB
//! columns. Read-then-write operations run in a transaction and lock the
//! product row; stock only moves through conditional updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::{needle, CategoryFilter, OrderFilter, OrderState, Placement, ProductFilter, Store, UserFilter};
use crate::domain::aggregates::{
    Address, AddressFields, CartItem, Category, LineItem, Order, OrderStats, Product, ProductPatch, User, UserStats,
};
use crate::domain::value_objects::{MoreDetails, Page, PageRequest, Quantity};
use crate::{EcommerceError, Result};

const PRODUCT_COLUMNS: &str =
    "id, name, image, category, unit, stock, price, discount, description, more_details, publish, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, order_id, items, delivery_address, payment_method, payment_id, invoice_receipt, \
     payment_status, delivery_status, sub_total_amt, total_amt, created_at, updated_at";
const ADDRESS_COLUMNS: &str = "id, user_id, address_line, city, state, pincode, country, mobile, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, email, avatar, mobile, verify_email, status, role, last_login_date, created_at";

const PRODUCT_FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR $1 = ANY(category))
      AND ($2::text IS NULL OR strpos(lower(name), $2) > 0)
      AND ($3::numeric IS NULL OR price >= $3)
      AND ($4::numeric IS NULL OR price <= $4)
      AND ($5::bool IS NULL OR publish = $5)
"#;

const ORDER_FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR user_id = $1)
      AND ($2::text IS NULL OR delivery_status = $2)
      AND ($3::text IS NULL OR payment_status = $3)
      AND ($4::timestamptz IS NULL OR created_at >= $4)
      AND ($5::timestamptz IS NULL OR created_at <= $5)
      AND ($6::text IS NULL OR strpos(lower(order_id), $6) > 0)
"#;

const USER_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR role = $1)
      AND ($2::text IS NULL OR status = $2)
      AND ($3::text IS NULL OR strpos(lower(name), $3) > 0 OR strpos(lower(email), $3) > 0)
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(url: &str, max_connections: u32) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Maps a unique-index violation to `Conflict`.
fn unique_conflict(err: sqlx::Error, message: &str) -> EcommerceError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => EcommerceError::Conflict(message.to_string()),
        _ => EcommerceError::Database(err),
    }
}

fn page_bounds(page: PageRequest) -> (i64, i64) {
    (i64::from(page.limit()), page.offset() as i64)
}

fn corrupt(what: &str, err: EcommerceError) -> EcommerceError {
    EcommerceError::Internal(format!("corrupt {what} row: {err}"))
}

// =============================================================================
// Rows
// =============================================================================

#[derive(FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    image: Vec<String>,
    category: Vec<Uuid>,
    unit: String,
    stock: i32,
    price: Decimal,
    discount: Decimal,
    description: String,
    more_details: Json<MoreDetails>,
    publish: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id, name: r.name, image: r.image, category: r.category, unit: r.unit, stock: r.stock,
            price: r.price, discount: r.discount, description: r.description, more_details: r.more_details.0,
            publish: r.publish, created_at: r.created_at, updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    order_id: String,
    items: Json<Vec<LineItem>>,
    delivery_address: Json<AddressFields>,
    payment_method: String,
    payment_id: Option<String>,
    invoice_receipt: Option<String>,
    payment_status: String,
    delivery_status: String,
    sub_total_amt: Decimal,
    total_amt: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = EcommerceError;

    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            order_id: r.order_id,
            items: r.items.0,
            delivery_address: r.delivery_address.0,
            payment_method: r.payment_method.parse().map_err(|e| corrupt("order", e))?,
            payment_id: r.payment_id,
            invoice_receipt: r.invoice_receipt,
            payment_status: r.payment_status.parse().map_err(|e| corrupt("order", e))?,
            delivery_status: r.delivery_status.parse().map_err(|e| corrupt("order", e))?,
            sub_total_amt: r.sub_total_amt,
            total_amt: r.total_amt,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AddressRow {
    id: Uuid,
    user_id: Uuid,
    address_line: String,
    city: String,
    state: String,
    pincode: String,
    country: String,
    mobile: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(r: AddressRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            fields: AddressFields {
                address_line: r.address_line, city: r.city, state: r.state,
                pincode: r.pincode, country: r.country, mobile: r.mobile,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    avatar: Option<String>,
    mobile: Option<String>,
    verify_email: bool,
    status: String,
    role: String,
    last_login_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = EcommerceError;

    fn try_from(r: UserRow) -> Result<Self> {
        Ok(Self {
            id: r.id, name: r.name, email: r.email, avatar: r.avatar, mobile: r.mobile,
            verify_email: r.verify_email,
            status: r.status.parse().map_err(|e| corrupt("user", e))?,
            role: r.role.parse().map_err(|e| corrupt("user", e))?,
            last_login_date: r.last_login_date,
            created_at: r.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserStatsRow {
    total_users: i64,
    active_users: i64,
    inactive_users: i64,
    suspended_users: i64,
    admin_users: i64,
    verified_users: i64,
}

async fn lock_product(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Option<Product>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(Product::from))
}

/// Writes every column of a row previously taken with [`lock_product`].
async fn save_product(tx: &mut Transaction<'_, Postgres>, product: &Product) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET name = $2, image = $3, category = $4, unit = $5, stock = $6, price = $7, discount = $8,
            description = $9, more_details = $10, publish = $11, updated_at = $12
        WHERE id = $1
        "#,
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.image)
    .bind(&product.category)
    .bind(&product.unit)
    .bind(product.stock)
    .bind(product.price)
    .bind(product.discount)
    .bind(&product.description)
    .bind(Json(&product.more_details))
    .bind(product.publish)
    .bind(product.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn insert_category(&self, category: Category) -> Result<Category> {
        sqlx::query("INSERT INTO categories (id, name, image, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.image)
            .bind(category.created_at)
            .bind(category.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_conflict(e, &format!("category {} already exists", category.name)))?;
        Ok(category)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(category)
    }

    async fn categories_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ANY($1) ORDER BY name")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    async fn list_categories(&self, filter: &CategoryFilter, page: PageRequest) -> Result<Page<Category>> {
        let search = needle(&filter.search);
        let (limit, offset) = page_bounds(page);
        let items = sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE ($1::text IS NULL OR strpos(lower(name), $1) > 0) ORDER BY lower(name) LIMIT $2 OFFSET $3",
        )
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE ($1::text IS NULL OR strpos(lower(name), $1) > 0)")
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;
        Ok(Page { items, total: total as u64, request: page })
    }

    async fn update_category(&self, category: Category) -> Result<Option<Category>> {
        let updated = sqlx::query("UPDATE categories SET name = $2, image = $3, updated_at = $4 WHERE id = $1")
            .bind(category.id)
            .bind(&category.name)
            .bind(&category.image)
            .bind(category.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| unique_conflict(e, &format!("category {} already exists", category.name)))?;
        Ok((updated.rows_affected() > 0).then_some(category))
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let in_use: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE $1 = ANY(category))")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if in_use {
            return Err(EcommerceError::Conflict("category is still used by products".into()));
        }
        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn insert_product(&self, product: Product) -> Result<Product> {
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.image)
        .bind(&product.category)
        .bind(&product.unit)
        .bind(product.stock)
        .bind(product.price)
        .bind(product.discount)
        .bind(&product.description)
        .bind(Json(&product.more_details))
        .bind(product.publish)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(product)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_products(&self, filter: &ProductFilter, page: PageRequest) -> Result<Page<Product>> {
        let search = needle(&filter.search);
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products {PRODUCT_FILTER} ORDER BY created_at DESC, id DESC LIMIT $6 OFFSET $7"
        ))
        .bind(filter.category)
        .bind(&search)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.publish)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products {PRODUCT_FILTER}"))
            .bind(filter.category)
            .bind(&search)
            .bind(filter.min_price)
            .bind(filter.max_price)
            .bind(filter.publish)
            .fetch_one(&self.pool)
            .await?;
        Ok(Page { items: rows.into_iter().map(Product::from).collect(), total: total as u64, request: page })
    }

    async fn update_product(&self, id: Uuid, patch: ProductPatch) -> Result<Option<Product>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut product) = lock_product(&mut tx, id).await? else { return Ok(None) };
        product.apply(patch)?;
        save_product(&mut tx, &product).await?;
        tx.commit().await?;
        Ok(Some(product))
    }

    async fn toggle_publish(&self, id: Uuid) -> Result<Option<Product>> {
        let mut tx = self.pool.begin().await?;
        let Some(mut product) = lock_product(&mut tx, id).await? else { return Ok(None) };
        product.toggle_publish();
        save_product(&mut tx, &product).await?;
        tx.commit().await?;
        Ok(Some(product))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        // cart_items cascade through the foreign key.
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn cart_items(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            "SELECT * FROM cart_items WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, qty: Quantity) -> Result<CartItem> {
        let mut tx = self.pool.begin().await?;
        let product = lock_product(&mut tx, product_id).await?.ok_or(EcommerceError::NotFound("Product"))?;
        let existing = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;

        let item = match existing {
            Some(mut item) => {
                item.merge(&product, qty)?;
                sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
                    .bind(item.id)
                    .bind(item.quantity)
                    .execute(&mut *tx)
                    .await?;
                item
            }
            None => {
                let item = CartItem::open(user_id, &product, qty)?;
                sqlx::query("INSERT INTO cart_items (id, user_id, product_id, quantity, created_at) VALUES ($1, $2, $3, $4, $5)")
                    .bind(item.id)
                    .bind(item.user_id)
                    .bind(item.product_id)
                    .bind(item.quantity)
                    .bind(item.created_at)
                    .execute(&mut *tx)
                    .await?;
                item
            }
        };
        tx.commit().await?;
        Ok(item)
    }

    async fn set_cart_quantity(&self, user_id: Uuid, item_id: Uuid, qty: Quantity) -> Result<CartItem> {
        let mut tx = self.pool.begin().await?;
        let mut item = sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(item_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(EcommerceError::NotFound("Cart item"))?;
        let product = lock_product(&mut tx, item.product_id).await?.ok_or(EcommerceError::NotFound("Product"))?;
        item.set_quantity(&product, qty)?;
        sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
            .bind(item.id)
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(item_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(&self.pool).await?;
        Ok(deleted.rows_affected())
    }

    async fn place_orders(&self, placement: Placement) -> Result<Vec<Order>> {
        let mut tx = self.pool.begin().await?;
        for order in &placement.orders {
            for line in &order.items {
                let updated = sqlx::query(
                    "UPDATE products SET stock = stock - $1, updated_at = NOW() WHERE id = $2 AND stock >= $1",
                )
                .bind(line.quantity)
                .bind(line.product_id)
                .execute(&mut *tx)
                .await?;
                if updated.rows_affected() == 0 {
                    // Dropping `tx` rolls back every earlier line.
                    let stock: Option<i32> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
                        .bind(line.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                    return Err(match stock {
                        None => EcommerceError::NotFound("Product"),
                        Some(available) => EcommerceError::insufficient_stock(&line.product_details.name, line.quantity, available),
                    });
                }
            }
            sqlx::query(&format!(
                "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
            ))
            .bind(order.id)
            .bind(order.user_id)
            .bind(&order.order_id)
            .bind(Json(&order.items))
            .bind(Json(&order.delivery_address))
            .bind(order.payment_method.as_str())
            .bind(&order.payment_id)
            .bind(&order.invoice_receipt)
            .bind(order.payment_status.as_str())
            .bind(order.delivery_status.as_str())
            .bind(order.sub_total_amt)
            .bind(order.total_amt)
            .bind(order.created_at)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| unique_conflict(e, &format!("order id {} already exists", order.order_id)))?;
        }
        if placement.clear_cart {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(placement.user_id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(placement.orders)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_orders(&self, filter: &OrderFilter, page: PageRequest) -> Result<Page<Order>> {
        let search = needle(&filter.search);
        let delivery = filter.delivery_status.map(|s| s.as_str());
        let payment = filter.payment_status.map(|s| s.as_str());
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders {ORDER_FILTER} ORDER BY created_at DESC, id DESC LIMIT $7 OFFSET $8"
        ))
        .bind(filter.user_id)
        .bind(delivery)
        .bind(payment)
        .bind(filter.from)
        .bind(filter.to)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders {ORDER_FILTER}"))
            .bind(filter.user_id)
            .bind(delivery)
            .bind(payment)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;
        let items = rows.into_iter().map(Order::try_from).collect::<Result<Vec<_>>>()?;
        Ok(Page { items, total: total as u64, request: page })
    }

    async fn update_order_status(&self, order: Order, expected: OrderState, restock: bool) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET delivery_status = $4, payment_status = $5, payment_id = $6, invoice_receipt = $7, updated_at = $8
            WHERE id = $1 AND delivery_status = $2 AND payment_status = $3
            "#,
        )
        .bind(order.id)
        .bind(expected.delivery.as_str())
        .bind(expected.payment.as_str())
        .bind(order.delivery_status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.payment_id)
        .bind(&order.invoice_receipt)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        if restock {
            for line in &order.items {
                sqlx::query("UPDATE products SET stock = stock + $1, updated_at = NOW() WHERE id = $2")
                    .bind(line.quantity)
                    .bind(line.product_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        Ok(Some(order))
    }

    async fn delete_order(&self, id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn order_stats(&self) -> Result<OrderStats> {
        let groups = sqlx::query_as::<_, (String, String, i64, Decimal)>(
            "SELECT delivery_status, payment_status, COUNT(*), COALESCE(SUM(total_amt), 0) FROM orders GROUP BY delivery_status, payment_status",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut stats = OrderStats::default();
        for (delivery, payment, count, total) in groups {
            let delivery = delivery.parse().map_err(|e| corrupt("order", e))?;
            let payment = payment.parse().map_err(|e| corrupt("order", e))?;
            stats.record(delivery, payment, total, count as u64);
        }
        Ok(stats)
    }

    async fn insert_address(&self, address: Address) -> Result<Address> {
        sqlx::query(&format!("INSERT INTO addresses ({ADDRESS_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"))
            .bind(address.id)
            .bind(address.user_id)
            .bind(&address.fields.address_line)
            .bind(&address.fields.city)
            .bind(&address.fields.state)
            .bind(&address.fields.pincode)
            .bind(&address.fields.country)
            .bind(&address.fields.mobile)
            .bind(address.created_at)
            .bind(address.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(address)
    }

    async fn get_address(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>> {
        let row = sqlx::query_as::<_, AddressRow>(&format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2"))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Address::from))
    }

    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    async fn update_address(&self, address: Address) -> Result<Option<Address>> {
        let updated = sqlx::query(
            r#"
            UPDATE addresses
            SET address_line = $3, city = $4, state = $5, pincode = $6, country = $7, mobile = $8, updated_at = $9
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(address.id)
        .bind(address.user_id)
        .bind(&address.fields.address_line)
        .bind(&address.fields.city)
        .bind(&address.fields.state)
        .bind(&address.fields.pincode)
        .bind(&address.fields.country)
        .bind(&address.fields.mobile)
        .bind(address.updated_at)
        .execute(&self.pool)
        .await?;
        Ok((updated.rows_affected() > 0).then_some(address))
    }

    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>> {
        let search = needle(&filter.search);
        let role = filter.role.map(|r| r.as_str());
        let status = filter.status.map(|s| s.as_str());
        let (limit, offset) = page_bounds(page);
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users {USER_FILTER} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(role)
        .bind(status)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM users {USER_FILTER}"))
            .bind(role)
            .bind(status)
            .bind(&search)
            .fetch_one(&self.pool)
            .await?;
        let items = rows.into_iter().map(User::try_from).collect::<Result<Vec<_>>>()?;
        Ok(Page { items, total: total as u64, request: page })
    }

    async fn user_stats(&self) -> Result<UserStats> {
        let row = sqlx::query_as::<_, UserStatsRow>(
            r#"
            SELECT COUNT(*) AS total_users,
                   COUNT(*) FILTER (WHERE status = 'Active') AS active_users,
                   COUNT(*) FILTER (WHERE status = 'Inactive') AS inactive_users,
                   COUNT(*) FILTER (WHERE status = 'Suspended') AS suspended_users,
                   COUNT(*) FILTER (WHERE role = 'ADMIN') AS admin_users,
                   COUNT(*) FILTER (WHERE verify_email) AS verified_users
            FROM users
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(UserStats {
            total_users: row.total_users as u64,
            active_users: row.active_users as u64,
            inactive_users: row.inactive_users as u64,
            suspended_users: row.suspended_users as u64,
            admin_users: row.admin_users as u64,
            verified_users: row.verified_users as u64,
        })
    }

    async fn update_user(&self, user: User) -> Result<Option<User>> {
        let updated = sqlx::query("UPDATE users SET status = $2, role = $3, verify_email = $4 WHERE id = $1")
            .bind(user.id)
            .bind(user.status.as_str())
            .bind(user.role.as_str())
            .bind(user.verify_email)
            .execute(&self.pool)
            .await?;
        Ok((updated.rows_affected() > 0).then_some(user))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&mut *tx).await?;
        if deleted.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(id).execute(&mut *tx).await?;
        sqlx::query("DELETE FROM addresses WHERE user_id = $1").bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(true)
    }
}
