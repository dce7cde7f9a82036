//! Category and product catalog.

use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Category, Product, ProductDraft, ProductPatch};
use crate::domain::value_objects::{Name, Page, PageRequest};
use crate::service::Principal;
use crate::store::{CategoryFilter, ProductFilter, Store};
use crate::{EcommerceError, Result};

// =============================================================================
// Categories
// =============================================================================

fn image_url(image: &str) -> Result<&str> {
    let image = image.trim();
    if image.is_empty() { return Err(EcommerceError::validation("image must not be empty")); }
    Ok(image)
}

pub async fn create_category(store: &dyn Store, name: &str, image: &str) -> Result<Category> {
    let category = store.insert_category(Category::create(Name::new(name)?, image_url(image)?)).await?;
    info!(category_id = %category.id, name = %category.name, "category created");
    Ok(category)
}

pub async fn update_category(store: &dyn Store, id: Uuid, name: Option<&str>, image: Option<&str>) -> Result<Category> {
    let mut category = store.get_category(id).await?.ok_or(EcommerceError::NotFound("Category"))?;
    if let Some(name) = name { category.rename(Name::new(name)?); }
    if let Some(image) = image { category.set_image(image_url(image)?); }
    store.update_category(category).await?.ok_or(EcommerceError::NotFound("Category"))
}

pub async fn delete_category(store: &dyn Store, id: Uuid) -> Result<()> {
    if !store.delete_category(id).await? {
        return Err(EcommerceError::NotFound("Category"));
    }
    info!(category_id = %id, "category deleted");
    Ok(())
}

pub async fn list_categories(store: &dyn Store, filter: CategoryFilter, page: PageRequest) -> Result<Page<Category>> {
    store.list_categories(&filter, page).await
}

// =============================================================================
// Products
// =============================================================================

async fn ensure_categories_exist(store: &dyn Store, ids: &[Uuid]) -> Result<()> {
    let mut wanted = ids.to_vec();
    wanted.sort();
    wanted.dedup();
    let found = store.categories_by_ids(&wanted).await?;
    if found.len() != wanted.len() {
        return Err(EcommerceError::validation("category contains unknown ids"));
    }
    Ok(())
}

pub async fn create_product(store: &dyn Store, draft: ProductDraft) -> Result<Product> {
    ensure_categories_exist(store, &draft.category).await?;
    let product = store.insert_product(Product::create(draft)?).await?;
    info!(product_id = %product.id, name = %product.name, stock = product.stock, "product created");
    Ok(product)
}

pub async fn update_product(store: &dyn Store, id: Uuid, patch: ProductPatch) -> Result<Product> {
    if let Some(category) = &patch.category {
        ensure_categories_exist(store, category).await?;
    }
    store.update_product(id, patch).await?.ok_or(EcommerceError::NotFound("Product"))
}

pub async fn toggle_publish(store: &dyn Store, id: Uuid) -> Result<Product> {
    let product = store.toggle_publish(id).await?.ok_or(EcommerceError::NotFound("Product"))?;
    info!(product_id = %product.id, publish = product.publish, "product visibility changed");
    Ok(product)
}

pub async fn delete_product(store: &dyn Store, id: Uuid) -> Result<()> {
    if !store.delete_product(id).await? {
        return Err(EcommerceError::NotFound("Product"));
    }
    info!(product_id = %id, "product deleted");
    Ok(())
}

fn sees_unpublished(principal: Option<&Principal>) -> bool {
    principal.map_or(false, Principal::is_admin)
}

/// Unpublished products exist only for admins.
pub async fn get_product(store: &dyn Store, principal: Option<&Principal>, id: Uuid) -> Result<Product> {
    store
        .get_product(id)
        .await?
        .filter(|p| p.publish || sees_unpublished(principal))
        .ok_or(EcommerceError::NotFound("Product"))
}

/// The publish filter is honoured for admins only; everyone else sees published products.
pub async fn list_products(store: &dyn Store, principal: Option<&Principal>, mut filter: ProductFilter, page: PageRequest) -> Result<Page<Product>> {
    if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
        if min > max { return Err(EcommerceError::validation("minPrice must not exceed maxPrice")); }
    }
    if !sees_unpublished(principal) {
        filter.publish = Some(true);
    }
    store.list_products(&filter, page).await
}
