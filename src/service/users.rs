//! Admin user console.

use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Role, User, UserStats, UserStatus};
use crate::domain::value_objects::{Page, PageRequest};
use crate::service::Principal;
use crate::store::{Store, UserFilter};
use crate::{EcommerceError, Result};

pub async fn list(store: &dyn Store, filter: UserFilter, page: PageRequest) -> Result<Page<User>> {
    store.list_users(&filter, page).await
}

pub async fn stats(store: &dyn Store) -> Result<UserStats> {
    store.user_stats().await
}

fn not_self(admin: &Principal, target: Uuid, action: &str) -> Result<()> {
    if admin.user_id == target {
        return Err(EcommerceError::validation(format!("admins cannot {action} their own account")));
    }
    Ok(())
}

async fn modify(store: &dyn Store, id: Uuid, change: impl FnOnce(&mut User)) -> Result<User> {
    let mut user = store.get_user(id).await?.ok_or(EcommerceError::NotFound("User"))?;
    change(&mut user);
    store.update_user(user).await?.ok_or(EcommerceError::NotFound("User"))
}

pub async fn set_status(store: &dyn Store, admin: &Principal, id: Uuid, status: UserStatus) -> Result<User> {
    not_self(admin, id, "change the status of")?;
    let user = modify(store, id, |u| u.status = status).await?;
    info!(user_id = %id, %status, "user status changed");
    Ok(user)
}

pub async fn set_role(store: &dyn Store, admin: &Principal, id: Uuid, role: Role) -> Result<User> {
    not_self(admin, id, "change the role of")?;
    let user = modify(store, id, |u| u.role = role).await?;
    info!(user_id = %id, %role, "user role changed");
    Ok(user)
}

pub async fn set_verified(store: &dyn Store, id: Uuid, verified: bool) -> Result<User> {
    modify(store, id, |u| u.verify_email = verified).await
}

pub async fn delete(store: &dyn Store, admin: &Principal, id: Uuid) -> Result<()> {
    not_self(admin, id, "delete")?;
    if !store.delete_user(id).await? {
        return Err(EcommerceError::NotFound("User"));
    }
    info!(user_id = %id, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::address::sample_fields;
    use crate::domain::aggregates::Address;
    use crate::service::cart;
    use crate::service::testing::product;
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    async fn seeded() -> (MemoryStore, Principal, User) {
        let store = MemoryStore::new();
        let admin = store.insert_user(User::new("Root", "root@example.com", Role::Admin)).await;
        let customer = store.insert_user(User::new("Cara", "cara@example.com", Role::User)).await;
        (store, Principal::new(admin.id, Role::Admin), customer)
    }

    #[tokio::test]
    async fn test_admin_cannot_change_self() {
        let (store, admin, _) = seeded().await;
        assert!(matches!(set_role(&store, &admin, admin.user_id, Role::User).await, Err(EcommerceError::Validation(_))));
        assert!(matches!(set_status(&store, &admin, admin.user_id, UserStatus::Inactive).await, Err(EcommerceError::Validation(_))));
        assert!(matches!(delete(&store, &admin, admin.user_id).await, Err(EcommerceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_mutations_and_stats() {
        let (store, admin, customer) = seeded().await;
        set_status(&store, &admin, customer.id, UserStatus::Suspended).await.unwrap();
        set_verified(&store, customer.id, true).await.unwrap();
        let promoted = set_role(&store, &admin, customer.id, Role::Admin).await.unwrap();
        assert_eq!(promoted.role, Role::Admin);

        let stats = stats(&store).await.unwrap();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.suspended_users, 1);
        assert_eq!(stats.admin_users, 2);
        assert_eq!(stats.verified_users, 1);

        let suspended = list(&store, UserFilter { status: Some(UserStatus::Suspended), ..Default::default() }, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(suspended.items[0].id, customer.id);
        let found = list(&store, UserFilter { search: Some("CARA@".into()), ..Default::default() }, PageRequest::default()).await.unwrap();
        assert_eq!(found.total, 1);
        assert!(matches!(set_verified(&store, Uuid::new_v4(), true).await, Err(EcommerceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_cart_and_addresses() {
        let (store, admin, customer) = seeded().await;
        let p = product(&store, "Apple", 5, Decimal::ONE).await;
        cart::add_item(&store, customer.id, p.id, 1).await.unwrap();
        store.insert_address(Address::create(customer.id, sample_fields()).unwrap()).await.unwrap();

        delete(&store, &admin, customer.id).await.unwrap();
        assert!(store.cart_items(customer.id).await.unwrap().is_empty());
        assert!(store.list_addresses(customer.id).await.unwrap().is_empty());
        assert!(matches!(delete(&store, &admin, customer.id).await, Err(EcommerceError::NotFound(_))));
    }
}
