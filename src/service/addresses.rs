//! Address book, scoped to the owning user.

use uuid::Uuid;

use crate::domain::aggregates::{Address, AddressFields};
use crate::store::Store;
use crate::{EcommerceError, Result};

pub async fn create(store: &dyn Store, user_id: Uuid, fields: AddressFields) -> Result<Address> {
    store.insert_address(Address::create(user_id, fields)?).await
}

pub async fn list(store: &dyn Store, user_id: Uuid) -> Result<Vec<Address>> {
    store.list_addresses(user_id).await
}

pub async fn update(store: &dyn Store, user_id: Uuid, id: Uuid, fields: AddressFields) -> Result<Address> {
    let mut address = store.get_address(user_id, id).await?.ok_or(EcommerceError::NotFound("Address"))?;
    address.replace(fields)?;
    store.update_address(address).await?.ok_or(EcommerceError::NotFound("Address"))
}

pub async fn delete(store: &dyn Store, user_id: Uuid, id: Uuid) -> Result<()> {
    if !store.delete_address(user_id, id).await? {
        return Err(EcommerceError::NotFound("Address"));
    }
    Ok(())
}
