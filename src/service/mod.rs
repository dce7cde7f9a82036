//! Use cases over the [`Store`](crate::store::Store) port.
//!
//! Every function takes the authenticated [`Principal`] (or a user id derived
//! from it) explicitly; nothing reads ambient request state.

use uuid::Uuid;

use crate::domain::aggregates::Role;

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod users;

/// The verified caller of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self { Self { user_id, role } }
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

#[cfg(test)]
pub(crate) mod testing {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::domain::aggregates::product::sample;
    use crate::domain::aggregates::Product;
    use crate::store::{MemoryStore, Store};

    pub async fn product(store: &MemoryStore, name: &str, stock: i32, price: Decimal) -> Product {
        store.insert_product(sample(name, stock, price)).await.unwrap()
    }

    pub fn user() -> Uuid { Uuid::new_v4() }
}
