//! Aggregates module
pub mod address;
pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod user;

pub use address::{Address, AddressFields};
pub use cart::{CartItem, CartLine, ProductWithCategories};
pub use category::Category;
pub use order::{DeliveryStatus, LineItem, Order, OrderStats, PaymentMethod, PaymentStatus, StatusUpdate};
pub use product::{Product, ProductDraft, ProductPatch, ProductSnapshot};
pub use user::{Role, User, UserStats, UserStatus};
