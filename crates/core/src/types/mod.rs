//! Shared domain types.

pub mod email;
pub mod id;
pub mod order;
pub mod role;

pub use email::{Email, EmailError};
pub use id::{AddressId, CartItemId, OrderId, ProductId, UserId};
pub use order::{OrderStatus, PaymentMethod};
pub use role::Role;
