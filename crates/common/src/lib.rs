//! Shared identifier types used across the order submission workspace.

pub mod types;

pub use types::{AddressId, CartLineId, OrderId, ParseIdError, ProductId, SkuId, UserId};
