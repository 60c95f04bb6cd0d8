//! Order records, submission requests and related value types.

mod model;
mod request;
mod state;
mod value_objects;

pub use model::{Order, OrderLine, PRODUCT_SUMMARY_MAX_CHARS, build_order, product_summary};
pub use request::{OrderLineRequest, OrderRequest};
pub use state::{OrderStatus, ParseStatusError};
pub use value_objects::{AddressInput, AddressSnapshot, Money};

use common::SkuId;
use thiserror::Error;

/// Errors raised when an order request violates its invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The request carries no lines.
    #[error("Order has no lines")]
    NoLines,

    /// A line has a zero quantity.
    #[error("Invalid quantity for sku {sku_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { sku_id: SkuId, quantity: u32 },

    /// A line has a negative unit price.
    #[error("Invalid price for sku {sku_id}: {price} (must not be negative)")]
    InvalidPrice { sku_id: SkuId, price: Money },

    /// `quantity * unit_price` does not fit in the money range.
    #[error("Line total for sku {sku_id} overflows ({quantity} x {price})")]
    AmountOverflow {
        sku_id: SkuId,
        quantity: u32,
        price: Money,
    },

    /// The request-supplied order total is negative.
    #[error("Invalid order total: {0} (must not be negative)")]
    InvalidTotal(Money),

    /// A required address field is blank.
    #[error("Address field '{0}' is required")]
    MissingAddressField(&'static str),
}
