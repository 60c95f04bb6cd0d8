//! Domain layer for order submission.
//!
//! This crate provides the value types the submission saga works with:
//! - `Money` amounts in minor units
//! - `OrderStatus` state machine
//! - `OrderRequest` / `OrderLineRequest` as submitted by the storefront
//! - `Order` / `OrderLine` records as persisted by the order store

pub mod order;

pub use order::{
    AddressInput, AddressSnapshot, Money, Order, OrderError, OrderLine, OrderLineRequest,
    OrderRequest, OrderStatus, PRODUCT_SUMMARY_MAX_CHARS, ParseStatusError, build_order,
    product_summary,
};
