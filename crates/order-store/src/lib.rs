//! Durable storage for submitted orders.
//!
//! The order header and its lines are always written together in one atomic
//! unit. Address snapshots are stored separately, ahead of the order that
//! references them.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use store::{AddressStore, CancelOutcome, OrderStore, validate_order_for_write};
