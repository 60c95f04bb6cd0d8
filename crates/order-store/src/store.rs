use async_trait::async_trait;
use common::{AddressId, OrderId, UserId};
use domain::{AddressInput, AddressSnapshot, Order, OrderLine, OrderStatus};

use crate::{Result, StoreError};

/// Outcome of a conditional `Unpaid -> Cancelled` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The order moved from `Unpaid` to `Cancelled` by this call.
    Cancelled,
    /// The order was not `Unpaid`; its status was left as is.
    Unchanged(OrderStatus),
}

/// Storage for address snapshots taken at submission time.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Stores a copy of `address` under `user_id` and returns its id.
    async fn save_address(&self, user_id: UserId, address: &AddressInput) -> Result<AddressId>;

    /// Loads an address snapshot.
    async fn get_address(&self, address_id: AddressId) -> Result<Option<AddressSnapshot>>;
}

/// Durable storage for orders and their lines.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes an order header together with its lines.
    ///
    /// The write is atomic: either the header and every line become visible,
    /// or nothing does. Fails with `Conflict` if the order id already exists.
    async fn write_order(&self, order: &Order, lines: &[OrderLine]) -> Result<()>;

    /// Loads an order header.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Loads the lines of an order in submission order.
    async fn lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    /// Moves an `Unpaid` order to `Cancelled`, recording `reason`.
    ///
    /// Any other status is left untouched and reported as `Unchanged`, so
    /// repeated calls are harmless. Fails with `NotFound` for unknown ids.
    async fn cancel_order(&self, order_id: OrderId, reason: &str) -> Result<CancelOutcome>;
}

/// Validates an order and its lines before writing.
pub fn validate_order_for_write(order: &Order, lines: &[OrderLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(StoreError::InvalidData(format!(
            "order {} has no lines",
            order.id
        )));
    }

    if order.status != OrderStatus::Unpaid {
        return Err(StoreError::InvalidData(format!(
            "order {} must be written as {}, got {}",
            order.id,
            OrderStatus::Unpaid,
            order.status
        )));
    }

    if let Some(stray) = lines.iter().find(|l| l.order_id != order.id) {
        return Err(StoreError::InvalidData(format!(
            "line for sku {} references order {}, expected {}",
            stray.sku_id, stray.order_id, order.id
        )));
    }

    Ok(())
}
