//! Inventory reservation service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{OrderId, SkuId};

use super::{read, write};
use crate::error::ServiceError;

/// One SKU quantity to lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLine {
    pub sku_id: SkuId,
    /// SKU display name, for the inventory service's own records.
    pub sku_name: String,
    pub quantity: u32,
}

/// Everything needed to lock stock for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryLockRequest {
    pub order_id: OrderId,
    pub lines: Vec<LockLine>,
}

/// Answer of the inventory service to a lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    /// Every line is locked.
    Locked,
    /// Nothing is locked; `sku_id` lacks stock.
    Insufficient { sku_id: SkuId },
}

/// Trait for inventory locking.
///
/// `lock` is all-or-nothing: it either locks every line or none.
#[async_trait]
pub trait InventoryReserver: Send + Sync {
    /// Locks stock for every line of the order.
    async fn lock(&self, request: InventoryLockRequest) -> Result<LockOutcome, ServiceError>;

    /// Releases whatever is locked for `order_id`. Releasing an order that
    /// holds nothing is a no-op.
    async fn release(&self, order_id: OrderId) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    stock: HashMap<SkuId, u32>,
    locks: HashMap<OrderId, Vec<LockLine>>,
    fail_on_lock: bool,
    fail_on_release: bool,
    latency: Option<Duration>,
    lock_calls: usize,
    release_calls: usize,
}

/// In-memory inventory for tests and the development server.
///
/// With a latency set, the lock is applied first and acknowledged after the
/// delay, so a caller that gives up early leaves a lock behind.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventory {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventory {
    /// Creates an inventory with no stock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the available quantity of a SKU.
    pub fn set_stock(&self, sku_id: SkuId, quantity: u32) {
        write(&self.state).stock.insert(sku_id, quantity);
    }

    /// Returns the available (unlocked) quantity of a SKU.
    pub fn available(&self, sku_id: SkuId) -> u32 {
        read(&self.state).stock.get(&sku_id).copied().unwrap_or(0)
    }

    /// Makes `lock` fail with a transport error while set.
    pub fn set_fail_on_lock(&self, fail: bool) {
        write(&self.state).fail_on_lock = fail;
    }

    /// Makes `release` fail with a transport error while set.
    pub fn set_fail_on_release(&self, fail: bool) {
        write(&self.state).fail_on_release = fail;
    }

    /// Delays every lock acknowledgement by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        write(&self.state).latency = latency;
    }

    /// Returns true if stock is currently locked for the order.
    pub fn has_lock(&self, order_id: OrderId) -> bool {
        read(&self.state).locks.contains_key(&order_id)
    }

    /// Returns the number of orders currently holding locks.
    pub fn lock_count(&self) -> usize {
        read(&self.state).locks.len()
    }

    /// Returns the number of `lock` calls received.
    pub fn lock_calls(&self) -> usize {
        read(&self.state).lock_calls
    }

    /// Returns the number of `release` calls received.
    pub fn release_calls(&self) -> usize {
        read(&self.state).release_calls
    }

    fn apply_lock(&self, request: InventoryLockRequest) -> Result<LockOutcome, ServiceError> {
        let mut state = write(&self.state);
        state.lock_calls += 1;

        if state.fail_on_lock {
            return Err(ServiceError::Unavailable("ware service down".to_string()));
        }
        if state.locks.contains_key(&request.order_id) {
            return Ok(LockOutcome::Locked);
        }

        let mut needed: HashMap<SkuId, u32> = HashMap::new();
        for line in &request.lines {
            *needed.entry(line.sku_id).or_default() += line.quantity;
        }
        // Report the first short line in request order
        for line in &request.lines {
            let available = state.stock.get(&line.sku_id).copied().unwrap_or(0);
            if available < needed[&line.sku_id] {
                return Ok(LockOutcome::Insufficient {
                    sku_id: line.sku_id,
                });
            }
        }

        for (sku_id, quantity) in needed {
            if let Some(available) = state.stock.get_mut(&sku_id) {
                *available -= quantity;
            }
        }
        state.locks.insert(request.order_id, request.lines);
        Ok(LockOutcome::Locked)
    }
}

#[async_trait]
impl InventoryReserver for InMemoryInventory {
    async fn lock(&self, request: InventoryLockRequest) -> Result<LockOutcome, ServiceError> {
        let outcome = self.apply_lock(request)?;

        let latency = read(&self.state).latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(outcome)
    }

    async fn release(&self, order_id: OrderId) -> Result<(), ServiceError> {
        let mut state = write(&self.state);
        state.release_calls += 1;

        if state.fail_on_release {
            return Err(ServiceError::Unavailable("ware service down".to_string()));
        }

        if let Some(lines) = state.locks.remove(&order_id) {
            for line in lines {
                *state.stock.entry(line.sku_id).or_default() += line.quantity;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(order: u64, lines: &[(u64, u32)]) -> InventoryLockRequest {
        InventoryLockRequest {
            order_id: OrderId::new(order),
            lines: lines
                .iter()
                .map(|(sku, quantity)| LockLine {
                    sku_id: SkuId::new(*sku),
                    sku_name: format!("sku-{sku}"),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_lock_and_release() {
        let inventory = InMemoryInventory::new();
        inventory.set_stock(SkuId::new(1), 5);

        let outcome = inventory.lock(request(100, &[(1, 2)])).await.unwrap();
        assert_eq!(outcome, LockOutcome::Locked);
        assert_eq!(inventory.available(SkuId::new(1)), 3);
        assert!(inventory.has_lock(OrderId::new(100)));

        inventory.release(OrderId::new(100)).await.unwrap();
        assert_eq!(inventory.available(SkuId::new(1)), 5);
        assert_eq!(inventory.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_locks_nothing() {
        let inventory = InMemoryInventory::new();
        inventory.set_stock(SkuId::new(1), 5);
        inventory.set_stock(SkuId::new(2), 1);
        inventory.set_stock(SkuId::new(3), 5);

        let outcome = inventory
            .lock(request(100, &[(1, 2), (2, 3), (3, 1)]))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            LockOutcome::Insufficient {
                sku_id: SkuId::new(2)
            }
        );
        assert_eq!(inventory.available(SkuId::new(1)), 5);
        assert_eq!(inventory.available(SkuId::new(2)), 1);
        assert_eq!(inventory.available(SkuId::new(3)), 5);
        assert!(!inventory.has_lock(OrderId::new(100)));
    }

    #[tokio::test]
    async fn test_repeated_lines_are_summed() {
        let inventory = InMemoryInventory::new();
        inventory.set_stock(SkuId::new(1), 3);

        let outcome = inventory
            .lock(request(100, &[(1, 2), (1, 2)]))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LockOutcome::Insufficient {
                sku_id: SkuId::new(1)
            }
        );
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let inventory = InMemoryInventory::new();
        inventory.set_stock(SkuId::new(1), 5);
        inventory.lock(request(100, &[(1, 2)])).await.unwrap();

        inventory.release(OrderId::new(100)).await.unwrap();
        inventory.release(OrderId::new(100)).await.unwrap();
        inventory.release(OrderId::new(999)).await.unwrap();

        assert_eq!(inventory.available(SkuId::new(1)), 5);
        assert_eq!(inventory.release_calls(), 3);
    }

    #[tokio::test]
    async fn test_fail_on_lock() {
        let inventory = InMemoryInventory::new();
        inventory.set_stock(SkuId::new(1), 5);
        inventory.set_fail_on_lock(true);

        let result = inventory.lock(request(100, &[(1, 2)])).await;
        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
        assert_eq!(inventory.available(SkuId::new(1)), 5);
        assert_eq!(inventory.lock_calls(), 1);
    }
}
