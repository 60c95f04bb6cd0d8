use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{AddressId, OrderId, UserId};
use domain::{AddressInput, AddressSnapshot, Order, OrderLine, OrderStatus};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{AddressStore, CancelOutcome, OrderStore, validate_order_for_write},
};

#[derive(Debug, Default)]
struct Tables {
    orders: HashMap<OrderId, Order>,
    lines: HashMap<OrderId, Vec<OrderLine>>,
    addresses: HashMap<AddressId, AddressSnapshot>,
    next_address_id: u64,
    cancellations: usize,
}

#[derive(Debug, Default)]
struct Faults {
    fail_on_address: AtomicBool,
    fail_on_write: AtomicBool,
    fail_on_cancel: AtomicBool,
    write_latency_ms: AtomicU64,
}

/// In-memory order store for testing and local development.
///
/// Headers, lines and addresses live behind a single lock, so an order and
/// its lines are published to readers in one step.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `save_address` fail while set.
    pub fn set_fail_on_address(&self, fail: bool) {
        self.faults.fail_on_address.store(fail, Ordering::SeqCst);
    }

    /// Makes `write_order` fail while set.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.faults.fail_on_write.store(fail, Ordering::SeqCst);
    }

    /// Makes `cancel_order` fail while set.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.faults.fail_on_cancel.store(fail, Ordering::SeqCst);
    }

    /// Delays every `write_order` by `latency` before it commits.
    pub fn set_write_latency(&self, latency: Option<Duration>) {
        let millis = latency.map_or(0, |l| u64::try_from(l.as_millis()).unwrap_or(u64::MAX));
        self.faults.write_latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of stored order lines across all orders.
    pub async fn line_count(&self) -> usize {
        self.tables.read().await.lines.values().map(Vec::len).sum()
    }

    /// Returns the number of stored address snapshots.
    pub async fn address_count(&self) -> usize {
        self.tables.read().await.addresses.len()
    }

    /// Returns how many `Unpaid -> Cancelled` transitions have been applied.
    pub async fn cancellation_count(&self) -> usize {
        self.tables.read().await.cancellations
    }

    /// Returns every stored order line.
    pub async fn all_lines(&self) -> Vec<OrderLine> {
        self.tables
            .read()
            .await
            .lines
            .values()
            .flatten()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AddressStore for InMemoryOrderStore {
    async fn save_address(&self, user_id: UserId, address: &AddressInput) -> Result<AddressId> {
        if self.faults.fail_on_address.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("address table locked".to_string()));
        }

        let mut tables = self.tables.write().await;
        tables.next_address_id += 1;
        let id = AddressId::new(tables.next_address_id);
        tables.addresses.insert(
            id,
            AddressSnapshot {
                id,
                user_id,
                address: address.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn get_address(&self, address_id: AddressId) -> Result<Option<AddressSnapshot>> {
        Ok(self.tables.read().await.addresses.get(&address_id).cloned())
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn write_order(&self, order: &Order, lines: &[OrderLine]) -> Result<()> {
        validate_order_for_write(order, lines)?;

        if self.faults.fail_on_write.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order table locked".to_string()));
        }

        let latency = self.faults.write_latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(order.id));
        }

        tables.orders.insert(order.id, order.clone());
        tables.lines.insert(order.id, lines.to_vec());
        Ok(())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&order_id).cloned())
    }

    async fn lines_for_order(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        Ok(self
            .tables
            .read()
            .await
            .lines
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn cancel_order(&self, order_id: OrderId, reason: &str) -> Result<CancelOutcome> {
        if self.faults.fail_on_cancel.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("order table locked".to_string()));
        }

        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::NotFound(order_id))?;

        if order.status != OrderStatus::Unpaid {
            return Ok(CancelOutcome::Unchanged(order.status));
        }

        order.status = OrderStatus::Cancelled;
        order.cancel_reason = Some(reason.to_string());
        order.updated_at = Utc::now();
        tables.cancellations += 1;
        Ok(CancelOutcome::Cancelled)
    }
}
