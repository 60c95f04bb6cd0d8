//! Compensation for orders whose inventory reservation did not succeed.

use std::fmt;
use std::time::Duration;

use common::OrderId;
use domain::OrderStatus;
use order_store::{CancelOutcome, OrderStore, StoreError};

use crate::services::InventoryReserver;

/// What compensation did to a written order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensationOutcome {
    /// The order moved from `Unpaid` to `Cancelled`.
    Cancelled,
    /// The order had already left `Unpaid`; nothing changed.
    AlreadyTerminal(OrderStatus),
    /// The order was never written, so there was nothing to cancel.
    NotWritten,
    /// The cancellation itself failed; the order needs reconciliation.
    Failed(String),
}

impl CompensationOutcome {
    /// Returns true if the order is known not to stay `Unpaid`.
    pub fn is_settled(&self) -> bool {
        !matches!(self, CompensationOutcome::Failed(_))
    }
}

impl fmt::Display for CompensationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompensationOutcome::Cancelled => write!(f, "order cancelled"),
            CompensationOutcome::AlreadyTerminal(status) => write!(f, "order already {status}"),
            CompensationOutcome::NotWritten => write!(f, "order not written"),
            CompensationOutcome::Failed(reason) => write!(f, "cancellation failed: {reason}"),
        }
    }
}

/// Cancels written orders and releases any inventory they may hold.
///
/// Every action is idempotent, so compensating the same order twice leaves
/// it cancelled exactly once.
#[derive(Debug, Clone)]
pub struct OrderCompensator<S, I> {
    store: S,
    inventory: I,
    call_timeout: Duration,
}

impl<S, I> OrderCompensator<S, I>
where
    S: OrderStore,
    I: InventoryReserver,
{
    pub fn new(store: S, inventory: I, call_timeout: Duration) -> Self {
        Self {
            store,
            inventory,
            call_timeout,
        }
    }

    /// Moves the order from `Unpaid` to `Cancelled`, recording `reason`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, order_id: OrderId, reason: &str) -> CompensationOutcome {
        let result = tokio::time::timeout(
            self.call_timeout,
            self.store.cancel_order(order_id, reason),
        )
        .await;

        let outcome = match result {
            Ok(Ok(CancelOutcome::Cancelled)) => CompensationOutcome::Cancelled,
            Ok(Ok(CancelOutcome::Unchanged(status))) => {
                CompensationOutcome::AlreadyTerminal(status)
            }
            Ok(Err(StoreError::NotFound(_))) => CompensationOutcome::NotWritten,
            Ok(Err(e)) => CompensationOutcome::Failed(e.to_string()),
            Err(_) => CompensationOutcome::Failed(format!(
                "cancellation timed out after {:?}",
                self.call_timeout
            )),
        };

        match &outcome {
            CompensationOutcome::Failed(cause) => {
                metrics::counter!("order_compensation_failed_total").increment(1);
                tracing::error!(%order_id, %cause, "order left unpaid, needs reconciliation");
            }
            other => {
                metrics::counter!("order_compensations_total").increment(1);
                tracing::warn!(%order_id, outcome = %other, "order compensated");
            }
        }
        outcome
    }

    /// Cancels the order and asks the inventory service to release whatever
    /// it may have locked for it.
    ///
    /// Used when the reservation outcome is unknown. A failed release is
    /// logged; the returned outcome describes the order.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_and_release(&self, order_id: OrderId, reason: &str) -> CompensationOutcome {
        let outcome = self.cancel(order_id, reason).await;

        match tokio::time::timeout(self.call_timeout, self.inventory.release(order_id)).await {
            Ok(Ok(())) => tracing::info!(%order_id, "inventory released"),
            Ok(Err(e)) => {
                metrics::counter!("order_inventory_release_failed_total").increment(1);
                tracing::error!(%order_id, error = %e, "inventory release failed");
            }
            Err(_) => {
                metrics::counter!("order_inventory_release_failed_total").increment(1);
                tracing::error!(%order_id, "inventory release timed out");
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryInventory, InventoryLockRequest, LockLine};
    use chrono::Utc;
    use common::{AddressId, ProductId, SkuId, UserId};
    use domain::{Money, Order, OrderLine};
    use order_store::InMemoryOrderStore;

    async fn written_order(store: &InMemoryOrderStore, id: u64) -> OrderId {
        let now = Utc::now();
        let order_id = OrderId::new(id);
        let order = Order {
            id: order_id,
            user_id: UserId::new(1),
            total: Money::from_cents(1000),
            product_count: 1,
            status: OrderStatus::Unpaid,
            address_id: AddressId::new(1),
            product_summary: "Mug".to_string(),
            remarks: String::new(),
            created_at: now,
            updated_at: now,
            cancel_reason: None,
        };
        let line = OrderLine {
            order_id,
            user_id: UserId::new(1),
            product_id: ProductId::new(1),
            sku_id: SkuId::new(10),
            product_name: "Mug".to_string(),
            sku_name: "Mug / blue".to_string(),
            picture: None,
            unit_price: Money::from_cents(1000),
            quantity: 1,
            line_total: Money::from_cents(1000),
            created_at: now,
        };
        store.write_order(&order, &[line]).await.unwrap();
        order_id
    }

    fn compensator(
        store: &InMemoryOrderStore,
        inventory: &InMemoryInventory,
    ) -> OrderCompensator<InMemoryOrderStore, InMemoryInventory> {
        OrderCompensator::new(store.clone(), inventory.clone(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let store = InMemoryOrderStore::new();
        let inventory = InMemoryInventory::new();
        let order_id = written_order(&store, 1).await;
        let compensator = compensator(&store, &inventory);

        let first = compensator.cancel(order_id, "insufficient stock").await;
        let second = compensator.cancel(order_id, "insufficient stock").await;

        assert_eq!(first, CompensationOutcome::Cancelled);
        assert_eq!(
            second,
            CompensationOutcome::AlreadyTerminal(OrderStatus::Cancelled)
        );
        assert_eq!(store.cancellation_count().await, 1);
    }

    #[tokio::test]
    async fn test_cancel_unknown_order() {
        let store = InMemoryOrderStore::new();
        let inventory = InMemoryInventory::new();

        let outcome = compensator(&store, &inventory)
            .cancel(OrderId::new(404), "timeout")
            .await;
        assert_eq!(outcome, CompensationOutcome::NotWritten);
    }

    #[tokio::test]
    async fn test_cancel_failure_is_reported() {
        let store = InMemoryOrderStore::new();
        let inventory = InMemoryInventory::new();
        let order_id = written_order(&store, 1).await;
        store.set_fail_on_cancel(true);

        let outcome = compensator(&store, &inventory)
            .cancel(order_id, "insufficient stock")
            .await;

        assert!(matches!(outcome, CompensationOutcome::Failed(_)));
        assert!(!outcome.is_settled());
        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Unpaid);
    }

    #[tokio::test]
    async fn test_cancel_and_release_frees_stock() {
        let store = InMemoryOrderStore::new();
        let inventory = InMemoryInventory::new();
        inventory.set_stock(SkuId::new(10), 3);
        let order_id = written_order(&store, 1).await;
        inventory
            .lock(InventoryLockRequest {
                order_id,
                lines: vec![LockLine {
                    sku_id: SkuId::new(10),
                    sku_name: "Mug / blue".to_string(),
                    quantity: 2,
                }],
            })
            .await
            .unwrap();

        let outcome = compensator(&store, &inventory)
            .cancel_and_release(order_id, "inventory timeout")
            .await;

        assert_eq!(outcome, CompensationOutcome::Cancelled);
        assert_eq!(inventory.available(SkuId::new(10)), 3);
        assert!(!inventory.has_lock(order_id));
    }

    #[tokio::test]
    async fn test_release_failure_keeps_cancel_outcome() {
        let store = InMemoryOrderStore::new();
        let inventory = InMemoryInventory::new();
        inventory.set_fail_on_release(true);
        let order_id = written_order(&store, 1).await;

        let outcome = compensator(&store, &inventory)
            .cancel_and_release(order_id, "inventory timeout")
            .await;

        assert_eq!(outcome, CompensationOutcome::Cancelled);
        assert_eq!(inventory.release_calls(), 1);
    }
}
