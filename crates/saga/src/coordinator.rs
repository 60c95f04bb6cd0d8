//! Coordinator for the order submission saga.

use std::sync::Arc;

use chrono::Utc;
use common::OrderId;
use domain::{OrderRequest, build_order};
use order_store::{AddressStore, OrderStore};
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::compensation::OrderCompensator;
use crate::config::SubmissionConfig;
use crate::deadline::{CallError, Deadline};
use crate::error::{Result, SubmitError};
use crate::id::IdAllocator;
use crate::services::{
    CartPruneRequest, CartPruner, CatalogClient, EventNotifier, InventoryLockRequest,
    InventoryReserver, LockLine, LockOutcome,
};
use crate::step::SubmissionStep;
use crate::validation::ValidationFanout;

/// Orchestrates order submissions.
///
/// Each submission waits for one of `max_in_flight` permits and then runs on
/// its own task, so a caller that stops waiting never abandons a saga
/// halfway. The whole submission, permit wait included, is bounded by
/// `overall_timeout`.
pub struct OrderSubmissionCoordinator<S, A, C, I, K, N> {
    saga: Arc<Saga<S, A, C, I, K, N>>,
    permits: Arc<Semaphore>,
}

struct Saga<S, A, C, I, K, N> {
    store: S,
    ids: A,
    validation: ValidationFanout<C>,
    inventory: I,
    cart: K,
    notifier: N,
    compensator: OrderCompensator<S, I>,
    config: SubmissionConfig,
}

impl<S, A, C, I, K, N> OrderSubmissionCoordinator<S, A, C, I, K, N>
where
    S: OrderStore + AddressStore + Clone + 'static,
    A: IdAllocator + 'static,
    C: CatalogClient + 'static,
    I: InventoryReserver + Clone + 'static,
    K: CartPruner + 'static,
    N: EventNotifier + 'static,
{
    /// Creates a new submission coordinator.
    pub fn new(
        store: S,
        ids: A,
        catalog: C,
        inventory: I,
        cart: K,
        notifier: N,
        config: SubmissionConfig,
    ) -> Self {
        let compensator = OrderCompensator::new(
            store.clone(),
            inventory.clone(),
            config.remote_call_timeout,
        );
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self {
            saga: Arc::new(Saga {
                store,
                ids,
                validation: ValidationFanout::new(catalog, config.remote_call_timeout),
                inventory,
                cart,
                notifier,
                compensator,
                config,
            }),
            permits,
        }
    }

    /// Returns the order store the coordinator writes to.
    pub fn store(&self) -> &S {
        &self.saga.store
    }

    /// Returns the compensator, for re-running compensation on an order.
    pub fn compensator(&self) -> &OrderCompensator<S, I> {
        &self.saga.compensator
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.saga.config
    }

    /// Returns how many more submissions may start right now.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Submits an order and returns its id.
    ///
    /// On success the order is `Unpaid` and its stock is locked. A failure
    /// before the order write leaves nothing behind; a failure after it
    /// leaves the order `Cancelled` (see `SubmitError::compensation`).
    #[tracing::instrument(skip(self, request), fields(user_id = %request.user_id, lines = request.lines.len()))]
    pub async fn submit(&self, request: OrderRequest) -> Result<OrderId> {
        metrics::counter!("order_submissions_total").increment(1);
        let started = std::time::Instant::now();

        let result = self.dispatch(request).await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("order_submission_duration_seconds").record(duration);
        match &result {
            Ok(order_id) => tracing::info!(%order_id, duration, "order submitted"),
            Err(e) => {
                metrics::counter!("order_submission_failed_total", "reason" => e.reason())
                    .increment(1);
                tracing::warn!(error = %e, reason = e.reason(), duration, "order submission failed");
            }
        }
        result
    }

    async fn dispatch(&self, request: OrderRequest) -> Result<OrderId> {
        request.validate()?;

        let deadline = Deadline::after(self.saga.config.overall_timeout);
        let permit = match tokio::time::timeout_at(
            deadline.instant(),
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(SubmitError::Internal("submission permits closed".into())),
            Err(_) => {
                return Err(SubmitError::DeadlineExceeded {
                    step: SubmissionStep::Admit,
                    order_id: None,
                    compensation: None,
                });
            }
        };

        let saga = Arc::clone(&self.saga);
        let task = tokio::spawn(
            async move {
                let _permit = permit;
                saga.run(request, deadline).await
            }
            .instrument(tracing::Span::current()),
        );

        task.await
            .map_err(|e| SubmitError::Internal(format!("submission task failed: {e}")))?
    }
}

impl<S, A, C, I, K, N> Saga<S, A, C, I, K, N>
where
    S: OrderStore + AddressStore,
    A: IdAllocator,
    C: CatalogClient,
    I: InventoryReserver,
    K: CartPruner,
    N: EventNotifier,
{
    async fn run(&self, request: OrderRequest, deadline: Deadline) -> Result<OrderId> {
        // 1. Address snapshot
        step_started(SubmissionStep::SaveAddress);
        let address_id = match deadline
            .run(self.store.save_address(request.user_id, &request.address))
            .await
        {
            Some(Ok(address_id)) => address_id,
            Some(Err(source)) => {
                return Err(SubmitError::Persistence {
                    step: SubmissionStep::SaveAddress,
                    source,
                });
            }
            None => return Err(expired(SubmissionStep::SaveAddress)),
        };

        // 2. Order id
        let order_id = self.ids.next_id();
        tracing::info!(step = %SubmissionStep::AllocateId, %order_id, %address_id, "order id allocated");

        // 3. Goods must exist
        step_started(SubmissionStep::ValidateCatalog);
        let validated = self
            .validation
            .validate(
                &request.distinct_product_ids(),
                &request.distinct_sku_ids(),
                deadline.instant(),
            )
            .await?;
        tracing::debug!(
            products = validated.products.len(),
            skus = validated.skus.len(),
            "goods identified"
        );

        // 4-5. Build and write header and lines together
        let (order, lines) = build_order(order_id, address_id, &request, Utc::now())?;
        step_started(SubmissionStep::WriteOrder);
        // Not bounded by the deadline: a dropped write could still commit
        // after compensation found nothing to cancel.
        if let Err(source) = self.store.write_order(&order, &lines).await {
            return Err(SubmitError::Persistence {
                step: SubmissionStep::WriteOrder,
                source,
            });
        }
        if deadline.has_passed() {
            let compensation = self
                .compensator
                .cancel(order_id, "submission deadline exceeded while writing")
                .await;
            return Err(SubmitError::DeadlineExceeded {
                step: SubmissionStep::WriteOrder,
                order_id: Some(order_id),
                compensation: Some(compensation),
            });
        }

        // 6. Lock inventory, compensating on any failure
        step_started(SubmissionStep::ReserveInventory);
        let lock_request = InventoryLockRequest {
            order_id,
            lines: lines
                .iter()
                .map(|line| LockLine {
                    sku_id: line.sku_id,
                    sku_name: line.sku_name.clone(),
                    quantity: line.quantity,
                })
                .collect(),
        };
        match deadline
            .call(
                self.config.remote_call_timeout,
                self.inventory.lock(lock_request),
            )
            .await
        {
            Ok(LockOutcome::Locked) => tracing::info!(%order_id, "inventory locked"),
            Ok(LockOutcome::Insufficient { sku_id }) => {
                let reason = format!("insufficient inventory for sku {sku_id}");
                let compensation = self.compensator.cancel(order_id, &reason).await;
                return Err(SubmitError::InventoryExhausted {
                    order_id,
                    sku_id,
                    compensation,
                });
            }
            Err(e) => {
                let reason = format!("inventory reservation failed: {e}");
                let compensation = self.compensator.cancel_and_release(order_id, &reason).await;
                return Err(match e {
                    CallError::Service(source) => SubmitError::TransientRemote {
                        step: SubmissionStep::ReserveInventory,
                        order_id: Some(order_id),
                        compensation: Some(compensation),
                        source,
                    },
                    CallError::Expired => SubmitError::DeadlineExceeded {
                        step: SubmissionStep::ReserveInventory,
                        order_id: Some(order_id),
                        compensation: Some(compensation),
                    },
                });
            }
        }

        // 7. Best-effort: prune the cart lines this order came from
        let line_ids = request.origin_cart_lines();
        if !line_ids.is_empty() {
            step_started(SubmissionStep::PruneCart);
            let prune = CartPruneRequest {
                user_id: request.user_id,
                line_ids,
            };
            if let Err(e) = deadline
                .call(self.config.best_effort_timeout, self.cart.remove_lines(prune))
                .await
            {
                metrics::counter!("order_cart_prune_failures_total").increment(1);
                tracing::warn!(%order_id, error = %e, "cart prune failed");
            }
        }

        // 8. Best-effort: announce the order
        step_started(SubmissionStep::PublishEvent);
        let topic = self.config.notify_topic.as_str();
        if let Err(e) = deadline
            .call(
                self.config.best_effort_timeout,
                self.notifier.publish(topic, order_id),
            )
            .await
        {
            metrics::counter!("order_notify_failures_total").increment(1);
            tracing::warn!(%order_id, topic, error = %e, "order created notification failed");
        }

        Ok(order_id)
    }
}

fn step_started(step: SubmissionStep) {
    tracing::info!(
        step = %step,
        best_effort = step.is_best_effort(),
        compensated = step.requires_compensation(),
        "saga step started"
    );
}

fn expired(step: SubmissionStep) -> SubmitError {
    SubmitError::DeadlineExceeded {
        step,
        order_id: None,
        compensation: None,
    }
}
