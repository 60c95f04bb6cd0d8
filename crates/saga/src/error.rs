//! Submission error types.

use std::time::Duration;

use common::{OrderId, ProductId, SkuId};
use domain::OrderError;
use order_store::StoreError;
use thiserror::Error;

use crate::compensation::CompensationOutcome;
use crate::step::SubmissionStep;

/// Errors reported by remote collaborators (catalog, inventory, cart, notifier).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The collaborator could not be reached or is not serving.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered with an error.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// No answer within the per-call limit.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors returned by `OrderSubmissionCoordinator::submit`.
///
/// Best-effort failures (cart pruning, notification) are never returned.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request is malformed; nothing was touched.
    #[error("Invalid order request: {0}")]
    InvalidRequest(#[from] OrderError),

    /// At least one product or SKU does not exist in the catalog.
    #[error(
        "Goods cannot be identified: missing products {missing_products:?}, missing skus {missing_skus:?}"
    )]
    GoodsUnidentifiable {
        missing_products: Vec<ProductId>,
        missing_skus: Vec<SkuId>,
    },

    /// A local store write failed.
    #[error("Persistence failed at {step}: {source}")]
    Persistence {
        step: SubmissionStep,
        #[source]
        source: StoreError,
    },

    /// The inventory service reported insufficient stock.
    #[error("Insufficient inventory for sku {sku_id} on order {order_id} (compensation: {compensation})")]
    InventoryExhausted {
        order_id: OrderId,
        sku_id: SkuId,
        compensation: CompensationOutcome,
    },

    /// A remote collaborator failed or exceeded its per-call limit.
    #[error("Remote call failed at {step}: {source}")]
    TransientRemote {
        step: SubmissionStep,
        order_id: Option<OrderId>,
        compensation: Option<CompensationOutcome>,
        #[source]
        source: ServiceError,
    },

    /// The overall submission deadline passed.
    #[error("Submission deadline exceeded at {step}")]
    DeadlineExceeded {
        step: SubmissionStep,
        order_id: Option<OrderId>,
        compensation: Option<CompensationOutcome>,
    },

    /// The submission task panicked or was aborted.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SubmitError {
    /// Returns the label used for the `reason` dimension of failure metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            SubmitError::InvalidRequest(_) => "invalid_request",
            SubmitError::GoodsUnidentifiable { .. } => "goods_unidentifiable",
            SubmitError::Persistence { .. } => "persistence",
            SubmitError::InventoryExhausted { .. } => "inventory_exhausted",
            SubmitError::TransientRemote { .. } => "transient_remote",
            SubmitError::DeadlineExceeded { .. } => "deadline_exceeded",
            SubmitError::Internal(_) => "internal",
        }
    }

    /// Returns the order id if the failure happened after one was allocated.
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            SubmitError::InventoryExhausted { order_id, .. } => Some(*order_id),
            SubmitError::TransientRemote { order_id, .. }
            | SubmitError::DeadlineExceeded { order_id, .. } => *order_id,
            _ => None,
        }
    }

    /// Returns the compensation applied to the written order, if any.
    pub fn compensation(&self) -> Option<&CompensationOutcome> {
        match self {
            SubmitError::InventoryExhausted { compensation, .. } => Some(compensation),
            SubmitError::TransientRemote { compensation, .. }
            | SubmitError::DeadlineExceeded { compensation, .. } => compensation.as_ref(),
            _ => None,
        }
    }
}

/// Convenience type alias for submission results.
pub type Result<T> = std::result::Result<T, SubmitError>;
