//! Order submission saga.
//!
//! This crate coordinates a single order submission across the services that
//! own its pieces:
//! 1. Save the shipping-address snapshot
//! 2. Allocate the order id
//! 3. Confirm every product and SKU exists (two lookups, run concurrently)
//! 4. Write the order and its lines atomically
//! 5. Lock inventory
//! 6. Prune the originating cart lines (best-effort)
//! 7. Publish "order created" (best-effort)
//!
//! A failure after step 4 and up to step 5 is compensated by cancelling the
//! written order. Failures in steps 6 and 7 are logged and counted only.

pub mod compensation;
pub mod config;
pub mod coordinator;
mod deadline;
pub mod error;
pub mod id;
pub mod services;
pub mod step;
pub mod validation;

pub use compensation::{CompensationOutcome, OrderCompensator};
pub use config::SubmissionConfig;
pub use coordinator::OrderSubmissionCoordinator;
pub use error::{ServiceError, SubmitError};
pub use id::{IdAllocator, InvalidWorkerId, SnowflakeIdAllocator};
pub use services::{
    CartPruneRequest, CartPruner, CatalogClient, CatalogEntry, ChannelNotifier, EventNotifier,
    InMemoryCart, InMemoryCatalog, InMemoryEventNotifier, InMemoryInventory, InventoryLockRequest,
    InventoryReserver, LockLine, LockOutcome, OrderCreated, SaleStatus,
};
pub use step::SubmissionStep;
pub use validation::{ValidatedCatalogSet, ValidationFanout};
