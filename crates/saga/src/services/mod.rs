//! Collaborator service traits and in-memory implementations.
//!
//! Each trait abstracts a remote service the submission saga talks to.
//! The in-memory implementations back the tests and the development server;
//! they support failure injection and call counting.

pub mod cart;
pub mod catalog;
pub mod inventory;
pub mod notifier;

pub use cart::{CartPruneRequest, CartPruner, InMemoryCart};
pub use catalog::{CatalogClient, CatalogEntry, InMemoryCatalog, SaleStatus};
pub use inventory::{InMemoryInventory, InventoryLockRequest, InventoryReserver, LockLine, LockOutcome};
pub use notifier::{ChannelNotifier, EventNotifier, InMemoryEventNotifier, OrderCreated};

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// A panic while holding a double's lock leaves plain data behind; keep serving it.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
