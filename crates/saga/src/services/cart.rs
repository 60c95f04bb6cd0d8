//! Cart pruning after a successful submission.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{CartLineId, UserId};

use super::{read, write};
use crate::error::ServiceError;

/// Cart lines to remove for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartPruneRequest {
    pub user_id: UserId,
    pub line_ids: Vec<CartLineId>,
}

/// Trait for removing purchased lines from a user's cart.
#[async_trait]
pub trait CartPruner: Send + Sync {
    /// Removes the given lines. Unknown line ids are ignored.
    async fn remove_lines(&self, request: CartPruneRequest) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, BTreeSet<CartLineId>>,
    fail_on_remove: bool,
    latency: Option<Duration>,
    remove_calls: usize,
}

/// In-memory cart service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCart {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCart {
    /// Creates a new in-memory cart service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts lines into a user's cart.
    pub fn add_lines(&self, user_id: UserId, line_ids: impl IntoIterator<Item = CartLineId>) {
        write(&self.state)
            .carts
            .entry(user_id)
            .or_default()
            .extend(line_ids);
    }

    /// Returns the lines currently in a user's cart.
    pub fn lines(&self, user_id: UserId) -> Vec<CartLineId> {
        read(&self.state)
            .carts
            .get(&user_id)
            .map(|lines| lines.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Makes `remove_lines` fail while set.
    pub fn set_fail_on_remove(&self, fail: bool) {
        write(&self.state).fail_on_remove = fail;
    }

    /// Delays every `remove_lines` by `latency` before it applies.
    pub fn set_latency(&self, latency: Option<Duration>) {
        write(&self.state).latency = latency;
    }

    /// Returns the number of `remove_lines` calls received.
    pub fn remove_calls(&self) -> usize {
        read(&self.state).remove_calls
    }
}

#[async_trait]
impl CartPruner for InMemoryCart {
    async fn remove_lines(&self, request: CartPruneRequest) -> Result<(), ServiceError> {
        let latency = {
            let mut state = write(&self.state);
            state.remove_calls += 1;
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = write(&self.state);
        if state.fail_on_remove {
            return Err(ServiceError::Unavailable("cart service down".to_string()));
        }

        if let Some(cart) = state.carts.get_mut(&request.user_id) {
            for line_id in &request.line_ids {
                cart.remove(line_id);
            }
        }
        Ok(())
    }
}
