//! "Order created" notifications.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{read, write};
use crate::error::ServiceError;

/// Message published once per successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreated {
    pub topic: String,
    pub order_id: OrderId,
}

/// Trait for publishing order events.
///
/// Delivery is at-least-once; consumers deduplicate by order id.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn publish(&self, topic: &str, order_id: OrderId) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    published: Vec<OrderCreated>,
    fail_on_publish: bool,
}

/// In-memory notifier that records every published message.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryEventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `publish` fail while set.
    pub fn set_fail_on_publish(&self, fail: bool) {
        write(&self.state).fail_on_publish = fail;
    }

    /// Returns every message published so far, oldest first.
    pub fn published(&self) -> Vec<OrderCreated> {
        read(&self.state).published.clone()
    }
}

#[async_trait]
impl EventNotifier for InMemoryEventNotifier {
    async fn publish(&self, topic: &str, order_id: OrderId) -> Result<(), ServiceError> {
        let mut state = write(&self.state);
        if state.fail_on_publish {
            return Err(ServiceError::Unavailable("broker unreachable".to_string()));
        }
        state.published.push(OrderCreated {
            topic: topic.to_string(),
            order_id,
        });
        Ok(())
    }
}

/// Notifier backed by a bounded channel.
///
/// Publishing never waits: a full or closed channel is reported as an error.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<OrderCreated>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiving end of its channel.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OrderCreated>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl EventNotifier for ChannelNotifier {
    async fn publish(&self, topic: &str, order_id: OrderId) -> Result<(), ServiceError> {
        let message = OrderCreated {
            topic: topic.to_string(),
            order_id,
        };
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => ServiceError::Rejected("notification queue full".to_string()),
            TrySendError::Closed(_) => {
                ServiceError::Unavailable("notification queue closed".to_string())
            }
        })
    }
}
