//! Submission settings.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Limits and routing for order submissions.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// Upper bound for a whole submission, including the wait for a permit.
    pub overall_timeout: Duration,
    /// Per-call limit for catalog lookups and inventory locking.
    pub remote_call_timeout: Duration,
    /// Per-call limit for cart pruning and notification.
    pub best_effort_timeout: Duration,
    /// Maximum concurrent submissions per coordinator.
    pub max_in_flight: usize,
    /// Topic the "order created" notification is published to.
    pub notify_topic: String,
    /// Snowflake worker id of this node.
    pub worker_id: u16,
}

impl SubmissionConfig {
    /// Loads settings from `ORDER_*` environment variables, falling back to
    /// the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            overall_timeout: env_millis("ORDER_SUBMIT_TIMEOUT_MS", defaults.overall_timeout),
            remote_call_timeout: env_millis(
                "ORDER_REMOTE_CALL_TIMEOUT_MS",
                defaults.remote_call_timeout,
            ),
            best_effort_timeout: env_millis(
                "ORDER_BEST_EFFORT_TIMEOUT_MS",
                defaults.best_effort_timeout,
            ),
            max_in_flight: env_parse("ORDER_MAX_IN_FLIGHT", defaults.max_in_flight).max(1),
            notify_topic: env::var("ORDER_NOTIFY_TOPIC").unwrap_or(defaults.notify_topic),
            worker_id: env_parse("ORDER_WORKER_ID", defaults.worker_id),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            overall_timeout: Duration::from_millis(10_000),
            remote_call_timeout: Duration::from_millis(3_000),
            best_effort_timeout: Duration::from_millis(1_000),
            max_in_flight: 64,
            notify_topic: "order.create".to_string(),
            worker_id: 0,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
