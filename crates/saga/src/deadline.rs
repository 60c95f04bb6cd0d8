use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::error::ServiceError;

/// Why a bounded call did not produce a result.
#[derive(Debug, Error)]
pub(crate) enum CallError {
    #[error(transparent)]
    Service(ServiceError),

    /// The overall submission deadline passed first.
    #[error("submission deadline exceeded")]
    Expired,
}

/// Overall deadline of one submission.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline(Instant);

impl Deadline {
    pub(crate) fn after(limit: Duration) -> Self {
        Self(Instant::now() + limit)
    }

    pub(crate) fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub(crate) fn instant(&self) -> Instant {
        self.0
    }

    pub(crate) fn has_passed(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Runs a remote call bounded by `limit` and by the overall deadline,
    /// whichever comes first.
    pub(crate) async fn call<T, F>(&self, limit: Duration, fut: F) -> Result<T, CallError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        let call_deadline = (Instant::now() + limit).min(self.0);
        match tokio::time::timeout_at(call_deadline, fut).await {
            Ok(result) => result.map_err(CallError::Service),
            Err(_) if call_deadline == self.0 => Err(CallError::Expired),
            Err(_) => Err(CallError::Service(ServiceError::Timeout(limit))),
        }
    }

    /// Runs a local step bounded by the overall deadline only.
    pub(crate) async fn run<T, F>(&self, fut: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout_at(self.0, fut).await.ok()
    }
}
