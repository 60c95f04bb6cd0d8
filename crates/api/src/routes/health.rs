//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use order_store::{AddressStore, OrderStore};
use serde::Serialize;

use super::orders::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Submissions that could start right now without waiting.
    pub available_permits: usize,
}

/// GET /health: returns service health and submission headroom.
pub async fn check<S>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse>
where
    S: OrderStore + AddressStore + Clone + 'static,
{
    Json(HealthResponse {
        status: "ok",
        available_permits: state.coordinator.available_permits(),
    })
}
