//! HTTP API server for order submission.
//!
//! Exposes the submission saga over REST, with structured logging (tracing)
//! and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod seed;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{AddressStore, OrderStore};
use saga::{
    ChannelNotifier, InMemoryCart, InMemoryCatalog, InMemoryInventory, InvalidWorkerId,
    OrderCreated, OrderSubmissionCoordinator, SnowflakeIdAllocator, SubmissionConfig,
};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Capacity of the "order created" channel of the default state.
pub const NOTIFICATION_BUFFER: usize = 1024;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router
where
    S: OrderStore + AddressStore + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/orders", post(routes::orders::submit::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around `store`, with in-memory catalog,
/// inventory and cart services.
///
/// Returns the receiving end of the "order created" notifications.
pub fn create_default_state<S>(
    store: S,
    config: SubmissionConfig,
) -> Result<(Arc<AppState<S>>, mpsc::Receiver<OrderCreated>), InvalidWorkerId>
where
    S: OrderStore + AddressStore + Clone + 'static,
{
    let ids = SnowflakeIdAllocator::new(config.worker_id)?;
    let catalog = InMemoryCatalog::new();
    let inventory = InMemoryInventory::new();
    let cart = InMemoryCart::new();
    let (notifier, notifications) = ChannelNotifier::new(NOTIFICATION_BUFFER);

    let coordinator = OrderSubmissionCoordinator::new(
        store.clone(),
        ids,
        catalog.clone(),
        inventory.clone(),
        cart.clone(),
        notifier,
        config,
    );

    let state = Arc::new(AppState {
        coordinator,
        store,
        catalog,
        inventory,
        cart,
    });

    Ok((state, notifications))
}
