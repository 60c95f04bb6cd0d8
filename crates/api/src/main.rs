//! API server entry point.

use api::config::Config;
use api::seed::CatalogSeed;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{AddressStore, InMemoryOrderStore, OrderStore, PostgresOrderStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<S>(config: Config, store: S, metrics_handle: PrometheusHandle)
where
    S: OrderStore + AddressStore + Clone + 'static,
{
    let (state, mut notifications) =
        api::create_default_state(store, config.submission.clone()).expect("invalid ORDER_WORKER_ID");

    if let Some(path) = &config.catalog_seed_file {
        let seed = CatalogSeed::load(path).expect("failed to load catalog seed");
        seed.apply(&state.catalog, &state.inventory);
    }

    // Stand-in for the message broker
    tokio::spawn(async move {
        while let Some(event) = notifications.recv().await {
            metrics::counter!("order_notifications_delivered_total").increment(1);
            tracing::info!(order_id = %event.order_id, topic = %event.topic, "order created");
        }
    });

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the order store and serve
    match config.database_url.clone() {
        Some(url) => {
            let store = PostgresOrderStore::connect(&url, 10)
                .await
                .expect("failed to connect to PostgreSQL");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL order store");
            serve(config, store, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory order store");
            serve(config, InMemoryOrderStore::new(), metrics_handle).await;
        }
    }
}
