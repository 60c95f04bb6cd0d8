//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::routes::orders::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{ProductId, SkuId};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InMemoryOrderStore;
use saga::{OrderCreated, SaleStatus, SubmissionConfig};
use tokio::sync::mpsc;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    state: Arc<AppState<InMemoryOrderStore>>,
    store: InMemoryOrderStore,
    notifications: mpsc::Receiver<OrderCreated>,
}

fn setup() -> TestApp {
    setup_with_config(SubmissionConfig::default())
}

fn setup_with_config(config: SubmissionConfig) -> TestApp {
    let store = InMemoryOrderStore::new();
    let (state, notifications) = api::create_default_state(store.clone(), config).unwrap();

    for (product, sku) in [(1, 10), (2, 20)] {
        state
            .catalog
            .add_product(ProductId::new(product), SaleStatus::OnSale);
        state.catalog.add_sku(SkuId::new(sku), SaleStatus::OnSale);
        state.inventory.set_stock(SkuId::new(sku), 10);
    }

    let app = api::create_app(state.clone(), get_metrics_handle());
    TestApp {
        app,
        state,
        store,
        notifications,
    }
}

fn order_body(sku_id: u64, quantity: u32) -> serde_json::Value {
    serde_json::json!({
        "user_id": 42,
        "address": {
            "receiver": "Chen",
            "mobile": "13900000000",
            "province": "Hubei",
            "city": "Wuhan",
            "area": "Wuchang",
            "detail": "Bayi Road 299"
        },
        "remarks": "leave at the door",
        "total_cents": 2500,
        "total_count": 3,
        "lines": [
            {
                "product_id": 1,
                "sku_id": sku_id,
                "product_name": "Mug",
                "sku_name": "Mug / blue",
                "unit_price_cents": 1000,
                "quantity": quantity,
                "cart_line_id": 7
            },
            {
                "product_id": 2,
                "sku_id": 20,
                "product_name": "Pen",
                "sku_name": "Pen / black",
                "unit_price_cents": 500,
                "quantity": 1
            }
        ]
    })
}

async fn post_order(app: &axum::Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();

    let (status, json) = get_json(&t.app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["available_permits"], 64);
}

#[tokio::test]
async fn test_submit_and_get_order() {
    let mut t = setup();
    t.state.cart.add_lines(common::UserId::new(42), [common::CartLineId::new(7)]);

    let (status, created) = post_order(&t.app, order_body(10, 2)).await;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = created["order_id"].as_str().unwrap().to_string();

    let (status, order) = get_json(&t.app, &format!("/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["id"], order_id.as_str());
    assert_eq!(order["status"], "UNPAID");
    assert_eq!(order["total_cents"], 2500);
    assert_eq!(order["product_count"], 3);
    assert_eq!(order["product_summary"], "Mug,Pen");
    assert_eq!(order["address"]["receiver"], "Chen");
    assert_eq!(order["lines"].as_array().unwrap().len(), 2);
    assert_eq!(order["lines"][0]["line_total_cents"], 2000);
    assert_eq!(order["lines"][1]["line_total_cents"], 500);

    assert!(t.state.cart.lines(common::UserId::new(42)).is_empty());
    let event = t.notifications.recv().await.unwrap();
    assert_eq!(event.order_id.to_string(), order_id);
    assert_eq!(event.topic, "order.create");
}

#[tokio::test]
async fn test_get_unknown_order() {
    let t = setup();

    let (status, json) = get_json(&t.app, "/orders/123456").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("123456"));
}

#[tokio::test]
async fn test_get_malformed_order_id() {
    let t = setup();

    let (status, json) = get_json(&t.app, "/orders/not-a-number").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_unknown_sku_is_unprocessable() {
    let t = setup();

    let (status, json) = post_order(&t.app, order_body(999, 2)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("999"));
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_insufficient_stock_is_conflict() {
    let t = setup();

    let (status, json) = post_order(&t.app, order_body(10, 11)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("Insufficient inventory"));
    assert_eq!(t.store.cancellation_count().await, 1);
}

#[tokio::test]
async fn test_zero_quantity_is_bad_request() {
    let t = setup();

    let (status, _) = post_order(&t.app, order_body(10, 0)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.store.address_count().await, 0);
}

#[tokio::test]
async fn test_inventory_outage_is_unavailable() {
    let t = setup();
    t.state.inventory.set_fail_on_lock(true);

    let (status, _) = post_order(&t.app, order_body(10, 1)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(t.store.cancellation_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_catalog_is_gateway_timeout() {
    let t = setup_with_config(SubmissionConfig {
        overall_timeout: Duration::from_millis(100),
        ..SubmissionConfig::default()
    });
    t.state.catalog.set_latency(Some(Duration::from_secs(2)));

    let (status, _) = post_order(&t.app, order_body(10, 1)).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_store_failure_is_internal() {
    let t = setup();
    t.store.set_fail_on_write(true);

    let (status, json) = post_order(&t.app, order_body(10, 1)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("write_order"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();
    post_order(&t.app, order_body(10, 1)).await;

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("order_submissions_total"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_cart_counts_prune_failure() {
    let t = setup_with_config(SubmissionConfig {
        best_effort_timeout: Duration::from_millis(50),
        ..SubmissionConfig::default()
    });
    t.state.cart.set_latency(Some(Duration::from_secs(5)));

    let (status, json) = post_order(&t.app, order_body(10, 2)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(json["order_id"].is_string());

    let response = t
        .app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("order_cart_prune_failures_total"));
}

#[tokio::test]
async fn test_overflowing_line_total_is_bad_request() {
    let t = setup();
    let mut body = order_body(10, 3);
    body["lines"][0]["unit_price_cents"] = serde_json::json!(i64::MAX / 2);

    let (status, json) = post_order(&t.app, body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("overflows"));
    assert_eq!(t.store.address_count().await, 0);
}
