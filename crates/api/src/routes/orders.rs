//! Order submission and lookup endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{CartLineId, OrderId, ProductId, SkuId, UserId};
use domain::{AddressInput, Money, OrderLineRequest, OrderRequest};
use order_store::{AddressStore, OrderStore};
use saga::{
    ChannelNotifier, InMemoryCart, InMemoryCatalog, InMemoryInventory,
    OrderSubmissionCoordinator, SnowflakeIdAllocator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;

/// Submission coordinator wired to the in-memory collaborators.
pub type Coordinator<S> = OrderSubmissionCoordinator<
    S,
    SnowflakeIdAllocator,
    InMemoryCatalog,
    InMemoryInventory,
    InMemoryCart,
    ChannelNotifier,
>;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub coordinator: Coordinator<S>,
    pub store: S,
    pub catalog: InMemoryCatalog,
    pub inventory: InMemoryInventory,
    pub cart: InMemoryCart,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct SubmitOrderRequest {
    pub user_id: u64,
    pub address: AddressInput,
    #[serde(default)]
    pub remarks: String,
    pub total_cents: i64,
    pub total_count: u32,
    pub lines: Vec<OrderLinePayload>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLinePayload {
    pub product_id: u64,
    pub sku_id: u64,
    pub product_name: String,
    pub sku_name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub cart_line_id: Option<u64>,
}

impl From<SubmitOrderRequest> for OrderRequest {
    fn from(req: SubmitOrderRequest) -> Self {
        OrderRequest {
            user_id: UserId::new(req.user_id),
            address: req.address,
            remarks: req.remarks,
            total: Money::from_cents(req.total_cents),
            total_count: req.total_count,
            lines: req
                .lines
                .into_iter()
                .map(|line| OrderLineRequest {
                    product_id: ProductId::new(line.product_id),
                    sku_id: SkuId::new(line.sku_id),
                    sku_name: line.sku_name,
                    product_name: line.product_name,
                    unit_price: Money::from_cents(line.unit_price_cents),
                    quantity: line.quantity,
                    picture: line.picture,
                    origin_cart_line_id: line.cart_line_id.map(CartLineId::new),
                })
                .collect(),
        }
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderSubmittedResponse {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: u64,
    pub status: String,
    pub total_cents: i64,
    pub product_count: u32,
    pub product_summary: String,
    pub remarks: String,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub address: Option<AddressInput>,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Debug, Serialize)]
pub struct OrderLineResponse {
    pub product_id: u64,
    pub sku_id: u64,
    pub product_name: String,
    pub sku_name: String,
    pub picture: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub line_total_cents: i64,
}

// -- Handlers --

/// POST /orders: submit an order.
#[tracing::instrument(skip(state, req), fields(user_id = req.user_id))]
pub async fn submit<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<SubmitOrderRequest>,
) -> Result<(StatusCode, Json<OrderSubmittedResponse>), ApiError>
where
    S: OrderStore + AddressStore + Clone + 'static,
{
    let order_id = state.coordinator.submit(req.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderSubmittedResponse {
            order_id: order_id.to_string(),
        }),
    ))
}

/// GET /orders/{id}: load an order with its lines and address snapshot.
#[tracing::instrument(skip(state))]
pub async fn get<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderStore + AddressStore + Clone + 'static,
{
    let order_id: OrderId = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;

    let order = state
        .store
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    let lines = state.store.lines_for_order(order_id).await?;
    let address = state.store.get_address(order.address_id).await?;

    Ok(Json(OrderResponse {
        id: order.id.to_string(),
        user_id: order.user_id.value(),
        status: order.status.to_string(),
        total_cents: order.total.cents(),
        product_count: order.product_count,
        product_summary: order.product_summary,
        remarks: order.remarks,
        cancel_reason: order.cancel_reason,
        created_at: order.created_at,
        address: address.map(|snapshot| snapshot.address),
        lines: lines
            .into_iter()
            .map(|line| OrderLineResponse {
                product_id: line.product_id.value(),
                sku_id: line.sku_id.value(),
                product_name: line.product_name,
                sku_name: line.sku_name,
                picture: line.picture,
                unit_price_cents: line.unit_price.cents(),
                quantity: line.quantity,
                line_total_cents: line.line_total.cents(),
            })
            .collect(),
    }))
}
