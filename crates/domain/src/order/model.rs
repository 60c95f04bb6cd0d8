//! Persisted order records.

use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, ProductId, SkuId, UserId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderError, OrderLineRequest, OrderRequest, OrderStatus};

/// Maximum number of characters kept in `Order::product_summary`.
pub const PRODUCT_SUMMARY_MAX_CHARS: usize = 100;

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub total: Money,
    /// Number of items across all lines, as supplied by the caller.
    pub product_count: u32,
    pub status: OrderStatus,
    pub address_id: AddressId,
    /// Product names joined with `,`, cut to `PRODUCT_SUMMARY_MAX_CHARS`.
    pub product_summary: String,
    pub remarks: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancel_reason: Option<String>,
}

/// A single line of an order with its catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub sku_id: SkuId,
    pub product_name: String,
    pub sku_name: String,
    pub picture: Option<String>,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    fn from_request(
        order_id: OrderId,
        user_id: UserId,
        line: &OrderLineRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        Ok(Self {
            order_id,
            user_id,
            product_id: line.product_id,
            sku_id: line.sku_id,
            product_name: line.product_name.clone(),
            sku_name: line.sku_name.clone(),
            picture: line.picture.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total()?,
            created_at: now,
        })
    }
}

/// Joins product names with `,` and cuts the result to
/// `PRODUCT_SUMMARY_MAX_CHARS` characters.
pub fn product_summary<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let joined = names.into_iter().collect::<Vec<_>>().join(",");
    joined.chars().take(PRODUCT_SUMMARY_MAX_CHARS).collect()
}

/// Builds the unpaid order header and its lines for a validated request.
pub fn build_order(
    order_id: OrderId,
    address_id: AddressId,
    request: &OrderRequest,
    now: DateTime<Utc>,
) -> Result<(Order, Vec<OrderLine>), OrderError> {
    let lines = request
        .lines
        .iter()
        .map(|line| OrderLine::from_request(order_id, request.user_id, line, now))
        .collect::<Result<Vec<_>, _>>()?;

    let order = Order {
        id: order_id,
        user_id: request.user_id,
        total: request.total,
        product_count: request.total_count,
        status: OrderStatus::Unpaid,
        address_id,
        product_summary: product_summary(request.lines.iter().map(|l| l.product_name.as_str())),
        remarks: request.remarks.clone(),
        created_at: now,
        updated_at: now,
        cancel_reason: None,
    };

    Ok((order, lines))
}
