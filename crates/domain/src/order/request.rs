//! Order submission requests.

use std::collections::BTreeSet;

use common::{CartLineId, ProductId, SkuId, UserId};
use serde::{Deserialize, Serialize};

use super::{AddressInput, Money, OrderError};

/// One line of an order as priced by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub sku_id: SkuId,
    pub sku_name: String,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub picture: Option<String>,
    /// Cart line this entry came from; `None` for "buy now" purchases.
    #[serde(default)]
    pub origin_cart_line_id: Option<CartLineId>,
}

impl OrderLineRequest {
    /// Returns `quantity * unit_price`.
    pub fn line_total(&self) -> Result<Money, OrderError> {
        self.unit_price
            .checked_multiply(self.quantity)
            .ok_or(OrderError::AmountOverflow {
                sku_id: self.sku_id,
                quantity: self.quantity,
                price: self.unit_price,
            })
    }
}

/// A complete order submission.
///
/// `total` and `total_count` are aggregates computed by the caller when the
/// cart was priced. They are recorded as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub user_id: UserId,
    pub address: AddressInput,
    #[serde(default)]
    pub remarks: String,
    pub total: Money,
    pub total_count: u32,
    pub lines: Vec<OrderLineRequest>,
}

impl OrderRequest {
    /// Checks the request invariants: at least one line, positive
    /// quantities, non-negative prices whose line totals fit in the money
    /// range, and a deliverable address.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::NoLines);
        }
        for line in &self.lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    sku_id: line.sku_id,
                    quantity: line.quantity,
                });
            }
            if line.unit_price.is_negative() {
                return Err(OrderError::InvalidPrice {
                    sku_id: line.sku_id,
                    price: line.unit_price,
                });
            }
            line.line_total()?;
        }
        if self.total.is_negative() {
            return Err(OrderError::InvalidTotal(self.total));
        }
        self.address.validate()
    }

    /// Distinct product ids referenced by the lines.
    pub fn distinct_product_ids(&self) -> BTreeSet<ProductId> {
        self.lines.iter().map(|l| l.product_id).collect()
    }

    /// Distinct SKU ids referenced by the lines.
    pub fn distinct_sku_ids(&self) -> BTreeSet<SkuId> {
        self.lines.iter().map(|l| l.sku_id).collect()
    }

    /// Cart lines that originated this order, in request order, without duplicates.
    pub fn origin_cart_lines(&self) -> Vec<CartLineId> {
        let mut seen = BTreeSet::new();
        self.lines
            .iter()
            .filter_map(|l| l.origin_cart_line_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}
