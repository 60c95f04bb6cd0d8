//! Catalog and stock seed for the in-memory collaborators.
//!
//! ```json
//! {
//!   "products": [{ "id": 1 }],
//!   "skus": [{ "id": 10, "stock": 25 }, { "id": 11, "status": "off_shelf" }]
//! }
//! ```

use std::path::Path;

use common::{ProductId, SkuId};
use saga::{InMemoryCatalog, InMemoryInventory, SaleStatus};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub skus: Vec<SeedSku>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedProduct {
    pub id: ProductId,
    #[serde(default)]
    pub status: SaleStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSku {
    pub id: SkuId,
    #[serde(default)]
    pub status: SaleStatus,
    #[serde(default)]
    pub stock: u32,
}

impl CatalogSeed {
    /// Reads a seed from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Registers every product and SKU and sets SKU stock.
    pub fn apply(&self, catalog: &InMemoryCatalog, inventory: &InMemoryInventory) {
        for product in &self.products {
            catalog.add_product(product.id, product.status);
        }
        for sku in &self.skus {
            catalog.add_sku(sku.id, sku.status);
            inventory.set_stock(sku.id, sku.stock);
        }
        tracing::info!(
            products = self.products.len(),
            skus = self.skus.len(),
            "catalog seeded"
        );
    }
}
