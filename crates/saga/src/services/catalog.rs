//! Catalog lookups used to confirm that requested goods exist.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{ProductId, SkuId};
use serde::{Deserialize, Serialize};

use super::{read, write};
use crate::error::ServiceError;

/// Whether a product or SKU is currently on sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    #[default]
    OnSale,
    OffShelf,
}

/// One catalog record returned by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry<Id> {
    pub id: Id,
    pub status: SaleStatus,
}

/// Read access to the product catalog.
///
/// Unknown ids are omitted from the result; they are not an error.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Looks up products by id.
    async fn get_products(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<CatalogEntry<ProductId>>, ServiceError>;

    /// Looks up SKUs by id.
    async fn get_skus(&self, ids: &[SkuId]) -> Result<Vec<CatalogEntry<SkuId>>, ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, SaleStatus>,
    skus: HashMap<SkuId, SaleStatus>,
    fail_on_products: bool,
    fail_on_skus: bool,
    latency: Option<Duration>,
    product_lookups: usize,
    sku_lookups: usize,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory catalog for tests and the development server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub fn add_product(&self, id: ProductId, status: SaleStatus) {
        write(&self.state).products.insert(id, status);
    }

    /// Adds or replaces a SKU.
    pub fn add_sku(&self, id: SkuId, status: SaleStatus) {
        write(&self.state).skus.insert(id, status);
    }

    /// Makes product lookups fail while set.
    pub fn set_fail_on_products(&self, fail: bool) {
        write(&self.state).fail_on_products = fail;
    }

    /// Makes SKU lookups fail while set.
    pub fn set_fail_on_skus(&self, fail: bool) {
        write(&self.state).fail_on_skus = fail;
    }

    /// Delays every lookup by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        write(&self.state).latency = latency;
    }

    /// Returns the number of product lookups served or attempted.
    pub fn product_lookups(&self) -> usize {
        read(&self.state).product_lookups
    }

    /// Returns the number of SKU lookups served or attempted.
    pub fn sku_lookups(&self) -> usize {
        read(&self.state).sku_lookups
    }

    /// Returns the highest number of lookups that were in progress at once.
    pub fn max_concurrent_lookups(&self) -> usize {
        read(&self.state).max_in_flight
    }

    /// Returns the number of lookups currently in progress.
    pub fn lookups_in_flight(&self) -> usize {
        read(&self.state).in_flight
    }

    /// Marks a lookup as in progress and waits out the configured latency.
    ///
    /// The lookup stays counted until the returned guard drops, including
    /// when the caller abandons the future mid-sleep.
    async fn enter(&self) -> LookupGuard<'_> {
        let latency = {
            let mut state = write(&self.state);
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.latency
        };
        let guard = LookupGuard { catalog: self };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        guard
    }
}

struct LookupGuard<'a> {
    catalog: &'a InMemoryCatalog,
}

impl Drop for LookupGuard<'_> {
    fn drop(&mut self) {
        let mut state = write(&self.catalog.state);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn get_products(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<CatalogEntry<ProductId>>, ServiceError> {
        write(&self.state).product_lookups += 1;
        drop(self.enter().await);

        let state = read(&self.state);
        if state.fail_on_products {
            return Err(ServiceError::Unavailable("product service down".to_string()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .products
                    .get(id)
                    .map(|status| CatalogEntry { id: *id, status: *status })
            })
            .collect())
    }

    async fn get_skus(&self, ids: &[SkuId]) -> Result<Vec<CatalogEntry<SkuId>>, ServiceError> {
        write(&self.state).sku_lookups += 1;
        drop(self.enter().await);

        let state = read(&self.state);
        if state.fail_on_skus {
            return Err(ServiceError::Unavailable("sku service down".to_string()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| {
                state
                    .skus
                    .get(id)
                    .map(|status| CatalogEntry { id: *id, status: *status })
            })
            .collect())
    }
}
