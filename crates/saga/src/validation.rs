//! Concurrent existence check of the requested goods.

use std::collections::BTreeSet;
use std::time::Duration;

use common::{ProductId, SkuId};
use tokio::time::Instant;

use crate::deadline::{CallError, Deadline};
use crate::error::SubmitError;
use crate::services::CatalogClient;
use crate::step::SubmissionStep;

/// Products and SKUs confirmed to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCatalogSet {
    pub products: BTreeSet<ProductId>,
    pub skus: BTreeSet<SkuId>,
}

/// Runs the product and SKU lookups concurrently and joins both.
#[derive(Debug, Clone)]
pub struct ValidationFanout<C> {
    catalog: C,
    call_timeout: Duration,
}

impl<C: CatalogClient> ValidationFanout<C> {
    pub fn new(catalog: C, call_timeout: Duration) -> Self {
        Self {
            catalog,
            call_timeout,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Confirms every requested product and SKU exists.
    ///
    /// Each lookup is bounded by the per-call timeout and by `deadline`.
    /// Sale status is not checked. Fails with `GoodsUnidentifiable` listing
    /// every missing id, or with a remote failure if either lookup fails.
    #[tracing::instrument(skip_all, fields(products = product_ids.len(), skus = sku_ids.len()))]
    pub async fn validate(
        &self,
        product_ids: &BTreeSet<ProductId>,
        sku_ids: &BTreeSet<SkuId>,
        deadline: Instant,
    ) -> Result<ValidatedCatalogSet, SubmitError> {
        let deadline = Deadline::at(deadline);
        let wanted_products: Vec<ProductId> = product_ids.iter().copied().collect();
        let wanted_skus: Vec<SkuId> = sku_ids.iter().copied().collect();

        let (products, skus) = tokio::join!(
            deadline.call(self.call_timeout, self.catalog.get_products(&wanted_products)),
            deadline.call(self.call_timeout, self.catalog.get_skus(&wanted_skus)),
        );

        let (products, skus) = match (products, skus) {
            (Ok(products), Ok(skus)) => (products, skus),
            (Err(e), skus) => {
                tracing::warn!(error = ?e, skus_ok = skus.is_ok(), "product lookup failed");
                return Err(lookup_failure(e));
            }
            (Ok(_), Err(e)) => {
                tracing::warn!(error = ?e, "sku lookup failed");
                return Err(lookup_failure(e));
            }
        };

        let found_products: BTreeSet<ProductId> = products
            .into_iter()
            .map(|entry| entry.id)
            .filter(|id| product_ids.contains(id))
            .collect();
        let found_skus: BTreeSet<SkuId> = skus
            .into_iter()
            .map(|entry| entry.id)
            .filter(|id| sku_ids.contains(id))
            .collect();

        if found_products.len() == product_ids.len() && found_skus.len() == sku_ids.len() {
            return Ok(ValidatedCatalogSet {
                products: found_products,
                skus: found_skus,
            });
        }

        let missing_products: Vec<ProductId> =
            product_ids.difference(&found_products).copied().collect();
        let missing_skus: Vec<SkuId> = sku_ids.difference(&found_skus).copied().collect();
        tracing::info!(?missing_products, ?missing_skus, "goods cannot be identified");

        Err(SubmitError::GoodsUnidentifiable {
            missing_products,
            missing_skus,
        })
    }
}

fn lookup_failure(error: CallError) -> SubmitError {
    match error {
        CallError::Service(source) => SubmitError::TransientRemote {
            step: SubmissionStep::ValidateCatalog,
            order_id: None,
            compensation: None,
            source,
        },
        CallError::Expired => SubmitError::DeadlineExceeded {
            step: SubmissionStep::ValidateCatalog,
            order_id: None,
            compensation: None,
        },
    }
}
