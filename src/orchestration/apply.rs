//! The gated Apply step shared by auto-pilot and manual reprices.
//!
//! Floor and profit gates run again right before the marketplace call, no
//! matter what the caller already checked.

use crate::db::Repository;
use crate::domain::{
    BuyboxStatus, ChangeMethod, Decimal, EffectiveSettings, PriceChange, PriceSnapshot, Product,
    ProductId, TimeMs,
};
use crate::engine::{Floor, PricingEngine};
use crate::marketplace::{MarketplaceError, MarketplacePriceClient, PriceUpdateResponse};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateFailure {
    #[error("price {price} is below the enforced floor {floor}")]
    BelowFloor { price: Decimal, floor: Floor },
    #[error("price {price} yields profit {profit}")]
    Unprofitable { price: Decimal, profit: Decimal },
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Gate(#[from] GateFailure),
    #[error("product {0} has no marketplace barcode")]
    MissingReference(ProductId),
    #[error("marketplace call failed: {0}")]
    Upstream(#[from] MarketplaceError),
    #[error("marketplace did not accept the price update: {raw}")]
    Rejected { raw: serde_json::Value },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    pub change: PriceChange,
    pub snapshot: PriceSnapshot,
    pub response: PriceUpdateResponse,
}

#[derive(Clone)]
pub struct PriceApplier {
    repo: Arc<Repository>,
    client: Arc<dyn MarketplacePriceClient>,
    engine: PricingEngine,
}

impl PriceApplier {
    pub fn new(
        repo: Arc<Repository>,
        client: Arc<dyn MarketplacePriceClient>,
        engine: PricingEngine,
    ) -> Self {
        Self {
            repo,
            client,
            engine,
        }
    }

    /// Floor gate, then profit gate.
    pub fn check_gates(
        &self,
        product: &Product,
        settings: &EffectiveSettings,
        price: Decimal,
    ) -> Result<(), GateFailure> {
        let floor = self.engine.floors.enforced_floor(settings, product.min_price);
        if !floor.admits(price) {
            return Err(GateFailure::BelowFloor { price, floor });
        }

        let profit = self.engine.fees.compute(price, settings).profit_sar;
        if profit.is_negative() {
            return Err(GateFailure::Unprofitable { price, profit });
        }
        Ok(())
    }

    /// Push `price` to the marketplace, then log the change, update the
    /// catalog price and append a refreshed snapshot in one transaction.
    ///
    /// An update the marketplace does not accept is an error and leaves no
    /// trace in the change log.
    pub async fn apply(
        &self,
        product: &Product,
        settings: &EffectiveSettings,
        price: Decimal,
        method: ChangeMethod,
        now: TimeMs,
    ) -> Result<AppliedChange, ApplyError> {
        self.check_gates(product, settings, price)?;

        let reference = product
            .barcode
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| ApplyError::MissingReference(product.id.clone()))?;

        let competitor_min_price = self
            .repo
            .latest_snapshot(&product.id)
            .await?
            .and_then(|s| s.competitor_min_price);

        let response = self.client.update_price(reference, price).await?;
        if !response.accepted {
            warn!(product_id = %product.id, price = %price, "Price update not accepted");
            return Err(ApplyError::Rejected { raw: response.raw });
        }

        let snapshot = PriceSnapshot {
            product_id: product.id.clone(),
            checked_at: now,
            our_price: Some(price),
            competitor_min_price,
            buybox_status: BuyboxStatus::Unknown,
        };

        let change = match self
            .repo
            .record_applied_price(product.current_price, price, method, &response.raw, &snapshot)
            .await
        {
            Ok(change) => change,
            Err(e) => {
                // The marketplace already holds the new price.
                error!(
                    product_id = %product.id,
                    new_price = %price,
                    method = %method,
                    raw = %response.raw,
                    error = %e,
                    "Accepted price change could not be recorded"
                );
                return Err(e.into());
            }
        };

        info!(
            product_id = %product.id,
            old_price = ?product.current_price.map(|p| p.to_string()),
            new_price = %price,
            method = %method,
            "Price applied"
        );

        Ok(AppliedChange {
            change,
            snapshot,
            response,
        })
    }
}
