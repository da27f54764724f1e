//! Store-backed entry point to the pure pricing engine.
//!
//! Loads the settings pair, latest snapshot and cooldown marker for a
//! product and hands them to the calculators.

use crate::db::Repository;
use crate::domain::{
    Decimal, EffectiveSettings, PriceSnapshot, Product, ProductId, SettingsError, TimeMs,
};
use crate::engine::{PricingEngine, SuggestedPriceResult, SuggestionInput};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// A suggestion together with the inputs it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSuggestion {
    pub product_id: ProductId,
    pub current_price: Option<Decimal>,
    pub snapshot: Option<PriceSnapshot>,
    #[serde(flatten)]
    pub result: SuggestedPriceResult,
}

#[derive(Clone)]
pub struct PricingService {
    repo: Arc<Repository>,
    engine: PricingEngine,
}

impl PricingService {
    pub fn new(repo: Arc<Repository>, engine: PricingEngine) -> Self {
        Self { repo, engine }
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    /// Merge the global record with the product's overrides, creating an
    /// empty override record on first access.
    pub async fn effective_settings(
        &self,
        product_id: &ProductId,
    ) -> Result<EffectiveSettings, PricingError> {
        let global = self.repo.get_global_settings().await?;
        let product = self
            .repo
            .get_or_create_product_settings(product_id, TimeMs::now())
            .await?;
        Ok(EffectiveSettings::merge(&global, &product)?)
    }

    /// Suggest a price from the latest snapshot.
    ///
    /// Our price is the catalog's current price, falling back to the price
    /// observed in the snapshot.
    pub async fn suggest(
        &self,
        product: &Product,
        settings: &EffectiveSettings,
        bypass_cooldown: bool,
        now: TimeMs,
    ) -> Result<ProductSuggestion, PricingError> {
        let snapshot = self.repo.latest_snapshot(&product.id).await?;
        let last_downward_change_at = self.repo.last_downward_change_at(&product.id).await?;
        let result = self.suggest_from(
            product,
            settings,
            snapshot.as_ref(),
            last_downward_change_at,
            bypass_cooldown,
            now,
        );

        Ok(ProductSuggestion {
            product_id: product.id.clone(),
            current_price: product.current_price,
            snapshot,
            result,
        })
    }

    pub fn suggest_from(
        &self,
        product: &Product,
        settings: &EffectiveSettings,
        snapshot: Option<&PriceSnapshot>,
        last_downward_change_at: Option<TimeMs>,
        bypass_cooldown: bool,
        now: TimeMs,
    ) -> SuggestedPriceResult {
        self.engine.suggester.suggest(&SuggestionInput {
            competitor_min: snapshot.and_then(|s| s.competitor_min_price),
            our_price: product
                .current_price
                .or_else(|| snapshot.and_then(|s| s.our_price)),
            settings,
            min_price: product.min_price,
            last_downward_change_at,
            now,
            bypass_cooldown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::temp_repo;
    use crate::domain::{BuyboxStatus, ChangeMethod, ProductSettings, VatMode};
    use crate::engine::{FeeBasis, Floor, SuggestionReason};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn product() -> Product {
        Product {
            id: ProductId::new("SKU-1"),
            barcode: Some("869000000001".to_string()),
            title: None,
            current_price: Some(d("210")),
            min_price: None,
            auto_pilot: true,
        }
    }

    async fn seed(repo: &Repository) {
        let overrides = ProductSettings {
            cost_price: Some(d("100")),
            fee_rate: Some(d("10")),
            shipping_cost: Some(d("20")),
            vat_rate: Some(d("15")),
            vat_mode: Some(VatMode::Inclusive),
            cooldown_minutes: Some(30),
            ..Default::default()
        };
        repo.put_product_settings(&ProductId::new("SKU-1"), &overrides, TimeMs::new(0))
            .await
            .unwrap();
        repo.insert_snapshot(&PriceSnapshot {
            product_id: ProductId::new("SKU-1"),
            checked_at: TimeMs::new(1_000),
            our_price: Some(d("210")),
            competitor_min_price: Some(d("200")),
            buybox_status: BuyboxStatus::Lose,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_effective_settings_merges_overrides() {
        let (_dir, repo) = temp_repo().await;
        let repo = Arc::new(repo);
        seed(&repo).await;
        let service = PricingService::new(repo, PricingEngine::new(FeeBasis::CostAnchored));

        let settings = service
            .effective_settings(&ProductId::new("SKU-1"))
            .await
            .unwrap();
        assert_eq!(settings.fee_rate, d("0.1"));
        assert_eq!(settings.undercut_step, d("0.5"));
    }

    #[tokio::test]
    async fn test_effective_settings_rejects_invalid_global() {
        let (_dir, repo) = temp_repo().await;
        let mut global = crate::domain::GlobalSettings::default();
        global.fee_rate = d("150");
        repo.put_global_settings(&global, TimeMs::new(0)).await.unwrap();
        let service =
            PricingService::new(Arc::new(repo), PricingEngine::new(FeeBasis::CostAnchored));

        let err = service
            .effective_settings(&ProductId::new("SKU-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, PricingError::Settings(SettingsError::InvalidFeeRate(_))));
    }

    #[tokio::test]
    async fn test_suggest_uses_latest_snapshot_and_cooldown() {
        let (_dir, repo) = temp_repo().await;
        let repo = Arc::new(repo);
        seed(&repo).await;
        let service =
            PricingService::new(repo.clone(), PricingEngine::new(FeeBasis::CostAnchored));
        let p = product();
        let settings = service.effective_settings(&p.id).await.unwrap();
        let now = TimeMs::new(10_000_000);

        let s = service.suggest(&p, &settings, false, now).await.unwrap();
        assert_eq!(s.result.suggested, Some(d("199.5")));
        assert_eq!(s.result.floor, Floor::Price(d("145")));
        assert_eq!(s.result.reason, SuggestionReason::AboveFloor);

        repo.append_price_change(
            &p.id,
            Some(d("220")),
            d("210"),
            ChangeMethod::Manual,
            &serde_json::json!({}),
            now.minus_minutes(5),
        )
        .await
        .unwrap();
        let held = service.suggest(&p, &settings, false, now).await.unwrap();
        assert_eq!(held.result.reason, SuggestionReason::CooldownActive);
        assert_eq!(held.result.suggested, Some(d("210")));

        let bypassed = service.suggest(&p, &settings, true, now).await.unwrap();
        assert_eq!(bypassed.result.suggested, Some(d("199.5")));
    }
}
