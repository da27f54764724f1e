//! Operator-triggered suggestions and reprices over many products.

use super::apply::{AppliedChange, ApplyError, PriceApplier};
use super::batch::{BatchProgress, BatchReport, BatchRunner, ItemPanicked};
use super::pricing::{PricingError, PricingService, ProductSuggestion};
use crate::db::Repository;
use crate::domain::{ChangeMethod, Product, ProductId, TimeMs};
use crate::engine::SuggestionReason;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ManualError {
    #[error("product {0} not found")]
    NotFound(ProductId),
    #[error("no price to apply ({0})")]
    NoSuggestion(SuggestionReason),
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Panicked(#[from] ItemPanicked),
}

/// Outcome of a manual reprice that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepriceOutcome {
    Applied(AppliedChange),
    /// The suggester held the current price; nothing was sent.
    Unchanged { reason: SuggestionReason },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem<T> {
    pub product_id: ProductId,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse<T> {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<BatchItem<T>>,
}

impl<T> From<BatchReport<ProductId, T, ManualError>> for BatchResponse<T> {
    fn from(report: BatchReport<ProductId, T, ManualError>) -> Self {
        let items = report
            .results
            .into_iter()
            .map(|(product_id, outcome)| match outcome {
                Ok(result) => BatchItem {
                    product_id,
                    ok: true,
                    result: Some(result),
                    error: None,
                },
                Err(e) => BatchItem {
                    product_id,
                    ok: false,
                    result: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();
        Self {
            total: report.total,
            succeeded: report.succeeded,
            failed: report.failed,
            items,
        }
    }
}

fn log_progress(operation: &'static str) -> impl Fn(BatchProgress) {
    move |p| {
        debug!(
            operation,
            completed = p.completed,
            total = p.total,
            failed = p.failed,
            "Batch progress"
        )
    }
}

#[derive(Clone)]
pub struct ManualPricing {
    repo: Arc<Repository>,
    pricing: PricingService,
    applier: PriceApplier,
    runner: BatchRunner,
}

impl ManualPricing {
    pub fn new(
        repo: Arc<Repository>,
        pricing: PricingService,
        applier: PriceApplier,
        runner: BatchRunner,
    ) -> Self {
        Self {
            repo,
            pricing,
            applier,
            runner,
        }
    }

    async fn load(&self, id: &ProductId) -> Result<Product, ManualError> {
        self.repo
            .get_product(id)
            .await?
            .ok_or_else(|| ManualError::NotFound(id.clone()))
    }

    pub async fn suggest_one(
        &self,
        id: &ProductId,
        bypass_cooldown: bool,
    ) -> Result<ProductSuggestion, ManualError> {
        let product = self.load(id).await?;
        let settings = self.pricing.effective_settings(id).await?;
        Ok(self
            .pricing
            .suggest(&product, &settings, bypass_cooldown, TimeMs::now())
            .await?)
    }

    /// Suggest and, when the suggestion moves the price, apply it through the
    /// same gates as auto-pilot.
    pub async fn reprice_one(
        &self,
        id: &ProductId,
        bypass_cooldown: bool,
    ) -> Result<RepriceOutcome, ManualError> {
        let product = self.load(id).await?;
        let settings = self.pricing.effective_settings(id).await?;
        let now = TimeMs::now();
        let suggestion = self
            .pricing
            .suggest(&product, &settings, bypass_cooldown, now)
            .await?;

        let reason = suggestion.result.reason;
        match (reason, suggestion.result.suggested) {
            (SuggestionReason::CooldownActive | SuggestionReason::NoChange, _) => {
                Ok(RepriceOutcome::Unchanged { reason })
            }
            (_, Some(price)) => {
                let applied = self
                    .applier
                    .apply(&product, &settings, price, ChangeMethod::Manual, now)
                    .await?;
                Ok(RepriceOutcome::Applied(applied))
            }
            (_, None) => Err(ManualError::NoSuggestion(reason)),
        }
    }

    pub async fn suggest_many(
        &self,
        ids: Vec<ProductId>,
        bypass_cooldown: bool,
    ) -> BatchResponse<ProductSuggestion> {
        self.runner
            .run(
                ids,
                |id| async move { self.suggest_one(&id, bypass_cooldown).await },
                log_progress("suggestions"),
            )
            .await
            .into()
    }

    pub async fn reprice_many(
        &self,
        ids: Vec<ProductId>,
        bypass_cooldown: bool,
    ) -> BatchResponse<RepriceOutcome> {
        self.runner
            .run(
                ids,
                |id| async move { self.reprice_one(&id, bypass_cooldown).await },
                log_progress("reprice"),
            )
            .await
            .into()
    }
}
