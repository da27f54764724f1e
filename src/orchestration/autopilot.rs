//! Autonomous repricing over every auto-pilot product.
//!
//! Per product: GateCost -> GateSnapshot -> Suggest -> GateFloor ->
//! GateProfit -> Apply. Any gate failure skips the product; any error while
//! loading or applying counts as errored and the loop moves on.

use super::apply::{ApplyError, GateFailure, PriceApplier};
use super::pricing::{PricingError, PricingService};
use crate::db::Repository;
use crate::domain::{ChangeMethod, Decimal, Product, ProductId, TimeMs};
use crate::engine::SuggestionReason;
use crate::notify::NotificationChannel;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    NoCostPrice,
    NoSnapshot,
    NoSuggestion,
    CooldownActive,
    NoChange,
    BelowFloor,
    Unprofitable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductOutcome {
    Updated {
        #[serde(rename = "oldPrice")]
        old_price: Option<Decimal>,
        #[serde(rename = "newPrice")]
        new_price: Decimal,
    },
    Skipped {
        reason: SkipReason,
    },
    Errored {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRunResult {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub outcome: ProductOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoPilotSummary {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errored: usize,
    pub results: Vec<ProductRunResult>,
}

impl AutoPilotSummary {
    fn push(&mut self, product_id: ProductId, outcome: ProductOutcome) {
        self.processed += 1;
        match outcome {
            ProductOutcome::Updated { .. } => self.updated += 1,
            ProductOutcome::Skipped { .. } => self.skipped += 1,
            ProductOutcome::Errored { .. } => self.errored += 1,
        }
        self.results.push(ProductRunResult {
            product_id,
            outcome,
        });
    }
}

#[derive(Debug, Error)]
enum ProductError {
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

#[derive(Clone)]
pub struct AutoPilot {
    repo: Arc<Repository>,
    pricing: PricingService,
    applier: PriceApplier,
    notifier: Arc<dyn NotificationChannel>,
}

impl AutoPilot {
    pub fn new(
        repo: Arc<Repository>,
        pricing: PricingService,
        applier: PriceApplier,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            repo,
            pricing,
            applier,
            notifier,
        }
    }

    /// Process every auto-pilot product sequentially.
    ///
    /// Only a failure to list products fails the run; per-product problems
    /// are reported in the summary.
    pub async fn run(&self, now: TimeMs) -> Result<AutoPilotSummary, sqlx::Error> {
        let products = self.repo.list_auto_pilot_products().await?;
        info!(products = products.len(), "Auto-pilot run starting");

        let mut summary = AutoPilotSummary::default();
        for product in &products {
            let outcome = match self.process_product(product, now).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(product_id = %product.id, error = %e, "Auto-pilot failed for product");
                    ProductOutcome::Errored {
                        error: e.to_string(),
                    }
                }
            };
            if let ProductOutcome::Skipped { reason } = &outcome {
                debug!(product_id = %product.id, reason = ?reason, "Auto-pilot skipped product");
            }
            summary.push(product.id.clone(), outcome);
        }

        info!(
            processed = summary.processed,
            updated = summary.updated,
            skipped = summary.skipped,
            errored = summary.errored,
            "Auto-pilot run finished"
        );
        self.notify(&summary).await;
        Ok(summary)
    }

    async fn process_product(
        &self,
        product: &Product,
        now: TimeMs,
    ) -> Result<ProductOutcome, ProductError> {
        let skip = |reason| Ok(ProductOutcome::Skipped { reason });

        let settings = self.pricing.effective_settings(&product.id).await?;
        if !settings.cost_price.is_positive() {
            return skip(SkipReason::NoCostPrice);
        }

        let Some(snapshot) = self
            .repo
            .latest_snapshot(&product.id)
            .await
            .map_err(PricingError::from)?
        else {
            return skip(SkipReason::NoSnapshot);
        };

        let last_downward_change_at = self
            .repo
            .last_downward_change_at(&product.id)
            .await
            .map_err(PricingError::from)?;
        let suggestion = self.pricing.suggest_from(
            product,
            &settings,
            Some(&snapshot),
            last_downward_change_at,
            false,
            now,
        );
        let price = match (suggestion.reason, suggestion.suggested) {
            (SuggestionReason::CooldownActive, _) => return skip(SkipReason::CooldownActive),
            (SuggestionReason::NoChange, _) => return skip(SkipReason::NoChange),
            (_, Some(price)) => price,
            (_, None) => return skip(SkipReason::NoSuggestion),
        };

        match self.applier.check_gates(product, &settings, price) {
            Err(GateFailure::BelowFloor { .. }) => return skip(SkipReason::BelowFloor),
            Err(GateFailure::Unprofitable { .. }) => return skip(SkipReason::Unprofitable),
            Ok(()) => {}
        }

        let applied = self
            .applier
            .apply(product, &settings, price, ChangeMethod::AutoPilot, now)
            .await?;
        Ok(ProductOutcome::Updated {
            old_price: applied.change.old_price,
            new_price: applied.change.new_price,
        })
    }

    async fn notify(&self, summary: &AutoPilotSummary) {
        if summary.updated == 0 && summary.errored == 0 {
            return;
        }
        let title = format!(
            "Auto-pilot: {} updated, {} errored",
            summary.updated, summary.errored
        );
        let body = summary
            .results
            .iter()
            .filter_map(|r| match &r.outcome {
                ProductOutcome::Updated {
                    old_price,
                    new_price,
                } => Some(format!(
                    "{}: {} -> {}",
                    r.product_id,
                    old_price.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
                    new_price
                )),
                ProductOutcome::Errored { error } => Some(format!("{}: {}", r.product_id, error)),
                ProductOutcome::Skipped { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        let result = self.notifier.send(&title, &body).await;
        if !result.sent {
            debug!(reason = ?result.reason, "Auto-pilot notification not sent");
        }
    }
}
