//! Snapshot polling: buybox lookup, snapshot append, alert detection.

use super::pricing::{PricingError, PricingService};
use crate::db::Repository;
use crate::domain::{AlertCandidate, BuyboxStatus, PriceSnapshot, Product, Severity, TimeMs};
use crate::engine::AlertInput;
use crate::marketplace::{BuyboxInfo, MarketplacePriceClient};
use crate::notify::NotificationChannel;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Buybox lookups are batched by this many barcodes.
pub const DEFAULT_CHUNK_SIZE: usize = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub products_polled: usize,
    pub snapshots_written: usize,
    pub alerts_raised: usize,
    pub errored: usize,
}

#[derive(Clone)]
pub struct Poller {
    repo: Arc<Repository>,
    client: Arc<dyn MarketplacePriceClient>,
    pricing: PricingService,
    notifier: Arc<dyn NotificationChannel>,
    chunk_size: usize,
}

impl Poller {
    pub fn new(
        repo: Arc<Repository>,
        client: Arc<dyn MarketplacePriceClient>,
        pricing: PricingService,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            repo,
            client,
            pricing,
            notifier,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Poll every product that has a barcode. A failed chunk counts each of
    /// its products as errored and the run continues.
    pub async fn run(&self, now: TimeMs) -> Result<PollSummary, sqlx::Error> {
        let products: Vec<Product> = self
            .repo
            .list_products()
            .await?
            .into_iter()
            .filter(|p| p.barcode.as_deref().is_some_and(|b| !b.trim().is_empty()))
            .collect();
        info!(products = products.len(), "Price polling starting");

        let mut summary = PollSummary::default();
        for chunk in products.chunks(self.chunk_size) {
            let references: Vec<String> = chunk.iter().filter_map(|p| p.barcode.clone()).collect();
            let infos = match self.client.fetch_buybox(&references).await {
                Ok(infos) => infos,
                Err(e) => {
                    warn!(chunk = references.len(), error = %e, "Buybox lookup failed");
                    summary.errored += chunk.len();
                    continue;
                }
            };
            let by_reference: HashMap<&str, &BuyboxInfo> =
                infos.iter().map(|i| (i.reference.as_str(), i)).collect();

            for product in chunk {
                summary.products_polled += 1;
                let info = product
                    .barcode
                    .as_deref()
                    .and_then(|b| by_reference.get(b).copied());
                match self.poll_product(product, info, now).await {
                    Ok(raised) => {
                        summary.snapshots_written += 1;
                        summary.alerts_raised += raised;
                    }
                    Err(e) => {
                        warn!(product_id = %product.id, error = %e, "Polling failed for product");
                        summary.errored += 1;
                    }
                }
            }
        }

        info!(
            polled = summary.products_polled,
            snapshots = summary.snapshots_written,
            alerts = summary.alerts_raised,
            errored = summary.errored,
            "Price polling finished"
        );
        Ok(summary)
    }

    /// Append the snapshot, then detect and record alerts. Returns the number
    /// of alerts recorded.
    async fn poll_product(
        &self,
        product: &Product,
        info: Option<&BuyboxInfo>,
        now: TimeMs,
    ) -> Result<usize, PricingError> {
        let previous = self.repo.latest_snapshot(&product.id).await?;
        let current = PriceSnapshot {
            product_id: product.id.clone(),
            checked_at: now,
            our_price: product.current_price,
            competitor_min_price: info.and_then(|i| i.competitor_min),
            buybox_status: info.map(|i| i.status).unwrap_or(BuyboxStatus::Unknown),
        };
        self.repo.insert_snapshot(&current).await?;

        let settings = self.pricing.effective_settings(&product.id).await?;
        let engine = self.pricing.engine();
        let last_downward_change_at = self.repo.last_downward_change_at(&product.id).await?;
        let suggestion = self.pricing.suggest_from(
            product,
            &settings,
            Some(&current),
            last_downward_change_at,
            false,
            now,
        );

        let candidates = engine.alerts.detect(&AlertInput {
            current: &current,
            previous: previous.as_ref(),
            settings: &settings,
            break_even: engine.floors.break_even(&settings),
            floor: suggestion.floor,
            suggestion: suggestion.suggested,
        });

        for candidate in &candidates {
            self.repo.record_alert(&product.id, candidate, now).await?;
            if candidate.severity >= Severity::Warn {
                self.notify(product, candidate, now).await;
            }
        }
        debug!(product_id = %product.id, alerts = candidates.len(), "Product polled");
        Ok(candidates.len())
    }

    async fn notify(&self, product: &Product, candidate: &AlertCandidate, now: TimeMs) {
        let title = format!("[{}] {} {}", candidate.severity, candidate.alert_type, product.id);
        let body = format!("{}\nChecked at {}", candidate.message, now.to_rfc3339());
        let result = self.notifier.send(&title, &body).await;
        if !result.sent {
            debug!(product_id = %product.id, reason = ?result.reason, "Alert notification not sent");
        }
    }
}
