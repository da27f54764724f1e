//! Scripted marketplace client for tests and dry runs.

use super::{BuyboxInfo, MarketplaceError, MarketplacePriceClient, PriceUpdateResponse};
use crate::domain::Decimal;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Records every price update and answers buybox lookups from a fixed table.
#[derive(Debug, Default)]
pub struct MockMarketplaceClient {
    buybox: HashMap<String, BuyboxInfo>,
    failing: HashSet<String>,
    rejecting: HashSet<String>,
    fail_buybox: bool,
    updates: Mutex<Vec<(String, Decimal)>>,
}

impl MockMarketplaceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buybox(mut self, info: BuyboxInfo) -> Self {
        self.buybox.insert(info.reference.clone(), info);
        self
    }

    /// Price updates for `reference` fail with an upstream 500.
    pub fn failing_for(mut self, reference: &str) -> Self {
        self.failing.insert(reference.to_string());
        self
    }

    /// Price updates for `reference` come back with `accepted = false`.
    pub fn rejecting(mut self, reference: &str) -> Self {
        self.rejecting.insert(reference.to_string());
        self
    }

    /// Every buybox lookup fails.
    pub fn with_failing_buybox(mut self) -> Self {
        self.fail_buybox = true;
        self
    }

    /// Price updates received so far, in call order.
    pub fn updates(&self) -> Vec<(String, Decimal)> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MarketplacePriceClient for MockMarketplaceClient {
    async fn update_price(
        &self,
        reference: &str,
        price: Decimal,
    ) -> Result<PriceUpdateResponse, MarketplaceError> {
        if self.failing.contains(reference) {
            return Err(MarketplaceError::Http {
                status: 500,
                body: "mock failure".to_string(),
            });
        }
        if let Ok(mut updates) = self.updates.lock() {
            updates.push((reference.to_string(), price));
        }

        let accepted = !self.rejecting.contains(reference);
        let raw = if accepted {
            serde_json::json!({ "batchRequestId": format!("mock-{}", reference) })
        } else {
            serde_json::json!({ "errors": ["rejected by mock"] })
        };
        Ok(PriceUpdateResponse { accepted, raw })
    }

    async fn fetch_buybox(&self, references: &[String]) -> Result<Vec<BuyboxInfo>, MarketplaceError> {
        if self.fail_buybox {
            return Err(MarketplaceError::Network("mock buybox outage".to_string()));
        }
        Ok(references
            .iter()
            .filter_map(|r| self.buybox.get(r).cloned())
            .collect())
    }
}
