//! Trendyol seller integration API client.

use super::{BuyboxInfo, MarketplaceError, MarketplacePriceClient, PriceUpdateResponse, RateLimiter};
use crate::domain::{BuyboxStatus, Decimal};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoffBuilder;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Upstream error bodies are truncated to this many characters for audit.
const BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone)]
pub struct TrendyolConfig {
    pub base_url: String,
    pub seller_id: u64,
    pub api_key: String,
    pub api_secret: String,
    /// Pre-encoded Basic token; derived from key and secret when absent.
    pub api_token: Option<String>,
    pub user_agent: Option<String>,
    pub storefront_code: String,
    pub timeout: Duration,
    pub min_request_gap: Duration,
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl TrendyolConfig {
    pub fn new(seller_id: u64, api_key: String, api_secret: String) -> Self {
        Self {
            base_url: "https://apigw.trendyol.com".to_string(),
            seller_id,
            api_key,
            api_secret,
            api_token: None,
            user_agent: None,
            storefront_code: "SA".to_string(),
            timeout: Duration::from_secs(30),
            min_request_gap: Duration::from_millis(250),
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }

    pub fn basic_token(&self) -> String {
        match &self.api_token {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", self.api_key, self.api_secret)),
        }
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| format!("{} - SelfIntegration", self.seller_id))
    }
}

/// Trendyol client with per-instance rate limiting and bounded retries.
#[derive(Debug)]
pub struct TrendyolClient {
    client: Client,
    config: TrendyolConfig,
    limiter: RateLimiter,
}

impl TrendyolClient {
    /// Build the client. Fails on credentials that cannot form valid headers.
    pub fn new(config: TrendyolConfig) -> Result<Self, MarketplaceError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Basic {}", config.basic_token()))
            .map_err(|e| MarketplaceError::Config(format!("invalid API token: {}", e)))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent())
                .map_err(|e| MarketplaceError::Config(format!("invalid User-Agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "storeFrontCode",
            HeaderValue::from_str(&config.storefront_code)
                .map_err(|e| MarketplaceError::Config(format!("invalid storefront code: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| MarketplaceError::Config(e.to_string()))?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(config.min_request_gap),
            config,
        })
    }

    fn url(&self, service: &str, resource: &str) -> String {
        format!(
            "{}/integration/{}/sellers/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            service,
            self.config.seller_id,
            resource
        )
    }

    async fn post_json(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, MarketplaceError> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.base_delay)
            .with_randomization_factor(0.5)
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build();
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let max_attempts = self.config.max_attempts.max(1);

        retry(policy, || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            self.limiter.wait().await;

            match self.send_once(url, payload).await {
                Ok(body) => Ok(body),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(url = %url, attempt, error = %e, "Transient marketplace error, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        })
        .await
    }

    async fn send_once(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value, MarketplaceError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| MarketplaceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| MarketplaceError::Network(e.to_string()))?;
        classify_response(status, &body)
    }
}

/// Map an upstream status and body to a parsed JSON body or a typed error.
pub(crate) fn classify_response(
    status: u16,
    body: &str,
) -> Result<serde_json::Value, MarketplaceError> {
    match status {
        200..=299 => {
            if body.trim().is_empty() {
                return Ok(serde_json::Value::Null);
            }
            serde_json::from_str(body).map_err(|e| MarketplaceError::Parse(e.to_string()))
        }
        401 | 403 => Err(MarketplaceError::Unauthorized { status }),
        429 => Err(MarketplaceError::RateLimited),
        _ => Err(MarketplaceError::Http {
            status,
            body: body.chars().take(BODY_PREVIEW_CHARS).collect(),
        }),
    }
}

fn decimal_field(value: Option<&serde_json::Value>) -> Option<Decimal> {
    match value? {
        serde_json::Value::Number(n) => Decimal::from_str_canonical(&n.to_string()).ok(),
        serde_json::Value::String(s) => Decimal::from_str_canonical(s).ok(),
        _ => None,
    }
}

fn parse_buybox_entry(entry: &serde_json::Value) -> Result<BuyboxInfo, MarketplaceError> {
    let reference = entry
        .get("barcode")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MarketplaceError::Parse("Missing barcode field".to_string()))?
        .to_string();

    let status = match entry.get("buyboxOrder").and_then(|v| v.as_i64()) {
        Some(1) => BuyboxStatus::Win,
        Some(order) if order > 1 => BuyboxStatus::Lose,
        _ => BuyboxStatus::Unknown,
    };
    let buybox_price = decimal_field(entry.get("buyboxPrice"));
    let competitor_min = match status {
        BuyboxStatus::Win => None,
        _ => buybox_price,
    };

    Ok(BuyboxInfo {
        reference,
        status,
        buybox_price,
        competitor_min,
    })
}

pub(crate) fn parse_buybox_response(
    body: &serde_json::Value,
) -> Result<Vec<BuyboxInfo>, MarketplaceError> {
    let entries = body
        .get("buyboxInfo")
        .and_then(|v| v.as_array())
        .ok_or_else(|| MarketplaceError::Parse("Expected buyboxInfo array".to_string()))?;

    let mut infos = Vec::with_capacity(entries.len());
    for entry in entries {
        match parse_buybox_entry(entry) {
            Ok(info) => infos.push(info),
            Err(e) => warn!("Failed to parse buybox entry: {}", e),
        }
    }
    Ok(infos)
}

#[async_trait]
impl MarketplacePriceClient for TrendyolClient {
    async fn update_price(
        &self,
        reference: &str,
        price: Decimal,
    ) -> Result<PriceUpdateResponse, MarketplaceError> {
        debug!(reference = %reference, price = %price, "Updating marketplace price");

        let payload = serde_json::json!({
            "items": [{
                "barcode": reference,
                "salePrice": price,
                "listPrice": price,
            }]
        });
        let url = self.url("inventory", "products/price-and-inventory");
        let raw = self.post_json(&url, &payload).await?;

        let accepted = raw
            .get("batchRequestId")
            .map(|id| !id.is_null())
            .unwrap_or(false);
        Ok(PriceUpdateResponse { accepted, raw })
    }

    async fn fetch_buybox(&self, references: &[String]) -> Result<Vec<BuyboxInfo>, MarketplaceError> {
        if references.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = references.len(), "Fetching buybox information");

        let payload = serde_json::json!({
            "barcodes": references,
            "supplierId": self.config.seller_id,
        });
        let url = self.url("product", "products/buybox-information");
        let body = self.post_json(&url, &payload).await?;
        parse_buybox_response(&body)
    }
}
