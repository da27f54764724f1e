//! Marketplace price client abstraction.

use crate::domain::{BuyboxStatus, Decimal};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub mod mock;
pub mod rate_limit;
pub mod trendyol;

pub use mock::MockMarketplaceClient;
pub use rate_limit::RateLimiter;
pub use trendyol::{TrendyolClient, TrendyolConfig};

/// Outbound price mutations and buybox lookups against the marketplace.
///
/// Implementations own their retry/backoff policy, request timeout and
/// rate limiting; callers treat every error as final.
#[async_trait]
pub trait MarketplacePriceClient: Send + Sync + fmt::Debug {
    /// Set the live sale price for the listing identified by `reference` (barcode).
    async fn update_price(
        &self,
        reference: &str,
        price: Decimal,
    ) -> Result<PriceUpdateResponse, MarketplaceError>;

    /// Fetch buybox standing for a batch of listings.
    ///
    /// Listings the marketplace does not report are simply absent from the result.
    async fn fetch_buybox(&self, references: &[String]) -> Result<Vec<BuyboxInfo>, MarketplaceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceUpdateResponse {
    pub accepted: bool,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyboxInfo {
    pub reference: String,
    pub status: BuyboxStatus,
    /// Price currently holding the buybox.
    pub buybox_price: Option<Decimal>,
    /// Cheapest competing offer, when we are not the buybox holder.
    pub competitor_min: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketplaceError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Authentication failed ({status}); check API credentials and User-Agent format")]
    Unauthorized { status: u16 },
    #[error("Rate limited")]
    RateLimited,
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl MarketplaceError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            MarketplaceError::Network(_) | MarketplaceError::RateLimited => true,
            MarketplaceError::Http { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Upstream status code, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            MarketplaceError::Http { status, .. } | MarketplaceError::Unauthorized { status } => {
                Some(*status)
            }
            MarketplaceError::RateLimited => Some(429),
            _ => None,
        }
    }
}
