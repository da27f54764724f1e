//! Competitive price snapshots written by the polling job.

use crate::domain::{Decimal, ProductId, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuyboxStatus {
    Win,
    Lose,
    Unknown,
}

impl BuyboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuyboxStatus::Win => "WIN",
            BuyboxStatus::Lose => "LOSE",
            BuyboxStatus::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for BuyboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuyboxStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WIN" => Ok(BuyboxStatus::Win),
            "LOSE" => Ok(BuyboxStatus::Lose),
            "UNKNOWN" => Ok(BuyboxStatus::Unknown),
            other => Err(format!("unknown buybox status: {}", other)),
        }
    }
}

/// Point-in-time view of our price against the cheapest competitor.
///
/// Immutable once written. Newest-first ordering by `checked_at` defines the
/// "current" and "previous" snapshots used by delta-based alert rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub product_id: ProductId,
    pub checked_at: TimeMs,
    pub our_price: Option<Decimal>,
    pub competitor_min_price: Option<Decimal>,
    pub buybox_status: BuyboxStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buybox_status_roundtrip_str() {
        for status in [BuyboxStatus::Win, BuyboxStatus::Lose, BuyboxStatus::Unknown] {
            assert_eq!(status.as_str().parse::<BuyboxStatus>().unwrap(), status);
        }
        assert!("MAYBE".parse::<BuyboxStatus>().is_err());
    }
}
