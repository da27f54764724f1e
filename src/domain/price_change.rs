//! Append-only price change log entries.

use crate::domain::{Decimal, ProductId, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a price change was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeMethod {
    AutoPilot,
    Manual,
}

impl ChangeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeMethod::AutoPilot => "AUTO_PILOT",
            ChangeMethod::Manual => "MANUAL",
        }
    }
}

impl fmt::Display for ChangeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO_PILOT" => Ok(ChangeMethod::AutoPilot),
            "MANUAL" => Ok(ChangeMethod::Manual),
            other => Err(format!("unknown change method: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    pub id: i64,
    pub product_id: ProductId,
    pub old_price: Option<Decimal>,
    pub new_price: Decimal,
    pub method: ChangeMethod,
    pub raw_response: serde_json::Value,
    pub changed_at: TimeMs,
}

impl PriceChange {
    /// A change counts as downward only when the previous price is known.
    pub fn is_downward(&self) -> bool {
        self.old_price.map(|old| self.new_price < old).unwrap_or(false)
    }
}
