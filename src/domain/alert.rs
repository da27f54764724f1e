//! Alert candidates emitted by the alert detector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    LostBuybox,
    NotCompetitive,
    CompetitorDrop,
    SafeReprice,
    PriceWar,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LostBuybox => "LOST_BUYBOX",
            AlertType::NotCompetitive => "NOT_COMPETITIVE",
            AlertType::CompetitorDrop => "COMPETITOR_DROP",
            AlertType::SafeReprice => "SAFE_REPRICE",
            AlertType::PriceWar => "PRICE_WAR",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOST_BUYBOX" => Ok(AlertType::LostBuybox),
            "NOT_COMPETITIVE" => Ok(AlertType::NotCompetitive),
            "COMPETITOR_DROP" => Ok(AlertType::CompetitorDrop),
            "SAFE_REPRICE" => Ok(AlertType::SafeReprice),
            "PRICE_WAR" => Ok(AlertType::PriceWar),
            other => Err(format!("unknown alert type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warn,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Severity::Info),
            "WARN" => Ok(Severity::Warn),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {}", other)),
        }
    }
}

/// An alert that fired for one evaluation. Persistence and read/unread state
/// belong to the alert sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCandidate {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}
