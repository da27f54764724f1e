//! Alert rules over the current/previous snapshot pair.
//!
//! Every rule is evaluated independently; zero or more may fire. Output order
//! follows rule order so identical inputs always produce identical output.

use super::floor::Floor;
use crate::domain::{
    AlertCandidate, AlertType, BuyboxStatus, Decimal, EffectiveSettings, PriceSnapshot, Severity,
};
use serde_json::json;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct AlertInput<'a> {
    pub current: &'a PriceSnapshot,
    pub previous: Option<&'a PriceSnapshot>,
    pub settings: &'a EffectiveSettings,
    pub break_even: Floor,
    pub floor: Floor,
    /// Suggested price from the suggester, if one exists.
    pub suggestion: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertDetector;

impl AlertDetector {
    pub fn detect(&self, input: &AlertInput<'_>) -> Vec<AlertCandidate> {
        [
            lost_buybox(input),
            not_competitive(input),
            competitor_drop(input),
            safe_reprice(input),
            price_war(input),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn candidate(
    alert_type: AlertType,
    severity: Severity,
    message: String,
    metadata: BTreeMap<String, serde_json::Value>,
) -> AlertCandidate {
    AlertCandidate {
        alert_type,
        severity,
        message,
        metadata,
    }
}

fn lost_buybox(input: &AlertInput<'_>) -> Option<AlertCandidate> {
    if input.current.buybox_status != BuyboxStatus::Lose {
        return None;
    }
    let mut metadata = BTreeMap::new();
    metadata.insert("ourPrice".to_string(), json!(input.current.our_price));
    metadata.insert(
        "competitorMinPrice".to_string(),
        json!(input.current.competitor_min_price),
    );
    Some(candidate(
        AlertType::LostBuybox,
        Severity::Warn,
        format!("Buybox lost for {}", input.current.product_id),
        metadata,
    ))
}

fn not_competitive(input: &AlertInput<'_>) -> Option<AlertCandidate> {
    let ours = input.current.our_price?;
    let competitor = input.current.competitor_min_price?;
    let gap = ours - competitor;
    if !gap.is_positive() {
        return None;
    }
    let gap_pct = gap.percent_of(ours);
    let thresholds = &input.settings.alert_thresholds;
    let over_absolute = gap > thresholds.absolute;
    let over_percent = ours.is_positive() && gap_pct > thresholds.percent;
    if !over_absolute && !over_percent {
        return None;
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("ourPrice".to_string(), json!(ours));
    metadata.insert("competitorMinPrice".to_string(), json!(competitor));
    metadata.insert("gap".to_string(), json!(gap.round_currency()));
    metadata.insert("gapPct".to_string(), json!(gap_pct.round_currency()));
    Some(candidate(
        AlertType::NotCompetitive,
        Severity::Warn,
        format!(
            "Our price {} is {} above the cheapest competitor ({}%)",
            ours,
            gap.round_currency(),
            gap_pct.round_currency()
        ),
        metadata,
    ))
}

fn competitor_drop(input: &AlertInput<'_>) -> Option<AlertCandidate> {
    let previous = input.previous?.competitor_min_price?;
    let current = input.current.competitor_min_price?;
    if !previous.is_positive() || current > previous {
        return None;
    }
    let drop_pct = (previous - current).percent_of(previous);
    if drop_pct < input.settings.competitor_drop_pct {
        return None;
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("previous".to_string(), json!(previous));
    metadata.insert("current".to_string(), json!(current));
    metadata.insert("dropPct".to_string(), json!(drop_pct.round_currency()));
    Some(candidate(
        AlertType::CompetitorDrop,
        Severity::Info,
        format!(
            "Competitor price dropped {}% ({} -> {})",
            drop_pct.round_currency(),
            previous,
            current
        ),
        metadata,
    ))
}

fn safe_reprice(input: &AlertInput<'_>) -> Option<AlertCandidate> {
    let suggestion = input.suggestion?;
    let ours = input.current.our_price?;
    if suggestion >= ours || !input.floor.admits(suggestion) {
        return None;
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("ourPrice".to_string(), json!(ours));
    metadata.insert("suggested".to_string(), json!(suggestion));
    metadata.insert("floor".to_string(), json!(input.floor));
    Some(candidate(
        AlertType::SafeReprice,
        Severity::Info,
        format!(
            "Price can safely move from {} to {} without breaching the floor",
            ours, suggestion
        ),
        metadata,
    ))
}

fn price_war(input: &AlertInput<'_>) -> Option<AlertCandidate> {
    let competitor = input.current.competitor_min_price?;
    if !input.break_even.exceeds(competitor) {
        return None;
    }

    let mut metadata = BTreeMap::new();
    metadata.insert("competitorMinPrice".to_string(), json!(competitor));
    metadata.insert("breakEven".to_string(), json!(input.break_even));
    Some(candidate(
        AlertType::PriceWar,
        Severity::Critical,
        match input.break_even {
            Floor::Price(break_even) => format!(
                "Competitor at {} is below our break-even {}; cannot match without loss",
                competitor, break_even
            ),
            Floor::Unreachable => format!(
                "Competitor at {} cannot be matched: fees leave no profitable price",
                competitor
            ),
        },
        metadata,
    ))
}
