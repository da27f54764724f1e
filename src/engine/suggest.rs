//! Cooldown-aware price suggestion.

use super::floor::{Floor, FloorResolver};
use crate::domain::{Decimal, EffectiveSettings, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionReason {
    NoCompetitorData,
    FloorInvalid,
    CooldownActive,
    AboveFloor,
    FloorProtected,
    NoChange,
}

impl SuggestionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionReason::NoCompetitorData => "NO_COMPETITOR_DATA",
            SuggestionReason::FloorInvalid => "FLOOR_INVALID",
            SuggestionReason::CooldownActive => "COOLDOWN_ACTIVE",
            SuggestionReason::AboveFloor => "ABOVE_FLOOR",
            SuggestionReason::FloorProtected => "FLOOR_PROTECTED",
            SuggestionReason::NoChange => "NO_CHANGE",
        }
    }
}

impl fmt::Display for SuggestionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `suggested` is `None` exactly when the reason is `NoCompetitorData` or `FloorInvalid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedPriceResult {
    pub suggested: Option<Decimal>,
    pub floor: Floor,
    pub target: Option<Decimal>,
    pub reason: SuggestionReason,
}

#[derive(Debug, Clone)]
pub struct SuggestionInput<'a> {
    pub competitor_min: Option<Decimal>,
    pub our_price: Option<Decimal>,
    pub settings: &'a EffectiveSettings,
    pub min_price: Option<Decimal>,
    pub last_downward_change_at: Option<TimeMs>,
    pub now: TimeMs,
    pub bypass_cooldown: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PriceSuggester {
    floors: FloorResolver,
}

impl PriceSuggester {
    pub fn new(floors: FloorResolver) -> Self {
        Self { floors }
    }

    pub fn suggest(&self, input: &SuggestionInput<'_>) -> SuggestedPriceResult {
        let floor = self.floors.enforced_floor(input.settings, input.min_price);
        let floor_price = match floor {
            Floor::Price(p) => p,
            Floor::Unreachable => {
                return SuggestedPriceResult {
                    suggested: None,
                    floor,
                    target: None,
                    reason: SuggestionReason::FloorInvalid,
                }
            }
        };

        let competitor_min = match input.competitor_min {
            Some(c) => c,
            None => {
                return SuggestedPriceResult {
                    suggested: None,
                    floor,
                    target: None,
                    reason: SuggestionReason::NoCompetitorData,
                }
            }
        };

        let target = (competitor_min - input.settings.undercut_step)
            .non_negative()
            .round_currency();
        let computed = floor_price.max(target);

        // Cooldown only ever holds back decreases.
        if let Some(our_price) = input.our_price {
            if !input.bypass_cooldown
                && computed < our_price
                && self.in_cooldown(input.settings, input.last_downward_change_at, input.now)
            {
                return SuggestedPriceResult {
                    suggested: Some(our_price),
                    floor,
                    target: Some(target),
                    reason: SuggestionReason::CooldownActive,
                };
            }

            if computed == our_price {
                return SuggestedPriceResult {
                    suggested: Some(computed),
                    floor,
                    target: Some(target),
                    reason: SuggestionReason::NoChange,
                };
            }
        }

        let reason = if computed == floor_price {
            SuggestionReason::FloorProtected
        } else {
            SuggestionReason::AboveFloor
        };

        SuggestedPriceResult {
            suggested: Some(computed),
            floor,
            target: Some(target),
            reason,
        }
    }

    fn in_cooldown(
        &self,
        settings: &EffectiveSettings,
        last_downward_change_at: Option<TimeMs>,
        now: TimeMs,
    ) -> bool {
        if settings.cooldown_minutes <= 0 {
            return false;
        }
        match last_downward_change_at {
            Some(last) => last > now.minus_minutes(settings.cooldown_minutes),
            None => false,
        }
    }
}
