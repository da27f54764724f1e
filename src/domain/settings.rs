//! Pricing settings: the global defaults, per-product overrides, and the
//! merged `EffectiveSettings` every calculator consumes.
//!
//! Precedence lives in exactly one place, [`EffectiveSettings::merge`]: a
//! product override wins field-by-field, anything unset falls back to the
//! global record. Merging also normalizes rates and validates ranges, so an
//! `EffectiveSettings` value is always safe to price with.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("invalid fee rate {0}: must be a fraction below 1 or a percentage between 1 and 100")]
    InvalidFeeRate(Decimal),
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: Decimal },
    #[error("{field} out of range (got {value})")]
    OutOfRange { field: &'static str, value: Decimal },
}

/// Normalize a rate that operators may enter either as "15" or "0.15".
///
/// Values below 1 are already fractions; values in `[1, 100]` are percentage
/// points and are divided by 100. Anything above 100 (or negative) is rejected.
pub fn normalize_rate(raw: Decimal) -> Result<Decimal, SettingsError> {
    if raw.is_negative() || raw > Decimal::hundred() {
        return Err(SettingsError::InvalidFeeRate(raw));
    }
    if raw < Decimal::one() {
        Ok(raw)
    } else {
        Ok(raw / Decimal::hundred())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceFeeType {
    Fixed,
    Percent,
}

impl ServiceFeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceFeeType::Fixed => "FIXED",
            ServiceFeeType::Percent => "PERCENT",
        }
    }
}

impl FromStr for ServiceFeeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIXED" => Ok(ServiceFeeType::Fixed),
            "PERCENT" => Ok(ServiceFeeType::Percent),
            other => Err(format!("unknown service fee type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceFee {
    #[serde(rename = "type")]
    pub fee_type: ServiceFeeType,
    pub value: Decimal,
}

impl ServiceFee {
    pub fn fixed(value: Decimal) -> Self {
        Self {
            fee_type: ServiceFeeType::Fixed,
            value,
        }
    }

    pub fn percent(value: Decimal) -> Self {
        Self {
            fee_type: ServiceFeeType::Percent,
            value,
        }
    }

    /// Fraction of gross revenue charged, zero for flat fees.
    pub fn variable_rate(&self) -> Decimal {
        match self.fee_type {
            ServiceFeeType::Percent => self.value,
            ServiceFeeType::Fixed => Decimal::zero(),
        }
    }

    /// Flat amount charged per sale, zero for percentage fees.
    pub fn fixed_amount(&self) -> Decimal {
        match self.fee_type {
            ServiceFeeType::Fixed => self.value,
            ServiceFeeType::Percent => Decimal::zero(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VatMode {
    /// Tax already embedded in the quoted price.
    Inclusive,
    /// Tax added on top of the quoted price.
    Exclusive,
}

impl VatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VatMode::Inclusive => "INCLUSIVE",
            VatMode::Exclusive => "EXCLUSIVE",
        }
    }
}

impl FromStr for VatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCLUSIVE" => Ok(VatMode::Inclusive),
            "EXCLUSIVE" => Ok(VatMode::Exclusive),
            other => Err(format!("unknown VAT mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MinProfitType {
    /// Absolute amount in the store currency.
    Sar,
    /// Percentage of gross revenue.
    Percent,
}

impl MinProfitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinProfitType::Sar => "SAR",
            MinProfitType::Percent => "PERCENT",
        }
    }
}

impl FromStr for MinProfitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAR" => Ok(MinProfitType::Sar),
            "PERCENT" => Ok(MinProfitType::Percent),
            other => Err(format!("unknown min profit type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinProfit {
    #[serde(rename = "type")]
    pub profit_type: MinProfitType,
    pub value: Decimal,
}

impl MinProfit {
    pub fn sar(value: Decimal) -> Self {
        Self {
            profit_type: MinProfitType::Sar,
            value,
        }
    }

    pub fn percent(value: Decimal) -> Self {
        Self {
            profit_type: MinProfitType::Percent,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertThresholds {
    pub absolute: Decimal,
    pub percent: Decimal,
}

/// Store-wide defaults. Every field is concrete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    pub cost_price: Decimal,
    pub fee_rate: Decimal,
    pub service_fee: ServiceFee,
    pub shipping_cost: Decimal,
    pub handling_cost: Decimal,
    pub vat_rate: Decimal,
    pub vat_mode: VatMode,
    pub min_profit: MinProfit,
    pub undercut_step: Decimal,
    pub alert_thresholds: AlertThresholds,
    pub cooldown_minutes: i64,
    pub competitor_drop_pct: Decimal,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        let dec = |s: &str| Decimal::from_str_canonical(s).unwrap_or_default();
        Self {
            cost_price: Decimal::zero(),
            fee_rate: dec("0.15"),
            service_fee: ServiceFee::fixed(Decimal::zero()),
            shipping_cost: Decimal::zero(),
            handling_cost: Decimal::zero(),
            vat_rate: Decimal::from_int(15),
            vat_mode: VatMode::Inclusive,
            min_profit: MinProfit::sar(Decimal::zero()),
            undercut_step: dec("0.5"),
            alert_thresholds: AlertThresholds {
                absolute: Decimal::zero(),
                percent: Decimal::zero(),
            },
            cooldown_minutes: 60,
            competitor_drop_pct: Decimal::from_int(10),
        }
    }
}

impl GlobalSettings {
    /// Validate by merging against an empty override.
    pub fn validate(&self) -> Result<(), SettingsError> {
        EffectiveSettings::merge(self, &ProductSettings::default()).map(|_| ())
    }
}

/// Per-product overrides. `None` means "inherit from global".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductSettings {
    pub cost_price: Option<Decimal>,
    pub fee_rate: Option<Decimal>,
    pub service_fee: Option<ServiceFee>,
    pub shipping_cost: Option<Decimal>,
    pub handling_cost: Option<Decimal>,
    pub vat_rate: Option<Decimal>,
    pub vat_mode: Option<VatMode>,
    pub min_profit: Option<MinProfit>,
    pub undercut_step: Option<Decimal>,
    pub alert_threshold_absolute: Option<Decimal>,
    pub alert_threshold_percent: Option<Decimal>,
    pub cooldown_minutes: Option<i64>,
    pub competitor_drop_pct: Option<Decimal>,
}

/// Fully resolved, validated settings for one product.
///
/// `fee_rate` and percentage service fees are fractions in `[0, 1]`;
/// `vat_rate` is in percentage points `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSettings {
    pub cost_price: Decimal,
    pub fee_rate: Decimal,
    pub service_fee: ServiceFee,
    pub shipping_cost: Decimal,
    pub handling_cost: Decimal,
    pub vat_rate: Decimal,
    pub vat_mode: VatMode,
    pub min_profit: MinProfit,
    pub undercut_step: Decimal,
    pub alert_thresholds: AlertThresholds,
    pub cooldown_minutes: i64,
    pub competitor_drop_pct: Decimal,
}

fn non_negative(field: &'static str, value: Decimal) -> Result<Decimal, SettingsError> {
    if value.is_negative() {
        return Err(SettingsError::Negative { field, value });
    }
    Ok(value)
}

impl EffectiveSettings {
    pub fn merge(
        global: &GlobalSettings,
        product: &ProductSettings,
    ) -> Result<Self, SettingsError> {
        let fee_rate = normalize_rate(product.fee_rate.unwrap_or(global.fee_rate))?;

        let service_fee = product.service_fee.unwrap_or(global.service_fee);
        let service_fee = match service_fee.fee_type {
            ServiceFeeType::Percent => ServiceFee::percent(normalize_rate(service_fee.value)?),
            ServiceFeeType::Fixed => {
                ServiceFee::fixed(non_negative("serviceFee.value", service_fee.value)?)
            }
        };

        let vat_rate = non_negative("vatRate", product.vat_rate.unwrap_or(global.vat_rate))?;
        if vat_rate > Decimal::hundred() {
            return Err(SettingsError::OutOfRange {
                field: "vatRate",
                value: vat_rate,
            });
        }

        let min_profit = product.min_profit.unwrap_or(global.min_profit);
        non_negative("minProfit.value", min_profit.value)?;
        if min_profit.profit_type == MinProfitType::Percent && min_profit.value > Decimal::hundred()
        {
            return Err(SettingsError::OutOfRange {
                field: "minProfit.value",
                value: min_profit.value,
            });
        }

        let cooldown_minutes = product.cooldown_minutes.unwrap_or(global.cooldown_minutes);
        if cooldown_minutes < 0 {
            return Err(SettingsError::Negative {
                field: "cooldownMinutes",
                value: Decimal::from_int(cooldown_minutes),
            });
        }

        Ok(Self {
            cost_price: non_negative(
                "costPrice",
                product.cost_price.unwrap_or(global.cost_price),
            )?,
            fee_rate,
            service_fee,
            shipping_cost: non_negative(
                "shippingCost",
                product.shipping_cost.unwrap_or(global.shipping_cost),
            )?,
            handling_cost: non_negative(
                "handlingCost",
                product.handling_cost.unwrap_or(global.handling_cost),
            )?,
            vat_rate,
            vat_mode: product.vat_mode.unwrap_or(global.vat_mode),
            min_profit,
            undercut_step: non_negative(
                "undercutStep",
                product.undercut_step.unwrap_or(global.undercut_step),
            )?,
            alert_thresholds: AlertThresholds {
                absolute: non_negative(
                    "alertThresholds.absolute",
                    product
                        .alert_threshold_absolute
                        .unwrap_or(global.alert_thresholds.absolute),
                )?,
                percent: non_negative(
                    "alertThresholds.percent",
                    product
                        .alert_threshold_percent
                        .unwrap_or(global.alert_thresholds.percent),
                )?,
            },
            cooldown_minutes,
            competitor_drop_pct: non_negative(
                "competitorDropPct",
                product
                    .competitor_drop_pct
                    .unwrap_or(global.competitor_drop_pct),
            )?,
        })
    }
}
