//! Fee and profit breakdown for a candidate price.

use crate::domain::{Decimal, EffectiveSettings, VatMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which amount the marketplace commission (and seller-borne VAT) is charged on.
///
/// `CostAnchored` charges commission and inclusive VAT on the cost price;
/// `GrossRevenue` charges commission on the sale price and backs VAT out of
/// an inclusive price. The floor resolver and the fee calculator must always
/// be constructed with the same basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeBasis {
    #[default]
    CostAnchored,
    GrossRevenue,
}

impl fmt::Display for FeeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeBasis::CostAnchored => f.write_str("cost"),
            FeeBasis::GrossRevenue => f.write_str("gross"),
        }
    }
}

impl FromStr for FeeBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cost" => Ok(FeeBasis::CostAnchored),
            "gross" => Ok(FeeBasis::GrossRevenue),
            other => Err(format!("must be cost or gross, got {}", other)),
        }
    }
}

/// Profit breakdown, every field rounded to currency precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceComputationResult {
    pub gross_revenue: Decimal,
    pub vat_amount: Decimal,
    pub commission_fee: Decimal,
    pub service_fee: Decimal,
    pub shipping_cost: Decimal,
    pub handling_cost: Decimal,
    pub total_fees: Decimal,
    pub net_revenue: Decimal,
    pub profit_sar: Decimal,
    pub profit_pct: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeeCalculator {
    basis: FeeBasis,
}

impl FeeCalculator {
    pub fn new(basis: FeeBasis) -> Self {
        Self { basis }
    }

    pub fn basis(&self) -> FeeBasis {
        self.basis
    }

    /// Compute the breakdown for selling at `price`.
    ///
    /// Negative prices are treated as zero. Intermediate values keep full
    /// precision; rounding happens once, on the way out.
    pub fn compute(&self, price: Decimal, settings: &EffectiveSettings) -> PriceComputationResult {
        let gross = price.non_negative();
        let cost = settings.cost_price;
        let vat_fraction = settings.vat_rate / Decimal::hundred();

        let commission = match self.basis {
            FeeBasis::CostAnchored => cost * settings.fee_rate,
            FeeBasis::GrossRevenue => gross * settings.fee_rate,
        };
        let service =
            gross * settings.service_fee.variable_rate() + settings.service_fee.fixed_amount();

        // (reported VAT, VAT the seller pays out of revenue as a fee, net revenue)
        let (vat_amount, vat_charge, net_revenue) = match (self.basis, settings.vat_mode) {
            (FeeBasis::CostAnchored, VatMode::Inclusive) => {
                let vat = cost * vat_fraction;
                (vat, vat, gross)
            }
            (FeeBasis::CostAnchored, VatMode::Exclusive) => {
                (gross * vat_fraction, Decimal::zero(), gross)
            }
            (FeeBasis::GrossRevenue, VatMode::Inclusive) => {
                let ex_vat = gross / (Decimal::one() + vat_fraction);
                let vat = gross - ex_vat;
                (vat, Decimal::zero(), gross - vat)
            }
            (FeeBasis::GrossRevenue, VatMode::Exclusive) => {
                (gross * vat_fraction, Decimal::zero(), gross)
            }
        };

        let total_fees =
            commission + service + settings.shipping_cost + settings.handling_cost + vat_charge;
        let profit = net_revenue - total_fees - cost;
        let profit_pct = profit.percent_of(gross);

        PriceComputationResult {
            gross_revenue: gross.round_currency(),
            vat_amount: vat_amount.round_currency(),
            commission_fee: commission.round_currency(),
            service_fee: service.round_currency(),
            shipping_cost: settings.shipping_cost.round_currency(),
            handling_cost: settings.handling_cost.round_currency(),
            total_fees: total_fees.round_currency(),
            net_revenue: net_revenue.round_currency(),
            profit_sar: profit.round_currency(),
            profit_pct: profit_pct.round_currency(),
        }
    }
}
