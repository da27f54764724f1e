//! Break-even and enforced floor prices.
//!
//! The enforced floor is the one "never price below this" value; every place
//! that proposes or applies a price checks against it.

use super::fees::FeeBasis;
use crate::domain::{Decimal, EffectiveSettings, MinProfitType, VatMode};
use serde::{Serialize, Serializer};
use std::fmt;

/// A floor price, or the signal that no price satisfies the profit constraint
/// (variable charges at or above 100% of revenue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Floor {
    Price(Decimal),
    Unreachable,
}

impl Floor {
    pub fn price(&self) -> Option<Decimal> {
        match self {
            Floor::Price(p) => Some(*p),
            Floor::Unreachable => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Floor::Price(_))
    }

    /// True when `price` satisfies the floor. Nothing satisfies an unreachable floor.
    pub fn admits(&self, price: Decimal) -> bool {
        match self {
            Floor::Price(floor) => price >= *floor,
            Floor::Unreachable => false,
        }
    }

    /// True when `price` is strictly below the floor. Every price is below an
    /// unreachable floor.
    pub fn exceeds(&self, price: Decimal) -> bool {
        !self.admits(price)
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Floor::Price(p) => write!(f, "{}", p),
            Floor::Unreachable => f.write_str("unreachable"),
        }
    }
}

impl Serialize for Floor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.price().serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloorResolver {
    basis: FeeBasis,
}

impl FloorResolver {
    pub fn new(basis: FeeBasis) -> Self {
        Self { basis }
    }

    /// Price at which profit equals the configured minimum profit, rounded up
    /// to currency precision.
    pub fn break_even(&self, settings: &EffectiveSettings) -> Floor {
        let hundred = Decimal::hundred();
        let service_rate = settings.service_fee.variable_rate();
        let fixed_service = settings.service_fee.fixed_amount();
        let logistics = settings.shipping_cost + settings.handling_cost;

        let (net_factor, variable_rate, fixed_costs) = match self.basis {
            FeeBasis::GrossRevenue => {
                let net_factor = match settings.vat_mode {
                    VatMode::Inclusive => {
                        Decimal::one() / (Decimal::one() + settings.vat_rate / hundred)
                    }
                    VatMode::Exclusive => Decimal::one(),
                };
                (
                    net_factor,
                    settings.fee_rate + service_rate,
                    settings.cost_price + logistics + fixed_service,
                )
            }
            FeeBasis::CostAnchored => {
                let vat_on_cost = match settings.vat_mode {
                    VatMode::Inclusive => settings.vat_rate / hundred,
                    VatMode::Exclusive => Decimal::zero(),
                };
                let anchored_cost =
                    settings.cost_price * (Decimal::one() + settings.fee_rate + vat_on_cost);
                (
                    Decimal::one(),
                    service_rate,
                    anchored_cost + logistics + fixed_service,
                )
            }
        };

        let (denominator, numerator) = match settings.min_profit.profit_type {
            MinProfitType::Percent => (
                net_factor - variable_rate - settings.min_profit.value / hundred,
                fixed_costs,
            ),
            MinProfitType::Sar => (
                net_factor - variable_rate,
                fixed_costs + settings.min_profit.value,
            ),
        };

        if !denominator.is_positive() {
            return Floor::Unreachable;
        }

        match numerator.checked_div(denominator) {
            Some(price) => Floor::Price(price.ceil_currency()),
            None => Floor::Unreachable,
        }
    }

    /// `max(break_even, max(0, min_price))`; an unreachable break-even stays unreachable.
    pub fn enforced_floor(&self, settings: &EffectiveSettings, min_price: Option<Decimal>) -> Floor {
        let min_price = min_price.unwrap_or_default().non_negative();
        match self.break_even(settings) {
            Floor::Price(break_even) => Floor::Price(break_even.max(min_price)),
            Floor::Unreachable => Floor::Unreachable,
        }
    }
}
