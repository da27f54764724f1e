//! Pure pricing computations.
//!
//! Everything here is synchronous and side-effect free: settings and
//! snapshot values in, decisions out. The orchestration layer owns all I/O.

pub mod alerts;
pub mod fees;
pub mod floor;
pub mod suggest;

pub use alerts::{AlertDetector, AlertInput};
pub use fees::{FeeBasis, FeeCalculator, PriceComputationResult};
pub use floor::{Floor, FloorResolver};
pub use suggest::{PriceSuggester, SuggestedPriceResult, SuggestionInput, SuggestionReason};

/// The calculators for one fee basis, built together so they always agree.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    pub fees: FeeCalculator,
    pub floors: FloorResolver,
    pub suggester: PriceSuggester,
    pub alerts: AlertDetector,
}

impl PricingEngine {
    pub fn new(basis: FeeBasis) -> Self {
        let floors = FloorResolver::new(basis);
        Self {
            fees: FeeCalculator::new(basis),
            floors,
            suggester: PriceSuggester::new(floors),
            alerts: AlertDetector,
        }
    }

    pub fn basis(&self) -> FeeBasis {
        self.fees.basis()
    }
}
