//! Domain types for the pricing engine.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Primitives: TimeMs, ProductId
//! - Settings records and the global/product merge
//! - Snapshots, alerts, price changes and products

pub mod alert;
pub mod decimal;
pub mod price_change;
pub mod primitives;
pub mod product;
pub mod settings;
pub mod snapshot;

pub use alert::{AlertCandidate, AlertType, Severity};
pub use decimal::Decimal;
pub use price_change::{ChangeMethod, PriceChange};
pub use primitives::{ProductId, TimeMs};
pub use product::Product;
pub use settings::{
    normalize_rate, AlertThresholds, EffectiveSettings, GlobalSettings, MinProfit, MinProfitType,
    ProductSettings, ServiceFee, ServiceFeeType, SettingsError, VatMode,
};
pub use snapshot::{BuyboxStatus, PriceSnapshot};
