//! Minimal product record the engine prices against.

use crate::domain::{Decimal, ProductId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    /// Marketplace reference used for price updates and buybox lookups.
    pub barcode: Option<String>,
    pub title: Option<String>,
    pub current_price: Option<Decimal>,
    /// Externally set minimum price; the enforced floor never goes below it.
    pub min_price: Option<Decimal>,
    /// Eligible for autonomous repricing.
    pub auto_pilot: bool,
}
