//! Domain primitives: TimeMs, ProductId.

use serde::{Deserialize, Serialize};

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    pub fn as_ms(&self) -> i64 {
        self.0
    }

    pub fn plus_secs(&self, secs: i64) -> Self {
        TimeMs(self.0.saturating_add(secs.saturating_mul(1_000)))
    }

    pub fn minus_minutes(&self, minutes: i64) -> Self {
        TimeMs(self.0.saturating_sub(minutes.saturating_mul(60_000)))
    }

    /// RFC 3339 rendering for logs and notification bodies.
    pub fn to_rfc3339(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| self.0.to_string())
    }
}

/// Product identifier as known to the operator (usually the merchant SKU).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        ProductId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timems_arithmetic() {
        let t = TimeMs::new(10 * 60_000);
        assert_eq!(t.minus_minutes(5), TimeMs::new(5 * 60_000));
        assert_eq!(t.plus_secs(2), TimeMs::new(10 * 60_000 + 2_000));
    }

    #[test]
    fn test_product_id_serializes_transparently() {
        let id = ProductId::new("SKU-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"SKU-1\"");
        assert_eq!(id.to_string(), "SKU-1");
    }
}
