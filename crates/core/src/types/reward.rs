//! Promotion reward representation using decimal arithmetic.
//!
//! Reward amounts are stored and serialized as decimal strings so that values
//! like `"10.50"` survive every hop without floating-point drift. The currency
//! is free text: usually an ISO 4217 code, sometimes a sentinel describing the
//! kind of reward (`FREE_ITEM`, `PERCENT`). No conversion between currencies
//! is ever performed.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sentinel currency for "get an item for free" rewards.
pub const FREE_ITEM: &str = "FREE_ITEM";

/// Sentinel currency for percentage discounts.
pub const PERCENT: &str = "PERCENT";

/// The value a promotion offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    /// Amount in the currency's standard unit, or a count/percentage for sentinels.
    pub amount: Decimal,
    /// Currency code or sentinel.
    pub currency: RewardCurrency,
}

impl Reward {
    /// Create a new reward.
    #[must_use]
    pub const fn new(amount: Decimal, currency: RewardCurrency) -> Self {
        Self { amount, currency }
    }
}

impl fmt::Display for Reward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.currency.is_percent() {
            write!(f, "{}%", self.amount.normalize())
        } else if self.currency.is_free_item() {
            write!(f, "{} free", self.amount.normalize())
        } else {
            write!(f, "{} {}", self.amount.normalize(), self.currency)
        }
    }
}

/// Free-text reward currency (e.g. `SAR`, `USD`, `FREE_ITEM`, `PERCENT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardCurrency(String);

impl RewardCurrency {
    /// Create a reward currency from a code or sentinel.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Get the raw code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this reward grants a free item rather than money.
    #[must_use]
    pub fn is_free_item(&self) -> bool {
        self.0 == FREE_ITEM
    }

    /// Whether the amount is a percentage.
    #[must_use]
    pub fn is_percent(&self) -> bool {
        self.0 == PERCENT
    }
}

impl fmt::Display for RewardCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RewardCurrency {
    fn from(code: &str) -> Self {
        Self(code.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_amount_serializes_as_string() {
        let reward = Reward::new(Decimal::from_str("10.50").unwrap(), "SAR".into());
        let json = serde_json::to_value(&reward).unwrap();
        assert_eq!(json["amount"], "10.50");
        assert_eq!(json["currency"], "SAR");
    }

    #[test]
    fn test_sentinels() {
        assert!(RewardCurrency::from("FREE_ITEM").is_free_item());
        assert!(RewardCurrency::from("PERCENT").is_percent());
        assert!(!RewardCurrency::from("SAR").is_percent());
    }

    #[test]
    fn test_display() {
        let pct = Reward::new(Decimal::from(15), "PERCENT".into());
        assert_eq!(pct.to_string(), "15%");

        let cash = Reward::new(Decimal::from_str("20.00").unwrap(), "SAR".into());
        assert_eq!(cash.to_string(), "20 SAR");
    }
}
