//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are non-negative amounts in the store currency's standard unit
//! (dollars, not cents). Arithmetic stays in [`Decimal`] so cart totals are
//! exact for two-decimal currency values.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Currency symbol used by the display rule.
pub const CURRENCY_SYMBOL: &str = "$";

/// Decimal places the catalog stores (`NUMERIC(12, 2)`).
pub const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound on a price: ten integer digits.
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// More than two decimal places.
    #[error("price can have at most 2 decimal places")]
    TooPrecise,
    /// Ten integer digits or more.
    #[error("price must be below 10000000000")]
    TooLarge,
    /// The input is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
}

/// A non-negative price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount` is below zero,
    /// `PriceError::TooPrecise` past two decimal places and
    /// `PriceError::TooLarge` at or above `10^10`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > PRICE_SCALE {
            return Err(PriceError::TooPrecise);
        }
        if amount >= MAX_AMOUNT {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Parse a price from form input such as `"10"` or `"5.50"`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Invalid` for non-numeric input, otherwise the
    /// same errors as [`Price::new`].
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount = Decimal::from_str(s.trim()).map_err(|_| PriceError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }

    /// Get the decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `quantity` units.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }

    /// Format for display, e.g. `$19.99`.
    #[must_use]
    pub fn display(&self) -> String {
        format_amount(self.0)
    }
}

/// Format any decimal amount with the store currency display rule.
///
/// The amount is rounded half away from zero to two decimal places:
/// `25.5` renders as `$25.50`.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{CURRENCY_SYMBOL}{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Price::parse("10").unwrap().amount(), Decimal::new(10, 0));
        assert_eq!(Price::parse(" 5.50 ").unwrap().amount(), Decimal::new(550, 2));
        assert_eq!(Price::parse("0").unwrap(), Price::ZERO);
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert_eq!(Price::parse("-1.00"), Err(PriceError::Negative));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Price::parse("ten"), Err(PriceError::Invalid(_))));
        assert!(matches!(Price::parse(""), Err(PriceError::Invalid(_))));
    }

    #[test]
    fn test_parse_rejects_sub_cent_amounts() {
        assert_eq!(Price::parse("1.005"), Err(PriceError::TooPrecise));
        assert_eq!(Price::parse("0.001"), Err(PriceError::TooPrecise));
        // Trailing zeros are not extra precision
        assert_eq!(Price::parse("1.500").unwrap().amount(), Decimal::new(15, 1));
    }

    #[test]
    fn test_parse_rejects_amounts_past_ten_digits() {
        assert_eq!(Price::parse("10000000000"), Err(PriceError::TooLarge));
        assert_eq!(
            Price::parse("9999999999.99").unwrap().amount(),
            Decimal::new(999_999_999_999, 2)
        );
    }

    #[test]
    fn test_display_pads_to_cents() {
        assert_eq!(Price::parse("25.5").unwrap().display(), "$25.50");
        assert_eq!(Price::parse("10").unwrap().display(), "$10.00");
        assert_eq!(format_amount(Decimal::new(12_345, 3)), "$12.35");
    }

    #[test]
    fn test_times_is_exact() {
        let price = Price::parse("0.10").unwrap();
        assert_eq!(price.times(3), Decimal::new(30, 2));
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Price>("\"-3.00\"").is_err());
        let price: Price = serde_json::from_str("\"3.00\"").unwrap();
        assert_eq!(price.display(), "$3.00");
        assert!(serde_json::from_str::<Price>("\"3.001\"").is_err());
    }
}
