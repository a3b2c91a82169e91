//! Unit price resolution using decimal arithmetic.
//!
//! Prices reach the cart from two places: catalog entries (usually numeric)
//! and loosely-typed backend records (sometimes numeric strings). Both are
//! funnelled through [`PriceInput`] so that a line is only ever sent to the
//! remote cart with a definite, positive price.

use core::str::FromStr;

use rust_decimal::Decimal;

/// Currency symbol used when rendering amounts.
pub const CURRENCY_SYMBOL: &str = "₹";

/// Errors that can occur when resolving a [`PriceInput`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// No price was supplied.
    #[error("price is missing")]
    Missing,
    /// The price was zero or negative.
    #[error("price must be positive, got {0}")]
    NotPositive(Decimal),
    /// The price text is not a number.
    #[error("price is not a number: {0:?}")]
    NotNumeric(String),
}

/// A unit price as supplied by the caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PriceInput {
    /// No price known.
    #[default]
    Missing,
    /// A numeric amount.
    Amount(Decimal),
    /// A textual amount, e.g. `"42.50"`.
    Text(String),
}

impl PriceInput {
    /// Resolve to a definite positive price.
    ///
    /// # Errors
    ///
    /// Returns an error if the price is missing, non-numeric, zero or
    /// negative.
    pub fn resolve(&self) -> Result<Decimal, PriceError> {
        let amount = match self {
            Self::Missing => return Err(PriceError::Missing),
            Self::Amount(amount) => *amount,
            Self::Text(text) => Decimal::from_str(text.trim())
                .map_err(|_| PriceError::NotNumeric(text.clone()))?,
        };

        if amount <= Decimal::ZERO {
            return Err(PriceError::NotPositive(amount));
        }

        Ok(amount)
    }

    /// Best-effort amount for local display; unresolvable prices count as zero.
    #[must_use]
    pub fn lenient(&self) -> Decimal {
        self.resolve().unwrap_or(Decimal::ZERO)
    }

    /// Whether any price was supplied at all.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<Decimal> for PriceInput {
    fn from(amount: Decimal) -> Self {
        Self::Amount(amount)
    }
}

impl From<i64> for PriceInput {
    fn from(amount: i64) -> Self {
        Self::Amount(Decimal::from(amount))
    }
}

impl From<&str> for PriceInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PriceInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl<T: Into<PriceInput>> From<Option<T>> for PriceInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Missing, Into::into)
    }
}

/// Format an amount for display (e.g. `"₹75.00"`).
#[must_use]
pub fn display_amount(amount: Decimal) -> String {
    format!("{CURRENCY_SYMBOL}{:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_numeric_amount() {
        assert_eq!(PriceInput::from(25_i64).resolve(), Ok(Decimal::from(25)));
    }

    #[test]
    fn test_resolve_numeric_text() {
        assert_eq!(
            PriceInput::from(" 42.50 ").resolve(),
            Ok(Decimal::new(4250, 2))
        );
    }

    #[test]
    fn test_resolve_rejects_non_numeric_text() {
        assert!(matches!(
            PriceInput::from("abc").resolve(),
            Err(PriceError::NotNumeric(_))
        ));
    }

    #[test]
    fn test_resolve_rejects_zero_and_negative() {
        assert!(matches!(
            PriceInput::from(0_i64).resolve(),
            Err(PriceError::NotPositive(_))
        ));
        assert!(matches!(
            PriceInput::from("-3").resolve(),
            Err(PriceError::NotPositive(_))
        ));
    }

    #[test]
    fn test_resolve_missing() {
        assert_eq!(PriceInput::Missing.resolve(), Err(PriceError::Missing));
        assert_eq!(PriceInput::from(None::<i64>), PriceInput::Missing);
    }

    #[test]
    fn test_lenient_falls_back_to_zero() {
        assert_eq!(PriceInput::from("abc").lenient(), Decimal::ZERO);
        assert_eq!(PriceInput::from("12").lenient(), Decimal::from(12));
    }

    #[test]
    fn test_display_amount() {
        assert_eq!(display_amount(Decimal::from(75)), "₹75.00");
        assert_eq!(display_amount(Decimal::new(1999, 2)), "₹19.99");
    }
}
