use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount backed by an exact decimal.
///
/// Use this type for **all** monetary values in the engine (balances,
/// transaction amounts) to avoid floating-point drift. It is persisted as
/// decimal text.
///
/// The value is signed:
/// - positive = income / increase
/// - negative = expense / decrease
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount: Money = "12.34".parse().unwrap();
/// assert_eq!(amount.to_string(), "12.34");
/// assert!(amount.is_positive());
/// ```
///
/// Parsing from user input accepts `.` or `,` as decimal separator:
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10,5".parse::<Money>().unwrap().to_string(), "10.5");
/// assert!("ten".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn decimal(self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if the amount is strictly positive.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns `true` if the amount is strictly negative.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Parses a value read back from storage.
    pub(crate) fn from_storage(value: &str, label: &str) -> Result<Self, EngineError> {
        Decimal::from_str(value)
            .map(Money)
            .map_err(|_| EngineError::Corrupted(format!("invalid stored {label}: {value}")))
    }

    /// Canonical text persisted in decimal columns.
    pub(crate) fn to_storage(self) -> String {
        self.0.normalize().to_string()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading `+`/`-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EngineError::Validation("empty amount".to_string()));
        }
        let normalized = trimmed.strip_prefix('+').unwrap_or(trimmed).replace(',', ".");
        Decimal::from_str(&normalized)
            .map(Money)
            .map_err(|_| EngineError::Validation(format!("invalid amount: {trimmed}")))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn display_is_normalized() {
        assert_eq!(Money::new(dec!(0)).to_string(), "0");
        assert_eq!(Money::new(dec!(10.50)).to_string(), "10.5");
        assert_eq!(Money::new(dec!(-50.00)).to_string(), "-50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap(), Money::new(dec!(10)));
        assert_eq!("10,50".parse::<Money>().unwrap(), Money::new(dec!(10.5)));
        assert_eq!("-0.01".parse::<Money>().unwrap(), Money::new(dec!(-0.01)));
        assert_eq!("+1.00".parse::<Money>().unwrap(), Money::new(dec!(1)));
        assert_eq!("  2.30 ".parse::<Money>().unwrap(), Money::new(dec!(2.3)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Money>().is_err());
        assert!("12.3.4".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn storage_round_trip_is_exact() {
        let value = Money::new(dec!(0.1)) + Money::new(dec!(0.2));
        let stored = value.to_storage();
        assert_eq!(stored, "0.3");
        assert_eq!(Money::from_storage(&stored, "balance").unwrap(), value);
    }

    #[test]
    fn sums_signed_amounts() {
        let total: Money = [dec!(100), dec!(-50.25), dec!(0.25)]
            .into_iter()
            .map(Money::new)
            .sum();
        assert_eq!(total, Money::new(dec!(50)));
    }
}
