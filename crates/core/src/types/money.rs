//! Monetary amounts using decimal arithmetic.
//!
//! The store trades in a single currency, so `Money` is just a non-negative
//! `Decimal`. Amounts are never held in binary floating point: order totals
//! are sums of `quantity * unit price` and must match to the cent.

use core::fmt;
use core::iter::Sum;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quantity::Quantity;

/// Errors that can occur when constructing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input string is not a decimal number.
    #[error("'{0}' is not a valid amount")]
    Invalid(String),
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount has more than two decimal places.
    #[error("amount cannot have more than two decimal places")]
    TooPrecise,
    /// The amount does not fit a `NUMERIC(12, 2)` column.
    #[error("amount cannot exceed {}", Money::MAX)]
    TooLarge,
}

/// A non-negative amount of money with at most two decimal places, no larger
/// than [`Money::MAX`].
///
/// ```
/// use supermarket_core::{Money, Quantity};
///
/// let unit = Money::parse("2.50").unwrap();
/// let line = unit.times(Quantity::new(2).unwrap());
/// assert_eq!(line.to_string(), "$5.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest storable amount: 9 999 999 999.99, the range of the ledger's
    /// `NUMERIC(12, 2)` columns.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    /// Create an amount from a decimal.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for amounts below zero,
    /// [`MoneyError::TooPrecise`] for sub-cent amounts and
    /// [`MoneyError::TooLarge`] above [`Money::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        if amount > Self::MAX.0 {
            return Err(MoneyError::TooLarge);
        }
        let normalized = amount.normalize();
        if normalized.scale() > 2 {
            return Err(MoneyError::TooPrecise);
        }
        Ok(Self(amount))
    }

    /// Create an amount from a whole number of cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// Parse an amount typed into a form, e.g. `"4.99"`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] if the input is not a number, plus the
    /// errors of [`Money::new`].
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let trimmed = s.trim();
        let amount =
            Decimal::from_str(trimmed).map_err(|_| MoneyError::Invalid(trimmed.to_owned()))?;
        Self::new(amount)
    }

    /// The underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether this amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Price of `quantity` units at this unit price.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooLarge`] if the result exceeds [`Money::MAX`].
    pub fn checked_times(self, quantity: Quantity) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity.get()))
            .ok_or(MoneyError::TooLarge)
            .and_then(Self::new)
    }

    /// Sum of two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::TooLarge`] if the result exceeds [`Money::MAX`].
    pub fn checked_add(self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .ok_or(MoneyError::TooLarge)
            .and_then(Self::new)
    }

    /// Like [`Money::checked_times`], clamped to [`Money::MAX`]. For display.
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        self.checked_times(quantity).unwrap_or(Self::MAX)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl core::ops::Add for Money {
    type Output = Self;

    /// Clamps at [`Money::MAX`]; use [`Money::checked_add`] where overflow
    /// must be reported.
    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).unwrap_or(Self::MAX)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, m| acc + m)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_plain_amounts() {
        assert_eq!(Money::parse("2.5").unwrap(), Money::from_cents(250));
        assert_eq!(Money::parse(" 10 ").unwrap(), Money::from_cents(1000));
        assert_eq!(Money::parse("0").unwrap(), Money::ZERO);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Money::parse("abc"), Err(MoneyError::Invalid(_))));
        assert!(matches!(Money::parse(""), Err(MoneyError::Invalid(_))));
    }

    #[test]
    fn test_negative_rejected() {
        assert_eq!(Money::parse("-0.01"), Err(MoneyError::Negative));
    }

    #[test]
    fn test_sub_cent_rejected() {
        assert_eq!(Money::parse("1.005"), Err(MoneyError::TooPrecise));
        // Trailing zeros are not extra precision.
        assert!(Money::parse("1.500").is_ok());
    }

    #[test]
    fn test_times_and_sum_are_exact() {
        let lines = [
            Money::parse("0.10").unwrap().times(Quantity::new(3).unwrap()),
            Money::parse("0.20").unwrap().times(Quantity::new(1).unwrap()),
        ];
        let total: Money = lines.into_iter().sum();
        assert_eq!(total, Money::parse("0.50").unwrap());
    }

    #[test]
    fn test_max_matches_column_range() {
        assert_eq!(Money::MAX.to_string(), "$9999999999.99");
        assert_eq!(Money::parse("9999999999.99").unwrap(), Money::MAX);
        assert_eq!(Money::parse("10000000000.00"), Err(MoneyError::TooLarge));
        assert_eq!(
            Money::parse("79228162514264337593543950335"),
            Err(MoneyError::TooLarge)
        );
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let big = Money::parse("5000000000.00").unwrap();
        assert_eq!(big.checked_times(Quantity::new(2).unwrap()), Err(MoneyError::TooLarge));
        assert_eq!(big.checked_add(big), Err(MoneyError::TooLarge));
        assert_eq!(
            Money::MAX.checked_times(Quantity::new(i64::from(i32::MAX)).unwrap()),
            Err(MoneyError::TooLarge)
        );
        assert_eq!(
            big.checked_times(Quantity::ONE).unwrap().checked_add(Money::from_cents(1)),
            Ok(Money::parse("5000000000.01").unwrap())
        );
    }

    #[test]
    fn test_display_arithmetic_clamps() {
        let big = Money::parse("5000000000.00").unwrap();
        assert_eq!(big.times(Quantity::new(3).unwrap()), Money::MAX);
        assert_eq!(big + big, Money::MAX);
        let total: Money = [Money::MAX, Money::MAX].into_iter().sum();
        assert_eq!(total, Money::MAX);
    }

    #[test]
    fn test_display_two_places() {
        assert_eq!(Money::parse("5").unwrap().to_string(), "$5.00");
        assert_eq!(Money::from_cents(1999).to_string(), "$19.99");
    }

    #[test]
    fn test_serde_uses_decimal_string() {
        let json = serde_json::to_string(&Money::from_cents(250)).unwrap();
        assert_eq!(json, "\"2.50\"");
        assert!(serde_json::from_str::<Money>("\"-1.00\"").is_err());
    }
}
