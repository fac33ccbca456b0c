//! Type-safe money amounts using decimal arithmetic.
//!
//! Amounts are stored as `NUMERIC(12,2)` and travel over JSON as plain
//! numbers (`25.5`), matching what storefront clients send at checkout.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when constructing [`Money`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// Amount does not fit the `NUMERIC(12,2)` column.
    #[error("amount cannot exceed {}", Money::MAX)]
    TooLarge,
    /// Value could not be interpreted as a decimal amount.
    #[error("amount is not a valid number: {0}")]
    Invalid(String),
}

/// A non-negative amount in the store currency, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest storable amount, `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    /// Create an amount, rejecting negative values.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Negative` if `amount < 0` and
    /// `MoneyError::TooLarge` above [`Money::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }
        let amount = amount.round_dp(2);
        if amount > Self::MAX.0 {
            return Err(MoneyError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Create an amount from whole cents.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), 2))
    }

    /// Create an amount from a JSON-style float.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Invalid` for NaN/infinite input, and otherwise
    /// whatever [`Money::new`] rejects.
    pub fn from_f64(value: f64) -> Result<Self, MoneyError> {
        let amount = Decimal::from_f64_retain(value)
            .ok_or_else(|| MoneyError::Invalid(value.to_string()))?;
        Self::new(amount)
    }

    /// Returns the underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl std::str::FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount = s
            .trim()
            .parse::<Decimal>()
            .map_err(|_| MoneyError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
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
    fn test_rejects_negative() {
        assert_eq!(Money::from_f64(-0.01), Err(MoneyError::Negative));
        assert_eq!("-5".parse::<Money>(), Err(MoneyError::Negative));
    }

    #[test]
    fn test_zero_is_allowed() {
        assert!(Money::from_f64(0.0).unwrap().is_zero());
    }

    #[test]
    fn test_serializes_as_number() {
        let money: Money = "25.50".parse().unwrap();
        assert_eq!(serde_json::to_string(&money).unwrap(), "25.5");
    }

    #[test]
    fn test_deserializes_number_and_string() {
        let a: Money = serde_json::from_str("4.99").unwrap();
        let b: Money = serde_json::from_str("\"4.99\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "4.99");
    }

    #[test]
    fn test_deserialize_rejects_negative() {
        assert!(serde_json::from_str::<Money>("-1").is_err());
    }

    #[test]
    fn test_upper_bound_matches_column() {
        assert_eq!(Money::MAX.to_string(), "9999999999.99");
        assert_eq!("9999999999.99".parse::<Money>(), Ok(Money::MAX));
        assert_eq!("10000000000".parse::<Money>(), Err(MoneyError::TooLarge));
        assert_eq!(Money::from_f64(1e12), Err(MoneyError::TooLarge));
        assert!(serde_json::from_str::<Money>("1e12").is_err());
    }
}
