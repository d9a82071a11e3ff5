//! Money type for representing monetary values.
//!
//! Uses a minor-unit integer representation (two decimal places) to avoid
//! floating-point drift in order totals. Amounts carry no currency of their
//! own: an order references its currency, and every amount on that order is
//! expressed in it.
//!
//! On the wire amounts are plain JSON numbers (`99.5`), converted to and from
//! minor units at the serde boundary.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

use crate::ids::CurrencyId;

/// Minor units per major unit.
pub const MINOR_PER_MAJOR: i64 = 100;

/// Currency code used when a storefront has none configured.
pub const DEFAULT_CURRENCY_CODE: &str = "SAR";

/// A monetary amount in minor units (e.g. halalas, cents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Create from minor units.
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Create from whole major units.
    pub const fn from_major(major: i64) -> Self {
        Self(major * MINOR_PER_MAJOR)
    }

    /// Create from a decimal amount, rounding to the nearest minor unit.
    ///
    /// ```
    /// use souq_commerce::money::Money;
    /// assert_eq!(Money::from_decimal(49.99).minor(), 4999);
    /// ```
    pub fn from_decimal(amount: f64) -> Self {
        Self((amount * MINOR_PER_MAJOR as f64).round() as i64)
    }

    /// Zero.
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Amount in minor units.
    pub const fn minor(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Convert to a decimal value.
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    /// Format without symbol (e.g. "49.99").
    pub fn display_amount(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = MINOR_PER_MAJOR as u64;
        format!("{}{}.{:02}", sign, abs / per, abs % per)
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Multiply by a quantity.
    pub fn checked_mul(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, quantity: i64) -> Money {
        Money(self.0 * quantity)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_amount())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        if !amount.is_finite() {
            return Err(de::Error::custom("amount must be a finite number"));
        }
        if amount.abs() > (i64::MAX / MINOR_PER_MAJOR) as f64 {
            return Err(de::Error::custom("amount out of range"));
        }
        Ok(Money::from_decimal(amount))
    }
}

/// A currency reference row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub id: CurrencyId,
    /// ISO code, e.g. "SAR".
    pub code: String,
    pub symbol: String,
    pub name_en: String,
    pub name_ar: String,
}

impl Currency {
    /// Format an amount with this currency's symbol.
    pub fn format(&self, amount: Money) -> String {
        format!("{} {}", amount.display_amount(), self.symbol)
    }
}
