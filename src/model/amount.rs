//! Amount type for handling the non-negative face value of a transaction.
//!
//! This module provides the `Amount` type which wraps `Decimal`. Amounts arrive from forms, from
//! the AI service and from spreadsheet rows, any of which may hand us a number, a numeric string,
//! a string with currency decorations, or garbage. Coercion never fails: garbage becomes zero.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Represents a money amount.
///
/// # Examples
///
/// Strict parsing accepts currency decorations:
/// ```
/// # use piggy_ledger::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("NT$1,200").unwrap();
/// assert_eq!(amount.to_string(), "$1,200");
/// ```
///
/// Coercion never fails:
/// ```
/// # use piggy_ledger::model::Amount;
/// assert!(Amount::coerce_str("about a hundred").is_zero());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// The absolute value.
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Rounds half away from zero to a whole number of currency units.
    pub fn round(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Divides evenly among `parts`. Returns `None` when `parts` is zero.
    pub fn divide(&self, parts: usize) -> Option<Self> {
        if parts == 0 {
            return None;
        }
        self.0.checked_div(Decimal::from(parts)).map(Self)
    }

    /// Coerces an untyped JSON value into an amount. Numbers are taken as-is, strings are parsed
    /// leniently, and anything else (or anything unparseable) becomes zero.
    pub fn coerce(value: &Value) -> Self {
        match value {
            Value::Number(n) => number_to_decimal(n).map(Self).unwrap_or_default(),
            Value::String(s) => Self::coerce_str(s),
            Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => Self::ZERO,
        }
    }

    /// Parses `s` leniently, returning zero when it is not a number.
    pub fn coerce_str(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    /// The plain numeric form used inside the split cell, e.g. `30` or `12.5`.
    pub fn plain(&self) -> String {
        self.0.normalize().to_string()
    }
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| n.as_f64().and_then(Decimal::from_f64))
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };

        // Currency markers that show up in receipts and in the sheet
        let unsigned = unsigned
            .strip_prefix("NT$")
            .or_else(|| unsigned.strip_prefix('$'))
            .unwrap_or(unsigned);
        let unsigned = unsigned.strip_suffix('元').unwrap_or(unsigned).trim();

        let without_commas = unsigned.replace(',', "");
        let value = Decimal::from_str(&without_commas).map_err(AmountError)?;
        Ok(Amount(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let num = self.0.abs();
        let float = num.to_f64().unwrap_or_default();
        let formatted = if num.fract().is_zero() {
            format_num::format_num!(",.0", float)
        } else {
            format_num::format_num!(",.2", float)
        };
        write!(f, "{sign}${formatted}")
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // The remote store expects a JSON number, preferably an integer.
        let normalized = self.0.normalize();
        if normalized.fract().is_zero() {
            if let Some(i) = normalized.to_i64() {
                return serializer.serialize_i64(i);
            }
        }
        serializer.serialize_f64(normalized.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Amount::coerce(&value))
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::new(Decimal::from(value))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + *a)
    }
}
