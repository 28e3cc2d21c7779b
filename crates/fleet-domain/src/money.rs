//! Fixed-point currency amounts.
//!
//! Every stored or displayed amount is a [`Money`] with exactly two decimal
//! places. Sums and differences are exact; percentage and ratio operations
//! round half away from zero back to two places.

use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits carried by every amount.
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude, in whole units, accepted from input.
pub const MAX_INPUT_UNITS: i64 = 1_000_000_000_000_000;

/// Exact decimal currency amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Builds an amount from whole currency units (rupees, dollars).
    pub fn new(units: i64) -> Self {
        Money(Decimal::from_i128_with_scale(i128::from(units) * 100, MONEY_SCALE))
    }

    /// Builds an amount from minor units (paise, cents).
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, MONEY_SCALE))
    }

    /// Parses user input such as `"1250.50"`. Rejects non-numeric text,
    /// values carrying more than two fractional digits and magnitudes above
    /// [`MAX_INPUT_UNITS`].
    pub fn parse(raw: &str) -> Result<Self, MoneyError> {
        let trimmed = raw.trim();
        let value = Decimal::from_str(trimmed)
            .map_err(|_| MoneyError::InvalidAmount(format!("`{trimmed}` is not a number")))?;
        Self::try_from_decimal(value)
    }

    /// Accepts a decimal only if it is already exact to two places and
    /// within [`MAX_INPUT_UNITS`].
    pub fn try_from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        let normalized = value.normalize();
        if normalized.scale() > MONEY_SCALE {
            return Err(MoneyError::InvalidAmount(format!(
                "`{value}` has more than {MONEY_SCALE} decimal places"
            )));
        }
        if normalized.abs() > Decimal::from(MAX_INPUT_UNITS) {
            return Err(MoneyError::InvalidAmount(format!(
                "`{value}` exceeds the largest accepted amount"
            )));
        }
        Self::rounded(normalized)
    }

    fn rounded(value: Decimal) -> Result<Self, MoneyError> {
        let mut value =
            value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(MONEY_SCALE);
        if value.scale() != MONEY_SCALE {
            return Err(MoneyError::InvalidAmount(format!(
                "`{value}` is too large to carry {MONEY_SCALE} decimal places"
            )));
        }
        Ok(Money(value))
    }

    /// Returns `self × rate / 100`, rounded to two places.
    pub fn percent(self, rate: Decimal) -> Result<Money, MoneyError> {
        let scaled = self.0.checked_mul(rate).ok_or_else(|| overflow("percentage"))?;
        Self::rounded(scaled / Decimal::from(100))
    }

    /// Returns `self × numerator / denominator`, rounded to two places.
    /// Multiplication happens first so the only rounding is the final one.
    pub fn mul_ratio(self, numerator: u32, denominator: u32) -> Result<Money, MoneyError> {
        if denominator == 0 {
            return Err(MoneyError::ZeroDenominator);
        }
        let scaled = self
            .0
            .checked_mul(Decimal::from(numerator))
            .ok_or_else(|| overflow("ratio"))?;
        Self::rounded(scaled / Decimal::from(denominator))
    }

    /// Multiplies by a whole count, e.g. trip rate × trips.
    pub fn times(self, count: u32) -> Result<Money, MoneyError> {
        let scaled = self
            .0
            .checked_mul(Decimal::from(count))
            .ok_or_else(|| overflow("product"))?;
        Self::rounded(scaled)
    }

    /// Sum, or `None` if the result does not fit.
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).and_then(|sum| Self::rounded(sum).ok())
    }

    /// Difference, or `None` if the result does not fit.
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).and_then(|diff| Self::rounded(diff).ok())
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Amount expressed in minor units.
    pub fn minor_units(&self) -> i128 {
        self.0.mantissa()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(self) -> Money {
        Money(self.0.abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::try_from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
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

    fn sub(self, rhs: Money) -> Money {
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

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, value| acc + value)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

fn overflow(operation: &str) -> MoneyError {
    MoneyError::InvalidAmount(format!("{operation} overflows the amount range"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Errors raised while constructing or transforming [`Money`] values.
pub enum MoneyError {
    InvalidAmount(String),
    ZeroDenominator,
}

impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoneyError::InvalidAmount(reason) => write!(f, "invalid amount: {reason}"),
            MoneyError::ZeroDenominator => f.write_str("ratio denominator must be non-zero"),
        }
    }
}

impl std::error::Error for MoneyError {}
