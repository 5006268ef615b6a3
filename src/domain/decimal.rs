//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Provides canonical parsing from strings and formatting without exponent notation.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Lossless decimal numeric type for prices, dollar amounts and ratios.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Build `mantissa * 10^-scale`, e.g. `(1_500_000, 6)` is 1.5.
    pub fn from_scaled(mantissa: i64, scale: u32) -> Self {
        Decimal(RustDecimal::new(mantissa, scale))
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Lossy conversion for text rendering.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Largest integer not greater than the value.
    pub fn floor(&self) -> Self {
        Decimal(self.0.floor())
    }

    /// Round half away from zero to `dp` decimal places.
    pub fn round_dp(&self, dp: u32) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Round towards positive infinity at `dp` decimal places.
    pub fn ceil_dp(&self, dp: u32) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(dp, rust_decimal::RoundingStrategy::ToPositiveInfinity),
        )
    }

    /// Integer part, truncated towards zero.
    pub fn trunc_i64(&self) -> i64 {
        self.0.trunc().to_i64().unwrap_or(0)
    }

    /// Returns the value 100.
    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    /// Basis points per unit (10000).
    pub fn bps_per_unit() -> Self {
        Decimal(RustDecimal::from(10_000))
    }

    /// Divide, returning 0 when the denominator is zero.
    pub fn checked_ratio(self, denominator: Decimal) -> Decimal {
        if denominator.is_zero() {
            return Decimal::zero();
        }
        self / denominator
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Self {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

/// Weighted average of `(value, weight)` pairs; 0 when the weights sum to zero.
pub fn weighted_average<I>(pairs: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, Decimal)>,
{
    let (weighted, total_weight) = pairs.into_iter().fold(
        (Decimal::zero(), Decimal::zero()),
        |(acc, weight_sum), (value, weight)| (acc + value * weight, weight_sum + weight),
    );
    weighted.checked_ratio(total_weight)
}
