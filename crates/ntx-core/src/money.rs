//! Fixed-point money, percentage and share-quantity types.
//!
//! A [`Money`] is an integer count of minor currency units (paisa), a
//! [`Percentage`] is an integer count of basis points and a [`Quantity`] is
//! an integer share count. No floating point is involved anywhere: products
//! are formed in `i128` and every division goes through [`div_round`], which
//! rounds half away from zero.
//!
//! # Examples
//!
//! ```
//! use ntx_core::{Money, Percentage, Quantity};
//!
//! let price: Money = "1,234.50".parse().unwrap();
//! assert_eq!(price.minor(), 123_450);
//!
//! let total = price.times(Quantity::new(10));
//! assert_eq!(total.to_string(), "12,345.00");
//!
//! // 7.5% of 10,000.00
//! let tax = Money::from_major(10_000).apply(Percentage::from_basis_points(750));
//! assert_eq!(tax, Money::from_major(750));
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Minor units in one major unit (100 paisa = 1 rupee).
pub const MINOR_PER_MAJOR: i64 = 100;

/// Basis points in a whole (100% = 10,000 bp).
pub const BASIS_POINTS_PER_WHOLE: i64 = 10_000;

/// Divide, rounding half away from zero.
///
/// Returns zero for a zero denominator.
#[must_use]
pub const fn div_round(numerator: i128, denominator: i128) -> i128 {
    if denominator == 0 {
        return 0;
    }
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder != 0 && 2 * remainder.abs() >= denominator.abs() {
        quotient + numerator.signum() * denominator.signum()
    } else {
        quotient
    }
}

/// Divide, rounding toward negative infinity.
///
/// Returns zero for a zero denominator.
#[must_use]
pub const fn div_floor(numerator: i128, denominator: i128) -> i128 {
    if denominator == 0 {
        return 0;
    }
    let quotient = numerator / denominator;
    if numerator % denominator != 0 && (numerator < 0) != (denominator < 0) {
        quotient - 1
    } else {
        quotient
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Error parsing a decimal amount from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    /// Text is not a decimal number.
    #[error("invalid number: {0:?}")]
    Invalid(String),
    /// A share quantity had a fractional part.
    #[error("quantity must be a whole number: {0:?}")]
    Fractional(String),
    /// The value does not fit in 64 bits of minor units.
    #[error("number out of range: {0:?}")]
    OutOfRange(String),
}

/// Strip currency prefixes, thousands separators and whitespace.
fn clean_number(s: &str) -> String {
    let trimmed = s.trim();
    let trimmed = trimmed
        .strip_prefix("NPR")
        .or_else(|| trimmed.strip_prefix("Rs."))
        .unwrap_or(trimmed);
    trimmed
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect()
}

fn parse_scaled(s: &str, scale: i64) -> Result<i64, ParseAmountError> {
    let cleaned = clean_number(s);
    if cleaned.is_empty() || cleaned == "-" {
        return Err(ParseAmountError::Invalid(s.to_string()));
    }
    let number =
        Decimal::from_str(&cleaned).map_err(|_| ParseAmountError::Invalid(s.to_string()))?;
    let scaled = number
        .checked_mul(Decimal::from(scale))
        .ok_or_else(|| ParseAmountError::OutOfRange(s.to_string()))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    scaled
        .to_i64()
        .ok_or_else(|| ParseAmountError::OutOfRange(s.to_string()))
}

/// Render `value / 100` with thousands separators and two decimals.
fn format_hundredths(value: i64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    write!(
        f,
        "{sign}{}.{:02}",
        group_thousands(abs / 100),
        abs % 100
    )
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// An amount of money in minor currency units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Create from minor units (paisa).
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Create from whole major units (rupees).
    #[must_use]
    pub const fn from_major(major: i64) -> Self {
        Self(major.saturating_mul(MINOR_PER_MAJOR))
    }

    /// The value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Check if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is strictly negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Absolute value.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    /// Multiply a per-share amount by a share count.
    ///
    /// Saturates at the bounds; booking paths use [`Money::checked_times`].
    #[must_use]
    pub fn times(self, quantity: Quantity) -> Self {
        Self(saturate(i128::from(self.0) * i128::from(quantity.0)))
    }

    /// Multiply by a share count, or `None` if the product overflows.
    #[must_use]
    pub fn checked_times(self, quantity: Quantity) -> Option<Self> {
        i64::try_from(i128::from(self.0) * i128::from(quantity.0))
            .ok()
            .map(Self)
    }

    /// Add, or `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtract, or `None` on overflow.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(diff) => Some(Self(diff)),
            None => None,
        }
    }

    /// Divide a total by a share count, yielding a per-share amount.
    ///
    /// Zero shares yield zero.
    #[must_use]
    pub fn per(self, quantity: Quantity) -> Self {
        Self(saturate(div_round(
            i128::from(self.0),
            i128::from(quantity.0),
        )))
    }

    /// The share of this amount attributable to `part` out of `whole`.
    ///
    /// Computed as `self * part / whole` in a single rounding step.
    #[must_use]
    pub fn pro_rata(self, part: Quantity, whole: Quantity) -> Self {
        Self(saturate(div_round(
            i128::from(self.0) * i128::from(part.0),
            i128::from(whole.0),
        )))
    }

    /// Multiply by `numerator / denominator` in a single rounding step.
    ///
    /// For rates finer than a basis point, such as a fee per lakh.
    #[must_use]
    pub fn mul_div(self, numerator: i64, denominator: i64) -> Self {
        Self(saturate(div_round(
            i128::from(self.0) * i128::from(numerator),
            i128::from(denominator),
        )))
    }

    /// Apply a percentage to this amount.
    #[must_use]
    pub fn apply(self, rate: Percentage) -> Self {
        Self(saturate(div_round(
            i128::from(self.0) * i128::from(rate.0),
            i128::from(BASIS_POINTS_PER_WHOLE),
        )))
    }

    /// Express this amount as a percentage of `base`.
    ///
    /// A zero base yields zero.
    #[must_use]
    pub fn percent_of(self, base: Self) -> Percentage {
        Percentage(saturate(div_round(
            i128::from(self.0) * i128::from(BASIS_POINTS_PER_WHOLE),
            i128::from(base.0),
        )))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_hundredths(self.0, f)
    }
}

impl FromStr for Money {
    type Err = ParseAmountError;

    /// Parse decimal text such as `"1,234.50"`, `"NPR 12.5"` or `"Rs. 3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_scaled(s, MINOR_PER_MAJOR).map(Self)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// A percentage stored in basis points (1% = 100 bp).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Percentage(i64);

impl Percentage {
    /// Zero percent.
    pub const ZERO: Self = Self(0);

    /// Create from basis points.
    #[must_use]
    pub const fn from_basis_points(bp: i64) -> Self {
        Self(bp)
    }

    /// Create from a whole number of percent.
    #[must_use]
    pub const fn from_percent(percent: i64) -> Self {
        Self(percent.saturating_mul(100))
    }

    /// The value in basis points.
    #[must_use]
    pub const fn basis_points(self) -> i64 {
        self.0
    }

    /// Check if the percentage is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Check if the percentage is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_hundredths(self.0, f)?;
        write!(f, "%")
    }
}

impl FromStr for Percentage {
    type Err = ParseAmountError;

    /// Parse text such as `"7.5%"` or `"7.5"` (both 750 bp).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
        parse_scaled(number, 100).map(Self)
    }
}

impl Add for Percentage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Sub for Percentage {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

/// A whole number of shares.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    /// No shares.
    pub const ZERO: Self = Self(0);

    /// Create a quantity.
    #[must_use]
    pub const fn new(shares: i64) -> Self {
        Self(shares)
    }

    /// The share count.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Check if the quantity is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Check if the quantity is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Check if the quantity is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Scale by `numerator / denominator`, rounding down.
    ///
    /// Used for entitlements, where fractional shares are never issued.
    #[must_use]
    pub fn scale_floor(self, numerator: i64, denominator: i64) -> Self {
        Self(saturate(div_floor(
            i128::from(self.0) * i128::from(numerator),
            i128::from(denominator),
        )))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-")?;
        }
        write!(f, "{}", group_thousands(self.0.unsigned_abs()))
    }
}

impl FromStr for Quantity {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = clean_number(s);
        let number =
            Decimal::from_str(&cleaned).map_err(|_| ParseAmountError::Invalid(s.to_string()))?;
        if !number.fract().is_zero() {
            return Err(ParseAmountError::Fractional(s.to_string()));
        }
        number
            .to_i64()
            .map(Self)
            .ok_or_else(|| ParseAmountError::OutOfRange(s.to_string()))
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Quantity {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_div_round_half_away_from_zero() {
        assert_eq!(div_round(5, 2), 3);
        assert_eq!(div_round(-5, 2), -3);
        assert_eq!(div_round(4, 3), 1);
        assert_eq!(div_round(-4, 3), -1);
        assert_eq!(div_round(5, -2), -3);
        assert_eq!(div_round(7, 0), 0);
    }

    #[test]
    fn test_div_floor() {
        assert_eq!(div_floor(7, 2), 3);
        assert_eq!(div_floor(-7, 2), -4);
        assert_eq!(div_floor(6, 3), 2);
    }

    #[test]
    fn test_money_parse() {
        assert_eq!("1,234.50".parse::<Money>().unwrap(), Money::from_minor(123_450));
        assert_eq!("NPR 12.5".parse::<Money>().unwrap(), Money::from_minor(1250));
        assert_eq!("Rs. 3".parse::<Money>().unwrap(), Money::from_major(3));
        assert_eq!("-0.015".parse::<Money>().unwrap(), Money::from_minor(-2));
        assert!(matches!(
            "abc".parse::<Money>(),
            Err(ParseAmountError::Invalid(_))
        ));
    }

    #[test]
    fn test_money_parse_rejects_blank() {
        for text in ["", "  ", "-", "NPR", "Rs. -"] {
            assert!(
                matches!(text.parse::<Money>(), Err(ParseAmountError::Invalid(_))),
                "{text:?}"
            );
        }
        assert!(matches!(
            "%".parse::<Percentage>(),
            Err(ParseAmountError::Invalid(_))
        ));
        assert_eq!("0".parse::<Money>().unwrap(), Money::ZERO);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_minor(123_456_789).to_string(), "1,234,567.89");
        assert_eq!(Money::from_minor(-5).to_string(), "-0.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_money_times_and_per() {
        let price = Money::from_major(10);
        let total = price.times(Quantity::new(3));
        assert_eq!(total, Money::from_major(30));
        // 10.00 / 3 = 3.333.. -> 3.33
        assert_eq!(price.per(Quantity::new(3)), Money::from_minor(333));
        // 20.00 / 3 = 6.666.. -> 6.67
        assert_eq!(Money::from_major(20).per(Quantity::new(3)), Money::from_minor(667));
        assert_eq!(price.per(Quantity::ZERO), Money::ZERO);
    }

    #[test]
    fn test_money_pro_rata() {
        // 1.00 split 1/3 -> 0.33
        let fees = Money::from_major(1);
        assert_eq!(
            fees.pro_rata(Quantity::new(1), Quantity::new(3)),
            Money::from_minor(33)
        );
        assert_eq!(
            fees.pro_rata(Quantity::new(2), Quantity::new(3)),
            Money::from_minor(67)
        );
    }

    #[test]
    fn test_money_mul_div() {
        // 0.015% of 100,000.00
        assert_eq!(
            Money::from_major(100_000).mul_div(15, 100_000),
            Money::from_major(15)
        );
        assert_eq!(Money::from_major(1).mul_div(1, 3), Money::from_minor(33));
        assert_eq!(Money::from_major(1).mul_div(1, 0), Money::ZERO);
    }

    #[test]
    fn test_money_apply_percentage() {
        let gain = Money::from_major(10_000);
        assert_eq!(gain.apply(Percentage::from_percent(5)), Money::from_major(500));
        assert_eq!(
            gain.apply(Percentage::from_basis_points(750)),
            Money::from_major(750)
        );
        // 0.15 * 5% = 0.0075 -> 0.01
        assert_eq!(
            Money::from_minor(15).apply(Percentage::from_percent(5)),
            Money::from_minor(1)
        );
    }

    #[test]
    fn test_money_percent_of() {
        let gain = Money::from_major(25);
        assert_eq!(
            gain.percent_of(Money::from_major(100)),
            Percentage::from_percent(25)
        );
        assert_eq!(gain.percent_of(Money::ZERO), Percentage::ZERO);
    }

    #[test]
    fn test_money_saturates() {
        let big = Money::from_minor(i64::MAX);
        assert_eq!(big + Money::from_minor(1), big);
        assert_eq!(big.times(Quantity::new(2)), big);
    }

    #[test]
    fn test_money_checked() {
        let big = Money::from_minor(i64::MAX);
        assert_eq!(big.checked_add(Money::from_minor(1)), None);
        assert_eq!(Money::from_minor(i64::MIN).checked_sub(Money::from_minor(1)), None);
        assert_eq!(big.checked_times(Quantity::new(2)), None);
        assert_eq!(
            Money::from_major(10).checked_times(Quantity::new(3)),
            Some(Money::from_major(30))
        );
        assert_eq!(
            Money::from_major(5).checked_sub(Money::from_major(7)),
            Some(Money::from_major(-2))
        );
    }

    #[test]
    fn test_percentage_parse_and_display() {
        let rate: Percentage = "7.5%".parse().unwrap();
        assert_eq!(rate.basis_points(), 750);
        assert_eq!(rate.to_string(), "7.50%");
        assert_eq!("5".parse::<Percentage>().unwrap(), Percentage::from_percent(5));
    }

    #[test]
    fn test_quantity_parse() {
        assert_eq!("1,000".parse::<Quantity>().unwrap(), Quantity::new(1000));
        assert!(matches!(
            "10.5".parse::<Quantity>(),
            Err(ParseAmountError::Fractional(_))
        ));
        assert_eq!(Quantity::new(1_234_567).to_string(), "1,234,567");
    }

    #[test]
    fn test_quantity_scale_floor() {
        assert_eq!(Quantity::new(105).scale_floor(1, 10), Quantity::new(10));
        assert_eq!(Quantity::new(100).scale_floor(2, 1), Quantity::new(200));
        assert_eq!(Quantity::new(7).scale_floor(1, 2), Quantity::new(3));
    }
}
