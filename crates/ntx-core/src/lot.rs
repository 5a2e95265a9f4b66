//! Lot type representing the open remainder of one acquisition.
//!
//! A [`Lot`] carries its remaining **total** cost in minor units rather than
//! a rounded per-share cost. Splitting a lot moves an exact slice of that
//! total to the consumed part, so the remainder plus everything consumed
//! always adds back to the original acquisition cost.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ActionId, Money, Quantity, TransactionId};

/// The event that created a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "from", content = "id")]
pub enum LotSource {
    /// A buy, bonus or rights transaction.
    Transaction(TransactionId),
    /// A bonus or rights corporate action.
    Action(ActionId),
}

impl fmt::Display for LotSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transaction(id) => write!(f, "{id}"),
            Self::Action(id) => write!(f, "{id}"),
        }
    }
}

/// Shares still held from one acquisition.
///
/// # Examples
///
/// ```
/// use ntx_core::{Lot, LotSource, Money, Quantity, TransactionId};
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// let lot = Lot::new(LotSource::Transaction(TransactionId(1)), date, Quantity::new(3), Money::from_major(10));
///
/// // 10.00 / 3 shares
/// assert_eq!(lot.unit_cost(), Money::from_minor(333));
///
/// let (taken, rest) = lot.split(Quantity::new(1));
/// assert_eq!(taken.cost + rest.cost, Money::from_major(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lot {
    /// Where the lot came from
    pub source: LotSource,
    /// Acquisition date
    pub acquired: NaiveDate,
    /// Shares remaining
    pub quantity: Quantity,
    /// Cost of the remaining shares
    pub cost: Money,
}

impl Lot {
    /// Create a lot.
    #[must_use]
    pub const fn new(source: LotSource, acquired: NaiveDate, quantity: Quantity, cost: Money) -> Self {
        Self {
            source,
            acquired,
            quantity,
            cost,
        }
    }

    /// Per-share cost, rounded half away from zero.
    #[must_use]
    pub fn unit_cost(&self) -> Money {
        self.cost.per(self.quantity)
    }

    /// Check if no shares remain.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Cost attributable to `take` shares of this lot.
    #[must_use]
    pub fn cost_of(&self, take: Quantity) -> Money {
        if take >= self.quantity {
            self.cost
        } else {
            self.cost.pro_rata(take, self.quantity)
        }
    }

    /// Split into `(taken, remainder)`.
    ///
    /// The taken part receives `cost_of(take)`; the remainder keeps the
    /// rest of the cost along with the acquisition date and source.
    #[must_use]
    pub fn split(&self, take: Quantity) -> (Self, Self) {
        let take = take.min(self.quantity);
        let taken_cost = self.cost_of(take);
        let taken = Self {
            quantity: take,
            cost: taken_cost,
            ..self.clone()
        };
        let rest = Self {
            quantity: self.quantity - take,
            cost: self.cost - taken_cost,
            ..self.clone()
        };
        (taken, rest)
    }
}

impl fmt::Display for Lot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({}, {})",
            self.quantity,
            self.unit_cost(),
            self.acquired,
            self.source
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn lot(quantity: i64, cost_minor: i64) -> Lot {
        Lot::new(
            LotSource::Transaction(TransactionId(1)),
            date(2024, 1, 1),
            Quantity::new(quantity),
            Money::from_minor(cost_minor),
        )
    }

    #[test]
    fn test_unit_cost() {
        assert_eq!(lot(100, 100_000).unit_cost(), Money::from_major(10));
        assert_eq!(lot(0, 0).unit_cost(), Money::ZERO);
    }

    #[test]
    fn test_split_conserves_cost() {
        let original = lot(3, 1000);
        let (taken, rest) = original.split(Quantity::new(2));

        assert_eq!(taken.quantity, Quantity::new(2));
        assert_eq!(rest.quantity, Quantity::new(1));
        // 10.00 * 2 / 3 = 6.666.. -> 6.67
        assert_eq!(taken.cost, Money::from_minor(667));
        assert_eq!(rest.cost, Money::from_minor(333));
        assert_eq!(taken.cost + rest.cost, original.cost);
        assert_eq!(rest.acquired, original.acquired);
        assert_eq!(rest.source, original.source);
    }

    #[test]
    fn test_split_whole_lot() {
        let original = lot(10, 999);
        let (taken, rest) = original.split(Quantity::new(25));
        assert_eq!(taken, original);
        assert!(rest.is_empty());
        assert_eq!(rest.cost, Money::ZERO);
    }

    #[test]
    fn test_display() {
        let l = lot(30, 36_000);
        assert_eq!(l.to_string(), "30 @ 12.00 (2024-01-01, #1)");
    }

    #[test]
    fn test_source_serde() {
        let json = serde_json::to_string(&LotSource::Action(ActionId(4))).unwrap();
        assert_eq!(json, r#"{"from":"action","id":4}"#);
    }
}
