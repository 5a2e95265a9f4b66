//! Realized results: lot disposals and dividend income.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{ActionId, LotSource, Money, Percentage, Quantity, Symbol, TransactionId};

/// One sell-side consumption of a single lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disposal {
    /// The sell transaction
    pub transaction: TransactionId,
    /// Security symbol
    pub symbol: Symbol,
    /// The consumed lot's origin
    pub lot: LotSource,
    /// Shares consumed from the lot
    pub quantity: Quantity,
    /// Acquisition date of the lot
    pub acquired: NaiveDate,
    /// Date of the sale
    pub disposed: NaiveDate,
    /// Cost removed from the lot
    pub cost: Money,
    /// Sale value net of apportioned fees
    pub proceeds: Money,
    /// Fees apportioned to this consumption
    pub fees: Money,
    /// `proceeds - cost`
    pub gain: Money,
}

impl Disposal {
    /// Calendar days between acquisition and disposal.
    #[must_use]
    pub fn holding_days(&self) -> i64 {
        (self.disposed - self.acquired).num_days()
    }

    /// Check if the holding period exceeds `threshold_days`.
    #[must_use]
    pub fn is_long_term(&self, threshold_days: i64) -> bool {
        self.holding_days() > threshold_days
    }
}

/// Where a dividend came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "from", content = "id")]
pub enum IncomeSource {
    /// A dividend transaction in the ledger.
    Transaction(TransactionId),
    /// A dividend corporate action.
    Action(ActionId),
}

/// Cash dividend income, reported apart from capital gains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendIncome {
    /// Origin of the income
    pub source: IncomeSource,
    /// Security symbol
    pub symbol: Symbol,
    /// Date entitlement was fixed
    pub record_date: NaiveDate,
    /// Date the cash was paid
    pub paid: NaiveDate,
    /// Shares entitled
    pub quantity: Quantity,
    /// Cash per share
    pub per_share: Money,
    /// `quantity * per_share`
    pub gross: Money,
    /// Tax withheld at source
    pub withholding: Money,
    /// `gross - withholding`
    pub net: Money,
}

impl DividendIncome {
    /// Compute income for `quantity` shares at `per_share`, withholding `rate`.
    #[must_use]
    pub fn compute(
        source: IncomeSource,
        symbol: Symbol,
        record_date: NaiveDate,
        paid: NaiveDate,
        quantity: Quantity,
        per_share: Money,
        rate: Percentage,
    ) -> Self {
        let gross = per_share.times(quantity);
        let withholding = gross.apply(rate);
        Self {
            source,
            symbol,
            record_date,
            paid,
            quantity,
            per_share,
            gross,
            withholding,
            net: gross - withholding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn disposal(acquired: NaiveDate, disposed: NaiveDate) -> Disposal {
        Disposal {
            transaction: TransactionId(2),
            symbol: Symbol::new("NABIL"),
            lot: LotSource::Transaction(TransactionId(1)),
            quantity: Quantity::new(10),
            acquired,
            disposed,
            cost: Money::from_major(1_000),
            proceeds: Money::from_major(1_500),
            fees: Money::ZERO,
            gain: Money::from_major(500),
        }
    }

    #[test]
    fn test_holding_days() {
        let d = disposal(date(2023, 1, 1), date(2024, 1, 1));
        assert_eq!(d.holding_days(), 365);
        assert!(!d.is_long_term(365));

        let d = disposal(date(2023, 1, 1), date(2024, 1, 2));
        assert!(d.is_long_term(365));
    }

    #[test]
    fn test_dividend_compute() {
        let income = DividendIncome::compute(
            IncomeSource::Action(ActionId(1)),
            Symbol::new("NICA"),
            date(2024, 3, 1),
            date(2024, 3, 20),
            Quantity::new(150),
            Money::from_major(10),
            Percentage::from_percent(5),
        );
        assert_eq!(income.gross, Money::from_major(1_500));
        assert_eq!(income.withholding, Money::from_major(75));
        assert_eq!(income.net, Money::from_major(1_425));
    }
}
