//! Transaction records.
//!
//! A [`Transaction`] is one immutable entry of the append-only ledger.
//! Corrections are recorded as new reversing transactions, never as edits.
//!
//! The meaning of `quantity` and `price` depends on the [`TransactionKind`]:
//!
//! | Kind | `quantity` | `price` |
//! |------|------------|---------|
//! | Buy | shares acquired | price per share |
//! | Sell | shares disposed | price per share |
//! | Bonus | shares received | cost per share (normally zero) |
//! | Rights | shares subscribed | subscription price |
//! | Split | forward multiplier N of an N:1 split | zero |
//! | Dividend | shares entitled | cash per share |

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{BookingError, Money, Quantity, Symbol, ValidationIssue};

/// Identifier of a ledger transaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Shares bought on the market.
    Buy,
    /// Shares sold on the market.
    Sell,
    /// Bonus shares credited.
    Bonus,
    /// Rights shares subscribed.
    Rights,
    /// Forward stock split.
    Split,
    /// Cash dividend received.
    Dividend,
}

impl TransactionKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Buy,
        Self::Sell,
        Self::Bonus,
        Self::Rights,
        Self::Split,
        Self::Dividend,
    ];

    /// Check if this kind creates a new lot.
    #[must_use]
    pub const fn is_acquisition(self) -> bool {
        match self {
            Self::Buy | Self::Bonus | Self::Rights => true,
            Self::Sell | Self::Split | Self::Dividend => false,
        }
    }
}

impl FromStr for TransactionKind {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            "bonus" => Ok(Self::Bonus),
            "rights" | "right" => Ok(Self::Rights),
            "split" => Ok(Self::Split),
            "dividend" => Ok(Self::Dividend),
            _ => Err(BookingError::validation(
                None,
                ValidationIssue::UnknownKind(s.to_string()),
            )),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Bonus => write!(f, "BONUS"),
            Self::Rights => write!(f, "RIGHTS"),
            Self::Split => write!(f, "SPLIT"),
            Self::Dividend => write!(f, "DIVIDEND"),
        }
    }
}

/// One immutable ledger entry for a single symbol.
///
/// # Examples
///
/// ```
/// use ntx_core::{Money, Quantity, Transaction, TransactionId, TransactionKind};
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// let txn = Transaction::buy(TransactionId(1), "NABIL", date, Quantity::new(10), Money::from_major(500))
///     .with_fees(Money::from_major(25));
///
/// assert_eq!(txn.kind, TransactionKind::Buy);
/// assert_eq!(txn.gross_value(), Money::from_major(5_000));
/// assert!(txn.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger id
    pub id: TransactionId,
    /// Security symbol
    pub symbol: Symbol,
    /// What happened
    pub kind: TransactionKind,
    /// Trade or credit date
    pub date: NaiveDate,
    /// Share count (see the module table for split and dividend)
    pub quantity: Quantity,
    /// Per-share price
    #[serde(default)]
    pub price: Money,
    /// Brokerage and other charges
    #[serde(default)]
    pub fees: Money,
    /// Free-form notes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl Transaction {
    /// Create a new transaction with zero fees.
    #[must_use]
    pub fn new(
        id: TransactionId,
        symbol: impl Into<Symbol>,
        kind: TransactionKind,
        date: NaiveDate,
        quantity: Quantity,
        price: Money,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            kind,
            date,
            quantity,
            price,
            fees: Money::ZERO,
            notes: String::new(),
        }
    }

    /// A market purchase.
    #[must_use]
    pub fn buy(
        id: TransactionId,
        symbol: impl Into<Symbol>,
        date: NaiveDate,
        quantity: Quantity,
        price: Money,
    ) -> Self {
        Self::new(id, symbol, TransactionKind::Buy, date, quantity, price)
    }

    /// A market sale.
    #[must_use]
    pub fn sell(
        id: TransactionId,
        symbol: impl Into<Symbol>,
        date: NaiveDate,
        quantity: Quantity,
        price: Money,
    ) -> Self {
        Self::new(id, symbol, TransactionKind::Sell, date, quantity, price)
    }

    /// Bonus shares credited at zero cost.
    #[must_use]
    pub fn bonus(
        id: TransactionId,
        symbol: impl Into<Symbol>,
        date: NaiveDate,
        quantity: Quantity,
    ) -> Self {
        Self::new(id, symbol, TransactionKind::Bonus, date, quantity, Money::ZERO)
    }

    /// Rights shares subscribed at `price`.
    #[must_use]
    pub fn rights(
        id: TransactionId,
        symbol: impl Into<Symbol>,
        date: NaiveDate,
        quantity: Quantity,
        price: Money,
    ) -> Self {
        Self::new(id, symbol, TransactionKind::Rights, date, quantity, price)
    }

    /// An N:1 forward split.
    #[must_use]
    pub fn split(
        id: TransactionId,
        symbol: impl Into<Symbol>,
        date: NaiveDate,
        multiplier: i64,
    ) -> Self {
        Self::new(
            id,
            symbol,
            TransactionKind::Split,
            date,
            Quantity::new(multiplier),
            Money::ZERO,
        )
    }

    /// A cash dividend of `per_share` on `quantity` shares.
    #[must_use]
    pub fn dividend(
        id: TransactionId,
        symbol: impl Into<Symbol>,
        date: NaiveDate,
        quantity: Quantity,
        per_share: Money,
    ) -> Self {
        Self::new(id, symbol, TransactionKind::Dividend, date, quantity, per_share)
    }

    /// Set the fees.
    #[must_use]
    pub const fn with_fees(mut self, fees: Money) -> Self {
        self.fees = fees;
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Price times quantity, before fees.
    #[must_use]
    pub fn gross_value(&self) -> Money {
        self.price.times(self.quantity)
    }

    /// Price times quantity plus fees, or `None` if it overflows.
    ///
    /// This is the cost a buy capitalises into its lot.
    #[must_use]
    pub fn checked_total(&self) -> Option<Money> {
        self.price.checked_times(self.quantity)?.checked_add(self.fees)
    }

    /// Check field-level constraints.
    pub fn validate(&self) -> Result<(), BookingError> {
        let fail = |issue| Err(BookingError::validation(Some(self.id), issue));

        if self.symbol.is_empty() {
            return fail(ValidationIssue::EmptySymbol);
        }
        if self.quantity.is_negative() {
            return fail(ValidationIssue::NegativeQuantity(self.quantity));
        }
        if self.price.is_negative() {
            return fail(ValidationIssue::NegativePrice(self.price));
        }
        if self.fees.is_negative() {
            return fail(ValidationIssue::NegativeFees(self.fees));
        }
        match self.kind {
            TransactionKind::Split => {
                if self.quantity.value() < 2 {
                    return fail(ValidationIssue::InvalidSplitMultiplier(self.quantity));
                }
                if !self.price.is_zero() || !self.fees.is_zero() {
                    return fail(ValidationIssue::PricedSplit);
                }
            }
            TransactionKind::Buy
            | TransactionKind::Sell
            | TransactionKind::Bonus
            | TransactionKind::Rights
            | TransactionKind::Dividend => {
                if self.quantity.is_zero() {
                    return fail(ValidationIssue::ZeroQuantity);
                }
                if self.checked_total().is_none() {
                    return fail(ValidationIssue::Overflow);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} @ {}",
            self.id, self.date, self.kind, self.symbol, self.quantity, self.price
        )?;
        if !self.fees.is_zero() {
            write!(f, " (fees {})", self.fees)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Buy".parse::<TransactionKind>().unwrap(), TransactionKind::Buy);
        assert_eq!(" RIGHT ".parse::<TransactionKind>().unwrap(), TransactionKind::Rights);
        let err = "ipo-allot".parse::<TransactionKind>().unwrap_err();
        assert!(matches!(
            err,
            BookingError::Validation {
                issue: ValidationIssue::UnknownKind(_),
                ..
            }
        ));
    }

    #[test]
    fn test_kind_serde_lowercase() {
        let json = serde_json::to_string(&TransactionKind::Dividend).unwrap();
        assert_eq!(json, "\"dividend\"");
        let kind: TransactionKind = serde_json::from_str("\"rights\"").unwrap();
        assert_eq!(kind, TransactionKind::Rights);
    }

    #[test]
    fn test_validate_rejects_negative_fields() {
        let base = Transaction::buy(
            TransactionId(1),
            "NABIL",
            date(2024, 1, 1),
            Quantity::new(10),
            Money::from_major(100),
        );

        let neg_qty = Transaction {
            quantity: Quantity::new(-1),
            ..base.clone()
        };
        assert!(matches!(
            neg_qty.validate(),
            Err(BookingError::Validation {
                issue: ValidationIssue::NegativeQuantity(_),
                ..
            })
        ));

        let neg_price = Transaction {
            price: Money::from_minor(-1),
            ..base.clone()
        };
        assert!(matches!(
            neg_price.validate(),
            Err(BookingError::Validation {
                issue: ValidationIssue::NegativePrice(_),
                ..
            })
        ));

        let neg_fees = base.clone().with_fees(Money::from_minor(-5));
        assert!(neg_fees.validate().is_err());

        let zero = Transaction {
            quantity: Quantity::ZERO,
            ..base
        };
        assert!(matches!(
            zero.validate(),
            Err(BookingError::Validation {
                issue: ValidationIssue::ZeroQuantity,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_split() {
        let ok = Transaction::split(TransactionId(2), "API", date(2024, 2, 1), 2);
        assert!(ok.validate().is_ok());

        let bad = Transaction::split(TransactionId(3), "API", date(2024, 2, 1), 1);
        assert!(matches!(
            bad.validate(),
            Err(BookingError::Validation {
                issue: ValidationIssue::InvalidSplitMultiplier(_),
                ..
            })
        ));

        let priced = Transaction::split(TransactionId(4), "API", date(2024, 2, 1), 2)
            .with_fees(Money::from_major(1));
        assert!(priced.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_total() {
        let huge = Transaction::buy(
            TransactionId(6),
            "NABIL",
            date(2024, 1, 1),
            Quantity::new(2_000),
            Money::from_minor(i64::MAX / 1_000),
        );
        let err = huge.validate().unwrap_err();
        assert_eq!(
            err,
            BookingError::validation(Some(TransactionId(6)), ValidationIssue::Overflow)
        );
        assert_eq!(err.code(), "V001");

        let at_limit = Transaction::buy(
            TransactionId(7),
            "NABIL",
            date(2024, 1, 1),
            Quantity::new(1),
            Money::from_minor(i64::MAX - 1),
        );
        assert!(at_limit.validate().is_ok());
        assert!(at_limit.with_fees(Money::from_minor(2)).validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{"id": 5, "symbol": "nica", "kind": "bonus", "date": "2024-03-01", "quantity": 12}"#;
        let txn: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(txn.symbol, "NICA");
        assert_eq!(txn.price, Money::ZERO);
        assert_eq!(txn.fees, Money::ZERO);
        assert!(txn.notes.is_empty());
    }

    #[test]
    fn test_display() {
        let txn = Transaction::sell(
            TransactionId(9),
            "NABIL",
            date(2024, 5, 2),
            Quantity::new(20),
            Money::from_major(1_200),
        )
        .with_fees(Money::from_minor(12_345));
        assert_eq!(
            txn.to_string(),
            "#9 2024-05-02 SELL NABIL 20 @ 1,200.00 (fees 123.45)"
        );
    }
}
