//! Core types for ntx
//!
//! This crate provides the fundamental types used throughout the ntx
//! cost-basis engine:
//!
//! - [`Money`], [`Percentage`], [`Quantity`] - exact fixed-point numbers
//! - [`Symbol`] - an interned ticker
//! - [`Transaction`] - one immutable ledger entry
//! - [`CorporateAction`] - bonus, rights, split and dividend events
//! - [`Lot`] - the open remainder of one acquisition
//! - [`Disposal`], [`DividendIncome`] - realized results
//! - [`TradingRules`] - exchange lot, fee and calendar conventions
//! - [`BookingError`] - the error taxonomy
//!
//! # Example
//!
//! ```
//! use ntx_core::{Lot, LotSource, Money, Quantity, Transaction, TransactionId};
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
//! let buy = Transaction::buy(TransactionId(1), "NABIL", date, Quantity::new(100), "520.50".parse().unwrap())
//!     .with_fees(Money::from_major(150));
//! buy.validate().unwrap();
//!
//! let lot = Lot::new(LotSource::Transaction(buy.id), buy.date, buy.quantity, buy.gross_value() + buy.fees);
//! assert_eq!(lot.cost, Money::from_major(52_200));
//! assert_eq!(lot.unit_cost(), Money::from_major(522));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod error;
pub mod intern;
pub mod lot;
pub mod money;
pub mod realized;
pub mod rules;
pub mod transaction;

pub use action::{
    parse_ratio, ActionFilter, ActionId, ActionKind, ActionStatus, CorporateAction, Ratio,
    RatioError,
};
pub use error::{BookingError, ConflictReason, ValidationIssue};
pub use intern::{Symbol, SymbolInterner};
pub use lot::{Lot, LotSource};
pub use money::{Money, ParseAmountError, Percentage, Quantity};
pub use realized::{Disposal, DividendIncome, IncomeSource};
pub use rules::{RuleLevel, RuleReport, RuleViolation, TradingRules};
pub use transaction::{Transaction, TransactionId, TransactionKind};

// Re-export commonly used external types
pub use chrono::NaiveDate;
