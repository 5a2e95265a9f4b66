//! Error taxonomy shared by the booking and portfolio crates.
//!
//! # Error Codes
//!
//! | Code | Description |
//! |------|-------------|
//! | V001 | Invalid transaction or action field |
//! | S001 | Event dated before the last processed date |
//! | H001 | Sell exceeds open lot quantity |
//! | C001 | Corporate action conflict |

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

use crate::{ActionId, Money, Quantity, Ratio, RuleViolation, Symbol, TransactionId};

/// What was wrong with a rejected record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Quantity below zero.
    NegativeQuantity(Quantity),
    /// Quantity of zero where shares must move.
    ZeroQuantity,
    /// Price below zero.
    NegativePrice(Money),
    /// Fees below zero.
    NegativeFees(Money),
    /// Split multiplier below two.
    InvalidSplitMultiplier(Quantity),
    /// Split carried a price or fees.
    PricedSplit,
    /// Transaction kind text not recognised.
    UnknownKind(String),
    /// Symbol was blank.
    EmptySymbol,
    /// Record belongs to a different symbol than the book it was fed to.
    SymbolMismatch {
        /// Symbol of the book.
        expected: Symbol,
        /// Symbol on the record.
        got: Symbol,
    },
    /// An amount does not fit in 64 bits of paisa.
    Overflow,
    /// The transaction id is already in use in the portfolio.
    DuplicateTransaction(TransactionId),
    /// A trade breaks an exchange rule under strict checking.
    TradingRule(RuleViolation),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeQuantity(q) => write!(f, "negative quantity {q}"),
            Self::ZeroQuantity => write!(f, "quantity must be positive"),
            Self::NegativePrice(p) => write!(f, "negative price {p}"),
            Self::NegativeFees(p) => write!(f, "negative fees {p}"),
            Self::InvalidSplitMultiplier(q) => {
                write!(f, "split multiplier must be at least 2, got {q}")
            }
            Self::PricedSplit => write!(f, "split must not carry a price or fees"),
            Self::UnknownKind(kind) => write!(f, "unknown transaction kind {kind:?}"),
            Self::EmptySymbol => write!(f, "symbol is empty"),
            Self::SymbolMismatch { expected, got } => {
                write!(f, "symbol mismatch: expected {expected}, got {got}")
            }
            Self::Overflow => write!(f, "amount out of range"),
            Self::DuplicateTransaction(id) => write!(f, "duplicate transaction id {id}"),
            Self::TradingRule(violation) => write!(f, "trading rule: {violation}"),
        }
    }
}

/// Why a corporate action could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The action has already been processed.
    AlreadyProcessed,
    /// The same action id appeared twice.
    DuplicateAction,
    /// The ratio text could not be parsed.
    UnparseableRatio(String),
    /// The ratio has a zero or negative term.
    InvalidRatio(Ratio),
    /// A consolidation would leave no whole share of the holding.
    EliminatesHolding(Quantity),
    /// Dates are out of order (announcement, record, execution).
    InvalidDates,
    /// A dividend or rights price was negative.
    NegativeAmount(Money),
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyProcessed => write!(f, "already processed"),
            Self::DuplicateAction => write!(f, "duplicate action id"),
            Self::UnparseableRatio(ratio) => write!(f, "unparseable ratio {ratio:?}"),
            Self::InvalidRatio(ratio) => write!(f, "ratio {ratio} must have positive terms"),
            Self::EliminatesHolding(held) => {
                write!(f, "consolidation leaves no whole share of {held}")
            }
            Self::InvalidDates => {
                write!(f, "dates must satisfy announcement <= record <= execution")
            }
            Self::NegativeAmount(m) => write!(f, "negative amount {m}"),
        }
    }
}

/// Errors raised while booking transactions and corporate actions.
///
/// Every variant is returned to the caller. Within one symbol the first
/// error stops the replay; other symbols are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// A record failed field validation.
    #[error("invalid record{}: {issue}", .id.as_ref().map(|id| format!(" {id}")).unwrap_or_default())]
    Validation {
        /// The offending transaction, when known.
        id: Option<TransactionId>,
        /// What was wrong.
        issue: ValidationIssue,
    },

    /// A transaction is dated before the last processed date of its symbol.
    #[error("{symbol}: transaction {id} dated {date} precedes last processed date {last}")]
    Sequencing {
        /// The symbol being replayed.
        symbol: Symbol,
        /// The out-of-order transaction.
        id: TransactionId,
        /// Its date.
        date: NaiveDate,
        /// The last date already processed.
        last: NaiveDate,
    },

    /// A sell exceeds the open lot quantity.
    #[error("{symbol}: insufficient holdings for {id}: requested {requested}, available {available}")]
    InsufficientHoldings {
        /// The symbol being sold.
        symbol: Symbol,
        /// The rejected transaction.
        id: TransactionId,
        /// Shares requested.
        requested: Quantity,
        /// Shares held.
        available: Quantity,
    },

    /// A corporate action could not be applied.
    #[error("{symbol}: corporate action {id}: {reason}")]
    CorporateActionConflict {
        /// The symbol of the action.
        symbol: Symbol,
        /// The action.
        id: ActionId,
        /// Why it was rejected.
        reason: ConflictReason,
    },
}

impl BookingError {
    /// Shorthand for a validation error.
    pub const fn validation(id: Option<TransactionId>, issue: ValidationIssue) -> Self {
        Self::Validation { id, issue }
    }

    /// Shorthand for a corporate action conflict.
    pub const fn conflict(symbol: Symbol, id: ActionId, reason: ConflictReason) -> Self {
        Self::CorporateActionConflict { symbol, id, reason }
    }

    /// Stable short code for adapters.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "V001",
            Self::Sequencing { .. } => "S001",
            Self::InsufficientHoldings { .. } => "H001",
            Self::CorporateActionConflict { .. } => "C001",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BookingError::InsufficientHoldings {
            symbol: Symbol::new("NABIL"),
            id: TransactionId(7),
            requested: Quantity::new(150),
            available: Quantity::new(100),
        };
        assert_eq!(
            err.to_string(),
            "NABIL: insufficient holdings for #7: requested 150, available 100"
        );
        assert_eq!(err.code(), "H001");
    }

    #[test]
    fn test_validation_display_without_id() {
        let err = BookingError::validation(None, ValidationIssue::UnknownKind("swap".into()));
        assert_eq!(err.to_string(), "invalid record: unknown transaction kind \"swap\"");
    }

    #[test]
    fn test_conflict_display() {
        let err = BookingError::conflict(
            Symbol::new("api"),
            ActionId(3),
            ConflictReason::UnparseableRatio("1-10".into()),
        );
        assert_eq!(
            err.to_string(),
            "API: corporate action CA-3: unparseable ratio \"1-10\""
        );
        assert_eq!(err.code(), "C001");
    }

    #[test]
    fn test_new_issue_display() {
        let err = BookingError::validation(Some(TransactionId(4)), ValidationIssue::Overflow);
        assert_eq!(err.to_string(), "invalid record #4: amount out of range");
        assert_eq!(err.code(), "V001");

        let err = BookingError::validation(
            Some(TransactionId(2)),
            ValidationIssue::DuplicateTransaction(TransactionId(2)),
        );
        assert_eq!(err.to_string(), "invalid record #2: duplicate transaction id #2");

        let err = BookingError::conflict(
            Symbol::new("NABIL"),
            ActionId(1),
            ConflictReason::InvalidRatio(Ratio::new(1, 0)),
        );
        assert_eq!(
            err.to_string(),
            "NABIL: corporate action CA-1: ratio 1:0 must have positive terms"
        );
    }
}
