//! Replay results for one symbol.

use chrono::NaiveDate;
use ntx_core::{
    ActionId, ActionStatus, CorporateAction, Disposal, DividendIncome, Lot, Money, Quantity,
    Symbol,
};
use serde::{Deserialize, Serialize};

use crate::LotTracker;

/// Derived position in one symbol.
///
/// Always rebuilt from the transaction log; never edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Security symbol
    pub symbol: Symbol,
    /// Shares held (sum of lot quantities)
    pub quantity: Quantity,
    /// Cost of the shares held
    pub total_cost: Money,
    /// Weighted-average cost per share
    pub average_cost: Money,
    /// Cumulative realized gain
    pub realized: Money,
    /// Cumulative net dividend income
    pub dividend_income: Money,
    /// Open lots, oldest first
    pub lots: Vec<Lot>,
}

impl Holding {
    /// Snapshot a tracker.
    #[must_use]
    pub fn from_tracker(tracker: &LotTracker) -> Self {
        Self {
            symbol: tracker.symbol().clone(),
            quantity: tracker.quantity(),
            total_cost: tracker.total_cost(),
            average_cost: tracker.average_cost(),
            realized: tracker.realized(),
            dividend_income: tracker.dividend_income(),
            lots: tracker.lots().to_vec(),
        }
    }

    /// Check if no shares are held.
    #[must_use]
    pub const fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// State of one corporate action after a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Action id
    pub id: ActionId,
    /// Security symbol
    pub symbol: Symbol,
    /// Action type name
    pub kind: String,
    /// Human-readable summary
    pub description: String,
    /// Record date
    pub record_date: NaiveDate,
    /// Execution date
    pub execution_date: NaiveDate,
    /// Lifecycle state as of the replay date
    pub status: ActionStatus,
    /// Shares held at the record date, once reached
    pub record_quantity: Option<Quantity>,
    /// Shares or cash granted, once executed
    pub entitlement: Option<Entitlement>,
}

impl ActionOutcome {
    pub(crate) fn new(action: &CorporateAction, status: ActionStatus) -> Self {
        Self {
            id: action.id,
            symbol: action.symbol.clone(),
            kind: action.kind.name().to_string(),
            description: action.description(),
            record_date: action.record_date,
            execution_date: action.execution_date,
            status,
            record_quantity: None,
            entitlement: None,
        }
    }
}

/// What an executed action granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entitlement {
    /// New shares (bonus or rights).
    Shares {
        /// Shares added
        quantity: Quantity,
        /// Cost of the new shares
        cost: Money,
    },
    /// Holding rescaled.
    Split {
        /// Shares before
        before: Quantity,
        /// Shares after
        after: Quantity,
    },
    /// Net cash income.
    Cash {
        /// Net of withholding
        net: Money,
    },
}

/// Everything a replay of one symbol produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolBook {
    /// Final lot state and realized results
    pub tracker: LotTracker,
    /// Corporate actions in execution order
    pub actions: Vec<ActionOutcome>,
    /// Replay cutoff
    pub as_of: NaiveDate,
}

impl SymbolBook {
    /// Security symbol.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        self.tracker.symbol()
    }

    /// Derived holding.
    #[must_use]
    pub fn holding(&self) -> Holding {
        Holding::from_tracker(&self.tracker)
    }

    /// Disposals in booking order.
    #[must_use]
    pub fn disposals(&self) -> &[Disposal] {
        self.tracker.disposals()
    }

    /// Dividend income in booking order.
    #[must_use]
    pub fn dividends(&self) -> &[DividendIncome] {
        self.tracker.dividends()
    }

    /// Check the lot invariants.
    ///
    /// The holding is derived from the lots, so the quantity check compares
    /// the published holding with a fresh sum.
    #[must_use]
    pub fn check_invariants(&self, published: Option<&Holding>) -> Vec<String> {
        let mut problems = self.tracker.check_invariants();
        if let Some(holding) = published {
            let lots: Quantity = self.tracker.lots().iter().map(|lot| lot.quantity).sum();
            if holding.quantity != lots {
                problems.push(format!(
                    "{}: holding quantity {} does not match lots {}",
                    self.symbol(),
                    holding.quantity,
                    lots
                ));
            }
        }
        problems
    }
}
