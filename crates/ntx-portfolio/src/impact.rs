//! Projected effect of a trade that has not been recorded.

use ntx_booking::Holding;
use ntx_core::{Disposal, Money, Quantity, RuleReport, Symbol, Transaction};
use serde::Serialize;

/// How one prospective transaction would change a holding.
///
/// Built by [`crate::Engine::preview_transaction`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionImpact {
    /// Security symbol
    pub symbol: Symbol,
    /// The transaction previewed
    pub transaction: Transaction,
    /// Holding before the trade (none if never traded)
    pub current: Option<Holding>,
    /// Holding after the trade
    pub projected: Holding,
    /// Price times quantity
    pub amount: Money,
    /// Lots a sell would consume, oldest first
    pub disposals: Vec<Disposal>,
    /// Realized gain of those disposals
    pub realized: Money,
    /// Capital gains tax on that gain alone
    pub estimated_tax: Money,
    /// Exchange rule check
    pub rules: RuleReport,
}

impl TransactionImpact {
    pub(crate) fn new(
        transaction: Transaction,
        current: Option<Holding>,
        projected: Holding,
        disposals: Vec<Disposal>,
        estimated_tax: Money,
        rules: RuleReport,
    ) -> Self {
        Self {
            symbol: transaction.symbol.clone(),
            amount: transaction.gross_value(),
            realized: disposals.iter().map(|d| d.gain).sum(),
            transaction,
            current,
            projected,
            disposals,
            estimated_tax,
            rules,
        }
    }

    /// Shares held before the trade.
    #[must_use]
    pub fn quantity_before(&self) -> Quantity {
        self.current.as_ref().map_or(Quantity::ZERO, |h| h.quantity)
    }

    /// Change in the share count.
    #[must_use]
    pub fn quantity_change(&self) -> Quantity {
        self.projected.quantity - self.quantity_before()
    }

    /// Change in the weighted-average cost per share.
    #[must_use]
    pub fn average_cost_change(&self) -> Money {
        let before = self.current.as_ref().map_or(Money::ZERO, |h| h.average_cost);
        self.projected.average_cost - before
    }
}
