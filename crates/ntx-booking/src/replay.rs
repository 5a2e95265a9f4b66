//! Chronological replay of one symbol.
//!
//! Transactions and corporate-action events are merged into a single
//! timeline, sorted by date and then by [`EventPriority`]. Transactions keep
//! their log order, so on any one day trades settle first, then record-date
//! snapshots are taken, then executions are paid out.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use ntx_core::{
    ActionId, BookingError, ConflictReason, CorporateAction, Money, Percentage, Quantity, Symbol,
    Transaction,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::book::{ActionOutcome, Entitlement, SymbolBook};
use crate::corporate::{ActionEffect, CorporateActionProcessor};
use crate::LotTracker;

/// Default tax withheld at source on cash dividends.
pub const DEFAULT_DIVIDEND_WITHHOLDING: Percentage = Percentage::from_percent(5);

/// Same-day ordering of replay events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventPriority {
    /// Trades settle first
    Transaction = 0,
    /// Entitlement snapshots see the day's trades
    RecordDate = 1,
    /// Payouts last
    Execution = 2,
}

/// One step of the replay timeline.
#[derive(Debug, Clone, Copy)]
pub enum ReplayEvent<'a> {
    /// A ledger transaction.
    Transaction(&'a Transaction),
    /// Snapshot the holding for a corporate action.
    RecordDate(&'a CorporateAction),
    /// Execute a corporate action.
    Execution(&'a CorporateAction),
}

impl ReplayEvent<'_> {
    /// Date the event happens.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Transaction(txn) => txn.date,
            Self::RecordDate(action) => action.record_date,
            Self::Execution(action) => action.execution_date,
        }
    }

    /// Same-day ordering key.
    #[must_use]
    pub const fn priority(&self) -> EventPriority {
        match self {
            Self::Transaction(_) => EventPriority::Transaction,
            Self::RecordDate(_) => EventPriority::RecordDate,
            Self::Execution(_) => EventPriority::Execution,
        }
    }
}

/// Sort events by date, then by priority.
///
/// This is a stable sort that preserves input order for events with the
/// same date and priority.
pub fn sort_events(events: &mut [ReplayEvent<'_>]) {
    events.sort_by(|a, b| {
        a.date()
            .cmp(&b.date())
            .then_with(|| a.priority().cmp(&b.priority()))
    });
}

/// Settings for one replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayOptions {
    /// Corporate-action events after this date are not applied
    pub as_of: NaiveDate,
    /// Tax withheld from cash dividends
    pub dividend_withholding: Percentage,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            as_of: NaiveDate::MAX,
            dividend_withholding: DEFAULT_DIVIDEND_WITHHOLDING,
        }
    }
}

impl ReplayOptions {
    /// Set the cutoff date.
    #[must_use]
    pub const fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    /// Set the dividend withholding rate.
    #[must_use]
    pub const fn with_withholding(mut self, rate: Percentage) -> Self {
        self.dividend_withholding = rate;
        self
    }
}

/// Build the sorted timeline for one symbol.
///
/// Fails if transactions are not in date order or an action id repeats.
/// Transactions are all included; corporate-action events are cut off at
/// `as_of`.
pub fn timeline<'a>(
    symbol: &Symbol,
    transactions: &'a [Transaction],
    actions: &'a [CorporateAction],
    as_of: NaiveDate,
) -> Result<Vec<ReplayEvent<'a>>, BookingError> {
    if let Some(pair) = transactions.windows(2).find(|pair| pair[1].date < pair[0].date) {
        return Err(BookingError::Sequencing {
            symbol: symbol.clone(),
            id: pair[1].id,
            date: pair[1].date,
            last: pair[0].date,
        });
    }

    let mut seen = HashSet::with_capacity(actions.len());
    for action in actions {
        if !seen.insert(action.id) {
            return Err(BookingError::conflict(
                action.symbol.clone(),
                action.id,
                ConflictReason::DuplicateAction,
            ));
        }
    }

    let mut ordered: Vec<&CorporateAction> = actions.iter().collect();
    ordered.sort_by_key(|action| action.id);

    let mut events: Vec<ReplayEvent<'a>> = transactions.iter().map(ReplayEvent::Transaction).collect();
    for action in ordered {
        if action.record_date <= as_of {
            events.push(ReplayEvent::RecordDate(action));
        }
        if action.execution_date <= as_of {
            events.push(ReplayEvent::Execution(action));
        }
    }
    sort_events(&mut events);
    Ok(events)
}

/// Replay one symbol from empty state.
///
/// A pure function of its inputs: the same log, actions and options always
/// produce the same book. The first failing event aborts the replay.
///
/// # Examples
///
/// ```
/// use ntx_booking::{replay_symbol, ReplayOptions};
/// use ntx_core::{ActionId, ActionKind, CorporateAction, Money, Quantity, Ratio, Symbol, Transaction, TransactionId};
/// use chrono::NaiveDate;
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
/// let txns = vec![Transaction::buy(TransactionId(1), "NABIL", d(1, 1), Quantity::new(100), Money::from_major(10))];
/// let actions = vec![CorporateAction::new(ActionId(1), "NABIL", ActionKind::Bonus { ratio: Ratio::new(1, 10) }, d(3, 1), d(3, 10))];
///
/// let book = replay_symbol(&Symbol::new("NABIL"), &txns, &actions, &ReplayOptions::default()).unwrap();
/// assert_eq!(book.holding().quantity, Quantity::new(110));
/// ```
pub fn replay_symbol(
    symbol: &Symbol,
    transactions: &[Transaction],
    actions: &[CorporateAction],
    options: &ReplayOptions,
) -> Result<SymbolBook, BookingError> {
    for action in actions {
        action.validate()?;
    }
    let events = timeline(symbol, transactions, actions, options.as_of)?;

    let mut tracker = LotTracker::new(symbol.clone());
    let mut processor = CorporateActionProcessor::new(options.dividend_withholding);
    let mut outcomes: HashMap<ActionId, ActionOutcome> = actions
        .iter()
        .map(|action| (action.id, ActionOutcome::new(action, action.status_on(options.as_of))))
        .collect();

    for event in &events {
        trace!(symbol = %symbol, date = %event.date(), priority = ?event.priority(), "replay event");
        match *event {
            ReplayEvent::Transaction(txn) => {
                tracker.apply(txn, options.dividend_withholding)?;
            }
            ReplayEvent::RecordDate(action) => {
                let held = processor.record(&tracker, action)?;
                if let Some(outcome) = outcomes.get_mut(&action.id) {
                    outcome.record_quantity = Some(held);
                }
            }
            ReplayEvent::Execution(action) => {
                let effect = processor.execute(&mut tracker, action)?;
                if let Some(outcome) = outcomes.get_mut(&action.id) {
                    let (record_quantity, entitlement) = describe(effect);
                    if outcome.record_quantity.is_none() {
                        outcome.record_quantity = record_quantity;
                    }
                    outcome.entitlement = Some(entitlement);
                }
            }
        }
    }

    let mut actions: Vec<ActionOutcome> = outcomes.into_values().collect();
    actions.sort_by(|a, b| {
        a.execution_date
            .cmp(&b.execution_date)
            .then_with(|| a.id.cmp(&b.id))
    });

    debug!(
        symbol = %symbol,
        transactions = transactions.len(),
        actions = actions.len(),
        lots = tracker.lots().len(),
        quantity = %tracker.quantity(),
        "replayed symbol"
    );

    Ok(SymbolBook {
        tracker,
        actions,
        as_of: options.as_of,
    })
}

fn describe(effect: ActionEffect) -> (Option<Quantity>, Entitlement) {
    match effect {
        ActionEffect::Shares {
            record_quantity,
            lot,
        } => {
            let entitlement = lot.map_or(
                Entitlement::Shares {
                    quantity: Quantity::ZERO,
                    cost: Money::ZERO,
                },
                |lot| Entitlement::Shares {
                    quantity: lot.quantity,
                    cost: lot.cost,
                },
            );
            (Some(record_quantity), entitlement)
        }
        ActionEffect::Split { before, after } => (None, Entitlement::Split { before, after }),
        ActionEffect::Income(income) => (
            Some(income.quantity),
            Entitlement::Cash { net: income.net },
        ),
    }
}
