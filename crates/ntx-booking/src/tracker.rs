//! Per-symbol FIFO lot queue.
//!
//! A [`LotTracker`] owns the open lots of exactly one symbol. Acquisitions
//! push a lot onto the tail; sells consume from the head, splitting the last
//! lot touched when the sell ends inside it. A sell is planned in full before
//! any lot is touched, so a rejected sell leaves the tracker unchanged.

use chrono::NaiveDate;
use ntx_core::{
    BookingError, Disposal, DividendIncome, IncomeSource, Lot, LotSource, Money, Percentage,
    Quantity, Symbol, Transaction, TransactionId, TransactionKind, ValidationIssue,
};
use serde::{Deserialize, Serialize};

/// What applying one transaction did to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A lot was added to the tail of the queue.
    Acquired(Lot),
    /// Lots were consumed by a sell.
    Disposed(Vec<Disposal>),
    /// All lots were rescaled.
    Split {
        /// Shares before the split.
        before: Quantity,
        /// Shares after the split.
        after: Quantity,
    },
    /// Dividend income was booked.
    Income(DividendIncome),
}

/// One step of a planned sell: consume `take` shares of the lot at `index`.
#[derive(Debug, Clone, Copy)]
struct Consumption {
    index: usize,
    take: Quantity,
}

/// Why [`LotTracker::rescale`] refused to rescale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescaleError {
    /// A rescaled share count does not fit in 64 bits.
    Overflow,
    /// Every lot would round down to zero shares; carries the holding.
    EliminatesHolding(Quantity),
}

fn overflow(id: TransactionId) -> BookingError {
    BookingError::validation(Some(id), ValidationIssue::Overflow)
}

/// FIFO lot queue and realized results for one symbol.
///
/// # Examples
///
/// ```
/// use ntx_booking::LotTracker;
/// use ntx_core::{Money, Percentage, Quantity, Transaction, TransactionId};
/// use chrono::NaiveDate;
///
/// let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
/// let mut tracker = LotTracker::new("NABIL");
/// let wht = Percentage::from_percent(5);
///
/// tracker.apply(&Transaction::buy(TransactionId(1), "NABIL", d(1, 1), Quantity::new(100), Money::from_major(10)), wht).unwrap();
/// tracker.apply(&Transaction::buy(TransactionId(2), "NABIL", d(2, 1), Quantity::new(50), Money::from_major(12)), wht).unwrap();
/// tracker.apply(&Transaction::sell(TransactionId(3), "NABIL", d(3, 1), Quantity::new(120), Money::from_major(15)), wht).unwrap();
///
/// assert_eq!(tracker.quantity(), Quantity::new(30));
/// assert_eq!(tracker.lots()[0].unit_cost(), Money::from_major(12));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotTracker {
    symbol: Symbol,
    lots: Vec<Lot>,
    disposals: Vec<Disposal>,
    dividends: Vec<DividendIncome>,
    /// Cost of every acquisition ever booked
    acquired_cost: Money,
    last_date: Option<NaiveDate>,
}

impl LotTracker {
    /// Create an empty tracker for `symbol`.
    pub fn new(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: symbol.into(),
            lots: Vec::new(),
            disposals: Vec::new(),
            dividends: Vec::new(),
            acquired_cost: Money::ZERO,
            last_date: None,
        }
    }

    /// The tracked symbol.
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Open lots, oldest first.
    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    /// Every disposal booked so far, in booking order.
    pub fn disposals(&self) -> &[Disposal] {
        &self.disposals
    }

    /// Every dividend booked so far, in booking order.
    pub fn dividends(&self) -> &[DividendIncome] {
        &self.dividends
    }

    /// Date of the last transaction applied.
    pub const fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    /// Total cost of every acquisition booked.
    pub const fn acquired_cost(&self) -> Money {
        self.acquired_cost
    }

    /// Shares held.
    pub fn quantity(&self) -> Quantity {
        self.lots.iter().map(|lot| lot.quantity).sum()
    }

    /// Cost of the shares held.
    pub fn total_cost(&self) -> Money {
        self.lots.iter().map(|lot| lot.cost).sum()
    }

    /// Weighted-average cost per share held (zero when flat).
    pub fn average_cost(&self) -> Money {
        self.total_cost().per(self.quantity())
    }

    /// Sum of realized gains over all disposals.
    pub fn realized(&self) -> Money {
        self.disposals.iter().map(|d| d.gain).sum()
    }

    /// Sum of net dividend income.
    pub fn dividend_income(&self) -> Money {
        self.dividends.iter().map(|d| d.net).sum()
    }

    /// Apply one ledger transaction.
    ///
    /// `withholding` is the tax withheld from dividend transactions.
    pub fn apply(
        &mut self,
        txn: &Transaction,
        withholding: Percentage,
    ) -> Result<Applied, BookingError> {
        txn.validate()?;
        if txn.symbol != self.symbol {
            return Err(BookingError::validation(
                Some(txn.id),
                ValidationIssue::SymbolMismatch {
                    expected: self.symbol.clone(),
                    got: txn.symbol.clone(),
                },
            ));
        }
        if let Some(last) = self.last_date {
            if txn.date < last {
                return Err(BookingError::Sequencing {
                    symbol: self.symbol.clone(),
                    id: txn.id,
                    date: txn.date,
                    last,
                });
            }
        }

        let applied = match txn.kind {
            TransactionKind::Buy | TransactionKind::Bonus | TransactionKind::Rights => {
                let cost = txn.checked_total().ok_or_else(|| overflow(txn.id))?;
                let lot = Lot::new(LotSource::Transaction(txn.id), txn.date, txn.quantity, cost);
                self.acquire(lot.clone()).map_err(|_| overflow(txn.id))?;
                Applied::Acquired(lot)
            }
            TransactionKind::Sell => Applied::Disposed(self.sell(txn)?),
            TransactionKind::Split => {
                let before = self.quantity();
                self.rescale(txn.quantity.value(), 1).map_err(|err| match err {
                    RescaleError::Overflow => overflow(txn.id),
                    RescaleError::EliminatesHolding(_) => BookingError::validation(
                        Some(txn.id),
                        ValidationIssue::InvalidSplitMultiplier(txn.quantity),
                    ),
                })?;
                Applied::Split {
                    before,
                    after: self.quantity(),
                }
            }
            TransactionKind::Dividend => {
                let income = DividendIncome::compute(
                    IncomeSource::Transaction(txn.id),
                    self.symbol.clone(),
                    txn.date,
                    txn.date,
                    txn.quantity,
                    txn.price,
                    withholding,
                );
                self.book_dividend(income.clone());
                Applied::Income(income)
            }
        };

        self.last_date = Some(txn.date);
        Ok(applied)
    }

    /// Push a lot onto the tail of the queue.
    ///
    /// Lots must arrive in acquisition-date order; the replay guarantees it.
    /// Fails with [`ValidationIssue::Overflow`] if the symbol's total cost
    /// would leave the representable range; the tracker is then unchanged.
    pub fn acquire(&mut self, lot: Lot) -> Result<(), BookingError> {
        debug_assert!(
            self.lots.last().map_or(true, |last| last.acquired <= lot.acquired),
            "lots must be pushed in acquisition order"
        );
        if lot.is_empty() {
            return Ok(());
        }
        let acquired_cost = self
            .acquired_cost
            .checked_add(lot.cost)
            .ok_or_else(|| BookingError::validation(None, ValidationIssue::Overflow))?;
        if self.quantity().value().checked_add(lot.quantity.value()).is_none() {
            return Err(BookingError::validation(None, ValidationIssue::Overflow));
        }
        self.acquired_cost = acquired_cost;
        self.lots.push(lot);
        Ok(())
    }

    /// Record dividend income.
    pub fn book_dividend(&mut self, income: DividendIncome) {
        self.dividends.push(income);
    }

    /// Rescale every open lot by `numerator / denominator`.
    ///
    /// Quantities round down and each lot keeps its total cost. A lot that
    /// rounds to zero shares is dropped and its cost moves onto the oldest
    /// surviving lot, so cost is conserved. A rescale that would leave no
    /// lot at all, or a share count out of range, is refused and the
    /// tracker is unchanged.
    pub fn rescale(&mut self, numerator: i64, denominator: i64) -> Result<(), RescaleError> {
        let mut scaled = Vec::with_capacity(self.lots.len());
        let mut total: i64 = 0;
        for lot in &self.lots {
            let quantity = i128::from(lot.quantity.value()) * i128::from(numerator)
                / i128::from(denominator.max(1));
            let quantity = i64::try_from(quantity).map_err(|_| RescaleError::Overflow)?;
            total = total.checked_add(quantity).ok_or(RescaleError::Overflow)?;
            scaled.push(quantity);
        }
        if total <= 0 && !self.lots.is_empty() {
            return Err(RescaleError::EliminatesHolding(self.quantity()));
        }

        let mut orphaned = Money::ZERO;
        let mut kept: Vec<Lot> = Vec::with_capacity(self.lots.len());
        for (mut lot, quantity) in self.lots.drain(..).zip(scaled) {
            lot.quantity = Quantity::new(quantity);
            if lot.is_empty() {
                orphaned += lot.cost;
            } else {
                kept.push(lot);
            }
        }
        if let Some(first) = kept.first_mut() {
            first.cost += orphaned;
        }
        self.lots = kept;
        Ok(())
    }

    /// Plan the FIFO consumption of `quantity` shares.
    fn plan(&self, txn: &Transaction) -> Result<Vec<Consumption>, BookingError> {
        let available = self.quantity();
        if available < txn.quantity {
            return Err(BookingError::InsufficientHoldings {
                symbol: self.symbol.clone(),
                id: txn.id,
                requested: txn.quantity,
                available,
            });
        }

        let mut remaining = txn.quantity;
        let mut plan = Vec::new();
        for (index, lot) in self.lots.iter().enumerate() {
            if remaining.is_zero() {
                break;
            }
            let take = remaining.min(lot.quantity);
            plan.push(Consumption { index, take });
            remaining -= take;
        }
        Ok(plan)
    }

    /// FIFO sell: consume from the oldest lots.
    ///
    /// Every disposal is computed before any lot is replaced, so an
    /// overflow leaves the tracker unchanged.
    fn sell(&mut self, txn: &Transaction) -> Result<Vec<Disposal>, BookingError> {
        let plan = self.plan(txn)?;

        let mut disposals = Vec::with_capacity(plan.len());
        let mut remainders = Vec::with_capacity(plan.len());
        let mut fees_left = txn.fees;
        let last_step = plan.len().saturating_sub(1);

        for (step, consumption) in plan.iter().enumerate() {
            let lot = &self.lots[consumption.index];
            let (taken, rest) = lot.split(consumption.take);

            // The final step absorbs rounding so fees add up exactly.
            let fees = if step == last_step {
                fees_left
            } else {
                txn.fees.pro_rata(consumption.take, txn.quantity)
            };
            fees_left -= fees;

            let proceeds = txn
                .price
                .checked_times(consumption.take)
                .and_then(|gross| gross.checked_sub(fees))
                .ok_or_else(|| overflow(txn.id))?;
            let gain = proceeds
                .checked_sub(taken.cost)
                .ok_or_else(|| overflow(txn.id))?;
            disposals.push(Disposal {
                transaction: txn.id,
                symbol: self.symbol.clone(),
                lot: taken.source,
                quantity: taken.quantity,
                acquired: taken.acquired,
                disposed: txn.date,
                cost: taken.cost,
                proceeds,
                fees,
                gain,
            });
            remainders.push((consumption.index, rest));
        }

        for (index, rest) in remainders {
            self.lots[index] = rest;
        }
        self.lots.retain(|lot| !lot.is_empty());
        self.disposals.extend(disposals.iter().cloned());
        Ok(disposals)
    }

    /// Check the structural invariants of the queue.
    ///
    /// Returns one message per violation; empty when healthy.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for lot in &self.lots {
            if !lot.quantity.is_positive() {
                problems.push(format!(
                    "{}: lot {} has non-positive quantity {}",
                    self.symbol, lot.source, lot.quantity
                ));
            }
            if lot.cost.is_negative() {
                problems.push(format!(
                    "{}: lot {} has negative cost {}",
                    self.symbol, lot.source, lot.cost
                ));
            }
        }

        if self
            .lots
            .windows(2)
            .any(|pair| pair[0].acquired > pair[1].acquired)
        {
            problems.push(format!(
                "{}: lots are not ordered by acquisition date",
                self.symbol
            ));
        }

        let removed: Money = self.disposals.iter().map(|d| d.cost).sum();
        let accounted = self.total_cost() + removed;
        if accounted != self.acquired_cost {
            problems.push(format!(
                "{}: cost not conserved: open {} + disposed {} != acquired {}",
                self.symbol,
                self.total_cost(),
                removed,
                self.acquired_cost
            ));
        }

        problems
    }
}
