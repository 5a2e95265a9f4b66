//! The portfolio engine.
//!
//! The engine owns the append-only transaction log of each portfolio and a
//! registry of corporate actions shared by all portfolios. Every change
//! replays the affected symbols from empty state and publishes the result
//! as a new snapshot:
//!
//! - one writer per portfolio, serialised by a `parking_lot::Mutex`
//! - readers clone the last published snapshot under a short
//!   `parking_lot::RwLock` read guard and never see a half-done replay
//! - a failed replay publishes nothing and leaves the log untouched

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use ntx_booking::{
    preview, replay_symbol, ActionOutcome, Holding, Preview, ReplayOptions, SymbolBook,
};
use ntx_core::{
    ActionFilter, ActionStatus, BookingError, ConflictReason, CorporateAction, Disposal,
    DividendIncome, Money, RuleLevel, RuleReport, Symbol, SymbolInterner, Transaction,
    TransactionId, ValidationIssue,
};
use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{summarize, PortfolioSummary, PriceLookup};
use crate::config::{EngineConfig, Period};
use crate::impact::TransactionImpact;
use crate::tax::{TaxEstimator, TaxReport};

/// Identifier of a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioId(String);

impl PortfolioId {
    /// Create an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortfolioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortfolioId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Supplies a portfolio's transactions, in date order per symbol.
pub trait TransactionSource {
    /// Symbols the portfolio has transactions for.
    fn symbols(&self, portfolio: &PortfolioId) -> Vec<Symbol>;

    /// Transactions of one symbol, non-decreasing in date.
    fn transactions(&self, portfolio: &PortfolioId, symbol: &Symbol) -> Vec<Transaction>;
}

/// Supplies announced corporate actions.
pub trait CorporateActionSource {
    /// Actions for one symbol.
    fn corporate_actions(&self, symbol: &Symbol) -> Vec<CorporateAction>;
}

/// Which disposals to return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisposalFilter {
    /// Only this symbol
    pub symbol: Option<Symbol>,
    /// Only disposals dated within this period
    pub period: Option<Period>,
}

impl DisposalFilter {
    /// Check if a disposal passes the filter.
    #[must_use]
    pub fn matches(&self, disposal: &Disposal) -> bool {
        self.symbol.as_ref().map_or(true, |s| s == &disposal.symbol)
            && self.period.map_or(true, |p| p.contains(disposal.disposed))
    }
}

/// Progress of a batch import, reported once per symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportProgress {
    /// Symbol just finished
    pub symbol: Symbol,
    /// Transactions of the batch processed so far
    pub processed: usize,
    /// Transactions in the batch
    pub total: usize,
}

/// A symbol rejected by a batch import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    /// Rejected symbol
    pub symbol: Symbol,
    /// Stable error code
    pub code: &'static str,
    /// Error message
    pub message: String,
    /// The error
    #[serde(skip)]
    pub error: BookingError,
}

impl ImportFailure {
    fn new(symbol: Symbol, error: BookingError) -> Self {
        Self {
            symbol,
            code: error.code(),
            message: error.to_string(),
            error,
        }
    }
}

/// Outcome of a batch import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Transactions appended to the log
    pub imported: usize,
    /// Symbols published
    pub published: Vec<Symbol>,
    /// Symbols rejected, with their first error
    pub failed: Vec<ImportFailure>,
    /// Symbols not attempted because the caller cancelled
    pub skipped: Vec<Symbol>,
}

impl ImportReport {
    /// Check if every symbol was published.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Published state of one portfolio.
#[derive(Debug, Default)]
struct Snapshot {
    books: BTreeMap<Symbol, Arc<SymbolBook>>,
    holdings: BTreeMap<Symbol, Holding>,
}

impl Snapshot {
    fn with_books(&self, books: impl IntoIterator<Item = SymbolBook>) -> Self {
        let mut next = Self {
            books: self.books.clone(),
            holdings: self.holdings.clone(),
        };
        for book in books {
            let symbol = book.symbol().clone();
            next.holdings.insert(symbol.clone(), book.holding());
            next.books.insert(symbol, Arc::new(book));
        }
        next
    }
}

#[derive(Debug, Default)]
struct Portfolio {
    /// Transaction log, per symbol; only touched with this lock held
    log: Mutex<HashMap<Symbol, Vec<Transaction>>>,
    published: RwLock<Arc<Snapshot>>,
}

impl Portfolio {
    fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.published.read())
    }

    fn publish(&self, books: Vec<SymbolBook>) {
        let mut published = self.published.write();
        let next = published.with_books(books);
        *published = Arc::new(next);
    }
}

/// Cost-basis engine over any number of portfolios.
///
/// # Examples
///
/// ```
/// use ntx_core::{Money, Quantity, Transaction, TransactionId};
/// use ntx_portfolio::{Engine, EngineConfig, PortfolioId};
/// use chrono::NaiveDate;
///
/// let engine = Engine::new(EngineConfig::default());
/// let me = PortfolioId::new("me");
/// let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
///
/// engine
///     .record_transaction(&me, Transaction::buy(TransactionId(1), "nabil", d, Quantity::new(10), Money::from_major(500)))
///     .unwrap();
///
/// let holdings = engine.holdings(&me);
/// assert_eq!(holdings[0].symbol.as_str(), "NABIL");
/// assert_eq!(holdings[0].total_cost, Money::from_major(5_000));
/// ```
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    interner: Mutex<SymbolInterner>,
    /// Serialises action registration against itself
    registrar: Mutex<()>,
    actions: RwLock<HashMap<Symbol, Vec<CorporateAction>>>,
    portfolios: RwLock<BTreeMap<PortfolioId, Arc<Portfolio>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an empty engine.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            interner: Mutex::new(SymbolInterner::new()),
            registrar: Mutex::new(()),
            actions: RwLock::new(HashMap::new()),
            portfolios: RwLock::new(BTreeMap::new()),
        }
    }

    /// The engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Date corporate actions are applied up to: the configured date, or today.
    pub fn as_of(&self) -> NaiveDate {
        self.config
            .as_of
            .unwrap_or_else(|| Utc::now().date_naive())
    }

    fn replay_options(&self) -> ReplayOptions {
        self.config.replay_options().with_as_of(self.as_of())
    }

    fn portfolio(&self, id: &PortfolioId) -> Option<Arc<Portfolio>> {
        self.portfolios.read().get(id).cloned()
    }

    fn portfolio_or_create(&self, id: &PortfolioId) -> Arc<Portfolio> {
        if let Some(portfolio) = self.portfolio(id) {
            return portfolio;
        }
        Arc::clone(self.portfolios.write().entry(id.clone()).or_default())
    }

    fn canonical(&self, mut txn: Transaction) -> Transaction {
        txn.symbol = self.interner.lock().canonical(&txn.symbol);
        txn
    }

    fn actions_for(&self, symbol: &Symbol) -> Vec<CorporateAction> {
        self.actions.read().get(symbol).cloned().unwrap_or_default()
    }

    /// Check `txn` against the exchange rules at `level`.
    ///
    /// `last_price` enables the daily price band check.
    pub fn check_rules(
        &self,
        level: RuleLevel,
        txn: &Transaction,
        last_price: Option<Money>,
    ) -> RuleReport {
        self.config
            .trading_rules
            .review(level, txn, last_price, self.as_of())
    }

    /// Apply the configured rule level: strict rejects, lenient logs.
    fn enforce_rules(&self, txn: &Transaction) -> Result<(), BookingError> {
        let mut report = self.check_rules(self.config.rule_level, txn, None);
        for warning in &report.warnings {
            warn!(id = %txn.id, symbol = %txn.symbol, "{warning}");
        }
        let first = report.errors.drain(..).next();
        match first {
            Some(violation) => Err(BookingError::validation(
                Some(txn.id),
                ValidationIssue::TradingRule(violation),
            )),
            None => Ok(()),
        }
    }

    /// The symbol's log with `txn` appended, if `txn` may join it.
    fn admit(
        &self,
        log: &HashMap<Symbol, Vec<Transaction>>,
        txn: Transaction,
    ) -> Result<Vec<Transaction>, BookingError> {
        if log.values().flatten().any(|t| t.id == txn.id) {
            return Err(BookingError::validation(
                Some(txn.id),
                ValidationIssue::DuplicateTransaction(txn.id),
            ));
        }
        let mut candidate = log.get(&txn.symbol).cloned().unwrap_or_default();
        if let Some(last) = candidate.last() {
            if txn.date < last.date {
                return Err(BookingError::Sequencing {
                    symbol: txn.symbol.clone(),
                    id: txn.id,
                    date: txn.date,
                    last: last.date,
                });
            }
        }
        candidate.push(txn);
        Ok(candidate)
    }

    /// Append one transaction and republish its symbol.
    ///
    /// On error nothing is appended and the published state is unchanged.
    pub fn record_transaction(
        &self,
        portfolio: &PortfolioId,
        txn: Transaction,
    ) -> Result<Holding, BookingError> {
        txn.validate()?;
        let txn = self.canonical(txn);
        self.enforce_rules(&txn)?;
        let symbol = txn.symbol.clone();
        let target = self.portfolio_or_create(portfolio);

        let mut log = target.log.lock();
        let candidate = self.admit(&log, txn)?;
        let book = replay_symbol(
            &symbol,
            &candidate,
            &self.actions_for(&symbol),
            &self.replay_options(),
        )?;
        let holding = book.holding();
        log.insert(symbol, candidate);
        target.publish(vec![book]);
        Ok(holding)
    }

    /// What recording `txn` would do, without recording it.
    ///
    /// The trade is replayed against a copy of the log, so a sell reports
    /// its exact FIFO disposals. Rule breaches are reported at the
    /// configured level, or as warnings when the level is basic. Fails for
    /// anything [`Engine::record_transaction`] would reject, except strict
    /// rule breaches, which land in [`TransactionImpact::rules`].
    pub fn preview_transaction(
        &self,
        portfolio: &PortfolioId,
        txn: Transaction,
        last_price: Option<Money>,
    ) -> Result<TransactionImpact, BookingError> {
        txn.validate()?;
        let txn = self.canonical(txn);
        let symbol = txn.symbol.clone();
        let level = match self.config.rule_level {
            RuleLevel::Basic => RuleLevel::Lenient,
            level => level,
        };
        let rules = self.check_rules(level, &txn, last_price);

        let target = self.portfolio(portfolio);
        let (current, candidate) = match &target {
            Some(target) => {
                let log = target.log.lock();
                let current = target.snapshot().holdings.get(&symbol).cloned();
                (current, self.admit(&log, txn.clone())?)
            }
            None => (None, self.admit(&HashMap::new(), txn.clone())?),
        };
        let book = replay_symbol(
            &symbol,
            &candidate,
            &self.actions_for(&symbol),
            &self.replay_options(),
        )?;

        let disposals: Vec<Disposal> = book
            .disposals()
            .iter()
            .filter(|d| d.transaction == txn.id)
            .cloned()
            .collect();
        let estimated_tax = TaxEstimator::new(self.config.tax)
            .estimate(&disposals)
            .total_tax;
        Ok(TransactionImpact::new(
            txn,
            current,
            book.holding(),
            disposals,
            estimated_tax,
            rules,
        ))
    }

    /// Append a batch of transactions.
    ///
    /// Transactions are grouped by symbol, keeping their relative order, and
    /// the touched symbols are replayed in parallel. Each symbol is published
    /// or rejected on its own; rejected symbols keep their previous log and
    /// state. `progress` is called after each symbol; returning
    /// [`ControlFlow::Break`] stops the import before the next symbol starts.
    pub fn import_batch<F>(
        &self,
        portfolio: &PortfolioId,
        transactions: Vec<Transaction>,
        progress: F,
    ) -> ImportReport
    where
        F: Fn(&ImportProgress) -> ControlFlow<()> + Sync,
    {
        let total = transactions.len();
        let target = self.portfolio_or_create(portfolio);
        let mut log = target.log.lock();

        // Ids must be unique across the log and the batch. A repeated id or
        // a strict rule breach rejects its whole symbol.
        let mut seen: HashSet<TransactionId> = log.values().flatten().map(|t| t.id).collect();
        let mut rejected: BTreeMap<Symbol, BookingError> = BTreeMap::new();
        let mut grouped: BTreeMap<Symbol, Vec<Transaction>> = BTreeMap::new();
        for txn in transactions {
            let txn = self.canonical(txn);
            let admitted = if seen.insert(txn.id) {
                self.enforce_rules(&txn)
            } else {
                Err(BookingError::validation(
                    Some(txn.id),
                    ValidationIssue::DuplicateTransaction(txn.id),
                ))
            };
            if let Err(error) = admitted {
                rejected.entry(txn.symbol.clone()).or_insert(error);
            }
            grouped.entry(txn.symbol.clone()).or_default().push(txn);
        }
        grouped.retain(|symbol, _| !rejected.contains_key(symbol));

        let options = self.replay_options();
        let cancelled = AtomicBool::new(false);
        let processed = AtomicUsize::new(0);
        let current: &HashMap<Symbol, Vec<Transaction>> = &log;

        let outcomes: Vec<(Symbol, Option<Result<(Vec<Transaction>, SymbolBook), BookingError>>)> =
            grouped
                .into_par_iter()
                .map(|(symbol, batch)| {
                    if cancelled.load(Ordering::SeqCst) {
                        return (symbol, None);
                    }
                    let count = batch.len();
                    let mut candidate = current.get(&symbol).cloned().unwrap_or_default();
                    candidate.extend(batch);
                    let result = replay_symbol(
                        &symbol,
                        &candidate,
                        &self.actions_for(&symbol),
                        &options,
                    )
                    .map(|book| (candidate, book));

                    let done = processed.fetch_add(count, Ordering::SeqCst) + count;
                    let update = ImportProgress {
                        symbol: symbol.clone(),
                        processed: done,
                        total,
                    };
                    if progress(&update).is_break() {
                        cancelled.store(true, Ordering::SeqCst);
                    }
                    (symbol, Some(result))
                })
                .collect();

        let mut report = ImportReport::default();
        let mut books = Vec::new();
        for (symbol, error) in rejected {
            warn!(symbol = %symbol, code = error.code(), %error, "symbol rejected");
            report.failed.push(ImportFailure::new(symbol, error));
        }
        for (symbol, outcome) in outcomes {
            match outcome {
                None => report.skipped.push(symbol),
                Some(Ok((candidate, book))) => {
                    let before = log.get(&symbol).map_or(0, Vec::len);
                    report.imported += candidate.len() - before;
                    report.published.push(symbol.clone());
                    log.insert(symbol, candidate);
                    books.push(book);
                }
                Some(Err(error)) => {
                    warn!(symbol = %symbol, code = error.code(), %error, "symbol rejected");
                    report.failed.push(ImportFailure::new(symbol, error));
                }
            }
        }
        target.publish(books);
        drop(log);

        info!(
            portfolio = %portfolio,
            imported = report.imported,
            published = report.published.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "batch import finished"
        );
        report
    }

    /// Import everything a source has for a portfolio.
    pub fn load<T>(&self, portfolio: &PortfolioId, source: &T) -> ImportReport
    where
        T: TransactionSource + ?Sized,
    {
        let transactions: Vec<Transaction> = source
            .symbols(portfolio)
            .iter()
            .flat_map(|symbol| source.transactions(portfolio, symbol))
            .collect();
        self.import_batch(portfolio, transactions, |_| ControlFlow::Continue(()))
    }

    /// Register every action a source announces for `symbols`.
    ///
    /// Stops at the first rejected action.
    pub fn load_actions<S>(&self, source: &S, symbols: &[Symbol]) -> Result<usize, BookingError>
    where
        S: CorporateActionSource + ?Sized,
    {
        let mut registered = 0;
        for symbol in symbols {
            for action in source.corporate_actions(symbol) {
                self.register_action(action)?;
                registered += 1;
            }
        }
        Ok(registered)
    }

    /// Register or amend a corporate action and republish affected symbols.
    ///
    /// An action whose id is already registered may be amended until it is
    /// processed; after that it is rejected with
    /// [`ConflictReason::AlreadyProcessed`]. If any portfolio fails to replay
    /// with the action, nothing changes.
    pub fn register_action(&self, mut action: CorporateAction) -> Result<(), BookingError> {
        action.validate()?;
        action.symbol = self.interner.lock().canonical(&action.symbol);
        let symbol = action.symbol.clone();
        let as_of = self.as_of();

        let _registrar = self.registrar.lock();
        let mut candidate = self.actions_for(&symbol);
        if let Some(existing) = candidate.iter_mut().find(|a| a.id == action.id) {
            if existing.status_on(as_of) == ActionStatus::Processed {
                return Err(BookingError::conflict(
                    symbol,
                    action.id,
                    ConflictReason::AlreadyProcessed,
                ));
            }
            *existing = action.clone();
        } else {
            candidate.push(action.clone());
        }

        // The registry read guard is held until the action is published so
        // no portfolio can be created in between and miss it. Writers are
        // locked in id order.
        let registry = self.portfolios.read();
        let portfolios: Vec<Arc<Portfolio>> = registry.values().cloned().collect();
        let logs: Vec<_> = portfolios.iter().map(|p| p.log.lock()).collect();

        let options = self.replay_options();
        let mut books = Vec::with_capacity(portfolios.len());
        for log in &logs {
            books.push(match log.get(&symbol) {
                Some(txns) => Some(replay_symbol(&symbol, txns, &candidate, &options)?),
                None => None,
            });
        }

        self.actions.write().insert(symbol.clone(), candidate);
        for (portfolio, book) in portfolios.iter().zip(books) {
            if let Some(book) = book {
                portfolio.publish(vec![book]);
            }
        }
        drop(logs);
        drop(registry);
        debug!(symbol = %symbol, action = %action.id, kind = action.kind.name(), "registered corporate action");
        Ok(())
    }

    /// Registered actions matching `filter`, with their status as of today.
    pub fn actions(&self, filter: &ActionFilter) -> Vec<(CorporateAction, ActionStatus)> {
        let as_of = self.as_of();
        let mut matched: Vec<_> = self
            .actions
            .read()
            .values()
            .flatten()
            .map(|action| (action.clone(), action.status_on(as_of)))
            .filter(|(action, status)| filter.matches(action, *status))
            .collect();
        matched.sort_by(|a, b| {
            a.0.execution_date
                .cmp(&b.0.execution_date)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        matched
    }

    /// Open holdings, by symbol.
    pub fn holdings(&self, portfolio: &PortfolioId) -> Vec<Holding> {
        self.portfolio(portfolio).map_or_else(Vec::new, |p| {
            p.snapshot()
                .holdings
                .values()
                .filter(|h| !h.is_flat())
                .cloned()
                .collect()
        })
    }

    /// One holding, open or closed.
    pub fn holding(&self, portfolio: &PortfolioId, symbol: &Symbol) -> Option<Holding> {
        self.portfolio(portfolio)
            .and_then(|p| p.snapshot().holdings.get(symbol).cloned())
    }

    /// Portfolio totals valued at `prices`.
    pub fn summary<P>(&self, portfolio: &PortfolioId, prices: &P) -> PortfolioSummary
    where
        P: PriceLookup + ?Sized,
    {
        let Some(target) = self.portfolio(portfolio) else {
            return PortfolioSummary::default();
        };
        let snapshot = target.snapshot();
        let holdings: Vec<Holding> = snapshot.holdings.values().cloned().collect();
        let tax = self.estimate(&snapshot).total_tax;
        summarize(&holdings, prices, tax)
    }

    /// Disposals passing `filter`, oldest first.
    pub fn disposals(&self, portfolio: &PortfolioId, filter: &DisposalFilter) -> Vec<Disposal> {
        let Some(target) = self.portfolio(portfolio) else {
            return Vec::new();
        };
        let mut disposals: Vec<Disposal> = target
            .snapshot()
            .books
            .values()
            .flat_map(|book| book.disposals().iter())
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        disposals.sort_by(|a, b| {
            a.disposed
                .cmp(&b.disposed)
                .then_with(|| a.transaction.cmp(&b.transaction))
        });
        disposals
    }

    /// Dividend income, oldest payment first.
    pub fn dividends(&self, portfolio: &PortfolioId, symbol: Option<&Symbol>) -> Vec<DividendIncome> {
        let Some(target) = self.portfolio(portfolio) else {
            return Vec::new();
        };
        let mut dividends: Vec<DividendIncome> = target
            .snapshot()
            .books
            .values()
            .flat_map(|book| book.dividends().iter())
            .filter(|d| symbol.map_or(true, |s| s == &d.symbol))
            .cloned()
            .collect();
        dividends.sort_by(|a, b| a.paid.cmp(&b.paid).then_with(|| a.symbol.cmp(&b.symbol)));
        dividends
    }

    /// Corporate actions touching the portfolio's symbols.
    pub fn action_statuses(&self, portfolio: &PortfolioId) -> Vec<ActionOutcome> {
        let Some(target) = self.portfolio(portfolio) else {
            return Vec::new();
        };
        let mut outcomes: Vec<ActionOutcome> = target
            .snapshot()
            .books
            .values()
            .flat_map(|book| book.actions.iter().cloned())
            .collect();
        outcomes.sort_by(|a, b| {
            a.execution_date
                .cmp(&b.execution_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        outcomes
    }

    /// Capital gains tax estimate over all disposals.
    pub fn tax_report(&self, portfolio: &PortfolioId) -> TaxReport {
        self.portfolio(portfolio)
            .map_or_else(TaxReport::default, |p| self.estimate(&p.snapshot()))
    }

    fn estimate(&self, snapshot: &Snapshot) -> TaxReport {
        let disposals: Vec<Disposal> = snapshot
            .books
            .values()
            .flat_map(|book| book.disposals().iter().cloned())
            .collect();
        TaxEstimator::new(self.config.tax).estimate(&disposals)
    }

    /// What `action` would do to the portfolio's current holding.
    pub fn preview(
        &self,
        portfolio: &PortfolioId,
        action: &CorporateAction,
    ) -> Result<Preview, BookingError> {
        let symbol = self.interner.lock().canonical(&action.symbol);
        let (held, wac) = self
            .holding(portfolio, &symbol)
            .map_or((Default::default(), Default::default()), |h| {
                (h.quantity, h.average_cost)
            });
        preview(action, held, wac, self.config.dividend_withholding)
    }

    /// Re-verify lot invariants on the published state.
    ///
    /// Returns one message per violation; empty when healthy.
    pub fn check_integrity(&self, portfolio: &PortfolioId) -> Vec<String> {
        let Some(target) = self.portfolio(portfolio) else {
            return Vec::new();
        };
        let snapshot = target.snapshot();
        let mut problems = Vec::new();
        for (symbol, book) in &snapshot.books {
            problems.extend(book.check_invariants(snapshot.holdings.get(symbol)));
        }
        problems
    }

    /// The transaction log of one symbol.
    pub fn transactions(&self, portfolio: &PortfolioId, symbol: &Symbol) -> Vec<Transaction> {
        self.portfolio(portfolio)
            .and_then(|p| p.log.lock().get(symbol).cloned())
            .unwrap_or_default()
    }
}
