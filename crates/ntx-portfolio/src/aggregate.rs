//! Portfolio valuation.

use std::collections::{BTreeMap, HashMap};

use ntx_booking::Holding;
use ntx_core::{Money, Percentage, Quantity, Symbol};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Source of last traded prices.
///
/// Implemented for maps keyed by [`Symbol`] and for closures, so callers can
/// pass whatever price cache they have.
///
/// ```
/// use ntx_core::{Money, Symbol};
/// use ntx_portfolio::PriceLookup;
///
/// let flat = |_: &Symbol| Some(Money::from_major(100));
/// assert_eq!(flat.latest_price(&Symbol::new("NABIL")), Some(Money::from_major(100)));
/// ```
pub trait PriceLookup {
    /// Last known price of one share, if any.
    fn latest_price(&self, symbol: &Symbol) -> Option<Money>;
}

impl PriceLookup for HashMap<Symbol, Money> {
    fn latest_price(&self, symbol: &Symbol) -> Option<Money> {
        self.get(symbol).copied()
    }
}

impl PriceLookup for BTreeMap<Symbol, Money> {
    fn latest_price(&self, symbol: &Symbol) -> Option<Money> {
        self.get(symbol).copied()
    }
}

impl<F> PriceLookup for F
where
    F: Fn(&Symbol) -> Option<Money>,
{
    fn latest_price(&self, symbol: &Symbol) -> Option<Money> {
        self(symbol)
    }
}

/// Market valuation of one holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingValuation {
    /// Security symbol
    pub symbol: Symbol,
    /// Shares held
    pub quantity: Quantity,
    /// Weighted-average cost per share
    pub average_cost: Money,
    /// Cost of the shares held
    pub invested: Money,
    /// Last price used (none: valued at cost)
    pub price: Option<Money>,
    /// `quantity * price`, or cost when no price is known
    pub market_value: Money,
    /// `market_value - invested`
    pub unrealized: Money,
    /// Unrealized gain as a share of cost
    pub unrealized_percent: Percentage,
}

impl HoldingValuation {
    /// Value a holding at `price`, or at cost when no price is known.
    #[must_use]
    pub fn new(holding: &Holding, price: Option<Money>) -> Self {
        let invested = holding.total_cost;
        let market_value = price.map_or(invested, |p| p.times(holding.quantity));
        let unrealized = market_value - invested;
        Self {
            symbol: holding.symbol.clone(),
            quantity: holding.quantity,
            average_cost: holding.average_cost,
            invested,
            price,
            market_value,
            unrealized,
            unrealized_percent: unrealized.percent_of(invested),
        }
    }
}

/// Portfolio totals.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Cost of everything held
    pub invested: Money,
    /// Market value of everything held
    pub market_value: Money,
    /// Realized gains over all disposals
    pub realized: Money,
    /// `market_value - invested`
    pub unrealized: Money,
    /// Net cash dividends
    pub dividend_income: Money,
    /// Capital gains tax on realized disposals
    pub estimated_tax: Money,
    /// `realized + unrealized + dividend_income`
    pub total_return: Money,
    /// Total return as a share of amount invested
    pub return_percent: Percentage,
    /// Per-holding valuations, by symbol
    pub holdings: Vec<HoldingValuation>,
    /// Held symbols valued at cost for lack of a price
    pub price_unavailable: Vec<Symbol>,
}

/// Combine holdings into a [`PortfolioSummary`].
///
/// `holdings` should include closed positions so their realized gains and
/// dividends are counted; only open positions are valued.
pub fn summarize<P>(holdings: &[Holding], prices: &P, estimated_tax: Money) -> PortfolioSummary
where
    P: PriceLookup + ?Sized,
{
    let mut summary = PortfolioSummary {
        estimated_tax,
        ..PortfolioSummary::default()
    };

    for holding in holdings {
        summary.realized += holding.realized;
        summary.dividend_income += holding.dividend_income;
        if holding.is_flat() {
            continue;
        }

        let price = prices.latest_price(&holding.symbol);
        if price.is_none() {
            warn!(symbol = %holding.symbol, "no price available, valuing at cost");
            summary.price_unavailable.push(holding.symbol.clone());
        }
        let valuation = HoldingValuation::new(holding, price);
        summary.invested += valuation.invested;
        summary.market_value += valuation.market_value;
        summary.holdings.push(valuation);
    }

    summary.holdings.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    summary.price_unavailable.sort();
    summary.unrealized = summary.market_value - summary.invested;
    summary.total_return = summary.realized + summary.unrealized + summary.dividend_income;
    summary.return_percent = summary.total_return.percent_of(summary.invested);
    summary
}
