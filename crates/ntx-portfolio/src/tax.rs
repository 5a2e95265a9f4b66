//! Capital gains tax estimate.
//!
//! Disposals are classified by holding period, grouped by tax period,
//! symbol and class, and taxed at the configured rate. How losses count
//! depends on [`LossPolicy`].

use std::collections::BTreeMap;
use std::fmt;

use ntx_core::{Disposal, Money, Percentage, Symbol};
use serde::{Deserialize, Serialize};

use crate::config::{LossPolicy, Period, TaxConfig};

/// Holding-period class of a gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermClass {
    /// Held for the threshold or less.
    Short,
    /// Held longer than the threshold.
    Long,
}

impl fmt::Display for TermClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short => write!(f, "short-term"),
            Self::Long => write!(f, "long-term"),
        }
    }
}

/// Tax for one (period, symbol, class) group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxLine {
    /// Tax period
    pub period: Period,
    /// Security symbol
    pub symbol: Symbol,
    /// Holding-period class
    pub class: TermClass,
    /// Disposals in the group
    pub disposals: usize,
    /// Sum of positive gains
    pub gains: Money,
    /// Sum of losses, as a positive amount
    pub losses: Money,
    /// Amount the rate is applied to
    pub taxable: Money,
    /// Rate applied
    pub rate: Percentage,
    /// Estimated tax
    pub tax: Money,
}

/// Tax for one period across symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTax {
    /// Tax period
    pub period: Period,
    /// Taxable amount
    pub taxable: Money,
    /// Estimated tax
    pub tax: Money,
}

/// Full tax estimate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxReport {
    /// Policy the estimate was made under
    pub loss_policy: LossPolicy,
    /// Per period, symbol and class, in that order
    pub lines: Vec<TaxLine>,
    /// Per period, oldest first
    pub periods: Vec<PeriodTax>,
    /// Tax across all periods
    pub total_tax: Money,
}

impl TaxReport {
    /// Tax for one symbol across all periods.
    #[must_use]
    pub fn tax_for(&self, symbol: &Symbol) -> Money {
        self.lines
            .iter()
            .filter(|line| &line.symbol == symbol)
            .map(|line| line.tax)
            .sum()
    }
}

/// Estimates capital gains tax from disposals.
///
/// # Examples
///
/// ```
/// use ntx_portfolio::{TaxConfig, TaxEstimator, TermClass};
///
/// let estimator = TaxEstimator::new(TaxConfig::default());
/// assert_eq!(estimator.classify_days(365), TermClass::Short);
/// assert_eq!(estimator.classify_days(366), TermClass::Long);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TaxEstimator {
    config: TaxConfig,
}

impl TaxEstimator {
    /// Create an estimator.
    #[must_use]
    pub const fn new(config: TaxConfig) -> Self {
        Self { config }
    }

    /// Class for a holding period of `days`.
    #[must_use]
    pub const fn classify_days(&self, days: i64) -> TermClass {
        if days > self.config.long_term_days {
            TermClass::Long
        } else {
            TermClass::Short
        }
    }

    /// Class of a disposal.
    #[must_use]
    pub fn classify(&self, disposal: &Disposal) -> TermClass {
        self.classify_days(disposal.holding_days())
    }

    /// Rate for a class.
    #[must_use]
    pub const fn rate(&self, class: TermClass) -> Percentage {
        match class {
            TermClass::Short => self.config.short_term_rate,
            TermClass::Long => self.config.long_term_rate,
        }
    }

    /// Tax on one disposal taken alone; losses are untaxed.
    #[must_use]
    pub fn tax_on(&self, disposal: &Disposal) -> Money {
        if disposal.gain.is_positive() {
            disposal.gain.apply(self.rate(self.classify(disposal)))
        } else {
            Money::ZERO
        }
    }

    /// Estimate tax over `disposals`.
    #[must_use]
    pub fn estimate(&self, disposals: &[Disposal]) -> TaxReport {
        let mut groups: BTreeMap<(Period, Symbol, TermClass), Vec<&Disposal>> = BTreeMap::new();
        for disposal in disposals {
            let key = (
                self.config.period.period_of(disposal.disposed),
                disposal.symbol.clone(),
                self.classify(disposal),
            );
            groups.entry(key).or_default().push(disposal);
        }

        let mut lines = Vec::with_capacity(groups.len());
        for ((period, symbol, class), members) in groups {
            let rate = self.rate(class);
            let gains: Money = members
                .iter()
                .filter(|d| d.gain.is_positive())
                .map(|d| d.gain)
                .sum();
            let losses: Money = members
                .iter()
                .filter(|d| d.gain.is_negative())
                .map(|d| d.gain.abs())
                .sum();

            let (taxable, tax) = match self.config.loss_policy {
                LossPolicy::Ignore => (gains, members.iter().map(|d| self.tax_on(d)).sum()),
                LossPolicy::NetWithinPeriod => {
                    let net = (gains - losses).max(Money::ZERO);
                    (net, net.apply(rate))
                }
            };

            lines.push(TaxLine {
                period,
                symbol,
                class,
                disposals: members.len(),
                gains,
                losses,
                taxable,
                rate,
                tax,
            });
        }

        let mut by_period: BTreeMap<Period, (Money, Money)> = BTreeMap::new();
        for line in &lines {
            let entry = by_period.entry(line.period).or_default();
            entry.0 += line.taxable;
            entry.1 += line.tax;
        }
        let periods: Vec<PeriodTax> = by_period
            .into_iter()
            .map(|(period, (taxable, tax))| PeriodTax {
                period,
                taxable,
                tax,
            })
            .collect();

        TaxReport {
            loss_policy: self.config.loss_policy,
            total_tax: periods.iter().map(|p| p.tax).sum(),
            lines,
            periods,
        }
    }
}
