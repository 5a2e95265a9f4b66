//! Engine configuration.
//!
//! Defaults follow Nepalese capital gains rules for listed shares:
//! 7.5% on gains held 365 days or less, 5% beyond that, and 5% withheld
//! at source on cash dividends. Rates are stored in basis points, so a JSON
//! config writes `7.5%` as `750`.
//!
//! ```json
//! {
//!   "tax": {
//!     "short_term_rate": 750,
//!     "long_term_rate": 500,
//!     "long_term_days": 365,
//!     "loss_policy": "net_within_period",
//!     "period": { "kind": "fiscal_year", "start_month": 7, "start_day": 16 }
//!   },
//!   "dividend_withholding": 500,
//!   "rule_level": "lenient",
//!   "trading_rules": { "lot_size": 10, "minimum_value": 50000 }
//! }
//! ```

use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use ntx_booking::{ReplayOptions, DEFAULT_DIVIDEND_WITHHOLDING};
use ntx_core::{Percentage, RuleLevel, TradingRules};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Fiscal year start is not a valid day in every year.
    #[error("invalid fiscal year start {month}-{day}")]
    InvalidFiscalStart {
        /// Month (1-12)
        month: u32,
        /// Day of month
        day: u32,
    },
    /// A rate was below zero or above 100%.
    #[error("{name} must be between 0% and 100%, got {rate}")]
    RateOutOfRange {
        /// Setting name
        name: &'static str,
        /// Offending rate
        rate: Percentage,
    },
    /// Long-term threshold was negative.
    #[error("long-term threshold must not be negative, got {0} days")]
    NegativeThreshold(i64),
}

/// How losses enter the tax estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossPolicy {
    /// Each disposal is taxed on its own gain; losses are ignored.
    #[default]
    Ignore,
    /// Gains and losses of the same class, symbol and period are netted
    /// before the rate is applied.
    NetWithinPeriod,
}

impl fmt::Display for LossPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignore => write!(f, "ignore"),
            Self::NetWithinPeriod => write!(f, "net-within-period"),
        }
    }
}

/// How disposals are grouped into tax periods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaxPeriod {
    /// January 1 to December 31.
    #[default]
    CalendarYear,
    /// A year starting on a fixed month and day.
    FiscalYear {
        /// First month (1-12)
        start_month: u32,
        /// First day of `start_month`
        start_day: u32,
    },
}

impl TaxPeriod {
    /// Check the fiscal start exists in every year (February 29 does not).
    pub fn validate(self) -> Result<(), ConfigError> {
        if let Self::FiscalYear {
            start_month,
            start_day,
        } = self
        {
            // 2023 is not a leap year.
            if NaiveDate::from_ymd_opt(2023, start_month, start_day).is_none() {
                return Err(ConfigError::InvalidFiscalStart {
                    month: start_month,
                    day: start_day,
                });
            }
        }
        Ok(())
    }

    /// The period containing `date`.
    #[must_use]
    pub fn period_of(self, date: NaiveDate) -> Period {
        let (month, day) = match self {
            Self::CalendarYear => (1, 1),
            Self::FiscalYear {
                start_month,
                start_day,
            } => (start_month, start_day),
        };
        let start_in = |year: i32| NaiveDate::from_ymd_opt(year, month, day);

        let start = match start_in(date.year()) {
            Some(start) if start <= date => start,
            Some(_) => start_in(date.year() - 1).unwrap_or(date),
            None => date,
        };
        let end = start_in(start.year() + 1)
            .and_then(|next| next.checked_sub_days(Days::new(1)))
            .unwrap_or(NaiveDate::MAX);
        Period { start, end }
    }
}

/// One tax period, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// First day
    pub start: NaiveDate,
    /// Last day
    pub end: NaiveDate,
}

impl Period {
    /// Check if `date` falls in the period.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.month() == 1 && self.start.day() == 1 {
            write!(f, "{}", self.start.year())
        } else {
            write!(
                f,
                "{}/{:02}",
                self.start.year(),
                (self.start.year() + 1).rem_euclid(100)
            )
        }
    }
}

/// Capital gains tax settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxConfig {
    /// Rate for holdings of `long_term_days` or less
    pub short_term_rate: Percentage,
    /// Rate for holdings longer than `long_term_days`
    pub long_term_rate: Percentage,
    /// Holding days above which a gain is long-term
    pub long_term_days: i64,
    /// Treatment of losses
    pub loss_policy: LossPolicy,
    /// Reporting period
    pub period: TaxPeriod,
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            short_term_rate: Percentage::from_basis_points(750),
            long_term_rate: Percentage::from_percent(5),
            long_term_days: 365,
            loss_policy: LossPolicy::Ignore,
            period: TaxPeriod::CalendarYear,
        }
    }
}

impl TaxConfig {
    /// Check the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("short_term_rate", self.short_term_rate)?;
        check_rate("long_term_rate", self.long_term_rate)?;
        if self.long_term_days < 0 {
            return Err(ConfigError::NegativeThreshold(self.long_term_days));
        }
        self.period.validate()
    }

    /// Rate for a gain held `days`.
    #[must_use]
    pub const fn rate_for(&self, days: i64) -> Percentage {
        if days > self.long_term_days {
            self.long_term_rate
        } else {
            self.short_term_rate
        }
    }
}

/// Everything the engine needs besides its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capital gains tax
    pub tax: TaxConfig,
    /// Tax withheld from cash dividends
    pub dividend_withholding: Percentage,
    /// Corporate actions after this date are not applied (none: apply all)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    /// How exchange rule breaches on market trades are treated
    pub rule_level: RuleLevel,
    /// Exchange rule parameters
    pub trading_rules: TradingRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tax: TaxConfig::default(),
            dividend_withholding: DEFAULT_DIVIDEND_WITHHOLDING,
            as_of: None,
            rule_level: RuleLevel::Basic,
            trading_rules: TradingRules::default(),
        }
    }
}

impl EngineConfig {
    /// Check the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("dividend_withholding", self.dividend_withholding)?;
        check_rate("commission_rate", self.trading_rules.commission_rate)?;
        check_rate("fee_tolerance", self.trading_rules.fee_tolerance)?;
        check_rate("price_band", self.trading_rules.price_band)?;
        self.tax.validate()
    }

    /// Set the replay cutoff date.
    #[must_use]
    pub const fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Set the tax settings.
    #[must_use]
    pub const fn with_tax(mut self, tax: TaxConfig) -> Self {
        self.tax = tax;
        self
    }

    /// Set how exchange rule breaches are treated.
    #[must_use]
    pub const fn with_rule_level(mut self, level: RuleLevel) -> Self {
        self.rule_level = level;
        self
    }

    /// Options for a symbol replay.
    #[must_use]
    pub fn replay_options(&self) -> ReplayOptions {
        let options = ReplayOptions::default().with_withholding(self.dividend_withholding);
        match self.as_of {
            Some(as_of) => options.with_as_of(as_of),
            None => options,
        }
    }
}

fn check_rate(name: &'static str, rate: Percentage) -> Result<(), ConfigError> {
    if rate.is_negative() || rate > Percentage::from_percent(100) {
        return Err(ConfigError::RateOutOfRange { name, rate });
    }
    Ok(())
}
