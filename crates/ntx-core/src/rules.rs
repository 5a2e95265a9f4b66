//! Exchange trading rules for market buys and sells.
//!
//! These are conventions of the Nepal Stock Exchange rather than accounting
//! constraints, so the booking engine never enforces them on its own. A
//! [`RuleLevel`] decides what a breach means:
//!
//! | Level | Breach |
//! |-------|--------|
//! | `basic` | not checked |
//! | `lenient` | reported as a warning, the trade is booked |
//! | `strict` | the trade is rejected |
//!
//! Only [`TransactionKind::Buy`] and [`TransactionKind::Sell`] are checked;
//! bonus, rights, split and dividend records do not pass through the market.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Money, Percentage, Quantity, Symbol, Transaction, TransactionKind};

/// Symbols traded in 100-share lots.
const INSURANCE_SYMBOLS: &[&str] = &["NICA", "PRIN", "SICL", "IGI", "UIC", "PICL", "NLICL", "LICN"];

/// How trading rule breaches are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    /// Field validation only.
    #[default]
    Basic,
    /// Breaches are warnings.
    Lenient,
    /// Breaches reject the trade.
    Strict,
}

/// One breached trading rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleViolation {
    /// Symbol is not 3 to 6 letters.
    #[error("symbol {symbol} must be 3 to 6 letters A-Z")]
    SymbolFormat {
        /// Offending symbol
        symbol: Symbol,
    },
    /// Quantity is not a whole number of lots.
    #[error("quantity {quantity} is not a multiple of the {lot_size}-share lot")]
    LotSize {
        /// Quantity traded
        quantity: Quantity,
        /// Lot size of the symbol
        lot_size: i64,
    },
    /// The exchange does not trade on that weekday.
    #[error("{date} is a {weekday}; the exchange trades Sunday to Thursday")]
    ClosedDay {
        /// Trade date
        date: NaiveDate,
        /// Its weekday
        weekday: Weekday,
    },
    /// Trade dated after the current date.
    #[error("trade date {date} is after {today}")]
    FutureDate {
        /// Trade date
        date: NaiveDate,
        /// Current date
        today: NaiveDate,
    },
    /// Trade value below the exchange minimum.
    #[error("trade value {value} is below the minimum {minimum}")]
    BelowMinimum {
        /// Price times quantity
        value: Money,
        /// Minimum trade value
        minimum: Money,
    },
    /// Fees far from the standard broker commission plus regulator fee.
    #[error("fees {fees} outside expected range {low} to {high}")]
    FeesOutOfRange {
        /// Fees recorded
        fees: Money,
        /// Lowest accepted
        low: Money,
        /// Highest accepted
        high: Money,
    },
    /// Price outside the daily circuit band around the last price.
    #[error("price {price} outside daily band {low} to {high}")]
    PriceBand {
        /// Trade price
        price: Money,
        /// Lower band
        low: Money,
        /// Upper band
        high: Money,
    },
}

/// Outcome of checking one trade at a given [`RuleLevel`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    /// Breaches that reject the trade
    pub errors: Vec<RuleViolation>,
    /// Breaches reported but tolerated
    pub warnings: Vec<RuleViolation>,
}

impl RuleReport {
    /// Check if nothing rejects the trade.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if any warning was raised.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Exchange trading rule parameters.
///
/// Defaults: 10-share lots (100 for insurance), Rs. 500 minimum trade,
/// 0.25% broker commission capped at Rs. 1,000, a regulator fee of 15 paisa
/// per Rs. 1,000 (0.015%), 10% tolerance on fees and a 10% daily band.
///
/// # Examples
///
/// ```
/// use ntx_core::{Money, Quantity, RuleLevel, Transaction, TransactionId, TradingRules};
/// use chrono::NaiveDate;
///
/// let sunday = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
/// let rules = TradingRules::default();
/// let odd = Transaction::buy(TransactionId(1), "NABIL", sunday, Quantity::new(15), Money::from_major(500));
///
/// let report = rules.review(RuleLevel::Lenient, &odd, None, sunday);
/// assert!(report.is_valid());
/// assert_eq!(report.warnings.len(), 1);
/// assert!(!rules.review(RuleLevel::Strict, &odd, None, sunday).is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingRules {
    /// Lot size of ordinary symbols
    pub lot_size: i64,
    /// Lot size of insurance symbols
    pub insurance_lot_size: i64,
    /// Minimum price times quantity
    pub minimum_value: Money,
    /// Broker commission on the trade value
    pub commission_rate: Percentage,
    /// Commission cap per trade
    pub commission_cap: Money,
    /// Regulator fee in paisa per Rs. 1,000 of trade value
    pub regulator_fee_per_thousand: i64,
    /// Accepted deviation of fees from the standard
    pub fee_tolerance: Percentage,
    /// Daily band around the last price
    pub price_band: Percentage,
}

impl Default for TradingRules {
    fn default() -> Self {
        Self {
            lot_size: 10,
            insurance_lot_size: 100,
            minimum_value: Money::from_major(500),
            commission_rate: Percentage::from_basis_points(25),
            commission_cap: Money::from_major(1_000),
            regulator_fee_per_thousand: 15,
            fee_tolerance: Percentage::from_percent(10),
            price_band: Percentage::from_percent(10),
        }
    }
}

impl TradingRules {
    /// Lot size of `symbol`.
    #[must_use]
    pub fn lot_size_of(&self, symbol: &Symbol) -> i64 {
        if INSURANCE_SYMBOLS.contains(&symbol.as_str()) {
            self.insurance_lot_size
        } else {
            self.lot_size
        }
    }

    /// Largest whole number of lots not above `quantity`.
    #[must_use]
    pub fn round_to_lot(&self, symbol: &Symbol, quantity: Quantity) -> Quantity {
        let lot = self.lot_size_of(symbol).max(1);
        Quantity::new(quantity.value() - quantity.value().rem_euclid(lot))
    }

    /// Standard broker commission plus regulator fee on a trade value.
    #[must_use]
    pub fn standard_fees(&self, value: Money) -> Money {
        let commission = value.apply(self.commission_rate).min(self.commission_cap);
        // Per thousand rupees is per 100,000 paisa.
        commission + value.mul_div(self.regulator_fee_per_thousand, 100_000)
    }

    /// Check the symbol format.
    pub fn check_symbol(&self, symbol: &Symbol) -> Result<(), RuleViolation> {
        let text = symbol.as_str();
        if (3..=6).contains(&text.len()) && text.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(())
        } else {
            Err(RuleViolation::SymbolFormat {
                symbol: symbol.clone(),
            })
        }
    }

    /// Check the quantity is a whole number of lots.
    pub fn check_lot_size(&self, symbol: &Symbol, quantity: Quantity) -> Result<(), RuleViolation> {
        let lot_size = self.lot_size_of(symbol);
        if lot_size > 0 && quantity.value() % lot_size != 0 {
            return Err(RuleViolation::LotSize { quantity, lot_size });
        }
        Ok(())
    }

    /// Check the date is a past or current trading day.
    pub fn check_trading_day(&self, date: NaiveDate, today: NaiveDate) -> Result<(), RuleViolation> {
        if date > today {
            return Err(RuleViolation::FutureDate { date, today });
        }
        match date.weekday() {
            weekday @ (Weekday::Fri | Weekday::Sat) => {
                Err(RuleViolation::ClosedDay { date, weekday })
            }
            _ => Ok(()),
        }
    }

    /// Check the trade value meets the minimum.
    pub fn check_minimum_value(&self, value: Money) -> Result<(), RuleViolation> {
        if value < self.minimum_value {
            return Err(RuleViolation::BelowMinimum {
                value,
                minimum: self.minimum_value,
            });
        }
        Ok(())
    }

    /// Check recorded fees are within tolerance of the standard fees.
    pub fn check_fees(&self, value: Money, fees: Money) -> Result<(), RuleViolation> {
        let standard = self.standard_fees(value);
        let slack = standard.apply(self.fee_tolerance);
        let (low, high) = (standard - slack, standard + slack);
        if fees < low || fees > high {
            return Err(RuleViolation::FeesOutOfRange { fees, low, high });
        }
        Ok(())
    }

    /// Check the price is inside the daily band around `last_price`.
    ///
    /// A zero last price skips the check.
    pub fn check_price_band(&self, price: Money, last_price: Money) -> Result<(), RuleViolation> {
        if last_price.is_zero() {
            return Ok(());
        }
        let band = last_price.apply(self.price_band);
        let (low, high) = (last_price - band, last_price + band);
        if price < low || price > high {
            return Err(RuleViolation::PriceBand { price, low, high });
        }
        Ok(())
    }

    /// Every rule `txn` breaches, in a fixed order.
    ///
    /// Fees are checked only when recorded; the price band only when
    /// `last_price` is known.
    #[must_use]
    pub fn violations(
        &self,
        txn: &Transaction,
        last_price: Option<Money>,
        today: NaiveDate,
    ) -> Vec<RuleViolation> {
        if !matches!(txn.kind, TransactionKind::Buy | TransactionKind::Sell) {
            return Vec::new();
        }
        let value = txn.gross_value();
        let mut checks = vec![
            self.check_symbol(&txn.symbol),
            self.check_lot_size(&txn.symbol, txn.quantity),
            self.check_trading_day(txn.date, today),
            self.check_minimum_value(value),
        ];
        if !txn.fees.is_zero() {
            checks.push(self.check_fees(value, txn.fees));
        }
        if let Some(last) = last_price {
            checks.push(self.check_price_band(txn.price, last));
        }
        checks.into_iter().filter_map(Result::err).collect()
    }

    /// Check `txn` and sort breaches into errors or warnings by `level`.
    #[must_use]
    pub fn review(
        &self,
        level: RuleLevel,
        txn: &Transaction,
        last_price: Option<Money>,
        today: NaiveDate,
    ) -> RuleReport {
        match level {
            RuleLevel::Basic => RuleReport::default(),
            RuleLevel::Lenient => RuleReport {
                errors: Vec::new(),
                warnings: self.violations(txn, last_price, today),
            },
            RuleLevel::Strict => RuleReport {
                errors: self.violations(txn, last_price, today),
                warnings: Vec::new(),
            },
        }
    }
}
