//! Portfolio engine for ntx.
//!
//! This crate ties the booking engine to portfolios:
//!
//! - [`Engine`]: per-portfolio transaction logs, corporate action registry,
//!   replay and snapshot publication
//! - [`summarize`] / [`PortfolioSummary`]: market valuation and returns
//! - [`TaxEstimator`] / [`TaxReport`]: capital gains tax by period
//! - [`TransactionImpact`]: what a prospective trade would do
//! - [`EngineConfig`]: tax rates, loss policy, periods and withholding
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use ntx_core::{Money, Quantity, Symbol, Transaction, TransactionId};
//! use ntx_portfolio::{Engine, EngineConfig, PortfolioId};
//! use chrono::NaiveDate;
//!
//! let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
//! let engine = Engine::new(EngineConfig::default());
//! let me = PortfolioId::new("me");
//!
//! engine.record_transaction(&me, Transaction::buy(TransactionId(1), "NABIL", d(2023, 1, 1), Quantity::new(100), Money::from_major(100))).unwrap();
//! engine.record_transaction(&me, Transaction::sell(TransactionId(2), "NABIL", d(2024, 2, 5), Quantity::new(50), Money::from_major(300))).unwrap();
//!
//! let prices = HashMap::from([(Symbol::new("NABIL"), Money::from_major(250))]);
//! let summary = engine.summary(&me, &prices);
//! assert_eq!(summary.realized, Money::from_major(10_000));
//! assert_eq!(summary.estimated_tax, Money::from_major(500));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod impact;
pub mod tax;

pub use aggregate::{summarize, HoldingValuation, PortfolioSummary, PriceLookup};
pub use config::{ConfigError, EngineConfig, LossPolicy, Period, TaxConfig, TaxPeriod};
pub use engine::{
    CorporateActionSource, DisposalFilter, Engine, ImportFailure, ImportProgress, ImportReport,
    PortfolioId, TransactionSource,
};
pub use impact::TransactionImpact;
pub use tax::{PeriodTax, TaxEstimator, TaxLine, TaxReport, TermClass};
