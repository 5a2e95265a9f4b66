//! FIFO booking engine for ntx.
//!
//! This crate provides:
//! - [`LotTracker`]: the per-symbol FIFO lot queue
//! - [`CorporateActionProcessor`]: record-date snapshots and execution of
//!   bonus, rights, split and dividend actions
//! - [`replay_symbol`]: a pure, chronological replay of one symbol's
//!   transactions and corporate actions into a [`SymbolBook`]
//!
//! # Replay order
//!
//! Events are sorted by date. On the same date, transactions come first,
//! then record-date snapshots, then executions:
//!
//! ```text
//! 2024-03-01  BUY 100        <- counts toward the record-date snapshot
//! 2024-03-01  record CA-1    <- entitlement fixed here
//! 2024-03-05  SELL 100       <- does not change the entitlement
//! 2024-03-10  execute CA-1   <- bonus lot created, dated 2024-03-10
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod book;
mod corporate;
mod replay;
mod tracker;

pub use book::{ActionOutcome, Entitlement, Holding, SymbolBook};
pub use corporate::{
    preview, ActionEffect, BonusCalculation, CorporateActionProcessor, DividendCalculation,
    Preview, RightsCalculation, SplitCalculation,
};
pub use replay::{
    replay_symbol, sort_events, timeline, EventPriority, ReplayEvent, ReplayOptions,
    DEFAULT_DIVIDEND_WITHHOLDING,
};
pub use tracker::{Applied, LotTracker, RescaleError};
