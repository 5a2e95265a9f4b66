//! Command-line tools for the ntx cost-basis engine.
//!
//! - `ntx-report`: holdings, summary, disposals, dividends, corporate
//!   actions and tax estimates for a ledger snapshot
//!
//! # Example Usage
//!
//! ```bash
//! ntx-report ledger.json holdings
//! ntx-report ledger.json summary --format json
//! ntx-report --config nepal.json ledger.json tax
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
pub mod ledger;
