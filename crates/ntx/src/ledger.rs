//! Ledger snapshot files.
//!
//! A snapshot is one JSON document holding already-normalized input:
//!
//! ```json
//! {
//!   "portfolio": "main",
//!   "transactions": [
//!     { "id": 1, "symbol": "NABIL", "kind": "buy", "date": "2024-01-15",
//!       "quantity": 100, "price": 52050, "fees": 15000 }
//!   ],
//!   "actions": [
//!     { "id": 1, "symbol": "NABIL", "kind": { "type": "bonus", "ratio": "1:10" },
//!       "announced": "2024-02-20", "record_date": "2024-03-01",
//!       "execution_date": "2024-03-20" }
//!   ],
//!   "prices": { "NABIL": 55000 }
//! }
//! ```
//!
//! Amounts are in paisa; ratios are `"new:held"` or a percentage.

use std::collections::BTreeMap;
use std::fs;
use std::ops::ControlFlow;
use std::path::Path;

use anyhow::{Context, Result};
use ntx_core::{CorporateAction, Money, Symbol, Transaction};
use ntx_portfolio::{Engine, EngineConfig, PortfolioId};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Portfolio id used when a snapshot does not name one.
pub const DEFAULT_PORTFOLIO: &str = "default";

/// A ledger snapshot as read from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerFile {
    /// Portfolio the transactions belong to
    pub portfolio: Option<String>,
    /// Transactions, oldest first per symbol
    pub transactions: Vec<Transaction>,
    /// Corporate actions for the traded symbols
    pub actions: Vec<CorporateAction>,
    /// Last traded price per symbol
    pub prices: BTreeMap<Symbol, Money>,
}

impl LedgerFile {
    /// Parse a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid ledger snapshot")
    }

    /// Read a snapshot file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("failed to load {}", path.display()))
    }

    /// The portfolio id.
    pub fn portfolio_id(&self) -> PortfolioId {
        PortfolioId::new(self.portfolio.as_deref().unwrap_or(DEFAULT_PORTFOLIO))
    }

    /// Register the actions and import the transactions into `engine`.
    ///
    /// Fails if any action or any symbol is rejected.
    pub fn load_into(&self, engine: &Engine) -> Result<PortfolioId> {
        for action in &self.actions {
            engine
                .register_action(action.clone())
                .with_context(|| format!("corporate action {} for {}", action.id, action.symbol))?;
        }

        let portfolio = self.portfolio_id();
        let report = engine.import_batch(&portfolio, self.transactions.clone(), |progress| {
            debug!(
                symbol = %progress.symbol,
                processed = progress.processed,
                total = progress.total,
                "replayed"
            );
            ControlFlow::Continue(())
        });

        if !report.failed.is_empty() {
            for failure in &report.failed {
                error!(symbol = %failure.symbol, code = failure.code, "{}", failure.message);
            }
            let first = &report.failed[0];
            anyhow::bail!(
                "{} symbol(s) rejected; first: {} [{}] {}",
                report.failed.len(),
                first.symbol,
                first.code,
                first.message
            );
        }
        Ok(portfolio)
    }
}

/// Read an engine configuration file.
pub fn read_config(path: &Path) -> Result<EngineConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&text)
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntx_core::{ActionKind, Quantity, TransactionKind};

    const SNAPSHOT: &str = r#"{
        "transactions": [
            {"id": 1, "symbol": "NABIL", "kind": "buy", "date": "2024-01-01",
             "quantity": 100, "price": 1000},
            {"id": 2, "symbol": "NABIL", "kind": "sell", "date": "2024-03-01",
             "quantity": 40, "price": 1500, "fees": 500}
        ],
        "actions": [
            {"id": 7, "symbol": "NABIL", "kind": {"type": "bonus", "ratio": "1:10"},
             "announced": "2024-01-20", "record_date": "2024-02-01",
             "execution_date": "2024-02-10"}
        ],
        "prices": {"NABIL": 2000}
    }"#;

    #[test]
    fn test_parse_snapshot() {
        let ledger = LedgerFile::from_json(SNAPSHOT).unwrap();
        assert_eq!(ledger.portfolio_id().as_str(), DEFAULT_PORTFOLIO);
        assert_eq!(ledger.transactions[1].kind, TransactionKind::Sell);
        assert_eq!(ledger.transactions[1].fees, Money::from_major(5));
        assert!(matches!(ledger.actions[0].kind, ActionKind::Bonus { .. }));
        assert_eq!(ledger.prices[&Symbol::new("NABIL")], Money::from_major(20));
    }

    #[test]
    fn test_load_into_engine() {
        let ledger = LedgerFile::from_json(SNAPSHOT).unwrap();
        let engine = Engine::new(EngineConfig::default());
        let portfolio = ledger.load_into(&engine).unwrap();

        // 100 + 10 bonus - 40 sold
        let holding = engine.holding(&portfolio, &Symbol::new("NABIL")).unwrap();
        assert_eq!(holding.quantity, Quantity::new(70));
    }

    #[test]
    fn test_rejected_symbol_fails_load() {
        let ledger = LedgerFile::from_json(
            r#"{"transactions": [
                {"id": 1, "symbol": "API", "kind": "sell", "date": "2024-01-01",
                 "quantity": 5, "price": 100}
            ]}"#,
        )
        .unwrap();
        let engine = Engine::new(EngineConfig::default());
        let err = ledger.load_into(&engine).unwrap_err();
        assert!(err.to_string().contains("H001"), "{err}");
    }

    #[test]
    fn test_invalid_json_has_context() {
        let err = LedgerFile::from_json("{ not json").unwrap_err();
        assert_eq!(err.to_string(), "invalid ledger snapshot");
    }
}
