//! ntx-report - Cost-basis reports from a ledger snapshot.
//!
//! # Usage
//!
//! ```bash
//! ntx-report ledger.json holdings --lots
//! ntx-report ledger.json summary
//! ntx-report ledger.json disposals --symbol NABIL
//! ntx-report ledger.json tax --loss-policy net
//! ntx-report ledger.json preview 12
//! ```
//!
//! # Reports
//!
//! - `holdings` - Open positions, optionally with their lots
//! - `summary` - Portfolio totals at the snapshot's prices
//! - `disposals` - Realized lot consumptions
//! - `dividends` - Cash dividend income
//! - `actions` - Corporate actions and what they granted
//! - `tax` - Capital gains tax estimate
//! - `preview` - Effect of one corporate action on the current holding
//! - `check` - Re-verify lot invariants

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use ntx_booking::{Entitlement, Preview};
use ntx_core::{ActionId, ActionStatus, Money, Percentage, Symbol};
use ntx_portfolio::{DisposalFilter, Engine, EngineConfig, LossPolicy, PortfolioId};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::ledger::{read_config, LedgerFile};

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables (default)
    #[default]
    Text,
    /// JSON for tooling
    Json,
}

/// Loss treatment selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LossArg {
    /// Tax each gain; ignore losses
    Ignore,
    /// Net gains and losses within a period
    Net,
}

impl From<LossArg> for LossPolicy {
    fn from(arg: LossArg) -> Self {
        match arg {
            LossArg::Ignore => Self::Ignore,
            LossArg::Net => Self::NetWithinPeriod,
        }
    }
}

/// Corporate action state selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    /// Record date not reached
    Announced,
    /// Awaiting execution
    Pending,
    /// Applied
    Processed,
}

impl From<StatusArg> for ActionStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Announced => Self::Announced,
            StatusArg::Pending => Self::Pending,
            StatusArg::Processed => Self::Processed,
        }
    }
}

/// Generate cost-basis reports from a ledger snapshot.
#[derive(Parser, Debug)]
#[command(name = "ntx-report")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The ledger snapshot (JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// The report to generate
    #[command(subcommand)]
    pub report: Report,

    /// Engine configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t, global = true)]
    pub format: OutputFormat,

    /// Apply corporate actions up to this date (default: today)
    #[arg(long, value_name = "DATE", global = true)]
    pub as_of: Option<NaiveDate>,

    /// Override the short-term capital gains rate, e.g. `7.5%`
    #[arg(long, value_name = "RATE", global = true)]
    pub short_term_rate: Option<Percentage>,

    /// Override the long-term capital gains rate, e.g. `5%`
    #[arg(long, value_name = "RATE", global = true)]
    pub long_term_rate: Option<Percentage>,

    /// Override the holding days above which a gain is long-term
    #[arg(long, value_name = "DAYS", global = true)]
    pub long_term_days: Option<i64>,

    /// Override the loss treatment
    #[arg(long, value_enum, global = true)]
    pub loss_policy: Option<LossArg>,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available reports.
#[derive(Subcommand, Debug)]
pub enum Report {
    /// Show open holdings
    Holdings {
        /// Also list each open lot
        #[arg(long)]
        lots: bool,
    },
    /// Show portfolio totals
    Summary,
    /// Show realized disposals
    Disposals {
        /// Only this symbol
        #[arg(short, long)]
        symbol: Option<String>,
        /// Only the tax period containing this date
        #[arg(long, value_name = "DATE")]
        period_of: Option<NaiveDate>,
    },
    /// Show dividend income
    Dividends {
        /// Only this symbol
        #[arg(short, long)]
        symbol: Option<String>,
    },
    /// Show corporate actions
    Actions {
        /// Only this symbol
        #[arg(short, long)]
        symbol: Option<String>,
        /// Only this state
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Estimate capital gains tax
    Tax,
    /// Preview a corporate action from the snapshot
    Preview {
        /// Action id
        id: u64,
    },
    /// Verify lot invariants
    Check,
}

/// Main entry point for the report command.
pub fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut stdout = io::stdout().lock();
    match run(&args, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

/// Build the engine configuration from the config file and flag overrides.
pub fn engine_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(as_of) = args.as_of {
        config.as_of = Some(as_of);
    }
    if let Some(rate) = args.short_term_rate {
        config.tax.short_term_rate = rate;
    }
    if let Some(rate) = args.long_term_rate {
        config.tax.long_term_rate = rate;
    }
    if let Some(days) = args.long_term_days {
        config.tax.long_term_days = days;
    }
    if let Some(policy) = args.loss_policy {
        config.tax.loss_policy = policy.into();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Load the snapshot and write the requested report.
pub fn run<W: Write>(args: &Args, writer: &mut W) -> Result<()> {
    if !args.file.exists() {
        anyhow::bail!("file not found: {}", args.file.display());
    }

    let config = engine_config(args)?;
    debug!(file = %args.file.display(), ?config, "loading snapshot");
    let ledger = LedgerFile::read(&args.file)?;
    let engine = Engine::new(config);
    let portfolio = ledger.load_into(&engine)?;

    let view = View {
        engine: &engine,
        portfolio: &portfolio,
        format: args.format,
    };
    match &args.report {
        Report::Holdings { lots } => view.holdings(*lots, writer),
        Report::Summary => view.summary(&ledger, writer),
        Report::Disposals { symbol, period_of } => {
            let filter = DisposalFilter {
                symbol: symbol.as_deref().map(Symbol::new),
                period: period_of.map(|date| config.tax.period.period_of(date)),
            };
            view.disposals(&filter, writer)
        }
        Report::Dividends { symbol } => {
            let symbol = symbol.as_deref().map(Symbol::new);
            view.dividends(symbol.as_ref(), writer)
        }
        Report::Actions { symbol, status } => {
            view.actions(symbol.as_deref(), status.map(ActionStatus::from), writer)
        }
        Report::Tax => view.tax(writer),
        Report::Preview { id } => view.preview(&ledger, ActionId(*id), writer),
        Report::Check => view.check(writer),
    }
}

struct View<'a> {
    engine: &'a Engine,
    portfolio: &'a PortfolioId,
    format: OutputFormat,
}

impl View<'_> {
    /// Write `value` as JSON when asked to; returns whether it did.
    fn json<W: Write, T: Serialize + ?Sized>(&self, value: &T, writer: &mut W) -> Result<bool> {
        match self.format {
            OutputFormat::Text => Ok(false),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)?;
                writeln!(writer)?;
                Ok(true)
            }
        }
    }

    fn holdings<W: Write>(&self, lots: bool, writer: &mut W) -> Result<()> {
        let holdings = self.engine.holdings(self.portfolio);
        if self.json(&holdings, writer)? {
            return Ok(());
        }

        writeln!(writer, "Holdings")?;
        writeln!(writer, "{}", "=".repeat(64))?;
        writeln!(writer)?;
        if holdings.is_empty() {
            writeln!(writer, "No open holdings.")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<10} {:>10} {:>14} {:>16}",
            "Symbol", "Quantity", "Avg cost", "Invested"
        )?;
        for holding in &holdings {
            writeln!(
                writer,
                "{:<10} {:>10} {:>14} {:>16}",
                holding.symbol.to_string(),
                holding.quantity.to_string(),
                holding.average_cost.to_string(),
                holding.total_cost.to_string()
            )?;
            if lots {
                for lot in &holding.lots {
                    writeln!(
                        writer,
                        "  {:<8} {}  {:>10} @ {:>12}",
                        lot.source.to_string(),
                        lot.acquired,
                        lot.quantity.to_string(),
                        lot.unit_cost().to_string()
                    )?;
                }
            }
        }
        Ok(())
    }

    fn summary<W: Write>(&self, ledger: &LedgerFile, writer: &mut W) -> Result<()> {
        let summary = self.engine.summary(self.portfolio, &ledger.prices);
        if self.json(&summary, writer)? {
            return Ok(());
        }

        writeln!(writer, "Portfolio Summary")?;
        writeln!(writer, "{}", "=".repeat(40))?;
        writeln!(writer)?;
        let rows = [
            ("Invested", summary.invested.to_string()),
            ("Market value", summary.market_value.to_string()),
            ("Unrealized", summary.unrealized.to_string()),
            ("Realized", summary.realized.to_string()),
            ("Dividends", summary.dividend_income.to_string()),
            ("Total return", summary.total_return.to_string()),
            ("Return", summary.return_percent.to_string()),
            ("Estimated tax", summary.estimated_tax.to_string()),
        ];
        for (label, value) in rows {
            writeln!(writer, "  {label:<16}{value:>20}")?;
        }

        if !summary.price_unavailable.is_empty() {
            writeln!(writer)?;
            let symbols: Vec<String> = summary
                .price_unavailable
                .iter()
                .map(ToString::to_string)
                .collect();
            writeln!(writer, "Valued at cost (no price): {}", symbols.join(", "))?;
        }
        Ok(())
    }

    fn disposals<W: Write>(&self, filter: &DisposalFilter, writer: &mut W) -> Result<()> {
        let disposals = self.engine.disposals(self.portfolio, filter);
        if self.json(&disposals, writer)? {
            return Ok(());
        }

        writeln!(writer, "Disposals ({} total)", disposals.len())?;
        writeln!(writer, "{}", "=".repeat(80))?;
        writeln!(writer)?;
        for d in &disposals {
            writeln!(
                writer,
                "{} {:<8} {:>8} from {:<6} ({:>4}d) cost {:>12} proceeds {:>12} gain {:>12}",
                d.disposed,
                d.symbol.to_string(),
                d.quantity.to_string(),
                d.lot.to_string(),
                d.holding_days(),
                d.cost.to_string(),
                d.proceeds.to_string(),
                d.gain.to_string()
            )?;
        }
        Ok(())
    }

    fn dividends<W: Write>(&self, symbol: Option<&Symbol>, writer: &mut W) -> Result<()> {
        let dividends = self.engine.dividends(self.portfolio, symbol);
        if self.json(&dividends, writer)? {
            return Ok(());
        }

        writeln!(writer, "Dividend Income")?;
        writeln!(writer, "{}", "=".repeat(60))?;
        writeln!(writer)?;
        if dividends.is_empty() {
            writeln!(writer, "No dividends found.")?;
            return Ok(());
        }
        for d in &dividends {
            writeln!(
                writer,
                "{} {:<8} {:>8} x {:>8}  gross {:>12}  withheld {:>10}  net {:>12}",
                d.paid,
                d.symbol.to_string(),
                d.quantity.to_string(),
                d.per_share.to_string(),
                d.gross.to_string(),
                d.withholding.to_string(),
                d.net.to_string()
            )?;
        }
        let total: Money = dividends.iter().map(|d| d.net).sum();
        writeln!(writer)?;
        writeln!(writer, "Total net: {total}")?;
        Ok(())
    }

    fn actions<W: Write>(
        &self,
        symbol: Option<&str>,
        status: Option<ActionStatus>,
        writer: &mut W,
    ) -> Result<()> {
        let outcomes: Vec<_> = self
            .engine
            .action_statuses(self.portfolio)
            .into_iter()
            .filter(|o| symbol.map_or(true, |s| o.symbol.as_str() == s))
            .filter(|o| status.map_or(true, |s| o.status == s))
            .collect();
        if self.json(&outcomes, writer)? {
            return Ok(());
        }

        writeln!(writer, "Corporate Actions ({} total)", outcomes.len())?;
        writeln!(writer, "{}", "=".repeat(72))?;
        writeln!(writer)?;
        for outcome in &outcomes {
            writeln!(
                writer,
                "{:<6} {:<8} {:<10} record {}  exec {}  {}",
                outcome.id.to_string(),
                outcome.symbol.to_string(),
                outcome.status.to_string(),
                outcome.record_date,
                outcome.execution_date,
                outcome.description
            )?;
            match outcome.entitlement {
                Some(Entitlement::Shares { quantity, cost }) => {
                    writeln!(writer, "       +{quantity} shares at cost {cost}")?;
                }
                Some(Entitlement::Split { before, after }) => {
                    writeln!(writer, "       {before} -> {after} shares")?;
                }
                Some(Entitlement::Cash { net }) => {
                    writeln!(writer, "       {net} net cash")?;
                }
                None => {
                    if let Some(held) = outcome.record_quantity {
                        writeln!(writer, "       {held} shares held at record date")?;
                    }
                }
            }
        }
        Ok(())
    }

    fn tax<W: Write>(&self, writer: &mut W) -> Result<()> {
        let report = self.engine.tax_report(self.portfolio);
        if self.json(&report, writer)? {
            return Ok(());
        }

        writeln!(writer, "Capital Gains Tax Estimate ({})", report.loss_policy)?;
        writeln!(writer, "{}", "=".repeat(72))?;
        writeln!(writer)?;
        if report.lines.is_empty() {
            writeln!(writer, "No disposals found.")?;
            return Ok(());
        }
        for line in &report.lines {
            writeln!(
                writer,
                "{:<8} {:<8} {:<10} gains {:>12} losses {:>12} @ {:>6} tax {:>10}",
                line.period.to_string(),
                line.symbol.to_string(),
                line.class.to_string(),
                line.gains.to_string(),
                line.losses.to_string(),
                line.rate.to_string(),
                line.tax.to_string()
            )?;
        }
        writeln!(writer)?;
        for period in &report.periods {
            writeln!(
                writer,
                "{:<8} taxable {:>12} tax {:>10}",
                period.period.to_string(),
                period.taxable.to_string(),
                period.tax.to_string()
            )?;
        }
        writeln!(writer, "Total tax: {}", report.total_tax)?;
        Ok(())
    }

    fn preview<W: Write>(&self, ledger: &LedgerFile, id: ActionId, writer: &mut W) -> Result<()> {
        let action = ledger
            .actions
            .iter()
            .find(|a| a.id == id)
            .with_context(|| format!("no corporate action {id} in snapshot"))?;
        let preview = self
            .engine
            .preview(self.portfolio, action)
            .with_context(|| format!("cannot preview {id}"))?;
        if self.json(&preview, writer)? {
            return Ok(());
        }

        writeln!(writer, "{}: {}", action.symbol, action.description())?;
        writeln!(writer, "{}", "=".repeat(40))?;
        match &preview {
            Preview::Bonus(calc) => {
                writeln!(writer, "  Held          {:>14}", calc.current_holding.to_string())?;
                writeln!(writer, "  Bonus shares  {:>14}", calc.bonus_shares.to_string())?;
                writeln!(writer, "  New total     {:>14}", calc.new_total_shares.to_string())?;
                writeln!(writer, "  New avg cost  {:>14}", calc.new_average_cost.to_string())?;
            }
            Preview::Rights(calc) => {
                writeln!(writer, "  Held          {:>14}", calc.current_holding.to_string())?;
                writeln!(writer, "  Entitled      {:>14}", calc.rights_entitled.to_string())?;
                writeln!(writer, "  Investment    {:>14}", calc.total_investment.to_string())?;
                writeln!(writer, "  New total     {:>14}", calc.new_total_shares.to_string())?;
                writeln!(writer, "  New avg cost  {:>14}", calc.new_average_cost.to_string())?;
            }
            Preview::Split(calc) => {
                writeln!(writer, "  Held          {:>14}", calc.current_holding.to_string())?;
                writeln!(writer, "  New total     {:>14}", calc.new_total_shares.to_string())?;
                writeln!(writer, "  New avg cost  {:>14}", calc.new_average_cost.to_string())?;
            }
            Preview::Dividend(calc) => {
                writeln!(writer, "  Held          {:>14}", calc.current_holding.to_string())?;
                writeln!(writer, "  Gross         {:>14}", calc.total_dividend.to_string())?;
                writeln!(writer, "  Withheld      {:>14}", calc.tax_deduction.to_string())?;
                writeln!(writer, "  Net           {:>14}", calc.net_dividend.to_string())?;
            }
        }
        Ok(())
    }

    fn check<W: Write>(&self, writer: &mut W) -> Result<()> {
        let problems = self.engine.check_integrity(self.portfolio);
        if !self.json(&problems, writer)? {
            for problem in &problems {
                writeln!(writer, "{problem}")?;
            }
        }
        if !problems.is_empty() {
            anyhow::bail!("{} integrity problem(s)", problems.len());
        }
        if matches!(self.format, OutputFormat::Text) {
            writeln!(writer, "ok")?;
        }
        Ok(())
    }
}
