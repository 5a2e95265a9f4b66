//! End-to-end booking scenarios.
//!
//! Each test replays a small ledger and checks the resulting lots,
//! disposals and income against hand-computed figures.

use chrono::NaiveDate;
use ntx_booking::{replay_symbol, Entitlement, ReplayOptions, SymbolBook};
use ntx_core::{
    ActionId, ActionKind, ActionStatus, BookingError, CorporateAction, Money, Percentage,
    Quantity, Ratio, Symbol, Transaction, TransactionId,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn symbol() -> Symbol {
    Symbol::new("NABIL")
}

fn buy(id: u64, d: NaiveDate, qty: i64, price: i64) -> Transaction {
    Transaction::buy(TransactionId(id), "NABIL", d, Quantity::new(qty), Money::from_major(price))
}

fn sell(id: u64, d: NaiveDate, qty: i64, price: i64) -> Transaction {
    Transaction::sell(TransactionId(id), "NABIL", d, Quantity::new(qty), Money::from_major(price))
}

fn replay(txns: &[Transaction], actions: &[CorporateAction]) -> SymbolBook {
    replay_symbol(&symbol(), txns, actions, &ReplayOptions::default()).unwrap()
}

// ============================================================================
// FIFO
// ============================================================================

#[test]
fn test_fifo_consumes_oldest_first() {
    let book = replay(
        &[
            buy(1, date(2024, 1, 1), 100, 10),
            buy(2, date(2024, 2, 1), 50, 12),
            sell(3, date(2024, 3, 1), 120, 15),
        ],
        &[],
    );

    let disposals = book.disposals();
    assert_eq!(disposals.len(), 2);
    assert_eq!(disposals[0].acquired, date(2024, 1, 1));
    assert_eq!(disposals[0].quantity, Quantity::new(100));
    assert_eq!(disposals[1].acquired, date(2024, 2, 1));
    assert_eq!(disposals[1].quantity, Quantity::new(20));

    let holding = book.holding();
    assert_eq!(holding.quantity, Quantity::new(30));
    assert_eq!(holding.lots.len(), 1);
    assert_eq!(holding.lots[0].unit_cost(), Money::from_major(12));
    assert_eq!(holding.average_cost, Money::from_major(12));
    assert!(book.check_invariants(Some(&holding)).is_empty());
}

#[test]
fn test_sell_everything_then_rebuy() {
    let book = replay(
        &[
            buy(1, date(2024, 1, 1), 10, 100),
            sell(2, date(2024, 1, 5), 10, 110),
            buy(3, date(2024, 1, 10), 5, 90),
        ],
        &[],
    );

    let holding = book.holding();
    assert_eq!(holding.quantity, Quantity::new(5));
    assert_eq!(holding.average_cost, Money::from_major(90));
    assert_eq!(holding.realized, Money::from_major(100));
}

#[test]
fn test_oversell_aborts_replay() {
    let err = replay_symbol(
        &symbol(),
        &[buy(1, date(2024, 1, 1), 10, 100), sell(2, date(2024, 1, 5), 11, 110)],
        &[],
        &ReplayOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.code(), "H001");
}

// ============================================================================
// Corporate actions
// ============================================================================

#[test]
fn test_bonus_math() {
    let bonus = CorporateAction::new(
        ActionId(1),
        "NABIL",
        ActionKind::Bonus { ratio: Ratio::new(1, 10) },
        date(2024, 3, 1),
        date(2024, 3, 15),
    );
    let book = replay(&[buy(1, date(2024, 1, 1), 100, 10)], &[bonus]);

    let holding = book.holding();
    assert_eq!(holding.quantity, Quantity::new(110));
    assert_eq!(holding.total_cost, Money::from_major(1_000));
    assert_eq!(holding.average_cost, Money::from_major(1_000).per(Quantity::new(110)));
    assert_eq!(book.actions[0].status, ActionStatus::Processed);
}

#[test]
fn test_rights_math() {
    let rights = CorporateAction::new(
        ActionId(2),
        "NABIL",
        ActionKind::Rights {
            ratio: Ratio::new(1, 5),
            price: Money::from_major(500),
        },
        date(2024, 3, 1),
        date(2024, 4, 1),
    );
    let book = replay(&[buy(1, date(2024, 1, 1), 100, 600)], &[rights]);

    let holding = book.holding();
    assert_eq!(holding.quantity, Quantity::new(120));
    assert_eq!(holding.total_cost, Money::from_major(60_000 + 10_000));
    assert_eq!(
        book.actions[0].entitlement,
        Some(Entitlement::Shares {
            quantity: Quantity::new(20),
            cost: Money::from_major(10_000),
        })
    );
}

#[test]
fn test_percent_bonus() {
    let bonus = CorporateAction::new(
        ActionId(3),
        "NABIL",
        ActionKind::Bonus {
            ratio: "20%".parse().unwrap(),
        },
        date(2024, 3, 1),
        date(2024, 3, 15),
    );
    let book = replay(&[buy(1, date(2024, 1, 1), 55, 10)], &[bonus]);

    // floor(55 * 0.2) = 11
    assert_eq!(book.holding().quantity, Quantity::new(66));
}

#[test]
fn test_record_date_entitlement() {
    let bonus = CorporateAction::new(
        ActionId(1),
        "NABIL",
        ActionKind::Bonus { ratio: Ratio::new(1, 10) },
        date(2024, 3, 1),
        date(2024, 3, 15),
    );
    let book = replay(
        &[
            buy(1, date(2024, 1, 1), 100, 10),
            sell(2, date(2024, 3, 5), 50, 12),
            buy(3, date(2024, 3, 6), 200, 11),
        ],
        &[bonus],
    );

    assert_eq!(book.actions[0].record_quantity, Some(Quantity::new(100)));
    assert_eq!(book.holding().quantity, Quantity::new(260));
}

#[test]
fn test_dividend_action_income() {
    let dividend = CorporateAction::new(
        ActionId(5),
        "NABIL",
        ActionKind::Dividend {
            per_share: Money::from_major(10),
        },
        date(2024, 3, 1),
        date(2024, 3, 20),
    );
    let options = ReplayOptions::default().with_withholding(Percentage::from_percent(5));
    let book = replay_symbol(
        &symbol(),
        &[buy(1, date(2024, 1, 1), 150, 10)],
        &[dividend],
        &options,
    )
    .unwrap();

    let income = &book.dividends()[0];
    assert_eq!(income.gross, Money::from_major(1_500));
    assert_eq!(income.withholding, Money::from_major(75));
    assert_eq!(income.net, Money::from_major(1_425));
    assert_eq!(book.holding().dividend_income, Money::from_major(1_425));
    // Cash dividends never touch lots.
    assert_eq!(book.holding().total_cost, Money::from_major(1_500));
}

#[test]
fn test_split_then_sell() {
    let split = CorporateAction::new(
        ActionId(7),
        "NABIL",
        ActionKind::Split { ratio: Ratio::new(2, 1) },
        date(2024, 2, 1),
        date(2024, 2, 1),
    );
    let book = replay(
        &[buy(1, date(2024, 1, 1), 100, 10), sell(2, date(2024, 3, 1), 50, 6)],
        &[split],
    );

    let disposal = &book.disposals()[0];
    assert_eq!(disposal.cost, Money::from_major(250));
    assert_eq!(disposal.gain, Money::from_major(50));
    // Split lots keep their original acquisition date.
    assert_eq!(disposal.acquired, date(2024, 1, 1));
    assert_eq!(book.holding().quantity, Quantity::new(150));
}

#[test]
fn test_invalid_action_dates() {
    let bad = CorporateAction::new(
        ActionId(8),
        "NABIL",
        ActionKind::Bonus { ratio: Ratio::new(1, 10) },
        date(2024, 3, 15),
        date(2024, 3, 1),
    );
    let err = replay_symbol(
        &symbol(),
        &[buy(1, date(2024, 1, 1), 100, 10)],
        &[bad],
        &ReplayOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, BookingError::CorporateActionConflict { .. }));
}
