//! Corporate action processing.
//!
//! Entitlements are fixed by a snapshot taken at the record date and paid
//! out at the execution date. Both steps run inside the chronological
//! replay, so a sale between the two dates never changes an entitlement.
//!
//! | Action   | Effect at execution |
//! |----------|---------------------|
//! | Bonus    | new lot of `floor(held * a / b)` shares at zero cost |
//! | Rights   | new lot of the same size at the rights price |
//! | Split    | every open lot rescaled by `a / b`, cost unchanged |
//! | Dividend | income of `held * per_share` less withholding |

use std::collections::{HashMap, HashSet};

use ntx_core::{
    ActionId, ActionKind, BookingError, ConflictReason, CorporateAction, DividendIncome,
    IncomeSource, Lot, LotSource, Money, Percentage, Quantity, Ratio, Symbol, ValidationIssue,
};
use serde::Serialize;

use crate::{LotTracker, RescaleError};

/// What executing an action did to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionEffect {
    /// A bonus or rights lot was added (none when the entitlement rounds to zero).
    Shares {
        /// Shares held at the record date.
        record_quantity: Quantity,
        /// The new lot.
        lot: Option<Lot>,
    },
    /// Lots were rescaled.
    Split {
        /// Shares before.
        before: Quantity,
        /// Shares after.
        after: Quantity,
    },
    /// Dividend income was booked.
    Income(DividendIncome),
}

/// Applies corporate actions to a [`LotTracker`], each at most once.
#[derive(Debug, Clone)]
pub struct CorporateActionProcessor {
    withholding: Percentage,
    snapshots: HashMap<ActionId, Quantity>,
    applied: HashSet<ActionId>,
}

impl CorporateActionProcessor {
    /// Create a processor that withholds `withholding` from cash dividends.
    #[must_use]
    pub fn new(withholding: Percentage) -> Self {
        Self {
            withholding,
            snapshots: HashMap::new(),
            applied: HashSet::new(),
        }
    }

    /// Check if `id` has been executed by this processor.
    #[must_use]
    pub fn is_applied(&self, id: ActionId) -> bool {
        self.applied.contains(&id)
    }

    /// Quantity captured at the record date of `id`, if taken.
    #[must_use]
    pub fn snapshot(&self, id: ActionId) -> Option<Quantity> {
        self.snapshots.get(&id).copied()
    }

    /// Capture the shares held at the record date.
    pub fn record(
        &mut self,
        tracker: &LotTracker,
        action: &CorporateAction,
    ) -> Result<Quantity, BookingError> {
        check_action(tracker.symbol(), action)?;
        if self.applied.contains(&action.id) || self.snapshots.contains_key(&action.id) {
            return Err(BookingError::conflict(
                action.symbol.clone(),
                action.id,
                ConflictReason::DuplicateAction,
            ));
        }
        let held = tracker.quantity();
        self.snapshots.insert(action.id, held);
        Ok(held)
    }

    /// Apply the action at its execution date.
    ///
    /// Uses the record-date snapshot when one was taken, otherwise the
    /// current holding. On error neither the tracker nor the processor
    /// changes.
    pub fn execute(
        &mut self,
        tracker: &mut LotTracker,
        action: &CorporateAction,
    ) -> Result<ActionEffect, BookingError> {
        check_action(tracker.symbol(), action)?;
        if self.applied.contains(&action.id) {
            return Err(BookingError::conflict(
                action.symbol.clone(),
                action.id,
                ConflictReason::AlreadyProcessed,
            ));
        }
        let record_quantity = self
            .snapshots
            .get(&action.id)
            .copied()
            .unwrap_or_else(|| tracker.quantity());

        let effect = match action.kind {
            ActionKind::Bonus { ratio } => {
                let lot = entitlement_lot(action, ratio.apply(record_quantity), Money::ZERO)?;
                if let Some(lot) = &lot {
                    tracker.acquire(lot.clone())?;
                }
                ActionEffect::Shares {
                    record_quantity,
                    lot,
                }
            }
            ActionKind::Rights { ratio, price } => {
                let lot = entitlement_lot(action, ratio.apply(record_quantity), price)?;
                if let Some(lot) = &lot {
                    tracker.acquire(lot.clone())?;
                }
                ActionEffect::Shares {
                    record_quantity,
                    lot,
                }
            }
            ActionKind::Split { ratio } => {
                let before = tracker.quantity();
                let (numerator, denominator) = ratio.fraction();
                tracker
                    .rescale(numerator, denominator)
                    .map_err(|err| match err {
                        RescaleError::Overflow => {
                            BookingError::validation(None, ValidationIssue::Overflow)
                        }
                        RescaleError::EliminatesHolding(held) => BookingError::conflict(
                            action.symbol.clone(),
                            action.id,
                            ConflictReason::EliminatesHolding(held),
                        ),
                    })?;
                ActionEffect::Split {
                    before,
                    after: tracker.quantity(),
                }
            }
            ActionKind::Dividend { per_share } => {
                if per_share.checked_times(record_quantity).is_none() {
                    return Err(BookingError::validation(None, ValidationIssue::Overflow));
                }
                let income = DividendIncome::compute(
                    IncomeSource::Action(action.id),
                    action.symbol.clone(),
                    action.record_date,
                    action.execution_date,
                    record_quantity,
                    per_share,
                    self.withholding,
                );
                tracker.book_dividend(income.clone());
                ActionEffect::Income(income)
            }
        };

        self.snapshots.remove(&action.id);
        self.applied.insert(action.id);
        Ok(effect)
    }
}

fn check_action(symbol: &Symbol, action: &CorporateAction) -> Result<(), BookingError> {
    action.validate()?;
    if &action.symbol != symbol {
        return Err(BookingError::validation(
            None,
            ValidationIssue::SymbolMismatch {
                expected: symbol.clone(),
                got: action.symbol.clone(),
            },
        ));
    }
    Ok(())
}

fn entitlement_lot(
    action: &CorporateAction,
    shares: Quantity,
    price: Money,
) -> Result<Option<Lot>, BookingError> {
    if !shares.is_positive() {
        return Ok(None);
    }
    let cost = price
        .checked_times(shares)
        .ok_or_else(|| BookingError::validation(None, ValidationIssue::Overflow))?;
    Ok(Some(Lot::new(
        LotSource::Action(action.id),
        action.execution_date,
        shares,
        cost,
    )))
}

/// Effect of a bonus issue on a holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BonusCalculation {
    /// Security symbol
    pub symbol: Symbol,
    /// Shares held before the issue
    pub current_holding: Quantity,
    /// Issue ratio
    pub ratio: Ratio,
    /// Shares received
    pub bonus_shares: Quantity,
    /// Holding after the issue
    pub new_total_shares: Quantity,
    /// Average cost after the issue
    pub new_average_cost: Money,
}

/// Effect of a rights offering on a holding, assuming full subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RightsCalculation {
    /// Security symbol
    pub symbol: Symbol,
    /// Shares held before the offering
    pub current_holding: Quantity,
    /// Offering ratio
    pub ratio: Ratio,
    /// Shares the holder may subscribe
    pub rights_entitled: Quantity,
    /// Subscription price per share
    pub rights_price: Money,
    /// Cash needed to subscribe in full
    pub total_investment: Money,
    /// Holding after subscription
    pub new_total_shares: Quantity,
    /// Average cost after subscription
    pub new_average_cost: Money,
}

/// Effect of a split on a holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitCalculation {
    /// Security symbol
    pub symbol: Symbol,
    /// Shares held before the split
    pub current_holding: Quantity,
    /// Split ratio
    pub ratio: Ratio,
    /// Holding after the split
    pub new_total_shares: Quantity,
    /// Average cost after the split
    pub new_average_cost: Money,
}

/// Cash dividend on a holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DividendCalculation {
    /// Security symbol
    pub symbol: Symbol,
    /// Shares entitled
    pub current_holding: Quantity,
    /// Cash per share
    pub dividend_rate: Money,
    /// Gross dividend
    pub total_dividend: Money,
    /// Tax withheld at source
    pub tax_deduction: Money,
    /// Cash received
    pub net_dividend: Money,
}

/// Outcome of [`preview`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Preview {
    /// Bonus issue.
    Bonus(BonusCalculation),
    /// Rights offering.
    Rights(RightsCalculation),
    /// Stock split.
    Split(SplitCalculation),
    /// Cash dividend.
    Dividend(DividendCalculation),
}

/// Compute what `action` would do to `held` shares carried at average cost `wac`.
///
/// Nothing is mutated. Split previews treat the holding as a single lot.
/// Fails if the action itself does not validate.
///
/// # Examples
///
/// ```
/// use ntx_booking::{preview, Preview};
/// use ntx_core::{ActionId, ActionKind, CorporateAction, Money, Percentage, Quantity, Ratio};
/// use chrono::NaiveDate;
///
/// let d = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
/// let bonus = CorporateAction::new(ActionId(1), "NABIL", ActionKind::Bonus { ratio: Ratio::new(1, 10) }, d, d);
///
/// let Preview::Bonus(calc) = preview(&bonus, Quantity::new(100), Money::from_major(11), Percentage::ZERO).unwrap() else {
///     unreachable!()
/// };
/// assert_eq!(calc.bonus_shares, Quantity::new(10));
/// assert_eq!(calc.new_average_cost, Money::from_major(10));
/// ```
pub fn preview(
    action: &CorporateAction,
    held: Quantity,
    wac: Money,
    withholding: Percentage,
) -> Result<Preview, BookingError> {
    action.validate()?;
    let cost = wac.times(held);
    let symbol = action.symbol.clone();
    let preview = match action.kind {
        ActionKind::Bonus { ratio } => {
            let bonus_shares = ratio.apply(held);
            let new_total_shares = held + bonus_shares;
            Preview::Bonus(BonusCalculation {
                symbol,
                current_holding: held,
                ratio,
                bonus_shares,
                new_total_shares,
                new_average_cost: cost.per(new_total_shares),
            })
        }
        ActionKind::Rights { ratio, price } => {
            let rights_entitled = ratio.apply(held);
            let total_investment = price.times(rights_entitled);
            let new_total_shares = held + rights_entitled;
            Preview::Rights(RightsCalculation {
                symbol,
                current_holding: held,
                ratio,
                rights_entitled,
                rights_price: price,
                total_investment,
                new_total_shares,
                new_average_cost: (cost + total_investment).per(new_total_shares),
            })
        }
        ActionKind::Split { ratio } => {
            let new_total_shares = ratio.apply(held);
            Preview::Split(SplitCalculation {
                symbol,
                current_holding: held,
                ratio,
                new_total_shares,
                new_average_cost: cost.per(new_total_shares),
            })
        }
        ActionKind::Dividend { per_share } => {
            let total_dividend = per_share.times(held);
            let tax_deduction = total_dividend.apply(withholding);
            Preview::Dividend(DividendCalculation {
                symbol,
                current_holding: held,
                dividend_rate: per_share,
                total_dividend,
                tax_deduction,
                net_dividend: total_dividend - tax_deduction,
            })
        }
    };
    Ok(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ntx_core::{Transaction, TransactionId};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn wht() -> Percentage {
        Percentage::from_percent(5)
    }

    fn holding(shares: i64, price: i64) -> LotTracker {
        let mut tracker = LotTracker::new("NABIL");
        tracker
            .apply(
                &Transaction::buy(
                    TransactionId(1),
                    "NABIL",
                    date(2024, 1, 1),
                    Quantity::new(shares),
                    Money::from_major(price),
                ),
                wht(),
            )
            .unwrap();
        tracker
    }

    fn action(id: u64, kind: ActionKind) -> CorporateAction {
        CorporateAction::new(ActionId(id), "NABIL", kind, date(2024, 6, 1), date(2024, 6, 15))
    }

    #[test]
    fn test_bonus_one_for_ten() {
        let mut tracker = holding(100, 10);
        let mut processor = CorporateActionProcessor::new(wht());
        let bonus = action(1, ActionKind::Bonus { ratio: Ratio::new(1, 10) });

        processor.record(&tracker, &bonus).unwrap();
        processor.execute(&mut tracker, &bonus).unwrap();

        assert_eq!(tracker.quantity(), Quantity::new(110));
        assert_eq!(tracker.total_cost(), Money::from_major(1_000));
        assert_eq!(tracker.average_cost(), Money::from_major(1_000).per(Quantity::new(110)));
        assert_eq!(tracker.lots()[1].acquired, date(2024, 6, 15));
        assert_eq!(tracker.lots()[1].source, LotSource::Action(ActionId(1)));
        assert!(tracker.check_invariants().is_empty());
    }

    #[test]
    fn test_rights_one_for_five() {
        let mut tracker = holding(100, 400);
        let mut processor = CorporateActionProcessor::new(wht());
        let rights = action(
            2,
            ActionKind::Rights {
                ratio: Ratio::new(1, 5),
                price: Money::from_major(500),
            },
        );

        processor.execute(&mut tracker, &rights).unwrap();

        assert_eq!(tracker.quantity(), Quantity::new(120));
        assert_eq!(tracker.total_cost(), Money::from_major(40_000 + 10_000));
    }

    #[test]
    fn test_record_snapshot_survives_later_sale() {
        let mut tracker = holding(100, 10);
        let mut processor = CorporateActionProcessor::new(wht());
        let bonus = action(1, ActionKind::Bonus { ratio: Ratio::new(1, 10) });

        assert_eq!(processor.record(&tracker, &bonus).unwrap(), Quantity::new(100));
        tracker
            .apply(
                &Transaction::sell(
                    TransactionId(2),
                    "NABIL",
                    date(2024, 6, 5),
                    Quantity::new(100),
                    Money::from_major(12),
                ),
                wht(),
            )
            .unwrap();
        let effect = processor.execute(&mut tracker, &bonus).unwrap();

        assert!(matches!(effect, ActionEffect::Shares { record_quantity, .. } if record_quantity == Quantity::new(100)));
        assert_eq!(tracker.quantity(), Quantity::new(10));
    }

    #[test]
    fn test_execute_twice_conflicts() {
        let mut tracker = holding(100, 10);
        let mut processor = CorporateActionProcessor::new(wht());
        let bonus = action(1, ActionKind::Bonus { ratio: Ratio::new(1, 10) });

        processor.execute(&mut tracker, &bonus).unwrap();
        let before = tracker.clone();
        let err = processor.execute(&mut tracker, &bonus).unwrap_err();

        assert_eq!(
            err,
            BookingError::conflict(Symbol::new("NABIL"), ActionId(1), ConflictReason::AlreadyProcessed)
        );
        assert_eq!(tracker, before);
        assert!(processor.is_applied(ActionId(1)));
    }

    #[test]
    fn test_split_two_for_one() {
        let mut tracker = holding(100, 10);
        let mut processor = CorporateActionProcessor::new(wht());
        let split = action(3, ActionKind::Split { ratio: Ratio::new(2, 1) });

        processor.execute(&mut tracker, &split).unwrap();

        assert_eq!(tracker.quantity(), Quantity::new(200));
        assert_eq!(tracker.total_cost(), Money::from_major(1_000));
        assert_eq!(tracker.average_cost(), Money::from_major(5));
    }

    #[test]
    fn test_reverse_split_drops_fraction() {
        let mut tracker = holding(101, 10);
        let mut processor = CorporateActionProcessor::new(wht());
        let split = action(3, ActionKind::Split { ratio: Ratio::new(1, 2) });

        processor.execute(&mut tracker, &split).unwrap();

        assert_eq!(tracker.quantity(), Quantity::new(50));
        assert_eq!(tracker.total_cost(), Money::from_major(1_010));
    }

    #[test]
    fn test_consolidation_below_one_share_rejected() {
        let mut tracker = holding(1, 1_000);
        let mut processor = CorporateActionProcessor::new(wht());
        let split = action(3, ActionKind::Split { ratio: Ratio::new(1, 2) });
        let before = tracker.clone();

        let err = processor.execute(&mut tracker, &split).unwrap_err();
        assert_eq!(
            err,
            BookingError::conflict(
                Symbol::new("NABIL"),
                ActionId(3),
                ConflictReason::EliminatesHolding(Quantity::new(1)),
            )
        );
        assert_eq!(tracker, before);
        assert!(!processor.is_applied(ActionId(3)));
        assert!(tracker.check_invariants().is_empty());
    }

    #[test]
    fn test_zero_ratio_rejected_before_touching_lots() {
        let mut tracker = holding(100, 10);
        let mut processor = CorporateActionProcessor::new(wht());
        let split = action(3, ActionKind::Split { ratio: Ratio::new(1, 0) });
        let before = tracker.clone();

        let err = processor.execute(&mut tracker, &split).unwrap_err();
        assert_eq!(err.code(), "C001");
        assert_eq!(tracker, before);
        assert!(preview(&split, Quantity::new(100), Money::from_major(10), wht()).is_err());
    }

    #[test]
    fn test_failed_execute_keeps_snapshot() {
        let mut tracker = holding(1, 10);
        let mut processor = CorporateActionProcessor::new(wht());
        let split = action(3, ActionKind::Split { ratio: Ratio::new(1, 2) });

        processor.record(&tracker, &split).unwrap();
        assert!(processor.execute(&mut tracker, &split).is_err());
        assert_eq!(processor.snapshot(ActionId(3)), Some(Quantity::new(1)));
    }

    #[test]
    fn test_dividend_uses_record_quantity() {
        let mut tracker = holding(150, 10);
        let mut processor = CorporateActionProcessor::new(wht());
        let dividend = action(4, ActionKind::Dividend { per_share: Money::from_major(10) });

        processor.record(&tracker, &dividend).unwrap();
        let ActionEffect::Income(income) = processor.execute(&mut tracker, &dividend).unwrap() else {
            panic!("expected income");
        };

        assert_eq!(income.gross, Money::from_major(1_500));
        assert_eq!(income.net, Money::from_major(1_425));
        assert_eq!(income.paid, date(2024, 6, 15));
        assert_eq!(tracker.total_cost(), Money::from_major(1_500));
    }

    #[test]
    fn test_symbol_mismatch() {
        let tracker = holding(100, 10);
        let mut processor = CorporateActionProcessor::new(wht());
        let other = CorporateAction::new(
            ActionId(9),
            "API",
            ActionKind::Bonus { ratio: Ratio::new(1, 10) },
            date(2024, 6, 1),
            date(2024, 6, 15),
        );
        assert!(processor.record(&tracker, &other).is_err());
    }

    #[test]
    fn test_preview_rights() {
        let rights = action(
            2,
            ActionKind::Rights {
                ratio: Ratio::new(1, 5),
                price: Money::from_major(100),
            },
        );
        let Preview::Rights(calc) =
            preview(&rights, Quantity::new(100), Money::from_major(400), wht()).unwrap()
        else {
            panic!("expected rights preview");
        };
        assert_eq!(calc.rights_entitled, Quantity::new(20));
        assert_eq!(calc.total_investment, Money::from_major(2_000));
        assert_eq!(calc.new_total_shares, Quantity::new(120));
        // (40,000 + 2,000) / 120
        assert_eq!(calc.new_average_cost, Money::from_major(350));
    }

    #[test]
    fn test_preview_dividend() {
        let dividend = action(4, ActionKind::Dividend { per_share: Money::from_minor(550) });
        let Preview::Dividend(calc) =
            preview(&dividend, Quantity::new(200), Money::from_major(300), wht()).unwrap()
        else {
            panic!("expected dividend preview");
        };
        assert_eq!(calc.total_dividend, Money::from_major(1_100));
        assert_eq!(calc.tax_deduction, Money::from_major(55));
        assert_eq!(calc.net_dividend, Money::from_major(1_045));
    }
}
