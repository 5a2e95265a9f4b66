//! Corporate action records.
//!
//! A [`CorporateAction`] is announced by the issuer, fixes entitlement on its
//! record date and takes effect on its execution date:
//!
//! ```text
//! Announced --(record date)--> Pending --(execution date)--> Processed
//! ```
//!
//! Entitlement ratios are written either as `a:b` (a new shares for every
//! b held) or as a percentage (`20%` is 20 new shares per 100 held).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{BookingError, ConflictReason, Money, Quantity, Symbol};

/// Identifier of a corporate action.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CA-{}", self.0)
    }
}

/// Error returned when ratio text cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparseable ratio {0:?}")]
pub struct RatioError(pub String);

/// An entitlement or split ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Ratio {
    /// `new` shares for every `held` shares.
    Proportion {
        /// Shares issued.
        new: i64,
        /// Shares held.
        held: i64,
    },
    /// New shares as basis points of the holding.
    Percent(i64),
}

impl Ratio {
    /// Create an `a:b` ratio.
    ///
    /// The terms are not checked here; [`CorporateAction::validate`] rejects
    /// a ratio that fails [`Ratio::is_valid`]. Use [`Ratio::try_new`] to
    /// check at construction.
    #[must_use]
    pub const fn new(new: i64, held: i64) -> Self {
        Self::Proportion { new, held }
    }

    /// Create an `a:b` ratio, rejecting zero or negative terms.
    pub fn try_new(new: i64, held: i64) -> Result<Self, RatioError> {
        let ratio = Self::new(new, held);
        if ratio.is_valid() {
            Ok(ratio)
        } else {
            Err(RatioError(ratio.to_string()))
        }
    }

    /// Check that every term is strictly positive.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        match self {
            Self::Proportion { new, held } => new > 0 && held > 0,
            Self::Percent(bp) => bp > 0,
        }
    }

    /// The ratio as an exact fraction.
    #[must_use]
    pub const fn fraction(self) -> (i64, i64) {
        match self {
            Self::Proportion { new, held } => (new, held),
            Self::Percent(bp) => (bp, crate::money::BASIS_POINTS_PER_WHOLE),
        }
    }

    /// Apply the ratio to a holding, rounding down to whole shares.
    #[must_use]
    pub fn apply(self, held: Quantity) -> Quantity {
        let (numerator, denominator) = self.fraction();
        held.scale_floor(numerator, denominator)
    }
}

impl FromStr for Ratio {
    type Err = RatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = || RatioError(s.to_string());
        let trimmed = s.trim();

        if let Some(percent) = trimmed.strip_suffix('%') {
            let rate: crate::Percentage = percent.parse().map_err(|_| fail())?;
            if rate.basis_points() <= 0 {
                return Err(fail());
            }
            return Ok(Self::Percent(rate.basis_points()));
        }

        let (new, held) = trimmed.split_once(':').ok_or_else(fail)?;
        let new: i64 = new.trim().parse().map_err(|_| fail())?;
        let held: i64 = held.trim().parse().map_err(|_| fail())?;
        if new <= 0 || held <= 0 {
            return Err(fail());
        }
        Ok(Self::Proportion { new, held })
    }
}

impl TryFrom<String> for Ratio {
    type Error = RatioError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Ratio> for String {
    fn from(ratio: Ratio) -> Self {
        ratio.to_string()
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proportion { new, held } => write!(f, "{new}:{held}"),
            Self::Percent(bp) => write!(f, "{}", crate::Percentage::from_basis_points(*bp)),
        }
    }
}

/// What a corporate action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionKind {
    /// Free shares issued at zero cost.
    Bonus {
        /// Entitlement ratio.
        ratio: Ratio,
    },
    /// Shares offered at a subscription price.
    Rights {
        /// Entitlement ratio.
        ratio: Ratio,
        /// Subscription price per share.
        price: Money,
    },
    /// Every lot rescaled by the ratio.
    Split {
        /// New shares per old shares.
        ratio: Ratio,
    },
    /// Cash paid per share held on the record date.
    Dividend {
        /// Cash per share.
        per_share: Money,
    },
}

impl ActionKind {
    /// Short lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bonus { .. } => "bonus",
            Self::Rights { .. } => "rights",
            Self::Split { .. } => "split",
            Self::Dividend { .. } => "dividend",
        }
    }

    /// The entitlement or split ratio, if the kind carries one.
    #[must_use]
    pub const fn ratio(&self) -> Option<Ratio> {
        match *self {
            Self::Bonus { ratio } | Self::Rights { ratio, .. } | Self::Split { ratio } => {
                Some(ratio)
            }
            Self::Dividend { .. } => None,
        }
    }
}

/// Lifecycle state of a corporate action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    /// Known, record date not reached.
    #[default]
    Announced,
    /// Record date reached, awaiting execution.
    Pending,
    /// Applied. Terminal.
    Processed,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Announced => write!(f, "Announced"),
            Self::Pending => write!(f, "Pending"),
            Self::Processed => write!(f, "Processed"),
        }
    }
}

/// A bonus, rights, split or dividend event for one symbol.
///
/// # Examples
///
/// ```
/// use ntx_core::{ActionId, ActionKind, ActionStatus, CorporateAction, Ratio};
/// use chrono::NaiveDate;
///
/// let record = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
/// let execution = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
/// let action = CorporateAction::new(
///     ActionId(1),
///     "NABIL",
///     ActionKind::Bonus { ratio: "1:10".parse().unwrap() },
///     record,
///     execution,
/// );
///
/// assert_eq!(action.description(), "Bonus shares 1:10");
/// assert_eq!(action.status_on(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()), ActionStatus::Pending);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporateAction {
    /// Action id
    pub id: ActionId,
    /// Security symbol
    pub symbol: Symbol,
    /// What the action does
    pub kind: ActionKind,
    /// Date the issuer announced it
    pub announced: NaiveDate,
    /// Entitlement is fixed by the holding on this date
    pub record_date: NaiveDate,
    /// Date shares are credited or cash is paid
    pub execution_date: NaiveDate,
    /// Processed flag
    #[serde(default)]
    pub status: ActionStatus,
    /// Free-form notes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl CorporateAction {
    /// Create an action announced on its record date.
    #[must_use]
    pub fn new(
        id: ActionId,
        symbol: impl Into<Symbol>,
        kind: ActionKind,
        record_date: NaiveDate,
        execution_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            kind,
            announced: record_date,
            record_date,
            execution_date,
            status: ActionStatus::Announced,
            notes: String::new(),
        }
    }

    /// Set the announcement date.
    #[must_use]
    pub const fn with_announcement(mut self, announced: NaiveDate) -> Self {
        self.announced = announced;
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Lifecycle state implied by the calendar on `as_of`.
    #[must_use]
    pub fn status_on(&self, as_of: NaiveDate) -> ActionStatus {
        if as_of < self.record_date {
            ActionStatus::Announced
        } else if as_of < self.execution_date {
            ActionStatus::Pending
        } else {
            ActionStatus::Processed
        }
    }

    /// Check if the action still has to be applied on `as_of`.
    #[must_use]
    pub fn requires_processing(&self, as_of: NaiveDate) -> bool {
        self.status != ActionStatus::Processed && as_of >= self.execution_date
    }

    /// Check field-level constraints.
    pub fn validate(&self) -> Result<(), BookingError> {
        let conflict = |reason| {
            Err(BookingError::conflict(
                self.symbol.clone(),
                self.id,
                reason,
            ))
        };

        if self.announced > self.record_date || self.record_date > self.execution_date {
            return conflict(ConflictReason::InvalidDates);
        }
        if let Some(ratio) = self.kind.ratio() {
            if !ratio.is_valid() {
                return conflict(ConflictReason::InvalidRatio(ratio));
            }
        }
        match self.kind {
            ActionKind::Rights { price, .. } if price.is_negative() => {
                conflict(ConflictReason::NegativeAmount(price))
            }
            ActionKind::Dividend { per_share } if per_share.is_negative() => {
                conflict(ConflictReason::NegativeAmount(per_share))
            }
            ActionKind::Bonus { .. }
            | ActionKind::Rights { .. }
            | ActionKind::Split { .. }
            | ActionKind::Dividend { .. } => Ok(()),
        }
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> String {
        match self.kind {
            ActionKind::Bonus { ratio } => format!("Bonus shares {ratio}"),
            ActionKind::Rights { ratio, price } => format!("Rights shares {ratio} at {price}"),
            ActionKind::Split { ratio } => format!("Stock split {ratio}"),
            ActionKind::Dividend { per_share } => {
                format!("Cash dividend Rs. {per_share} per share")
            }
        }
    }

    /// How the action affects a holding.
    #[must_use]
    pub const fn impact(&self) -> &'static str {
        match self.kind {
            ActionKind::Bonus { .. } => "Increases share quantity, reduces average cost per share",
            ActionKind::Rights { .. } => "Adds shares at the subscription price",
            ActionKind::Split { .. } => {
                "Rescales share quantity, keeps total cost unchanged"
            }
            ActionKind::Dividend { .. } => "Provides cash income, no impact on share quantity",
        }
    }
}

/// Parse ratio text, reporting failure as a corporate action conflict.
pub fn parse_ratio(symbol: &Symbol, id: ActionId, text: &str) -> Result<Ratio, BookingError> {
    text.parse().map_err(|RatioError(raw)| {
        BookingError::conflict(symbol.clone(), id, ConflictReason::UnparseableRatio(raw))
    })
}

/// Criteria for selecting corporate actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFilter {
    /// Only this symbol.
    pub symbol: Option<Symbol>,
    /// Only this kind (by name, e.g. `"bonus"`).
    pub kind: Option<String>,
    /// Only this status.
    pub status: Option<ActionStatus>,
    /// Execution on or after this date.
    pub from: Option<NaiveDate>,
    /// Execution on or before this date.
    pub to: Option<NaiveDate>,
}

impl ActionFilter {
    /// Check if an action with the given status passes the filter.
    #[must_use]
    pub fn matches(&self, action: &CorporateAction, status: ActionStatus) -> bool {
        if self.symbol.as_ref().is_some_and(|s| *s != action.symbol) {
            return false;
        }
        if self
            .kind
            .as_deref()
            .is_some_and(|k| !k.eq_ignore_ascii_case(action.kind.name()))
        {
            return false;
        }
        if self.status.is_some_and(|s| s != status) {
            return false;
        }
        if self.from.is_some_and(|d| action.execution_date < d) {
            return false;
        }
        if self.to.is_some_and(|d| action.execution_date > d) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn bonus(ratio: &str) -> CorporateAction {
        CorporateAction::new(
            ActionId(1),
            "NABIL",
            ActionKind::Bonus {
                ratio: ratio.parse().unwrap(),
            },
            date(2024, 3, 1),
            date(2024, 3, 20),
        )
        .with_announcement(date(2024, 2, 1))
    }

    #[test]
    fn test_ratio_parse() {
        assert_eq!("1:10".parse::<Ratio>().unwrap(), Ratio::new(1, 10));
        assert_eq!(" 2 : 1 ".parse::<Ratio>().unwrap(), Ratio::new(2, 1));
        assert_eq!("20%".parse::<Ratio>().unwrap(), Ratio::Percent(2000));
        assert_eq!("12.5%".parse::<Ratio>().unwrap(), Ratio::Percent(1250));
        assert!("1:0".parse::<Ratio>().is_err());
        assert!("1-10".parse::<Ratio>().is_err());
        assert!("x%".parse::<Ratio>().is_err());
        assert!("".parse::<Ratio>().is_err());
    }

    #[test]
    fn test_ratio_apply() {
        assert_eq!(Ratio::new(1, 10).apply(Quantity::new(100)), Quantity::new(10));
        assert_eq!(Ratio::new(1, 10).apply(Quantity::new(109)), Quantity::new(10));
        assert_eq!(Ratio::Percent(2000).apply(Quantity::new(55)), Quantity::new(11));
        assert_eq!(Ratio::Percent(1250).apply(Quantity::new(10)), Quantity::new(1));
    }

    #[test]
    fn test_ratio_serde_as_string() {
        let json = serde_json::to_string(&Ratio::new(1, 5)).unwrap();
        assert_eq!(json, "\"1:5\"");
        let ratio: Ratio = serde_json::from_str("\"20%\"").unwrap();
        assert_eq!(ratio, Ratio::Percent(2000));
        assert!(serde_json::from_str::<Ratio>("\"five\"").is_err());
    }

    #[test]
    fn test_parse_ratio_conflict() {
        let err = parse_ratio(&Symbol::new("API"), ActionId(4), "abc").unwrap_err();
        assert!(matches!(
            err,
            BookingError::CorporateActionConflict {
                reason: ConflictReason::UnparseableRatio(_),
                ..
            }
        ));
    }

    #[test]
    fn test_status_on() {
        let action = bonus("1:10");
        assert_eq!(action.status_on(date(2024, 2, 15)), ActionStatus::Announced);
        assert_eq!(action.status_on(date(2024, 3, 1)), ActionStatus::Pending);
        assert_eq!(action.status_on(date(2024, 3, 20)), ActionStatus::Processed);
        assert!(action.requires_processing(date(2024, 4, 1)));
        assert!(!action.requires_processing(date(2024, 3, 10)));
    }

    #[test]
    fn test_validate_dates() {
        let mut action = bonus("1:10");
        assert!(action.validate().is_ok());

        action.execution_date = date(2024, 2, 20);
        assert!(matches!(
            action.validate(),
            Err(BookingError::CorporateActionConflict {
                reason: ConflictReason::InvalidDates,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_degenerate_ratio() {
        for ratio in [Ratio::new(1, 0), Ratio::new(0, 1), Ratio::new(-1, 2), Ratio::Percent(0)] {
            let split = CorporateAction::new(
                ActionId(5),
                "NABIL",
                ActionKind::Split { ratio },
                date(2024, 3, 1),
                date(2024, 3, 20),
            );
            assert_eq!(
                split.validate(),
                Err(BookingError::conflict(
                    Symbol::new("NABIL"),
                    ActionId(5),
                    ConflictReason::InvalidRatio(ratio),
                )),
                "{ratio}"
            );
        }

        assert!(Ratio::try_new(1, 0).is_err());
        assert_eq!(Ratio::try_new(2, 1), Ok(Ratio::new(2, 1)));
    }

    #[test]
    fn test_validate_negative_dividend() {
        let action = CorporateAction::new(
            ActionId(2),
            "NICA",
            ActionKind::Dividend {
                per_share: Money::from_minor(-100),
            },
            date(2024, 3, 1),
            date(2024, 3, 1),
        );
        assert!(action.validate().is_err());
    }

    #[test]
    fn test_description() {
        let rights = CorporateAction::new(
            ActionId(3),
            "NICA",
            ActionKind::Rights {
                ratio: Ratio::new(1, 5),
                price: Money::from_major(100),
            },
            date(2024, 3, 1),
            date(2024, 4, 1),
        );
        assert_eq!(rights.description(), "Rights shares 1:5 at 100.00");

        let dividend = CorporateAction::new(
            ActionId(4),
            "NICA",
            ActionKind::Dividend {
                per_share: Money::from_minor(550),
            },
            date(2024, 3, 1),
            date(2024, 4, 1),
        );
        assert_eq!(dividend.description(), "Cash dividend Rs. 5.50 per share");
    }

    #[test]
    fn test_action_serde() {
        let json = r#"{
            "id": 7,
            "symbol": "hidcl",
            "kind": {"type": "rights", "ratio": "1:2", "price": 10000},
            "announced": "2024-01-01",
            "record_date": "2024-01-10",
            "execution_date": "2024-02-10"
        }"#;
        let action: CorporateAction = serde_json::from_str(json).unwrap();
        assert_eq!(action.symbol, "HIDCL");
        assert_eq!(action.status, ActionStatus::Announced);
        assert_eq!(
            action.kind,
            ActionKind::Rights {
                ratio: Ratio::new(1, 2),
                price: Money::from_major(100),
            }
        );
    }

    #[test]
    fn test_filter() {
        let action = bonus("1:10");
        let filter = ActionFilter {
            symbol: Some(Symbol::new("nabil")),
            kind: Some("BONUS".into()),
            ..ActionFilter::default()
        };
        assert!(filter.matches(&action, ActionStatus::Pending));

        let by_status = ActionFilter {
            status: Some(ActionStatus::Processed),
            ..ActionFilter::default()
        };
        assert!(!by_status.matches(&action, ActionStatus::Pending));

        let by_date = ActionFilter {
            from: Some(date(2024, 4, 1)),
            ..ActionFilter::default()
        };
        assert!(!by_date.matches(&action, ActionStatus::Pending));
    }
}
