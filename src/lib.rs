extern crate self as parkfee;

use chrono::{NaiveDateTime, TimeDelta};
use std::cmp::Ordering;
use std::fmt;

#[macro_use]
mod macros;
mod api;
mod availability;
mod engine;
mod rules;

pub use api::{FeeBreakdown, Options, calculate_fee, calculate_fee_with, calculate_verbose_with};
pub use availability::{OpeningHours, OpeningWindow, RawOpeningWindow};
pub use engine::{
    CarryState, DEFAULT_MATCHING_POLICY, MatchingPolicy, RuleId, SegmentCharge, TimeSegment, UnavailableReason,
};
pub use rules::day_type::{DayClassifier, HolidayCalendar, WeekendClassifier, resolve_day_type};
pub use rules::hygiene::{Adjustment, ClampConfig, clamp_anomalies};
pub use rules::model::{CapWindow, DayMask, DayType, MINUTES_PER_DAY, RateRule, RateRuleSet, RuleKind, Schedule, TimeRange};
pub use rules::parse::{RawRateRule, RuleParseError, parse_day_mask, parse_time_range};
pub use rules::summary::summarize;

// --- Stay interval ----------------------------------------------------------

/// A requested stay: `[entry, exit)` in facility-local wall-clock time.
///
/// The constructor enforces `exit > entry`, so every `StayInterval` in
/// circulation has a positive duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StayInterval {
    entry: NaiveDateTime,
    exit: NaiveDateTime,
}

impl StayInterval {
    /// Returns `None` unless `exit` is strictly after `entry`.
    pub fn new(entry: NaiveDateTime, exit: NaiveDateTime) -> Option<Self> {
        (exit > entry).then_some(StayInterval { entry, exit })
    }

    /// A stay of `minutes` starting at `entry`.
    pub fn from_minutes(entry: NaiveDateTime, minutes: u32) -> Option<Self> {
        let exit = entry.checked_add_signed(TimeDelta::minutes(i64::from(minutes)))?;
        Self::new(entry, exit)
    }

    pub fn entry(&self) -> NaiveDateTime {
        self.entry
    }

    pub fn exit(&self) -> NaiveDateTime {
        self.exit
    }

    pub fn duration(&self) -> TimeDelta {
        self.exit - self.entry
    }

    /// Duration rounded to the nearest whole minute.
    pub fn minutes(&self) -> u32 {
        rounded_minutes(self.duration())
    }
}

/// Round a non-negative span to whole minutes (30 seconds rounds up).
pub(crate) fn rounded_minutes(span: TimeDelta) -> u32 {
    let seconds = span.num_seconds().max(0);
    u32::try_from((seconds + 30) / 60).unwrap_or(u32::MAX)
}

// --- Fee result -------------------------------------------------------------

/// Outcome of a fee calculation.
///
/// `Unavailable` is a first-class value, not an error: it means the rule data
/// cannot price this stay. There is no conversion to a number; use
/// [`FeeResult::amount`] and branch on `None`.
///
/// Ordering puts every `Fee` before `Unavailable`, so sorting a list of
/// quotes ranks unpriceable facilities last instead of treating them as free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeResult {
    Fee(u64),
    Unavailable,
}

impl FeeResult {
    pub fn amount(self) -> Option<u64> {
        match self {
            FeeResult::Fee(amount) => Some(amount),
            FeeResult::Unavailable => None,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, FeeResult::Fee(_))
    }
}

impl Ord for FeeResult {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FeeResult::Fee(a), FeeResult::Fee(b)) => a.cmp(b),
            (FeeResult::Fee(_), FeeResult::Unavailable) => Ordering::Less,
            (FeeResult::Unavailable, FeeResult::Fee(_)) => Ordering::Greater,
            (FeeResult::Unavailable, FeeResult::Unavailable) => Ordering::Equal,
        }
    }
}

impl PartialOrd for FeeResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FeeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeResult::Fee(amount) => write!(f, "¥{}", amount),
            FeeResult::Unavailable => write!(f, "unavailable"),
        }
    }
}
