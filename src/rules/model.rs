//! Normalized rate-rule model.
//!
//! A facility's tariff is an ordered [`RateRuleSet`]. Each [`RateRule`] is one
//! line of the price board: a [`RuleKind`], a unit (minutes + price), and the
//! scope it applies to (time-of-day [`Schedule`], [`DayMask`], activation
//! threshold).
//!
//! ```text
//! RateRule
//!   kind ........ Base | Max | ConditionalFree | Progressive
//!   unit ........ unit_minutes / unit_price (either may be missing in raw data)
//!   schedule .... AllDay | Window(22:00-08:00) | Unparseable
//!   days ........ WEEKDAY | WEEKEND_HOLIDAY
//!   apply_after . minutes since entry before the rule becomes active
//! ```
//!
//! Rule order matters: when several Base (or Max) rules apply to the same
//! instant, the first one wins.

use chrono::{NaiveDateTime, Timelike};
use std::fmt;

pub const MINUTES_PER_DAY: u32 = 1440;

bitflags::bitflags! {
    /// Day types a rule (or an opening window) applies to.
    ///
    /// A rule without a day restriction carries `DayMask::all()`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DayMask: u8 {
        const WEEKDAY         = 1 << 0;
        const WEEKEND_HOLIDAY = 1 << 1;
    }
}

impl DayMask {
    pub fn admits(self, day: DayType) -> bool {
        self.contains(day.mask())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayType {
    Weekday,
    WeekendHoliday,
}

impl DayType {
    pub fn mask(self) -> DayMask {
        match self {
            DayType::Weekday => DayMask::WEEKDAY,
            DayType::WeekendHoliday => DayMask::WEEKEND_HOLIDAY,
        }
    }
}

// --- Time ranges --------------------------------------------------------------

/// A time-of-day window stored as minutes since midnight.
///
/// `end <= start` wraps past midnight (`22:00-08:00`). `start == end` and
/// `00:00-24:00` both cover the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: u32,
    end: u32,
}

impl TimeRange {
    /// `start` must be a valid minute of the day; `end` may be 1440 (24:00).
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start < MINUTES_PER_DAY && end <= MINUTES_PER_DAY).then_some(TimeRange { start, end })
    }

    pub fn from_hm(start_hour: u32, start_minute: u32, end_hour: u32, end_minute: u32) -> Option<Self> {
        if start_minute >= 60 || end_minute >= 60 {
            return None;
        }
        Self::new(start_hour * 60 + start_minute, end_hour * 60 + end_minute)
    }

    pub fn start_minute(&self) -> u32 {
        self.start
    }

    pub fn end_minute(&self) -> u32 {
        self.end
    }

    pub fn is_all_day(&self) -> bool {
        self.start == self.end || (self.start == 0 && self.end == MINUTES_PER_DAY)
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    /// Length of the window in minutes.
    pub fn span_minutes(&self) -> u32 {
        if self.is_all_day() {
            MINUTES_PER_DAY
        } else if self.wraps_midnight() {
            MINUTES_PER_DAY - self.start + self.end
        } else {
            self.end - self.start
        }
    }

    pub fn contains_minute(&self, minute: u32) -> bool {
        if self.is_all_day() {
            true
        } else if self.wraps_midnight() {
            minute >= self.start || minute < self.end
        } else {
            self.start <= minute && minute < self.end
        }
    }

    /// Whether the time-of-day of `at` falls in the window. Only the wall
    /// clock is consulted, so a wrapping window matches the late-night and the
    /// early-morning part of every calendar day.
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        self.contains_minute(minute_of_day(at))
    }

    /// Minute-of-day offsets at which the window opens or closes.
    pub fn edges(&self) -> [u32; 2] {
        [self.start, self.end]
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}-{:02}:{:02}", self.start / 60, self.start % 60, self.end / 60, self.end % 60)
    }
}

pub(crate) fn minute_of_day(at: NaiveDateTime) -> u32 {
    at.hour() * 60 + at.minute()
}

/// Time-of-day scope of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Schedule {
    /// No time range: a "default" rule.
    AllDay,
    Window(TimeRange),
    /// The source carried a time range that could not be read. Such a rule
    /// never matches.
    Unparseable,
}

impl Schedule {
    pub fn matches(&self, at: NaiveDateTime) -> bool {
        match self {
            Schedule::AllDay => true,
            Schedule::Window(range) => range.matches(at),
            Schedule::Unparseable => false,
        }
    }

    pub fn is_time_scoped(&self) -> bool {
        !matches!(self, Schedule::AllDay)
    }
}

// --- Rules ------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Recurring per-unit charge.
    Base,
    /// Cap over a bounded or whole-day window.
    Max,
    /// Free for `unit_minutes` under a condition the engine cannot verify
    /// (purchase, validation stamp, ...).
    ConditionalFree,
    /// Per-unit charge that takes over from Base once `apply_after` minutes
    /// have elapsed since entry.
    Progressive,
}

/// How a Max rule's cap window is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapWindow {
    /// Flat cap applied once per segment; `window` minutes are carried.
    Unrestricted { window: u32 },
    /// Cap repeats every `period` minutes.
    Bounded { period: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateRule {
    pub kind: RuleKind,
    pub unit_minutes: Option<u32>,
    pub unit_price: Option<u64>,
    pub schedule: Schedule,
    pub days: DayMask,
    pub apply_after: Option<u32>,
}

impl RateRule {
    pub fn new(kind: RuleKind, unit_minutes: Option<u32>, unit_price: Option<u64>) -> Self {
        RateRule { kind, unit_minutes, unit_price, schedule: Schedule::AllDay, days: DayMask::all(), apply_after: None }
    }

    pub fn base(unit_minutes: u32, unit_price: u64) -> Self {
        Self::new(RuleKind::Base, Some(unit_minutes), Some(unit_price))
    }

    pub fn max(unit_minutes: u32, unit_price: u64) -> Self {
        Self::new(RuleKind::Max, Some(unit_minutes), Some(unit_price))
    }

    pub fn conditional_free(threshold_minutes: u32) -> Self {
        Self::new(RuleKind::ConditionalFree, Some(threshold_minutes), Some(0))
    }

    pub fn progressive(unit_minutes: u32, unit_price: u64, apply_after: u32) -> Self {
        Self::new(RuleKind::Progressive, Some(unit_minutes), Some(unit_price)).after(apply_after)
    }

    /// Restrict the rule to a time-of-day window.
    pub fn during(mut self, range: TimeRange) -> Self {
        self.schedule = Schedule::Window(range);
        self
    }

    /// Restrict the rule to the given day types.
    pub fn on(mut self, days: DayMask) -> Self {
        self.days = days;
        self
    }

    /// Activate the rule only after `minutes` have elapsed since entry.
    pub fn after(mut self, minutes: u32) -> Self {
        self.apply_after = Some(minutes);
        self
    }

    /// Base `{price: 0, minutes: 0}`: the facility does not charge at all.
    pub fn is_fully_free(&self) -> bool {
        self.kind == RuleKind::Base && self.unit_price == Some(0) && self.unit_minutes == Some(0)
    }

    /// A Base rule with a positive unit and a known price.
    pub fn is_usable_base(&self) -> bool {
        self.kind == RuleKind::Base && self.unit_minutes.is_some_and(|m| m > 0) && self.unit_price.is_some()
    }

    /// A Max rule that can price any stay on its own as a flat fee.
    pub fn is_standalone_max(&self) -> bool {
        self.kind == RuleKind::Max
            && self.unit_price.is_some()
            && self.schedule == Schedule::AllDay
            && self.days == DayMask::all()
            && self.apply_after.unwrap_or(0) == 0
    }

    /// Whether this rule can legitimately produce a zero charge.
    pub fn authorizes_zero(&self) -> bool {
        let free_window = self.apply_after.is_some_and(|m| m > 0);
        match self.kind {
            RuleKind::Base | RuleKind::Max => self.unit_price == Some(0) || free_window,
            RuleKind::ConditionalFree => false,
            RuleKind::Progressive => free_window,
        }
    }

    /// Whether the rule takes part in time-scoped matching (and so suppresses
    /// default rules under the default policy).
    pub fn competes_as_scoped(&self) -> bool {
        match self.kind {
            RuleKind::Base | RuleKind::Max | RuleKind::Progressive => self.schedule.is_time_scoped(),
            RuleKind::ConditionalFree => false,
        }
    }

    /// `ceil(minutes / unit) * price`; 0 when the unit or the price is missing.
    pub fn linear_fee(&self, minutes: u32) -> u64 {
        match (self.unit_minutes, self.unit_price) {
            (Some(unit), Some(price)) if unit > 0 => u64::from(minutes.div_ceil(unit)).saturating_mul(price),
            _ => 0,
        }
    }

    /// Cap window of a Max rule. Default-scoped caps and whole-day units
    /// (0 or 1440 minutes) are unrestricted.
    pub fn cap_window(&self) -> CapWindow {
        match self.unit_minutes {
            None | Some(0) => CapWindow::Unrestricted { window: MINUTES_PER_DAY },
            Some(minutes) if minutes == MINUTES_PER_DAY || !self.schedule.is_time_scoped() => {
                CapWindow::Unrestricted { window: minutes }
            }
            Some(minutes) => CapWindow::Bounded { period: minutes },
        }
    }
}

// --- Rule sets ----------------------------------------------------------------

/// Ordered rules for one facility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateRuleSet {
    rules: Vec<RateRule>,
}

impl RateRuleSet {
    pub fn new(rules: Vec<RateRule>) -> Self {
        RateRuleSet { rules }
    }

    pub fn rules(&self) -> &[RateRule] {
        &self.rules
    }

    pub(crate) fn rules_mut(&mut self) -> &mut [RateRule] {
        &mut self.rules
    }

    pub fn get(&self, id: usize) -> Option<&RateRule> {
        self.rules.get(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RateRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn push(&mut self, rule: RateRule) {
        self.rules.push(rule);
    }

    /// True when some rule is restricted to a subset of day types, which makes
    /// local midnight a potential segment boundary.
    pub fn has_day_restrictions(&self) -> bool {
        self.rules.iter().any(|r| r.days != DayMask::all())
    }
}

impl FromIterator<RateRule> for RateRuleSet {
    fn from_iter<I: IntoIterator<Item = RateRule>>(iter: I) -> Self {
        RateRuleSet { rules: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a RateRuleSet {
    type Item = &'a RateRule;
    type IntoIter = std::slice::Iter<'a, RateRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
