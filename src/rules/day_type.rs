//! Day-type classification.
//!
//! Rules priced differently on weekends/holidays need to know which kind of
//! day an instant belongs to. The classifier is a strategy: the default only
//! looks at the day of week, and a [`HolidayCalendar`] can be injected through
//! [`crate::Options`] when public holidays matter.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use std::collections::BTreeSet;
use std::fmt;

use crate::rules::model::DayType;

pub trait DayClassifier: fmt::Debug + Send + Sync {
    fn classify(&self, at: NaiveDateTime) -> DayType;
}

/// Saturday and Sunday are `WeekendHoliday`; every other day is a `Weekday`.
/// No holiday table is consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeekendClassifier;

impl DayClassifier for WeekendClassifier {
    fn classify(&self, at: NaiveDateTime) -> DayType {
        resolve_day_type(at)
    }
}

pub fn resolve_day_type(at: NaiveDateTime) -> DayType {
    match at.date().weekday() {
        Weekday::Sat | Weekday::Sun => DayType::WeekendHoliday,
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri => DayType::Weekday,
    }
}

/// Weekends plus an explicit set of holiday dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate) -> bool {
        self.holidays.insert(date)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }
}

impl FromIterator<NaiveDate> for HolidayCalendar {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        HolidayCalendar { holidays: iter.into_iter().collect() }
    }
}

impl DayClassifier for HolidayCalendar {
    fn classify(&self, at: NaiveDateTime) -> DayType {
        if self.is_holiday(at.date()) { DayType::WeekendHoliday } else { resolve_day_type(at) }
    }
}
