//! Opening hours: is a facility open for the whole requested stay?
//!
//! Used by the search layer to filter candidates before or after pricing; it
//! is not part of the fee calculation itself.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::StayInterval;
use crate::rules::day_type::DayClassifier;
use crate::rules::model::{DayMask, TimeRange};
use crate::rules::parse::{parse_day_mask, parse_time_range};

/// An opening window on the day types in `days`. A window that wraps past
/// midnight belongs to the day it opens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningWindow {
    pub days: DayMask,
    pub range: TimeRange,
}

/// Opening window as stored by the facility repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOpeningWindow {
    pub time_range: String,
    #[serde(default)]
    pub day_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OpeningHours {
    #[default]
    AlwaysOpen,
    Windows(Vec<OpeningWindow>),
}

impl OpeningHours {
    /// Build opening hours from repository rows. No rows means the facility
    /// is always open; unreadable rows are skipped.
    pub fn from_records(records: &[RawOpeningWindow]) -> OpeningHours {
        if records.is_empty() {
            return OpeningHours::AlwaysOpen;
        }

        let windows = records
            .iter()
            .filter_map(|raw| {
                let range = parse_time_range(&raw.time_range);
                let days = raw.day_type.as_deref().map_or(Ok(DayMask::all()), parse_day_mask);
                match (range, days) {
                    (Ok(range), Ok(days)) => Some(OpeningWindow { days, range }),
                    (Err(err), _) | (_, Err(err)) => {
                        warn!("skipping opening window: {err}");
                        None
                    }
                }
            })
            .collect();

        OpeningHours::Windows(windows)
    }

    /// Whether the facility is open at every instant of `stay`.
    pub fn is_open_for(&self, stay: &StayInterval, classifier: &dyn DayClassifier) -> bool {
        let windows = match self {
            OpeningHours::AlwaysOpen => return true,
            OpeningHours::Windows(windows) => windows,
        };

        // Absolute open intervals for every day that can overlap the stay,
        // starting the day before entry for windows that wrap into it.
        let mut open: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::new();
        let mut day = stay.entry().date().pred_opt().unwrap_or(stay.entry().date());
        while day <= stay.exit().date() {
            let midnight = day.and_time(NaiveTime::MIN);
            let day_type = classifier.classify(midnight);
            for window in windows.iter().filter(|w| w.days.admits(day_type)) {
                if let Some(interval) = absolute_window(day, &window.range) {
                    open.push(interval);
                }
            }
            let Some(next) = day.checked_add_days(Days::new(1)) else { break };
            day = next;
        }
        open.sort();

        let mut covered_until = stay.entry();
        for (start, end) in open {
            if start > covered_until {
                break;
            }
            covered_until = covered_until.max(end);
            if covered_until >= stay.exit() {
                return true;
            }
        }
        false
    }
}

fn absolute_window(day: NaiveDate, range: &TimeRange) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let midnight = day.and_time(NaiveTime::MIN);
    let start = midnight + TimeDelta::minutes(i64::from(range.start_minute()));
    let end = if range.is_all_day() {
        midnight.checked_add_days(Days::new(1))?
    } else if range.wraps_midnight() {
        midnight.checked_add_days(Days::new(1))? + TimeDelta::minutes(i64::from(range.end_minute()))
    } else {
        midnight + TimeDelta::minutes(i64::from(range.end_minute()))
    };
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::day_type::WeekendClassifier;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn window(days: DayMask, sh: u32, eh: u32) -> OpeningWindow {
        OpeningWindow { days, range: TimeRange::from_hm(sh, 0, eh, 0).unwrap() }
    }

    #[test]
    fn always_open_accepts_anything() {
        let stay = StayInterval::new(at(10, 0, 0), at(20, 0, 0)).unwrap();
        assert!(OpeningHours::AlwaysOpen.is_open_for(&stay, &WeekendClassifier));
    }

    #[test]
    fn daytime_hours_reject_overnight_stays() {
        let hours = OpeningHours::Windows(vec![window(DayMask::all(), 7, 23)]);
        let day = StayInterval::new(at(10, 9, 0), at(10, 22, 59)).unwrap();
        let overnight = StayInterval::new(at(10, 20, 0), at(11, 8, 0)).unwrap();

        assert!(hours.is_open_for(&day, &WeekendClassifier));
        assert!(!hours.is_open_for(&overnight, &WeekendClassifier));
    }

    #[test]
    fn wrapping_windows_chain_across_days() {
        // Day shift and night shift cover the clock together.
        let hours = OpeningHours::Windows(vec![window(DayMask::all(), 8, 20), window(DayMask::all(), 20, 8)]);
        let stay = StayInterval::new(at(10, 3, 0), at(12, 19, 0)).unwrap();
        assert!(hours.is_open_for(&stay, &WeekendClassifier));
    }

    #[test]
    fn weekday_only_hours_close_on_saturday() {
        let hours = OpeningHours::Windows(vec![window(DayMask::WEEKDAY, 0, 0)]);
        let friday = StayInterval::new(at(12, 10, 0), at(12, 18, 0)).unwrap();
        let into_saturday = StayInterval::new(at(12, 22, 0), at(13, 1, 0)).unwrap();

        assert!(hours.is_open_for(&friday, &WeekendClassifier));
        assert!(!hours.is_open_for(&into_saturday, &WeekendClassifier));
    }

    #[test]
    fn records_parse_and_skip_bad_rows() {
        let records = vec![
            RawOpeningWindow { time_range: "7:00〜23:00".into(), day_type: None },
            RawOpeningWindow { time_range: "late".into(), day_type: None },
            RawOpeningWindow { time_range: "9:00-18:00".into(), day_type: Some("土日祝".into()) },
        ];
        let hours = OpeningHours::from_records(&records);
        assert_eq!(
            hours,
            OpeningHours::Windows(vec![window(DayMask::all(), 7, 23), window(DayMask::WEEKEND_HOLIDAY, 9, 18)])
        );
        assert_eq!(OpeningHours::from_records(&[]), OpeningHours::AlwaysOpen);
    }
}
