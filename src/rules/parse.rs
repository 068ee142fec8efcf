//! Ingestion of raw facility records.
//!
//! Facility repositories hand over loosely typed rows:
//!
//! ```text
//! { "type": "base", "minutes": 20, "price": 200,
//!   "time_range": "08:00〜22:00", "day_type": "weekday", "apply_after": 60 }
//! ```
//!
//! Conversion is lenient about the shape of the data and strict about its
//! meaning. An unreadable `time_range` keeps the rule but marks its schedule
//! [`Schedule::Unparseable`] so it never matches; an unknown `type` or
//! `day_type` drops the rule. A single bad row never fails the facility.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::model::{DayMask, RateRule, RateRuleSet, RuleKind, Schedule, TimeRange};

/// One rate row as stored by the facility repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRateRule {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub minutes: Option<u32>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub day_type: Option<String>,
    #[serde(default)]
    pub apply_after: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParseError {
    #[error("unknown rule type '{0}'")]
    UnknownKind(String),
    #[error("malformed time range '{0}'")]
    MalformedTimeRange(String),
    #[error("unknown day type '{0}'")]
    UnknownDayType(String),
}

/// Parse `HH:MM<sep>HH:MM`. Hours may have one digit, the end may be `24:00`,
/// and `<sep>` is any of the dash/tilde variants found in price boards.
pub fn parse_time_range(text: &str) -> Result<TimeRange, RuleParseError> {
    let malformed = || RuleParseError::MalformedTimeRange(text.to_string());
    let caps = regex!(r"^\s*(\d{1,2})[:：](\d{2})\s*(?:-|~|〜|～|–|—|―|−|‐|ー)\s*(\d{1,2})[:：](\d{2})\s*$")
        .captures(text)
        .ok_or_else(malformed)?;

    let field = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<u32>().ok()).ok_or_else(malformed);
    let (start_hour, start_minute) = (field(1)?, field(2)?);
    let (end_hour, end_minute) = (field(3)?, field(4)?);

    // 24:00 is only meaningful as a closing time.
    if start_hour > 23 || end_hour > 24 || (end_hour == 24 && end_minute != 0) {
        return Err(malformed());
    }

    TimeRange::from_hm(start_hour, start_minute, end_hour, end_minute).ok_or_else(malformed)
}

/// Map a day-type tag to the day types it covers.
pub fn parse_day_mask(tag: &str) -> Result<DayMask, RuleParseError> {
    match tag.trim().to_lowercase().as_str() {
        "" | "all" | "any" | "everyday" | "daily" | "毎日" => Ok(DayMask::all()),
        "weekday" | "weekdays" | "平日" => Ok(DayMask::WEEKDAY),
        "weekend" | "weekends" | "holiday" | "holidays" | "weekend_holiday" | "weekendholiday" | "土日祝" | "土日"
        | "休日" => Ok(DayMask::WEEKEND_HOLIDAY),
        _ => Err(RuleParseError::UnknownDayType(tag.to_string())),
    }
}

fn parse_kind(tag: &str) -> Result<RuleKind, RuleParseError> {
    match tag.trim().to_lowercase().as_str() {
        "base" | "normal" | "regular" => Ok(RuleKind::Base),
        "max" | "cap" | "maximum" => Ok(RuleKind::Max),
        "conditional_free" | "conditional-free" | "conditionalfree" => Ok(RuleKind::ConditionalFree),
        "progressive" => Ok(RuleKind::Progressive),
        _ => Err(RuleParseError::UnknownKind(tag.to_string())),
    }
}

impl TryFrom<&RawRateRule> for RateRule {
    type Error = RuleParseError;

    fn try_from(raw: &RawRateRule) -> Result<Self, Self::Error> {
        let kind = parse_kind(&raw.kind)?;
        let days = match raw.day_type.as_deref() {
            Some(tag) => parse_day_mask(tag)?,
            None => DayMask::all(),
        };

        let schedule = match raw.time_range.as_deref().map(str::trim) {
            None | Some("") => Schedule::AllDay,
            Some(text) => match parse_time_range(text) {
                Ok(range) => Schedule::Window(range),
                Err(err) => {
                    warn!("keeping rule with unusable schedule: {err}");
                    Schedule::Unparseable
                }
            },
        };

        Ok(RateRule {
            kind,
            unit_minutes: raw.minutes,
            unit_price: raw.price,
            schedule,
            days,
            apply_after: raw.apply_after,
        })
    }
}

impl RateRuleSet {
    /// Build a rule set from repository rows, skipping rows that cannot be
    /// interpreted.
    pub fn from_records(records: &[RawRateRule]) -> RateRuleSet {
        records
            .iter()
            .enumerate()
            .filter_map(|(idx, raw)| match RateRule::try_from(raw) {
                Ok(rule) => Some(rule),
                Err(err) => {
                    warn!("skipping rate record #{idx}: {err}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_accepts_separator_variants() {
        let expected = TimeRange::from_hm(22, 0, 8, 0).unwrap();
        for text in ["22:00-08:00", "22:00~08:00", "22:00〜08:00", "22:00～08:00", "22:00 – 8:00", "22:00ー08:00"] {
            assert_eq!(parse_time_range(text), Ok(expected), "{text}");
        }
    }

    #[test]
    fn time_range_accepts_closing_midnight() {
        let range = parse_time_range("8:00-24:00").unwrap();
        assert_eq!(range.start_minute(), 480);
        assert_eq!(range.end_minute(), 1440);
    }

    #[test]
    fn time_range_rejects_garbage() {
        for text in ["", "8-22", "25:00-08:00", "08:00-24:30", "08:75-09:00", "08:00/22:00", "all day"] {
            assert!(parse_time_range(text).is_err(), "{text}");
        }
    }

    #[test]
    fn day_mask_tags() {
        assert_eq!(parse_day_mask("Weekday"), Ok(DayMask::WEEKDAY));
        assert_eq!(parse_day_mask("土日祝"), Ok(DayMask::WEEKEND_HOLIDAY));
        assert_eq!(parse_day_mask("weekend_holiday"), Ok(DayMask::WEEKEND_HOLIDAY));
        assert_eq!(parse_day_mask(""), Ok(DayMask::all()));
        assert!(parse_day_mask("fortnightly").is_err());
    }

    #[test]
    fn malformed_time_range_keeps_rule_unmatchable() {
        let raw = RawRateRule {
            kind: "base".into(),
            minutes: Some(30),
            price: Some(200),
            time_range: Some("night".into()),
            ..Default::default()
        };
        let rule = RateRule::try_from(&raw).unwrap();
        assert_eq!(rule.schedule, Schedule::Unparseable);
    }

    #[test]
    fn from_records_skips_unknown_rows() {
        let json = r#"[
            {"type": "base", "minutes": 20, "price": 200, "time_range": "08:00~22:00"},
            {"type": "coupon", "minutes": 60, "price": 0},
            {"type": "max", "minutes": 0, "price": 1500, "day_type": "weekend"},
            {"type": "base", "minutes": 60, "price": 100, "day_type": "someday"}
        ]"#;
        let records: Vec<RawRateRule> = serde_json::from_str(json).unwrap();
        let rules = RateRuleSet::from_records(&records);

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.rules()[0].kind, RuleKind::Base);
        assert!(matches!(rules.rules()[0].schedule, Schedule::Window(_)));
        assert_eq!(rules.rules()[1].kind, RuleKind::Max);
        assert_eq!(rules.rules()[1].days, DayMask::WEEKEND_HOLIDAY);
    }

    #[test]
    fn unknown_kind_is_reported() {
        let raw = RawRateRule { kind: "voucher".into(), ..Default::default() };
        assert_eq!(RateRule::try_from(&raw), Err(RuleParseError::UnknownKind("voucher".into())));
    }
}
