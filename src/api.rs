use crate::engine::{self, DEFAULT_MATCHING_POLICY, MatchingPolicy, SegmentCharge, UnavailableReason};
use crate::rules::day_type::{DayClassifier, WeekendClassifier};
use crate::rules::model::RateRuleSet;
use crate::{FeeResult, StayInterval};
use std::sync::Arc;
use std::time::Duration;

/// Options that affect matching and day-type resolution.
#[derive(Debug, Clone)]
pub struct Options {
    /// How time-scoped rules interact with default rules.
    pub policy: MatchingPolicy,
    /// Weekday / weekend-holiday classifier.
    pub classifier: Arc<dyn DayClassifier>,
}

impl Default for Options {
    fn default() -> Self {
        Options { policy: DEFAULT_MATCHING_POLICY, classifier: Arc::new(WeekendClassifier) }
    }
}

impl Options {
    pub fn with_classifier(mut self, classifier: impl DayClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_policy(mut self, policy: MatchingPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Result from [`calculate_verbose_with`].
#[derive(Debug, Clone)]
pub struct FeeBreakdown {
    pub result: FeeResult,
    /// Sum of segment fees before the final zero check; `None` when the
    /// rule set was decided without segmenting.
    pub raw_total: Option<u64>,
    /// Set whenever `result` is `Unavailable`.
    pub reason: Option<UnavailableReason>,
    pub segments: Vec<SegmentCharge>,
    pub elapsed: Duration,
}

/// Price `stay` against `rules` with default [`Options`].
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use parkfee::{FeeResult, RateRule, RateRuleSet, StayInterval, calculate_fee};
///
/// let rules = RateRuleSet::new(vec![RateRule::base(20, 200)]);
/// let entry = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let stay = StayInterval::from_minutes(entry, 30).unwrap();
///
/// assert_eq!(calculate_fee(&rules, stay), FeeResult::Fee(400));
/// ```
pub fn calculate_fee(rules: &RateRuleSet, stay: StayInterval) -> FeeResult {
    calculate_fee_with(rules, stay, &Options::default())
}

/// Price `stay` against `rules` with the provided `options`.
pub fn calculate_fee_with(rules: &RateRuleSet, stay: StayInterval, options: &Options) -> FeeResult {
    engine::Calculator::new(rules, options).run(stay)
}

/// Price `stay` and return the per-segment breakdown.
///
/// Use this for debugging a tariff; the plain [`calculate_fee_with`] path does
/// not allocate the trace.
pub fn calculate_verbose_with(rules: &RateRuleSet, stay: StayInterval, options: &Options) -> FeeBreakdown {
    let run = engine::Calculator::new(rules, options).run_with_metrics(stay);

    FeeBreakdown {
        result: run.result,
        raw_total: run.raw_total,
        reason: run.reason,
        segments: run.charges,
        elapsed: run.elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::day_type::HolidayCalendar;
    use crate::rules::model::{DayMask, RateRule, TimeRange};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn verbose_reports_segments_and_total() {
        let rules = RateRuleSet::new(vec![
            RateRule::base(20, 200).during(TimeRange::from_hm(8, 0, 22, 0).unwrap()),
            RateRule::base(60, 100).during(TimeRange::from_hm(22, 0, 8, 0).unwrap()),
        ]);
        let stay = StayInterval::new(at(10, 21, 0), at(10, 23, 0)).unwrap();
        let out = calculate_verbose_with(&rules, stay, &Options::default());

        // 60 min day (3 x 200) + 60 min night (1 x 100).
        assert_eq!(out.result, FeeResult::Fee(700));
        assert_eq!(out.raw_total, Some(700));
        assert_eq!(out.reason, None);
        assert_eq!(out.segments.len(), 2);
        assert_eq!(out.segments[0].fee, 600);
        assert_eq!(out.segments[1].base_rule, Some(1));
        assert_eq!(out.result, calculate_fee(&rules, stay));
    }

    #[test]
    fn verbose_explains_unavailable() {
        let rules = RateRuleSet::new(vec![RateRule::base(30, 300), RateRule::conditional_free(120)]);
        let stay = StayInterval::from_minutes(at(10, 9, 0), 90).unwrap();
        let out = calculate_verbose_with(&rules, stay, &Options::default());

        assert_eq!(out.result, FeeResult::Unavailable);
        assert_eq!(out.reason, Some(UnavailableReason::ConditionalFreeWindow));
        assert!(out.segments.is_empty());
    }

    #[test]
    fn injected_holiday_calendar_changes_day_type() {
        let rules = RateRuleSet::new(vec![
            RateRule::base(30, 200).on(DayMask::WEEKDAY),
            RateRule::base(30, 400).on(DayMask::WEEKEND_HOLIDAY),
        ]);
        // Monday 2024-04-29 is a public holiday in this calendar.
        let stay = StayInterval::from_minutes(at(29, 10, 0), 60).unwrap();
        let holidays: HolidayCalendar = [NaiveDate::from_ymd_opt(2024, 4, 29).unwrap()].into_iter().collect();

        assert_eq!(calculate_fee(&rules, stay), FeeResult::Fee(400));
        assert_eq!(
            calculate_fee_with(&rules, stay, &Options::default().with_classifier(holidays)),
            FeeResult::Fee(800)
        );
    }
}
