//! Boundary-driven segmentation of a stay.
//!
//! The stay `[entry, exit)` is cut wherever the set of applicable rules can
//! change:
//!
//! ```text
//!  rules:   base 08:00-22:00 ─────────────┐   base 22:00-08:00 ──────
//!  stay:         |=========================|==================|
//!              entry                     22:00               exit
//!  segments:     [ seg 0: {rule 0}        )[ seg 1: {rule 1}   )
//! ```
//!
//! Candidate boundaries are, for the cursor's calendar day and the next one,
//! every open/close edge of every time-scoped rule, each activation threshold
//! (`entry + apply_after`), and local midnight when day restrictions exist.
//! The scan only moves forward; a boundary that leaves the applicable subset
//! unchanged is absorbed into the previous segment so every emitted segment is
//! maximal.
//!
//! ## Invariants
//!
//! - Segments are contiguous: `segments[i].end == segments[i + 1].start`.
//! - The first segment starts at entry, the last one ends at exit, so their
//!   durations sum to the stay duration exactly.
//! - Neighbouring segments never carry the same rule subset.

use chrono::{Days, NaiveDateTime, NaiveTime, TimeDelta};
use log::trace;

use crate::rules::day_type::DayClassifier;
use crate::rules::model::{RateRule, RateRuleSet, RuleKind, Schedule};
use crate::{StayInterval, rounded_minutes};

/// Rule identifier (index into the rule set).
pub type RuleId = usize;

/// How time-scoped rules interact with default (all-day) rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchingPolicy {
    /// When any time-scoped rule matches an instant, default rules are
    /// dropped for that instant.
    ScopedSuppressesDefaults,
    /// Default rules stay applicable next to time-scoped ones; scoped rules
    /// are ordered first so they win first-match selection.
    Layered,
}

pub const DEFAULT_MATCHING_POLICY: MatchingPolicy = MatchingPolicy::ScopedSuppressesDefaults;

/// A maximal sub-interval of the stay with a constant applicable rule subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSegment {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Applicable rules, in selection order.
    pub rules: Vec<RuleId>,
}

impl TimeSegment {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Billed length in whole minutes, rounded cumulatively from `entry` so
    /// that the segments of a stay add up to the stay's rounded length.
    pub fn billed_minutes(&self, entry: NaiveDateTime) -> u32 {
        rounded_minutes(self.end - entry).saturating_sub(rounded_minutes(self.start - entry))
    }
}

pub(crate) struct Segmenter<'a> {
    rules: &'a RateRuleSet,
    stay: StayInterval,
    policy: MatchingPolicy,
    classifier: &'a dyn DayClassifier,
    day_boundaries: bool,
}

impl<'a> Segmenter<'a> {
    pub(crate) fn new(
        rules: &'a RateRuleSet,
        stay: StayInterval,
        policy: MatchingPolicy,
        classifier: &'a dyn DayClassifier,
    ) -> Self {
        Segmenter { rules, stay, policy, classifier, day_boundaries: rules.has_day_restrictions() }
    }

    /// Split the stay into maximal segments.
    pub(crate) fn segments(&self) -> Vec<TimeSegment> {
        let mut out: Vec<TimeSegment> = Vec::new();
        let mut cursor = self.stay.entry();

        while cursor < self.stay.exit() {
            let rules = self.applicable_at(cursor);
            let end = self.next_boundary(cursor);
            trace!("[segment] {cursor} -> {end} rules={rules:?}");

            match out.last_mut() {
                Some(prev) if prev.rules == rules => prev.end = end,
                _ => out.push(TimeSegment { start: cursor, end, rules }),
            }
            cursor = end;
        }

        out
    }

    /// Rules applicable at instant `at`, after the matching policy.
    pub(crate) fn applicable_at(&self, at: NaiveDateTime) -> Vec<RuleId> {
        let mut candidates: Vec<RuleId> =
            self.rules.iter().enumerate().filter(|(_, rule)| self.is_candidate(rule, at)).map(|(id, _)| id).collect();

        match self.policy {
            MatchingPolicy::ScopedSuppressesDefaults => {
                if candidates.iter().any(|&id| self.rules.rules()[id].competes_as_scoped()) {
                    candidates.retain(|&id| {
                        let rule = &self.rules.rules()[id];
                        rule.schedule.is_time_scoped() || rule.kind == RuleKind::ConditionalFree
                    });
                }
            }
            MatchingPolicy::Layered => {
                candidates.sort_by_key(|&id| !self.rules.rules()[id].competes_as_scoped());
            }
        }

        candidates
    }

    fn is_candidate(&self, rule: &RateRule, at: NaiveDateTime) -> bool {
        let priced = match rule.kind {
            RuleKind::Base | RuleKind::Max | RuleKind::Progressive => rule.unit_price.is_some(),
            RuleKind::ConditionalFree => true,
        };
        priced
            && rule.days.admits(self.classifier.classify(at))
            && self.activation(rule).is_none_or(|active_from| at >= active_from)
            && rule.schedule.matches(at)
    }

    /// Instant from which a thresholded rule becomes active.
    fn activation(&self, rule: &RateRule) -> Option<NaiveDateTime> {
        let minutes = rule.apply_after.filter(|&m| m > 0)?;
        self.stay.entry().checked_add_signed(TimeDelta::minutes(i64::from(minutes)))
    }

    /// Soonest instant after `at` where the applicable subset may change,
    /// bounded by exit.
    pub(crate) fn next_boundary(&self, at: NaiveDateTime) -> NaiveDateTime {
        let mut next = self.stay.exit();
        let mut consider = |candidate: NaiveDateTime| {
            if candidate > at && candidate < next {
                next = candidate;
            }
        };

        for day in 0..=1 {
            let Some(midnight) = at.date().checked_add_days(Days::new(day)).map(|d| d.and_time(NaiveTime::MIN))
            else {
                continue;
            };
            if self.day_boundaries {
                consider(midnight);
            }
            for rule in self.rules {
                if let Schedule::Window(range) = rule.schedule {
                    for edge in range.edges() {
                        consider(midnight + TimeDelta::minutes(i64::from(edge)));
                    }
                }
            }
        }

        for rule in self.rules {
            if let Some(active_from) = self.activation(rule) {
                consider(active_from);
            }
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::day_type::WeekendClassifier;
    use crate::rules::model::{DayMask, TimeRange};
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    fn range(sh: u32, eh: u32) -> TimeRange {
        TimeRange::from_hm(sh, 0, eh, 0).unwrap()
    }

    fn day_night() -> RateRuleSet {
        RateRuleSet::new(vec![RateRule::base(20, 200).during(range(8, 22)), RateRule::base(60, 100).during(range(22, 8))])
    }

    fn segments(rules: &RateRuleSet, stay: StayInterval) -> Vec<TimeSegment> {
        Segmenter::new(rules, stay, DEFAULT_MATCHING_POLICY, &WeekendClassifier).segments()
    }

    #[test]
    fn splits_at_window_edges() {
        let rules = day_night();
        let stay = StayInterval::new(at(10, 20, 0), at(11, 9, 0)).unwrap();
        let segs = segments(&rules, stay);

        assert_eq!(segs.len(), 3);
        assert_eq!((segs[0].start, segs[0].end, segs[0].rules.clone()), (at(10, 20, 0), at(10, 22, 0), vec![0]));
        assert_eq!((segs[1].start, segs[1].end, segs[1].rules.clone()), (at(10, 22, 0), at(11, 8, 0), vec![1]));
        assert_eq!((segs[2].start, segs[2].end, segs[2].rules.clone()), (at(11, 8, 0), at(11, 9, 0), vec![0]));
    }

    #[test]
    fn segments_cover_the_stay_exactly() {
        let rules = day_night();
        let stay = StayInterval::new(at(10, 7, 13), at(13, 3, 47)).unwrap();
        let segs = segments(&rules, stay);

        assert_eq!(segs.first().unwrap().start, stay.entry());
        assert_eq!(segs.last().unwrap().end, stay.exit());
        for pair in segs.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_ne!(pair[0].rules, pair[1].rules);
        }
        let total: TimeDelta = segs.iter().map(TimeSegment::duration).sum();
        assert_eq!(total, stay.duration());
    }

    #[test]
    fn midnight_inside_a_wrapping_window_is_not_a_split() {
        let rules = RateRuleSet::new(vec![
            RateRule::base(20, 200).during(range(8, 22)),
            RateRule::base(60, 100).during(range(22, 8)).on(DayMask::all()),
            RateRule::max(0, 1000).on(DayMask::WEEKEND_HOLIDAY),
        ]);
        let stay = StayInterval::new(at(10, 23, 0), at(11, 1, 0)).unwrap();
        let segs = segments(&rules, stay);

        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].rules, vec![1]);
    }

    #[test]
    fn scoped_match_suppresses_default_rules() {
        let rules = RateRuleSet::new(vec![
            RateRule::base(30, 300),
            RateRule::base(60, 100).during(range(22, 8)),
            RateRule::conditional_free(30),
        ]);
        let seg = Segmenter::new(
            &rules,
            StayInterval::from_minutes(at(10, 12, 0), 60).unwrap(),
            DEFAULT_MATCHING_POLICY,
            &WeekendClassifier,
        );

        assert_eq!(seg.applicable_at(at(10, 12, 0)), vec![0, 2]);
        assert_eq!(seg.applicable_at(at(10, 23, 0)), vec![1, 2]);
    }

    #[test]
    fn layered_policy_keeps_defaults_behind_scoped_rules() {
        let rules = RateRuleSet::new(vec![RateRule::base(30, 300), RateRule::base(60, 100).during(range(22, 8))]);
        let seg = Segmenter::new(
            &rules,
            StayInterval::from_minutes(at(10, 23, 0), 60).unwrap(),
            MatchingPolicy::Layered,
            &WeekendClassifier,
        );

        assert_eq!(seg.applicable_at(at(10, 23, 0)), vec![1, 0]);
    }

    #[test]
    fn activation_threshold_is_a_boundary() {
        let rules = RateRuleSet::new(vec![RateRule::base(1, 10).after(60)]);
        let stay = StayInterval::from_minutes(at(10, 9, 0), 90).unwrap();
        let segs = segments(&rules, stay);

        assert_eq!(segs.len(), 2);
        assert!(segs[0].rules.is_empty());
        assert_eq!(segs[0].billed_minutes(stay.entry()), 60);
        assert_eq!(segs[1].rules, vec![0]);
        assert_eq!(segs[1].billed_minutes(stay.entry()), 30);
    }

    #[test]
    fn billed_minutes_add_up_with_seconds_in_entry() {
        let rules = day_night();
        let entry = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap().and_hms_opt(21, 59, 31).unwrap();
        let exit = NaiveDate::from_ymd_opt(2024, 4, 11).unwrap().and_hms_opt(8, 0, 29).unwrap();
        let stay = StayInterval::new(entry, exit).unwrap();
        let segs = segments(&rules, stay);

        let billed: Vec<u32> = segs.iter().map(|s| s.billed_minutes(stay.entry())).collect();
        assert_eq!(billed, vec![0, 600, 1]);
        assert_eq!(billed.iter().sum::<u32>(), stay.minutes());
    }

    #[test]
    fn day_type_change_splits_at_midnight() {
        // Friday night into Saturday.
        let rules = RateRuleSet::new(vec![
            RateRule::base(30, 200).on(DayMask::WEEKDAY),
            RateRule::base(30, 300).on(DayMask::WEEKEND_HOLIDAY),
        ]);
        let stay = StayInterval::new(at(12, 23, 0), at(13, 1, 0)).unwrap();
        let segs = segments(&rules, stay);

        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].end, at(13, 0, 0));
        assert_eq!(segs[0].rules, vec![0]);
        assert_eq!(segs[1].rules, vec![1]);
    }

    #[test]
    fn unparseable_schedule_never_matches() {
        let mut broken = RateRule::base(10, 1000);
        broken.schedule = Schedule::Unparseable;
        let rules = RateRuleSet::new(vec![broken, RateRule::base(30, 100)]);
        let segs = segments(&rules, StayInterval::from_minutes(at(10, 9, 0), 60).unwrap());

        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].rules, vec![1]);
    }
}
