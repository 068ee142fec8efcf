//! Segment fee accumulation.
//!
//! Segments are folded left to right. The only state threaded between them is
//! [`CarryState`]: the part of a cap window that was paid for in one segment
//! and still covers the start of the next.
//!
//! Per segment of `D` minutes, with the segment's BaseRate `B` and MaxRate
//! `X` (price `P`):
//!
//! ```text
//! carry > 0           covered = min(D, carry); excess billed linearly at B
//! no X                linear(B, D)
//! X unrestricted      linear > P ? P (carry window - D) : linear
//!                     repeated for every full day when D > 1440
//! X bounded, D <= M   linear > P ? P (carry M - D)      : linear
//! X bounded, D > M    floor(D / M) * P + min(P, linear(B, D mod M))
//! ```
//!
//! A segment with a MaxRate but no BaseRate is priced by the cap alone.

use chrono::NaiveDateTime;

use crate::engine::metrics::SegmentCharge;
use crate::engine::segmenter::{RuleId, TimeSegment};
use crate::rules::model::{CapWindow, MINUTES_PER_DAY, RateRule, RateRuleSet, RuleKind};

/// Unconsumed part of a previously applied cap window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarryState {
    pub remaining_capped_minutes: u32,
}

/// The rules a segment is billed with.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SegmentRates<'a> {
    pub base: Option<(RuleId, &'a RateRule)>,
    pub max: Option<(RuleId, &'a RateRule)>,
}

impl<'a> SegmentRates<'a> {
    /// First applicable Progressive rule, else first Base; first Max.
    pub(crate) fn select(rules: &'a RateRuleSet, applicable: &[RuleId]) -> Self {
        let mut base = None;
        let mut progressive = None;
        let mut max = None;

        for &id in applicable {
            let Some(rule) = rules.get(id) else { continue };
            match rule.kind {
                RuleKind::Base => {
                    base.get_or_insert((id, rule));
                }
                RuleKind::Progressive => {
                    progressive.get_or_insert((id, rule));
                }
                RuleKind::Max => {
                    max.get_or_insert((id, rule));
                }
                RuleKind::ConditionalFree => {}
            }
        }

        SegmentRates { base: progressive.or(base), max }
    }
}

#[derive(Debug)]
pub(crate) struct Accumulator {
    entry: NaiveDateTime,
    carry: CarryState,
    total: u64,
}

impl Accumulator {
    pub(crate) fn new(entry: NaiveDateTime) -> Self {
        Accumulator { entry, carry: CarryState::default(), total: 0 }
    }

    pub(crate) fn feed(&mut self, rules: &RateRuleSet, segment: &TimeSegment) -> SegmentCharge {
        let rates = SegmentRates::select(rules, &segment.rules);
        let minutes = segment.billed_minutes(self.entry);
        let carried_in = self.carry.remaining_capped_minutes;
        let fee = charge(minutes, rates, &mut self.carry);
        self.total = self.total.saturating_add(fee);

        SegmentCharge {
            start: segment.start,
            end: segment.end,
            minutes,
            base_rule: rates.base.map(|(id, _)| id),
            max_rule: rates.max.map(|(id, _)| id),
            carried_in,
            carry_out: self.carry.remaining_capped_minutes,
            fee,
        }
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }
}

/// Fee for one segment of `minutes`, updating `carry`.
pub(crate) fn charge(minutes: u32, rates: SegmentRates<'_>, carry: &mut CarryState) -> u64 {
    let base = rates.base.map(|(_, rule)| rule);

    if carry.remaining_capped_minutes > 0 {
        let covered = minutes.min(carry.remaining_capped_minutes);
        carry.remaining_capped_minutes -= covered;
        return base.map_or(0, |b| b.linear_fee(minutes - covered));
    }

    if minutes == 0 {
        return 0;
    }

    // `None` = no BaseRate, so any cap is cheaper.
    let linear = |m: u32| base.map(|b| b.linear_fee(m));
    let Some((_, max)) = rates.max else {
        return linear(minutes).unwrap_or(0);
    };
    let price = max.unit_price.unwrap_or(0);
    let exceeds = |fee: Option<u64>| fee.is_none_or(|f| f > price);

    // Cap `span` minutes once; a capped span carries the rest of `window`.
    let capped = |span: u32, window: u32, carry: &mut CarryState| match linear(span) {
        _ if span == 0 => 0,
        fee if exceeds(fee) => {
            carry.remaining_capped_minutes = window.saturating_sub(span);
            price
        }
        fee => fee.unwrap_or(0),
    };

    match max.cap_window() {
        CapWindow::Unrestricted { window } if minutes <= MINUTES_PER_DAY => capped(minutes, window, carry),
        CapWindow::Unrestricted { window } => {
            let full_days = u64::from(minutes / MINUTES_PER_DAY);
            let day_fee = match linear(MINUTES_PER_DAY) {
                fee if exceeds(fee) => price,
                fee => fee.unwrap_or(0),
            };
            full_days.saturating_mul(day_fee).saturating_add(capped(minutes % MINUTES_PER_DAY, window, carry))
        }
        CapWindow::Bounded { period } if minutes <= period => capped(minutes, period, carry),
        CapWindow::Bounded { period } => {
            let full_periods = u64::from(minutes / period);
            full_periods.saturating_mul(price).saturating_add(capped(minutes % period, period, carry))
        }
    }
}
