//! Fee calculation driver.
//!
//! The whole calculation is a single forward pass with state
//! `{cursor, CarryState}`:
//!
//! ```text
//! precheck ──┬─ FullyFree ─────────────────────────────▶ Fee(0)
//!            ├─ Unavailable ───────────────────────────▶ Unavailable
//!            └─ Proceed
//!                 │
//!                 v
//!          Segmenter::segments      (segmenter.rs)
//!                 │  ordered, maximal, contiguous
//!                 v
//!          Accumulator::feed × n    (accumulator.rs, carry threaded)
//!                 │  raw total
//!                 v
//!          validate_total           (validate.rs) ──▶ Fee(n) | Unavailable
//! ```
//!
//! Nothing is shared between runs, so a `Calculator` can be created per
//! facility inside a ranking loop, or reused across stays for one facility.

use log::debug;
use std::time::Instant;

use super::accumulator::Accumulator;
use super::metrics::{RunResult, SegmentCharge};
use super::segmenter::Segmenter;
use super::validate::{Precheck, UnavailableReason, precheck, validate_total};
use crate::rules::model::RateRuleSet;
use crate::{FeeResult, Options, StayInterval};

#[derive(Debug)]
pub struct Calculator<'a> {
    rules: &'a RateRuleSet,
    options: &'a Options,
}

impl<'a> Calculator<'a> {
    pub fn new(rules: &'a RateRuleSet, options: &'a Options) -> Self {
        Calculator { rules, options }
    }

    /// Compute the fee for `stay`.
    pub fn run(&self, stay: StayInterval) -> FeeResult {
        self.execute(stay, None).0
    }

    /// Compute the fee for `stay` and keep a per-segment trace.
    pub fn run_with_metrics(&self, stay: StayInterval) -> RunResult {
        let started = Instant::now();
        let mut charges = Vec::new();
        let (result, raw_total, reason) = self.execute(stay, Some(&mut charges));

        RunResult { result, raw_total, reason, charges, elapsed: started.elapsed() }
    }

    fn execute(
        &self,
        stay: StayInterval,
        mut trace: Option<&mut Vec<SegmentCharge>>,
    ) -> (FeeResult, Option<u64>, Option<UnavailableReason>) {
        match precheck(self.rules, stay.minutes()) {
            Precheck::FullyFree => return (FeeResult::Fee(0), None, None),
            Precheck::Unavailable(reason) => return (FeeResult::Unavailable, None, Some(reason)),
            Precheck::Proceed => {}
        }

        let segmenter = Segmenter::new(self.rules, stay, self.options.policy, &*self.options.classifier);
        let mut accumulator = Accumulator::new(stay.entry());

        for segment in segmenter.segments() {
            let charge = accumulator.feed(self.rules, &segment);
            debug!(
                "[segment] {}..{} {}min base={:?} max={:?} carry {}->{} fee={}",
                charge.start,
                charge.end,
                charge.minutes,
                charge.base_rule,
                charge.max_rule,
                charge.carried_in,
                charge.carry_out,
                charge.fee
            );
            if let Some(trace) = trace.as_deref_mut() {
                trace.push(charge);
            }
        }

        let raw_total = accumulator.total();
        match validate_total(self.rules, raw_total) {
            Ok(result) => (result, Some(raw_total), None),
            Err(reason) => (FeeResult::Unavailable, Some(raw_total), Some(reason)),
        }
    }
}
