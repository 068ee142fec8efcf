//! Calculation traces.
//!
//! `Calculator::run` is the hot path used inside ranking loops and keeps
//! nothing. `Calculator::run_with_metrics` additionally records one
//! [`SegmentCharge`] per segment plus the elapsed time, for debugging and the
//! CLI report.

use chrono::NaiveDateTime;
use std::time::Duration;

use crate::FeeResult;
use crate::engine::segmenter::RuleId;
use crate::engine::validate::UnavailableReason;

/// What one segment contributed to the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentCharge {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Rounded segment length.
    pub minutes: u32,
    /// Rule used as BaseRate, if any.
    pub base_rule: Option<RuleId>,
    /// Rule used as MaxRate, if any.
    pub max_rule: Option<RuleId>,
    /// Capped minutes carried into the segment.
    pub carried_in: u32,
    /// Capped minutes carried out of the segment.
    pub carry_out: u32,
    pub fee: u64,
}

/// Calculator output bundled with its trace.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub result: FeeResult,
    /// Sum of segment fees before final validation (`None` when segmentation
    /// was skipped).
    pub raw_total: Option<u64>,
    pub reason: Option<UnavailableReason>,
    pub charges: Vec<SegmentCharge>,
    pub elapsed: Duration,
}
