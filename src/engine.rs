//! Fee calculation engine.
//!
//! Pricing a stay against a facility's rule set is a pipeline:
//!
//! ```text
//! RateRuleSet ──┐
//!               │  precheck                     (validate.rs)
//!               └───────────────┬──────────────
//!                               │
//! StayInterval ── Segmenter ────┼─ maximal segments with a constant rule subset
//!                 (segmenter.rs) │
//!                               v
//!                     Accumulator (accumulator.rs)
//!                       - pick BaseRate / MaxRate per segment
//!                       - apply caps, thread CarryState
//!                               │
//!                               v
//!                     validate_total (validate.rs)
//!                               │
//!                               v
//!                     FeeResult::{Fee(n), Unavailable}
//! ```
//!
//! The engine is pure: no I/O, no clock reads, no shared state. The same
//! rules, stay and options always produce the same result.
//!
//! ## Responsibilities by module
//!
//! - `calculator.rs`: drives the pass and optionally records a trace.
//! - `segmenter.rs`: boundary scan, matching policy, [`TimeSegment`].
//! - `accumulator.rs`: per-segment pricing and [`CarryState`].
//! - `validate.rs`: rule-set usability and final zero check.
//! - `metrics.rs`: [`SegmentCharge`] and the per-run trace.
//!
//! ## Debugging
//!
//! The engine logs through `log`: `debug` for short-circuits and per-segment
//! charges, `trace` for every emitted segment boundary.

#[path = "engine/accumulator.rs"]
mod accumulator;
#[path = "engine/calculator.rs"]
mod calculator;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/segmenter.rs"]
mod segmenter;
#[path = "engine/validate.rs"]
mod validate;

pub use accumulator::CarryState;
pub use calculator::Calculator;
pub use metrics::SegmentCharge;
pub use segmenter::{DEFAULT_MATCHING_POLICY, MatchingPolicy, RuleId, TimeSegment};
pub use validate::UnavailableReason;
