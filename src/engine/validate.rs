//! Usability checks around the segment scan.
//!
//! Before segmentation, [`precheck`] decides whether the rule set can price
//! the stay at all, or whether the answer is known without scanning. After
//! accumulation, [`validate_total`] refuses a zero total that no rule
//! authorizes, since that is how malformed tariffs (a priced Base with a zero
//! unit, a scoped rule that never matches) usually show up.

use log::debug;
use std::fmt;

use crate::FeeResult;
use crate::rules::model::{RateRuleSet, RuleKind};

/// Why a calculation ended in `FeeResult::Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnavailableReason {
    /// No Base rule with a positive unit and a price, and no standalone Max.
    NoUsableRate,
    /// A conditional-free window covers the whole stay; the condition cannot
    /// be verified, so the stay is not priced.
    ConditionalFreeWindow,
    /// The segments summed to zero and no rule allows a free stay.
    UnauthorizedZero,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::NoUsableRate => write!(f, "no usable rate"),
            UnavailableReason::ConditionalFreeWindow => write!(f, "conditional free window covers the stay"),
            UnavailableReason::UnauthorizedZero => write!(f, "zero total not authorized by any rule"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Precheck {
    /// Facility never charges; skip segmentation.
    FullyFree,
    Unavailable(UnavailableReason),
    Proceed,
}

pub(crate) fn precheck(rules: &RateRuleSet, stay_minutes: u32) -> Precheck {
    if rules.iter().any(|r| r.is_fully_free()) {
        debug!("[precheck] fully free facility");
        return Precheck::FullyFree;
    }

    let conditional_window = rules.iter().any(|r| match r.kind {
        RuleKind::ConditionalFree => r.unit_minutes.is_some_and(|threshold| threshold >= stay_minutes),
        RuleKind::Base | RuleKind::Max | RuleKind::Progressive => false,
    });
    if conditional_window {
        debug!("[precheck] conditional free window >= {stay_minutes} min");
        return Precheck::Unavailable(UnavailableReason::ConditionalFreeWindow);
    }

    if !rules.iter().any(|r| r.is_usable_base() || r.is_standalone_max()) {
        debug!("[precheck] no usable base rate and no standalone cap");
        return Precheck::Unavailable(UnavailableReason::NoUsableRate);
    }

    Precheck::Proceed
}

pub(crate) fn validate_total(rules: &RateRuleSet, raw_total: u64) -> Result<FeeResult, UnavailableReason> {
    if raw_total == 0 && !rules.iter().any(|r| r.authorizes_zero()) {
        debug!("[validate] zero total without an authorizing rule");
        return Err(UnavailableReason::UnauthorizedZero);
    }
    Ok(FeeResult::Fee(raw_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::RateRule;

    #[test]
    fn fully_free_short_circuits() {
        let rules = RateRuleSet::new(vec![RateRule::base(30, 300), RateRule::base(0, 0)]);
        assert_eq!(precheck(&rules, 120), Precheck::FullyFree);
    }

    #[test]
    fn conditional_free_covering_the_stay_is_unavailable() {
        let rules = RateRuleSet::new(vec![RateRule::base(30, 300), RateRule::conditional_free(60)]);
        assert_eq!(precheck(&rules, 60), Precheck::Unavailable(UnavailableReason::ConditionalFreeWindow));
        assert_eq!(precheck(&rules, 61), Precheck::Proceed);
    }

    #[test]
    fn needs_a_usable_base_or_standalone_cap() {
        let broken = RateRuleSet::new(vec![RateRule::base(0, 300), RateRule::new(RuleKind::Base, Some(30), None)]);
        assert_eq!(precheck(&broken, 30), Precheck::Unavailable(UnavailableReason::NoUsableRate));

        let flat = RateRuleSet::new(vec![RateRule::max(0, 700)]);
        assert_eq!(precheck(&flat, 30), Precheck::Proceed);
    }

    #[test]
    fn zero_total_needs_authorization() {
        let paid = RateRuleSet::new(vec![RateRule::base(30, 300)]);
        assert_eq!(validate_total(&paid, 0), Err(UnavailableReason::UnauthorizedZero));
        assert_eq!(validate_total(&paid, 600), Ok(FeeResult::Fee(600)));

        let free_nights = RateRuleSet::new(vec![RateRule::base(30, 300), RateRule::base(60, 0)]);
        assert_eq!(validate_total(&free_nights, 0), Ok(FeeResult::Fee(0)));
    }
}
