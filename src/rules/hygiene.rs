//! Anomaly clamp for ingested rate tables.
//!
//! Price boards read by OCR or typed in by hand regularly come through with a
//! dropped decimal separator (`2000` for `200`) or a cap cheaper than a single
//! unit. This stage corrects the obvious cases. It is a separate step of the
//! ingestion pipeline; the calculator never calls it.

use log::warn;

use crate::engine::RuleId;
use crate::rules::model::{RateRule, RateRuleSet, RuleKind, Schedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampConfig {
    /// Highest plausible price for one Base unit.
    pub base_price_ceiling: u64,
    /// A Max price below its Base price is raised to this multiple of it.
    pub max_to_base_multiplier: u64,
}

impl Default for ClampConfig {
    fn default() -> Self {
        ClampConfig { base_price_ceiling: 3000, max_to_base_multiplier: 3 }
    }
}

/// A correction made by [`clamp_anomalies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    BasePriceClamped { rule: RuleId, from: u64, to: u64 },
    MaxPriceRaised { rule: RuleId, from: u64, to: u64 },
}

/// Clamp implausible Base prices, then raise Max prices that undercut their
/// Base price. Returns every change made.
pub fn clamp_anomalies(rules: &mut RateRuleSet, config: &ClampConfig) -> Vec<Adjustment> {
    let mut adjustments = Vec::new();

    for (id, rule) in rules.rules_mut().iter_mut().enumerate() {
        if rule.kind != RuleKind::Base {
            continue;
        }
        if let Some(price) = rule.unit_price.filter(|&p| p > config.base_price_ceiling) {
            warn!("[hygiene] base rule #{id}: price {price} clamped to {}", config.base_price_ceiling);
            rule.unit_price = Some(config.base_price_ceiling);
            adjustments.push(Adjustment::BasePriceClamped { rule: id, from: price, to: config.base_price_ceiling });
        }
    }

    let snapshot: Vec<RateRule> = rules.rules().to_vec();
    for (id, rule) in rules.rules_mut().iter_mut().enumerate() {
        if rule.kind != RuleKind::Max {
            continue;
        }
        let (Some(price), Some(base_price)) = (rule.unit_price, reference_base_price(&snapshot, &rule.schedule)) else {
            continue;
        };
        if price < base_price {
            let raised = base_price.saturating_mul(config.max_to_base_multiplier);
            warn!("[hygiene] max rule #{id}: price {price} below base {base_price}, raised to {raised}");
            rule.unit_price = Some(raised);
            adjustments.push(Adjustment::MaxPriceRaised { rule: id, from: price, to: raised });
        }
    }

    adjustments
}

/// Price of the Base rule a Max rule caps: the first usable Base with the
/// same schedule, else the first usable Base.
fn reference_base_price(rules: &[RateRule], schedule: &Schedule) -> Option<u64> {
    let usable = || rules.iter().filter(|r| r.is_usable_base());
    usable().find(|r| &r.schedule == schedule).or_else(|| usable().next()).and_then(|r| r.unit_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::TimeRange;

    #[test]
    fn clamps_base_and_raises_max() {
        let night = TimeRange::from_hm(22, 0, 8, 0).unwrap();
        let mut rules = RateRuleSet::new(vec![
            RateRule::base(30, 20000),
            RateRule::base(60, 100).during(night),
            RateRule::max(0, 50),
            RateRule::max(0, 80).during(night),
        ]);
        let adjustments = clamp_anomalies(&mut rules, &ClampConfig::default());

        assert_eq!(
            adjustments,
            vec![
                Adjustment::BasePriceClamped { rule: 0, from: 20000, to: 3000 },
                Adjustment::MaxPriceRaised { rule: 2, from: 50, to: 9000 },
                Adjustment::MaxPriceRaised { rule: 3, from: 80, to: 300 },
            ]
        );
        assert_eq!(rules.rules()[0].unit_price, Some(3000));
        assert_eq!(rules.rules()[3].unit_price, Some(300));
    }

    #[test]
    fn plausible_tables_are_untouched() {
        let mut rules = RateRuleSet::new(vec![RateRule::base(30, 300), RateRule::max(0, 1500)]);
        let before = rules.clone();
        assert!(clamp_anomalies(&mut rules, &ClampConfig::default()).is_empty());
        assert_eq!(rules, before);
    }
}
