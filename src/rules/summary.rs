//! Human-readable tariff summaries for display.

use crate::rules::model::{CapWindow, DayMask, MINUTES_PER_DAY, RateRule, RateRuleSet, RuleKind, Schedule};

/// Summarize a rule set, one clause per rule, in rule order.
///
/// ```text
/// ¥200/20min (08:00-22:00); ¥100/60min (22:00-08:00); max ¥1500/day
/// ```
pub fn summarize(rules: &RateRuleSet) -> String {
    if rules.is_empty() {
        return "no rates".to_string();
    }
    rules.iter().map(describe).collect::<Vec<_>>().join("; ")
}

fn describe(rule: &RateRule) -> String {
    let price = rule.unit_price.map_or_else(|| "¥?".to_string(), |p| format!("¥{p}"));
    let unit = rule.unit_minutes.map_or_else(|| "?".to_string(), format_minutes);

    let head = match rule.kind {
        RuleKind::Base if rule.is_fully_free() => "free".to_string(),
        RuleKind::Base => format!("{price}/{unit}"),
        RuleKind::Max => match rule.cap_window() {
            CapWindow::Unrestricted { window } if window == MINUTES_PER_DAY => format!("max {price}/day"),
            CapWindow::Unrestricted { window } | CapWindow::Bounded { period: window } => {
                format!("max {price}/{}", format_minutes(window))
            }
        },
        RuleKind::ConditionalFree => format!("first {unit} free (conditional)"),
        RuleKind::Progressive => format!("{price}/{unit}"),
    };

    let mut scope = Vec::new();
    match rule.schedule {
        Schedule::AllDay => {}
        Schedule::Window(range) => scope.push(range.to_string()),
        Schedule::Unparseable => scope.push("hours unknown".to_string()),
    }
    if rule.days == DayMask::WEEKDAY {
        scope.push("weekdays".to_string());
    } else if rule.days == DayMask::WEEKEND_HOLIDAY {
        scope.push("weekends/holidays".to_string());
    }
    if let Some(after) = rule.apply_after.filter(|&m| m > 0) {
        scope.push(format!("after {}", format_minutes(after)));
    }

    if scope.is_empty() { head } else { format!("{head} ({})", scope.join(", ")) }
}

fn format_minutes(minutes: u32) -> String {
    if minutes > 0 && minutes % 60 == 0 { format!("{}h", minutes / 60) } else { format!("{minutes}min") }
}
