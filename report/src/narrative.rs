//! Rule-based cause text for cost changes. Everything here is a pure
//! function of the delta rows: same input, same strings, no clock, no I/O.

use common::PeriodKey;

use crate::analyze::{DeltaRow, PctChange};
use crate::config::AnalysisConfig;
use crate::normalize::KEY_SEPARATOR;

/// Fallback when no classification rule matches. Never an error.
pub const FALLBACK_REASON: &str = "Cost changed; review usage details";

/// Usage-type prefixes billed by the hour, formatted with their effective
/// hourly rate in the breakdown text.
const COMPUTE_PATTERNS: &[&str] = &[
    "BoxUsage:",
    "HeavyUsage:",
    "SpotUsage:",
    "InstanceUsage:",
    "Multi-AZUsage:",
    "ServerlessUsage:",
    "NodeUsage:",
    "Node:",
];

/// Strips the `service / ` prefix off a usage-type sub-row key.
fn usage_type_name(key: &str) -> &str {
    key.split_once(KEY_SEPARATOR).map_or(key, |(_, rest)| rest)
}

fn format_compute_usage(usage_type: &str, cost: f64, usage: f64) -> Option<String> {
    let pattern = COMPUTE_PATTERNS.iter().find(|p| usage_type.contains(**p))?;
    let instance = usage_type
        .split(pattern)
        .nth(1)
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("");
    if usage > 0.0 {
        let hourly_rate = cost / usage;
        Some(format!(
            "{instance} ({usage:.3} Hrs @ ${hourly_rate:.4}): ${cost:.2}"
        ))
    } else {
        Some(format!("{instance}: ${cost:.2}"))
    }
}

/// Fixed rule table over the sign, magnitude and usage trend of one row.
pub fn classify(row: &DeltaRow, config: &AnalysisConfig) -> &'static str {
    match row.pct {
        PctChange::New => "New service usage",
        PctChange::Credit => "Credit or refund applied",
        PctChange::Flat => "Minimal Cost Difference",
        PctChange::Ratio(pct) => {
            if pct.abs() < config.minimal_change_pct {
                "Minimal Cost Difference"
            } else if row.delta > 0.0 {
                classify_increase(row, pct)
            } else if row.delta < 0.0 {
                if row.current < 0.0 {
                    "Credit or refund applied"
                } else {
                    "Reduced usage"
                }
            } else {
                FALLBACK_REASON
            }
        }
    }
}

fn classify_increase(row: &DeltaRow, pct: f64) -> &'static str {
    if row.baseline_usage > 0.0 && row.current_usage > 0.0 {
        let usage_growth = row.current_usage / row.baseline_usage - 1.0;
        let cost_growth = pct / 100.0;
        if usage_growth.abs() <= 0.05 && cost_growth > 0.05 {
            "Price or rate change (usage flat, cost up)"
        } else if usage_growth > 0.0 {
            "Usage volume increase"
        } else {
            FALLBACK_REASON
        }
    } else {
        "Usage volume increase"
    }
}

/// Cause text for one row: the classification, the delta, and the usage-type
/// shifts that moved it. `sub` holds the row's usage-type sub-rows, already
/// in analyzer order.
pub fn reason(row: &DeltaRow, sub: &[&DeltaRow], config: &AnalysisConfig) -> String {
    let category = classify(row, config);
    if category == "Minimal Cost Difference" {
        return category.to_string();
    }

    let mut lines = vec![category.to_string()];
    match row.pct {
        PctChange::New => {
            lines.push(format!(
                "Cost increased by USD {:.2} (no activity in the baseline period)",
                row.delta.abs()
            ));
        }
        PctChange::Credit => {
            lines.push(format!(
                "Cost decreased by USD {:.2} (credit with no prior activity)",
                row.delta.abs()
            ));
        }
        PctChange::Ratio(pct) => {
            let verb = if row.delta > 0.0 { "increased" } else { "decreased" };
            lines.push(format!(
                "Cost {verb} by USD {:.2} ({:.1}%)",
                row.delta.abs(),
                pct.abs()
            ));
        }
        PctChange::Flat => {}
    }

    let shifts: Vec<&&DeltaRow> = sub
        .iter()
        .filter(|s| s.delta.abs() > config.min_significant_cost)
        .take(3)
        .collect();
    if !shifts.is_empty() {
        lines.push("Top changes:".to_string());
        for shift in shifts {
            lines.push(format!(
                "- {}: USD {:.2} -> USD {:.2}",
                usage_type_name(&shift.key),
                shift.baseline,
                shift.current
            ));
        }
    }

    lines.join("\n")
}

/// Per-month usage-type breakdown for one row, ending with the cost
/// difference between the compared periods.
pub fn comparison(row: &DeltaRow, periods: &[PeriodKey], sub: &[&DeltaRow]) -> String {
    let mut lines = Vec::new();

    for (index, period) in periods.iter().enumerate() {
        let mut details: Vec<&&DeltaRow> = sub.iter().filter(|s| s.costs[index] != 0.0).collect();
        if details.is_empty() {
            continue;
        }
        details.sort_by(|a, b| b.costs[index].total_cmp(&a.costs[index]));

        lines.push(format!("[{} BREAKDOWN]", period.label().to_uppercase()));
        for detail in details.into_iter().take(5) {
            let name = usage_type_name(&detail.key);
            let cost = detail.costs[index];
            let usage = detail.usages[index];
            match format_compute_usage(name, cost, usage) {
                Some(formatted) => lines.push(formatted),
                None => {
                    lines.push(format!("{name}: USD {cost:.2}"));
                    if usage > 0.0 {
                        lines.push(format!("Usage: {usage:.3} units"));
                    }
                }
            }
        }
    }

    lines.push("[COST DIFFERENCE]".to_string());
    let direction = if row.delta > 0.0 {
        "Increased"
    } else if row.delta < 0.0 {
        "Decreased"
    } else {
        "Unchanged"
    };
    lines.push(format!("USD {:.2} ({direction})", row.delta.abs()));

    lines.join("\n")
}

/// Totals-row comparison text: one line per period plus the overall change.
pub fn total_comparison(periods: &[PeriodKey], totals: &[f64]) -> String {
    let mut lines: Vec<String> = periods
        .iter()
        .zip(totals)
        .map(|(period, total)| format!("{} Total: USD {total:.2}", period.label()))
        .collect();
    if totals.len() >= 2 {
        let change = totals[totals.len() - 1] - totals[0];
        let direction = if change > 0.0 { "Increased" } else { "Decreased" };
        lines.push(String::new());
        lines.push(format!(
            "Total Change: USD {:.2} ({direction})",
            change.abs()
        ));
    }
    lines.join("\n")
}

/// Totals-row reason text.
pub fn simple_reason(totals: &[f64], config: &AnalysisConfig) -> String {
    if totals.len() < 2 {
        return "Insufficient data".to_string();
    }
    let first = totals[0];
    let change = totals[totals.len() - 1] - first;
    let pct = if first > 0.0 { change / first * 100.0 } else { 0.0 };

    if pct.abs() < config.minimal_change_pct {
        "Minimal Cost Difference".to_string()
    } else if change > 0.0 {
        format!(
            "Cost increased by USD {:.2} ({:.1}% increase)",
            change.abs(),
            pct.abs()
        )
    } else {
        format!(
            "Cost decreased by USD {:.2} ({:.1}% decrease)",
            change.abs(),
            pct.abs()
        )
    }
}
