//! Month-over-month delta computation, driver ranking and impact tiers.

use common::PeriodKey;
use std::cmp::Ordering;

use crate::config::AnalysisConfig;
use crate::error::ReportError;
use crate::normalize::CostMatrix;

/// Coarse bucket summarizing a delta's magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactTier {
    Critical,
    High,
    Medium,
    Low,
}

impl ImpactTier {
    pub fn label(&self) -> &'static str {
        match self {
            ImpactTier::Critical => "Critical",
            ImpactTier::High => "High",
            ImpactTier::Medium => "Medium",
            ImpactTier::Low => "Low",
        }
    }
}

/// Percentage change with the zero-baseline cases made explicit instead of
/// dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PctChange {
    /// Ordinary change, in percent (50.0 means +50%).
    Ratio(f64),
    /// Baseline zero, current positive: the key is new this period. Ranked
    /// as maximal positive impact.
    New,
    /// Baseline zero, current negative: a credit or refund with no prior
    /// activity. Ranked like an ordinary decrease.
    Credit,
    /// Zero in both compared periods. Kept in the full table, excluded from
    /// drivers.
    Flat,
}

impl PctChange {
    pub fn label(&self) -> String {
        match self {
            PctChange::Ratio(pct) => format!("{pct:+.1}%"),
            PctChange::New => "new".to_string(),
            PctChange::Credit => "credit".to_string(),
            PctChange::Flat => "0.0%".to_string(),
        }
    }
}

/// Whether a row's cost went up, down, or stayed roughly flat between the
/// compared periods. Drives the spreadsheet grouping and row colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    Increased,
    Decreased,
    Same,
}

/// Derived analysis for one dimension key. Computed once per report and
/// consumed only by the narrative generator and renderers.
#[derive(Debug, Clone)]
pub struct DeltaRow {
    pub key: String,
    /// Net cost per requested period, chronological.
    pub costs: Vec<f64>,
    /// Usage quantity per requested period; zeros when unavailable.
    pub usages: Vec<f64>,
    pub total: f64,
    pub baseline: f64,
    pub current: f64,
    pub baseline_usage: f64,
    pub current_usage: f64,
    /// Current minus baseline.
    pub delta: f64,
    pub pct: PctChange,
    pub tier: ImpactTier,
    /// Per-month breakdown text. Filled by the narrative stage.
    pub comparison: String,
    /// Cause classification text. Filled by the narrative stage.
    pub reason: String,
}

impl DeltaRow {
    pub fn is_new(&self) -> bool {
        matches!(self.pct, PctChange::New)
    }

    pub fn change_class(&self, config: &AnalysisConfig) -> ChangeClass {
        match self.pct {
            PctChange::New => ChangeClass::Increased,
            PctChange::Credit => ChangeClass::Decreased,
            PctChange::Flat => ChangeClass::Same,
            PctChange::Ratio(pct) => {
                if pct.abs() < config.minimal_change_pct {
                    ChangeClass::Same
                } else if self.delta > 0.0 {
                    ChangeClass::Increased
                } else {
                    ChangeClass::Decreased
                }
            }
        }
    }
}

fn pct_change(baseline: f64, current: f64) -> PctChange {
    if baseline == 0.0 {
        if current == 0.0 {
            PctChange::Flat
        } else if current < 0.0 {
            PctChange::Credit
        } else {
            PctChange::New
        }
    } else {
        PctChange::Ratio((current - baseline) / baseline * 100.0)
    }
}

fn tier_for(delta: f64, config: &AnalysisConfig) -> ImpactTier {
    let magnitude = delta.abs();
    if magnitude >= config.critical_threshold {
        ImpactTier::Critical
    } else if magnitude >= config.high_threshold {
        ImpactTier::High
    } else if magnitude >= config.medium_threshold {
        ImpactTier::Medium
    } else {
        ImpactTier::Low
    }
}

/// New keys first (they carry maximal positive impact), then descending
/// absolute delta, ties by descending total, then key ascending. Fully
/// deterministic: identical input yields identical order.
fn rank(a: &DeltaRow, b: &DeltaRow) -> Ordering {
    b.is_new()
        .cmp(&a.is_new())
        .then_with(|| b.delta.abs().total_cmp(&a.delta.abs()))
        .then_with(|| b.total.total_cmp(&a.total))
        .then_with(|| a.key.cmp(&b.key))
}

/// Computes one `DeltaRow` per matrix row, ordered for rendering. The
/// baseline and current periods must be among the matrix periods; the
/// orchestrator validates this before calling.
pub fn analyze(
    matrix: &CostMatrix,
    baseline: PeriodKey,
    current: PeriodKey,
    config: &AnalysisConfig,
) -> Result<Vec<DeltaRow>, ReportError> {
    let baseline_index = matrix.period_index(baseline).ok_or_else(|| {
        ReportError::InvalidRequest(format!("baseline period {baseline} is not in the report"))
    })?;
    let current_index = matrix.period_index(current).ok_or_else(|| {
        ReportError::InvalidRequest(format!("current period {current} is not in the report"))
    })?;

    let mut rows: Vec<DeltaRow> = matrix
        .rows()
        .map(|(key, cells)| {
            let costs: Vec<f64> = cells.iter().map(|c| c.cost).collect();
            let usages: Vec<f64> = cells.iter().map(|c| c.usage).collect();
            let baseline_cost = costs[baseline_index];
            let current_cost = costs[current_index];
            let delta = current_cost - baseline_cost;
            DeltaRow {
                key: key.to_string(),
                total: costs.iter().sum(),
                baseline: baseline_cost,
                current: current_cost,
                baseline_usage: usages[baseline_index],
                current_usage: usages[current_index],
                delta,
                pct: pct_change(baseline_cost, current_cost),
                tier: tier_for(delta, config),
                comparison: String::new(),
                reason: String::new(),
                costs,
                usages,
            }
        })
        .collect();

    rows.sort_by(rank);
    Ok(rows)
}

/// Head of the ranked sequence, skipping rows with no change at all.
pub fn drivers<'a>(rows: &'a [DeltaRow], n: usize) -> Vec<&'a DeltaRow> {
    rows.iter().filter(|r| r.delta != 0.0).take(n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::build_matrix;
    use common::{Granularity, RawCostRecord};

    fn period(s: &str) -> PeriodKey {
        s.parse().unwrap()
    }

    fn record(key: &str, month: &str, amount: f64) -> RawCostRecord {
        RawCostRecord {
            key: key.to_string(),
            usage_type: None,
            period: period(month),
            amount,
            usage: None,
        }
    }

    fn analyze_records(records: Vec<RawCostRecord>, months: &[&str]) -> Vec<DeltaRow> {
        let periods: Vec<PeriodKey> = months.iter().map(|m| period(m)).collect();
        let config = AnalysisConfig::default();
        let matrix = build_matrix(&records, &periods, Granularity::Service, &config).unwrap();
        analyze(&matrix, periods[0], periods[periods.len() - 1], &config).unwrap()
    }

    #[test]
    fn compute_storage_scenario() {
        let rows = analyze_records(
            vec![
                record("Compute", "2025-01", 100.0),
                record("Compute", "2025-02", 150.0),
                record("Storage", "2025-01", 50.0),
                record("Storage", "2025-02", 50.0),
            ],
            &["2025-01", "2025-02"],
        );

        let compute = rows.iter().find(|r| r.key == "Compute").unwrap();
        assert!((compute.delta - 50.0).abs() < f64::EPSILON);
        assert_eq!(compute.pct, PctChange::Ratio(50.0));

        let storage = rows.iter().find(|r| r.key == "Storage").unwrap();
        assert!((storage.delta - 0.0).abs() < f64::EPSILON);
        assert_eq!(storage.pct, PctChange::Ratio(0.0));

        // Storage is in the full table but not among the drivers.
        assert_eq!(rows.len(), 2);
        let top = drivers(&rows, 5);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].key, "Compute");
    }

    #[test]
    fn new_key_ranks_first_despite_small_delta() {
        let rows = analyze_records(
            vec![
                record("Big Mover", "2025-01", 1000.0),
                record("Big Mover", "2025-02", 1900.0),
                record("Newcomer", "2025-02", 3.5),
            ],
            &["2025-01", "2025-02"],
        );
        assert_eq!(rows[0].key, "Newcomer");
        assert_eq!(rows[0].pct, PctChange::New);
        assert_eq!(rows[1].key, "Big Mover");
    }

    #[test]
    fn zero_in_both_compared_periods_is_flat_and_not_a_driver() {
        // MidOnly has cost only in the middle month, so both compared
        // periods are zero.
        let rows = analyze_records(
            vec![
                record("MidOnly", "2025-02", 10.0),
                record("Active", "2025-01", 5.0),
                record("Active", "2025-03", 9.0),
            ],
            &["2025-01", "2025-02", "2025-03"],
        );
        let mid = rows.iter().find(|r| r.key == "MidOnly").unwrap();
        assert_eq!(mid.pct, PctChange::Flat);
        assert!((mid.total - 10.0).abs() < f64::EPSILON);
        assert!(drivers(&rows, 5).iter().all(|r| r.key != "MidOnly"));
    }

    #[test]
    fn zero_baseline_credit_is_a_decrease_not_a_new_service() {
        let rows = analyze_records(
            vec![
                record("CreditOnly", "2025-02", -50.0),
                record("Big Mover", "2025-01", 1000.0),
                record("Big Mover", "2025-02", 2000.0),
            ],
            &["2025-01", "2025-02"],
        );
        let credit = rows.iter().find(|r| r.key == "CreditOnly").unwrap();
        assert_eq!(credit.pct, PctChange::Credit);
        assert!(!credit.is_new());
        assert_eq!(
            credit.change_class(&AnalysisConfig::default()),
            ChangeClass::Decreased
        );
        // The real mover outranks the small credit.
        assert_eq!(rows[0].key, "Big Mover");
        assert_eq!(drivers(&rows, 5).len(), 2);
    }

    #[test]
    fn ordering_is_deterministic_across_runs() {
        let records = vec![
            record("A", "2025-01", 10.0),
            record("A", "2025-02", 30.0),
            record("B", "2025-01", 40.0),
            record("B", "2025-02", 60.0),
            record("C", "2025-01", 5.0),
            record("C", "2025-02", 25.0),
        ];
        let first = analyze_records(records.clone(), &["2025-01", "2025-02"]);
        let second = analyze_records(records, &["2025-01", "2025-02"]);
        let order_a: Vec<_> = first.iter().map(|r| r.key.clone()).collect();
        let order_b: Vec<_> = second.iter().map(|r| r.key.clone()).collect();
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn equal_deltas_tie_break_on_total_then_key() {
        // Both move by +20; B has the larger total across periods.
        let rows = analyze_records(
            vec![
                record("A", "2025-01", 10.0),
                record("A", "2025-02", 30.0),
                record("B", "2025-01", 50.0),
                record("B", "2025-02", 70.0),
            ],
            &["2025-01", "2025-02"],
        );
        assert_eq!(rows[0].key, "B");
        assert_eq!(rows[1].key, "A");
    }

    #[test]
    fn tiers_follow_configured_cutoffs() {
        let config = AnalysisConfig::default();
        assert_eq!(tier_for(1500.0, &config), ImpactTier::Critical);
        assert_eq!(tier_for(-1500.0, &config), ImpactTier::Critical);
        assert_eq!(tier_for(600.0, &config), ImpactTier::High);
        assert_eq!(tier_for(150.0, &config), ImpactTier::Medium);
        assert_eq!(tier_for(20.0, &config), ImpactTier::Low);
    }

    #[test]
    fn change_class_respects_minimal_threshold() {
        let rows = analyze_records(
            vec![
                record("Nudge", "2025-01", 100.0),
                record("Nudge", "2025-02", 102.0),
                record("Jump", "2025-01", 100.0),
                record("Jump", "2025-02", 150.0),
                record("Drop", "2025-01", 100.0),
                record("Drop", "2025-02", 40.0),
            ],
            &["2025-01", "2025-02"],
        );
        let config = AnalysisConfig::default();
        let class_of = |key: &str| {
            rows.iter()
                .find(|r| r.key == key)
                .unwrap()
                .change_class(&config)
        };
        assert_eq!(class_of("Nudge"), ChangeClass::Same);
        assert_eq!(class_of("Jump"), ChangeClass::Increased);
        assert_eq!(class_of("Drop"), ChangeClass::Decreased);
    }

    #[test]
    fn missing_comparison_period_is_invalid_request() {
        let periods = [period("2025-01"), period("2025-02")];
        let config = AnalysisConfig::default();
        let matrix = build_matrix(&[], &periods, Granularity::Service, &config).unwrap();
        let err = analyze(&matrix, period("2024-01"), period("2025-02"), &config).unwrap_err();
        assert!(matches!(err, ReportError::InvalidRequest(_)));
    }
}
