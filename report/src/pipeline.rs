//! The report pipeline: validate, normalize, analyze, narrate, render.
//! Strictly sequential; each stage is a pure function of the previous
//! stage's output, and nothing here touches the network or the clock.

use chrono::{DateTime, Utc};
use common::{CostDataSet, Granularity, PeriodKey, RenderedArtifact, ReportRequest};

use crate::analyze::{analyze, drivers, DeltaRow};
use crate::config::AnalysisConfig;
use crate::error::ReportError;
use crate::narrative;
use crate::normalize::{build_matrix, KEY_SEPARATOR};
use crate::render::{renderer_for, ReportView};

pub const MIN_PERIODS: usize = 2;
pub const MAX_PERIODS: usize = 6;

/// Rejects anything the pipeline is not willing to process. Invalid
/// requests never reach the normalizer.
pub fn validate_request(request: &ReportRequest) -> Result<(), ReportError> {
    let count = request.periods.len();
    if !(MIN_PERIODS..=MAX_PERIODS).contains(&count) {
        return Err(ReportError::InvalidRequest(format!(
            "expected between {MIN_PERIODS} and {MAX_PERIODS} periods, got {count}"
        )));
    }
    for pair in request.periods.windows(2) {
        if pair[1] <= pair[0] {
            return Err(ReportError::InvalidRequest(
                "periods must be distinct and strictly increasing".to_string(),
            ));
        }
    }
    if let Some(budget) = &request.budget {
        if !budget.threshold.is_finite() || budget.threshold < 0.0 {
            return Err(ReportError::InvalidRequest(
                "budget threshold must be a non-negative amount".to_string(),
            ));
        }
        for period in [budget.baseline, budget.current].into_iter().flatten() {
            if !request.periods.contains(&period) {
                return Err(ReportError::InvalidRequest(format!(
                    "budget comparison period {period} is not among the requested periods"
                )));
            }
        }
    }
    Ok(())
}

/// Baseline and current period for delta computation: the budget context
/// pair when given, otherwise the first and last requested periods.
pub fn comparison_periods(request: &ReportRequest) -> (PeriodKey, PeriodKey) {
    let first = request.periods[0];
    let last = request.periods[request.periods.len() - 1];
    match &request.budget {
        Some(budget) => (
            budget.baseline.unwrap_or(first),
            budget.current.unwrap_or(last),
        ),
        None => (first, last),
    }
}

/// Runs the whole pipeline and returns the rendered artifact. The caller
/// supplies `generated_at` so identical requests produce identical bytes.
pub fn build_report(
    request: &ReportRequest,
    data: &CostDataSet,
    config: &AnalysisConfig,
    generated_at: DateTime<Utc>,
) -> Result<RenderedArtifact, ReportError> {
    validate_request(request)?;
    let (baseline, current) = comparison_periods(request);

    let matrix = build_matrix(&data.records, &request.periods, request.granularity, config)?;
    let regional_matrix =
        build_matrix(&data.regional, &request.periods, Granularity::Region, config)?;

    let mut rows = analyze(&matrix, baseline, current, config)?;
    let regional = analyze(&regional_matrix, baseline, current, config)?;

    // Usage-type sub-rows feed the narrative for service-keyed reports.
    let sub_rows: Vec<DeltaRow> = if request.granularity == Granularity::Service {
        let sub_matrix =
            build_matrix(&data.records, &request.periods, Granularity::UsageType, config)?;
        analyze(&sub_matrix, baseline, current, config)?
    } else {
        Vec::new()
    };

    for row in &mut rows {
        let prefix = format!("{}{}", row.key, KEY_SEPARATOR);
        let sub: Vec<&DeltaRow> = sub_rows
            .iter()
            .filter(|s| s.key.starts_with(&prefix))
            .collect();
        row.comparison = narrative::comparison(row, &request.periods, &sub);
        row.reason = narrative::reason(row, &sub, config);
    }

    let driver_rows: Vec<DeltaRow> = drivers(&rows, config.top_drivers)
        .into_iter()
        .cloned()
        .collect();
    log::debug!(
        "analyzed {} rows, {} drivers, {} regions",
        rows.len(),
        driver_rows.len(),
        regional.len()
    );

    let view = ReportView {
        client: &request.client,
        periods: &request.periods,
        rows: &rows,
        drivers: &driver_rows,
        regional: &regional,
        budget: request.budget.as_ref(),
        generated_at,
    };
    renderer_for(request.format).render(&view, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::{BudgetContext, RawCostRecord, ReportFormat};

    fn period(s: &str) -> PeriodKey {
        s.parse().unwrap()
    }

    fn periods(months: &[&str]) -> Vec<PeriodKey> {
        months.iter().map(|m| period(m)).collect()
    }

    fn request(months: &[&str], format: ReportFormat) -> ReportRequest {
        ReportRequest {
            client: "Acme Corp".to_string(),
            periods: periods(months),
            granularity: Granularity::Service,
            format,
            budget: None,
        }
    }

    fn record(key: &str, usage_type: Option<&str>, month: &str, amount: f64) -> RawCostRecord {
        RawCostRecord {
            key: key.to_string(),
            usage_type: usage_type.map(|u| u.to_string()),
            period: period(month),
            amount,
            usage: Some(100.0),
        }
    }

    fn sample_data() -> CostDataSet {
        CostDataSet {
            records: vec![
                record("Compute", Some("BoxUsage:t3.large"), "2025-09", 100.0),
                record("Compute", Some("BoxUsage:t3.large"), "2025-10", 150.0),
                record("Storage", Some("TimedStorage-ByteHrs"), "2025-09", 50.0),
                record("Storage", Some("TimedStorage-ByteHrs"), "2025-10", 50.0),
            ],
            regional: vec![
                record("us-east-1", None, "2025-09", 120.0),
                record("us-east-1", None, "2025-10", 160.0),
                record("eu-west-1", None, "2025-09", 30.0),
                record("eu-west-1", None, "2025-10", 40.0),
            ],
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, 9, 30, 0).unwrap()
    }

    #[test]
    fn two_and_six_periods_are_accepted() {
        let two = request(&["2025-09", "2025-10"], ReportFormat::Spreadsheet);
        assert!(validate_request(&two).is_ok());

        let six = request(
            &["2025-01", "2025-02", "2025-03", "2025-04", "2025-05", "2025-06"],
            ReportFormat::Spreadsheet,
        );
        assert!(validate_request(&six).is_ok());
    }

    #[test]
    fn one_and_seven_periods_are_rejected() {
        let one = request(&["2025-09"], ReportFormat::Spreadsheet);
        assert!(matches!(
            validate_request(&one),
            Err(ReportError::InvalidRequest(_))
        ));

        let seven = request(
            &[
                "2025-01", "2025-02", "2025-03", "2025-04", "2025-05", "2025-06", "2025-07",
            ],
            ReportFormat::Spreadsheet,
        );
        assert!(matches!(
            validate_request(&seven),
            Err(ReportError::InvalidRequest(_))
        ));
    }

    #[test]
    fn duplicate_or_unordered_periods_are_rejected() {
        let duplicate = request(&["2025-09", "2025-09"], ReportFormat::Spreadsheet);
        assert!(validate_request(&duplicate).is_err());

        let unordered = request(&["2025-10", "2025-09"], ReportFormat::Spreadsheet);
        assert!(validate_request(&unordered).is_err());
    }

    #[test]
    fn budget_period_outside_request_is_rejected() {
        let mut req = request(&["2025-09", "2025-10"], ReportFormat::Spreadsheet);
        req.budget = Some(BudgetContext {
            threshold: 500.0,
            breach_date: None,
            baseline: Some(period("2025-01")),
            current: None,
        });
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn budget_pair_overrides_default_comparison() {
        let mut req = request(&["2025-08", "2025-09", "2025-10"], ReportFormat::Spreadsheet);
        assert_eq!(
            comparison_periods(&req),
            (period("2025-08"), period("2025-10"))
        );

        req.budget = Some(BudgetContext {
            threshold: 500.0,
            breach_date: None,
            baseline: Some(period("2025-09")),
            current: Some(period("2025-10")),
        });
        assert_eq!(
            comparison_periods(&req),
            (period("2025-09"), period("2025-10"))
        );
    }

    #[test]
    fn spreadsheet_report_builds_with_expected_metadata() {
        let req = request(&["2025-09", "2025-10"], ReportFormat::Spreadsheet);
        let artifact = build_report(&req, &sample_data(), &AnalysisConfig::default(), fixed_time())
            .unwrap();
        assert!(!artifact.bytes.is_empty());
        assert!(artifact.content_type.contains("spreadsheetml"));
        assert_eq!(
            artifact.filename,
            "Acme-Corp-September-October-CostReport.xlsx"
        );
    }

    #[test]
    fn document_report_builds_with_expected_metadata() {
        let req = request(&["2025-09", "2025-10"], ReportFormat::Document);
        let artifact = build_report(&req, &sample_data(), &AnalysisConfig::default(), fixed_time())
            .unwrap();
        assert!(!artifact.bytes.is_empty());
        assert!(artifact.content_type.contains("wordprocessingml"));
        assert_eq!(
            artifact.filename,
            "Acme-Corp-September-October-CostReport.docx"
        );
    }

    #[test]
    fn identical_requests_render_identical_bytes() {
        let config = AnalysisConfig::default();
        let data = sample_data();
        for format in [ReportFormat::Spreadsheet, ReportFormat::Document] {
            let req = request(&["2025-09", "2025-10"], format);
            let first = build_report(&req, &data, &config, fixed_time()).unwrap();
            let second = build_report(&req, &data, &config, fixed_time()).unwrap();
            assert_eq!(first.bytes, second.bytes);
        }
    }

    #[test]
    fn both_renderers_consume_the_same_analyzed_numbers() {
        let req = request(&["2025-09", "2025-10"], ReportFormat::Spreadsheet);
        let config = AnalysisConfig::default();
        let data = sample_data();
        let (baseline, current) = comparison_periods(&req);

        let matrix =
            build_matrix(&data.records, &req.periods, req.granularity, &config).unwrap();
        let rows = analyze(&matrix, baseline, current, &config).unwrap();
        let regional_matrix =
            build_matrix(&data.regional, &req.periods, Granularity::Region, &config).unwrap();
        let regional = analyze(&regional_matrix, baseline, current, &config).unwrap();
        let driver_rows: Vec<DeltaRow> = drivers(&rows, config.top_drivers)
            .into_iter()
            .cloned()
            .collect();

        let view = ReportView {
            client: &req.client,
            periods: &req.periods,
            rows: &rows,
            drivers: &driver_rows,
            regional: &regional,
            budget: None,
            generated_at: fixed_time(),
        };
        // One view, so both formats embed the same analyzed figures.
        assert!((view.baseline_total() - 150.0).abs() < f64::EPSILON);
        assert!((view.current_total() - 200.0).abs() < f64::EPSILON);
        assert_eq!(view.period_totals(), vec![150.0, 200.0]);

        for format in [ReportFormat::Spreadsheet, ReportFormat::Document] {
            let artifact = renderer_for(format).render(&view, &config).unwrap();
            assert!(!artifact.bytes.is_empty());
            assert_eq!(artifact.content_type, format.content_type());
        }
    }

    #[test]
    fn zero_cost_client_still_renders() {
        let req = request(&["2025-09", "2025-10"], ReportFormat::Spreadsheet);
        let artifact = build_report(
            &req,
            &CostDataSet::default(),
            &AnalysisConfig::default(),
            fixed_time(),
        )
        .unwrap();
        assert!(!artifact.bytes.is_empty());
    }

    #[test]
    fn leaked_tax_records_do_not_abort_the_report() {
        let mut data = sample_data();
        data.records.push(record("Tax", None, "2025-10", 37.0));
        let req = request(&["2025-09", "2025-10"], ReportFormat::Spreadsheet);
        assert!(
            build_report(&req, &data, &AnalysisConfig::default(), fixed_time()).is_ok()
        );
    }

    #[test]
    fn record_outside_requested_periods_aborts() {
        let mut data = sample_data();
        data.records.push(record("Compute", None, "2025-01", 5.0));
        let req = request(&["2025-09", "2025-10"], ReportFormat::Spreadsheet);
        let err = build_report(&req, &data, &AnalysisConfig::default(), fixed_time()).unwrap_err();
        assert!(matches!(err, ReportError::MalformedInput(_)));
    }
}
