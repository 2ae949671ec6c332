//! Document renderers. Both variants consume the same analyzed view, so the
//! two output formats can never disagree on the underlying numbers.

use chrono::{DateTime, Utc};
use common::{BudgetContext, PeriodKey, RenderedArtifact, ReportFormat};

use crate::analyze::DeltaRow;
use crate::config::AnalysisConfig;
use crate::error::ReportError;

pub mod document;
pub mod sheet;

pub use document::DocRenderer;
pub use sheet::SheetRenderer;

/// Everything a renderer is allowed to see. Built once by the orchestrator.
pub struct ReportView<'a> {
    pub client: &'a str,
    pub periods: &'a [PeriodKey],
    /// Full table, in analyzer order.
    pub rows: &'a [DeltaRow],
    /// Top-N driver subset of `rows`.
    pub drivers: &'a [DeltaRow],
    /// Independent region-keyed analysis.
    pub regional: &'a [DeltaRow],
    pub budget: Option<&'a BudgetContext>,
    /// Injected by the caller so identical requests render identical bytes.
    pub generated_at: DateTime<Utc>,
}

impl ReportView<'_> {
    /// Per-period totals across the full table.
    pub fn period_totals(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.periods.len()];
        for row in self.rows {
            for (total, cost) in totals.iter_mut().zip(&row.costs) {
                *total += cost;
            }
        }
        totals
    }

    pub fn baseline_total(&self) -> f64 {
        self.rows.iter().map(|r| r.baseline).sum()
    }

    pub fn current_total(&self) -> f64 {
        self.rows.iter().map(|r| r.current).sum()
    }
}

pub trait Renderer {
    fn format(&self) -> ReportFormat;
    fn render(
        &self,
        view: &ReportView<'_>,
        config: &AnalysisConfig,
    ) -> Result<RenderedArtifact, ReportError>;
}

pub fn renderer_for(format: ReportFormat) -> Box<dyn Renderer> {
    match format {
        ReportFormat::Spreadsheet => Box::new(SheetRenderer),
        ReportFormat::Document => Box::new(DocRenderer),
    }
}

/// `{Client-Name}-{Month}-...-CostReport.{ext}` with spaces dashed out.
pub(crate) fn artifact_filename(
    client: &str,
    periods: &[PeriodKey],
    format: ReportFormat,
) -> String {
    let client = client.trim().replace(' ', "-");
    let months: Vec<String> = periods.iter().map(|p| p.short_label()).collect();
    format!(
        "{}-{}-CostReport.{}",
        client,
        months.join("-"),
        format.extension()
    )
}

pub(crate) fn usd(value: f64) -> String {
    format!("{value:.2}")
}
