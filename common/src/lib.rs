use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, the column unit of every report.
///
/// Ordered chronologically; serialized as `YYYY-MM` to match the request
/// format of the HTTP and CLI entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=9999).contains(&year) && (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// First day of the month.
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("year and month are validated on construction")
    }

    /// First day of the following month, the exclusive end of the
    /// Cost Explorer query window. December rolls into January.
    pub fn end_date_exclusive(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .expect("year and month are validated on construction")
    }

    /// Long display name, e.g. "September 2025".
    pub fn label(&self) -> String {
        self.start_date().format("%B %Y").to_string()
    }

    /// Month name only, e.g. "September". Used in report filenames.
    pub fn short_label(&self) -> String {
        self.start_date().format("%B").to_string()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PeriodKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
            .map_err(|_| format!("invalid month '{s}', expected YYYY-MM"))?;
        use chrono::Datelike;
        PeriodKey::new(date.year(), date.month())
            .ok_or_else(|| format!("month '{s}' is out of range"))
    }
}

impl TryFrom<String> for PeriodKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PeriodKey> for String {
    fn from(value: PeriodKey) -> Self {
        value.to_string()
    }
}

/// One raw cost observation from the acquisition collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCostRecord {
    /// Dimension value: a service name or a region, depending on how the
    /// upstream query was grouped.
    pub key: String,
    /// Usage type when the query was grouped by service and usage type.
    pub usage_type: Option<String>,
    pub period: PeriodKey,
    /// Net cost, tax excluded upstream. Negative for credits and refunds.
    pub amount: f64,
    pub usage: Option<f64>,
}

/// Everything the cost-query collaborator returns for one report request:
/// service/usage-type grouped observations plus region-grouped observations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostDataSet {
    pub records: Vec<RawCostRecord>,
    pub regional: Vec<RawCostRecord>,
}

/// Row identity used when building the cost matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    Service,
    UsageType,
    Region,
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::Service
    }
}

/// Output format of the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    #[serde(rename = "xlsx")]
    Spreadsheet,
    #[serde(rename = "docx")]
    Document,
}

impl ReportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ReportFormat::Document => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Spreadsheet => "xlsx",
            ReportFormat::Document => "docx",
        }
    }
}

impl Default for ReportFormat {
    fn default() -> Self {
        ReportFormat::Spreadsheet
    }
}

/// Budget-breach context attached to a report request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetContext {
    pub threshold: f64,
    pub breach_date: Option<NaiveDate>,
    /// Comparison pair override. When absent the pipeline compares the
    /// first and last requested periods.
    pub baseline: Option<PeriodKey>,
    pub current: Option<PeriodKey>,
}

/// Validated input of the report pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub client: String,
    pub periods: Vec<PeriodKey>,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default)]
    pub budget: Option<BudgetContext>,
}

/// The finished report: opaque bytes plus enough metadata to serve or save
/// it. The pipeline never persists this; that is the caller's job.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_parses_and_displays() {
        let p: PeriodKey = "2025-09".parse().unwrap();
        assert_eq!(p.year, 2025);
        assert_eq!(p.month, 9);
        assert_eq!(p.to_string(), "2025-09");
    }

    #[test]
    fn period_rejects_bad_input() {
        assert!("2025-13".parse::<PeriodKey>().is_err());
        assert!("2025".parse::<PeriodKey>().is_err());
        assert!("Sep 2025".parse::<PeriodKey>().is_err());
    }

    #[test]
    fn period_ordering_is_chronological() {
        let a: PeriodKey = "2024-12".parse().unwrap();
        let b: PeriodKey = "2025-01".parse().unwrap();
        assert!(a < b);
    }

    #[test]
    fn december_rolls_into_next_year() {
        let p: PeriodKey = "2025-12".parse().unwrap();
        assert_eq!(p.start_date().to_string(), "2025-12-01");
        assert_eq!(p.end_date_exclusive().to_string(), "2026-01-01");
    }

    #[test]
    fn labels_use_month_names() {
        let p: PeriodKey = "2025-09".parse().unwrap();
        assert_eq!(p.label(), "September 2025");
        assert_eq!(p.short_label(), "September");
    }

    #[test]
    fn format_content_types() {
        assert!(ReportFormat::Spreadsheet.content_type().contains("spreadsheetml"));
        assert!(ReportFormat::Document.content_type().contains("wordprocessingml"));
        assert_eq!(ReportFormat::Spreadsheet.extension(), "xlsx");
        assert_eq!(ReportFormat::Document.extension(), "docx");
    }
}
