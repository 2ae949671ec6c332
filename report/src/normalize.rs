//! Turns raw cost observations into the canonical per-key, per-period table.

use common::{Granularity, PeriodKey, RawCostRecord};
use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::error::ReportError;

/// Separator between service and usage type in composite dimension keys.
pub const KEY_SEPARATOR: &str = " / ";

/// One cell of the matrix: summed net cost and summed usage quantity for a
/// (dimension key, period) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cell {
    pub cost: f64,
    pub usage: f64,
}

/// The canonical table. Every row holds exactly one cell per requested
/// period, zero-filled where the raw data had no activity. Rows iterate in
/// key order, which keeps downstream output deterministic.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    periods: Vec<PeriodKey>,
    rows: BTreeMap<String, Vec<Cell>>,
}

impl CostMatrix {
    pub fn periods(&self) -> &[PeriodKey] {
        &self.periods
    }

    pub fn period_index(&self, period: PeriodKey) -> Option<usize> {
        self.periods.iter().position(|p| *p == period)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Cell])> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Row identity for one record under the requested granularity. Usage-type
/// rows are keyed `service / usage_type` so they can be matched back to
/// their parent service row.
fn dimension_key(record: &RawCostRecord, granularity: Granularity) -> String {
    match granularity {
        Granularity::Service | Granularity::Region => record.key.clone(),
        Granularity::UsageType => match &record.usage_type {
            Some(usage_type) => format!("{}{}{}", record.key, KEY_SEPARATOR, usage_type),
            None => record.key.clone(),
        },
    }
}

/// Builds the matrix for one dimension. Unknown keys are included as-is,
/// credits stay negative, and any row matching the tax predicate is dropped
/// entirely.
pub fn build_matrix(
    records: &[RawCostRecord],
    periods: &[PeriodKey],
    granularity: Granularity,
    config: &AnalysisConfig,
) -> Result<CostMatrix, ReportError> {
    let mut rows: BTreeMap<String, Vec<Cell>> = BTreeMap::new();

    for record in records {
        if config.is_tax_key(&record.key) {
            continue;
        }
        let Some(index) = periods.iter().position(|p| *p == record.period) else {
            return Err(ReportError::MalformedInput(format!(
                "record for '{}' references period {} outside the requested range",
                record.key, record.period
            )));
        };
        if !record.amount.is_finite() {
            return Err(ReportError::MalformedInput(format!(
                "non-numeric amount for '{}' in {}",
                record.key, record.period
            )));
        }
        if let Some(usage) = record.usage {
            if !usage.is_finite() {
                return Err(ReportError::MalformedInput(format!(
                    "non-numeric usage quantity for '{}' in {}",
                    record.key, record.period
                )));
            }
        }

        let row = rows
            .entry(dimension_key(record, granularity))
            .or_insert_with(|| vec![Cell::default(); periods.len()]);
        row[index].cost += record.amount;
        row[index].usage += record.usage.unwrap_or(0.0);
    }

    Ok(CostMatrix {
        periods: periods.to_vec(),
        rows,
    })
}
