//! Narrative document renderer. Fixed section order; sections with nothing
//! to say still appear, with a placeholder line, so readers and parsers can
//! rely on the structure.

use common::{RenderedArtifact, ReportFormat};
use docx_rs::{
    AlignmentType, BreakType, Docx, Paragraph, Run, Table, TableCell, TableRow,
};
use std::collections::HashSet;
use std::io::Cursor;

use crate::analyze::{DeltaRow, ImpactTier};
use crate::config::AnalysisConfig;
use crate::error::ReportError;

use super::{artifact_filename, usd, Renderer, ReportView};

pub struct DocRenderer;

const NO_CHANGE: &str = "No significant change in this period.";

const SECTIONS: &[&str] = &[
    "Executive Summary",
    "Cost Drivers",
    "Per-Service Detail",
    "Regional Breakdown",
    "Recommendations",
    "Appendix: Full Cost Table",
];

fn title(text: &str) -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text(text).bold().size(48))
        .align(AlignmentType::Center)
}

fn heading(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).bold().size(32))
}

fn subheading(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).bold().size(26))
}

fn body(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

fn centered(text: &str) -> Paragraph {
    body(text).align(AlignmentType::Center)
}

fn page_break() -> Paragraph {
    Paragraph::new().add_run(Run::new().add_break(BreakType::Page))
}

fn cell(text: &str) -> TableCell {
    TableCell::new().add_paragraph(body(text))
}

fn bold_cell(text: &str) -> TableCell {
    TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text).bold()))
}

/// Multi-line narrative text becomes one paragraph per line.
fn paragraphs(text: &str) -> Vec<Paragraph> {
    text.lines().map(body).collect()
}

fn cover(mut docx: Docx, view: &ReportView<'_>) -> Docx {
    docx = docx
        .add_paragraph(title(&format!("{} Cost Report", view.client)))
        .add_paragraph(centered(&format!(
            "Period: {} to {}",
            view.periods[0].label(),
            view.periods[view.periods.len() - 1].label()
        )));
    if let Some(budget) = view.budget {
        docx = docx.add_paragraph(centered(&format!(
            "Budget threshold: USD {}",
            usd(budget.threshold)
        )));
        if let Some(breach_date) = budget.breach_date {
            docx = docx.add_paragraph(centered(&format!("Budget breached on: {breach_date}")));
        }
    }
    docx.add_paragraph(centered(&format!(
        "Generated: {}",
        view.generated_at.format("%Y-%m-%d %H:%M UTC")
    )))
    .add_paragraph(centered("CONFIDENTIAL"))
    .add_paragraph(page_break())
}

fn table_of_contents(mut docx: Docx) -> Docx {
    docx = docx.add_paragraph(heading("Contents"));
    for (index, section) in SECTIONS.iter().enumerate() {
        docx = docx.add_paragraph(body(&format!("{}. {}", index + 1, section)));
    }
    docx.add_paragraph(page_break())
}

fn executive_summary(mut docx: Docx, view: &ReportView<'_>) -> Docx {
    docx = docx.add_paragraph(heading("Executive Summary"));

    let baseline_total = view.baseline_total();
    let current_total = view.current_total();
    let delta = current_total - baseline_total;
    let direction = if delta >= 0.0 { "up" } else { "down" };

    docx = docx
        .add_paragraph(body(&format!(
            "Baseline period total: USD {}",
            usd(baseline_total)
        )))
        .add_paragraph(body(&format!(
            "Current period total: USD {}",
            usd(current_total)
        )))
        .add_paragraph(body(&format!(
            "Change: USD {} ({direction})",
            usd(delta.abs())
        )));

    if let Some(budget) = view.budget {
        let status = if current_total > budget.threshold {
            format!(
                "EXCEEDED: current spend USD {} is over the USD {} budget",
                usd(current_total),
                usd(budget.threshold)
            )
        } else {
            format!(
                "Within budget: current spend USD {} against a USD {} budget",
                usd(current_total),
                usd(budget.threshold)
            )
        };
        docx = docx.add_paragraph(body(&format!("Budget status: {status}")));
    }

    docx = docx.add_paragraph(subheading("Top cost drivers"));
    if view.drivers.is_empty() {
        docx = docx.add_paragraph(body(NO_CHANGE));
    } else {
        for driver in view.drivers {
            docx = docx.add_paragraph(body(&format!(
                "{} — {} impact, change USD {} ({})",
                driver.key,
                driver.tier.label(),
                usd(driver.delta),
                driver.pct.label()
            )));
        }
    }
    docx.add_paragraph(page_break())
}

fn cost_drivers(mut docx: Docx, view: &ReportView<'_>) -> Docx {
    docx = docx.add_paragraph(heading("Cost Drivers"));
    if view.drivers.is_empty() {
        return docx.add_paragraph(body(NO_CHANGE)).add_paragraph(page_break());
    }
    for driver in view.drivers {
        docx = docx.add_paragraph(subheading(&driver.key)).add_paragraph(body(&format!(
            "Impact tier: {}",
            driver.tier.label()
        )));
        for paragraph in paragraphs(&driver.reason) {
            docx = docx.add_paragraph(paragraph);
        }
    }
    docx.add_paragraph(page_break())
}

fn delta_table(periods: &[common::PeriodKey], rows: &[DeltaRow], key_header: &str) -> Table {
    let mut header_cells = vec![bold_cell(key_header)];
    for period in periods {
        header_cells.push(bold_cell(&period.label()));
    }
    header_cells.push(bold_cell("Total"));
    header_cells.push(bold_cell("Change"));

    let mut table_rows = vec![TableRow::new(header_cells)];
    for row in rows {
        let mut cells = vec![cell(&row.key)];
        for cost in &row.costs {
            cells.push(cell(&usd(*cost)));
        }
        cells.push(cell(&usd(row.total)));
        cells.push(cell(&row.pct.label()));
        table_rows.push(TableRow::new(cells));
    }
    Table::new(table_rows)
}

fn per_service_detail(mut docx: Docx, view: &ReportView<'_>) -> Docx {
    docx = docx.add_paragraph(heading("Per-Service Detail"));
    if view.rows.is_empty() {
        return docx.add_paragraph(body(NO_CHANGE)).add_paragraph(page_break());
    }
    docx.add_table(delta_table(view.periods, view.rows, "Service"))
        .add_paragraph(page_break())
}

fn regional_breakdown(mut docx: Docx, view: &ReportView<'_>) -> Docx {
    docx = docx.add_paragraph(heading("Regional Breakdown"));
    if view.regional.is_empty() {
        return docx.add_paragraph(body(NO_CHANGE)).add_paragraph(page_break());
    }
    docx.add_table(delta_table(view.periods, view.regional, "Region"))
        .add_paragraph(page_break())
}

/// Three fixed horizons, each templated from the set of tiers present among
/// the drivers. Rule-based, so the same analysis always yields the same
/// advice.
fn recommendation_lines(tiers: &HashSet<ImpactTier>) -> [(&'static str, &'static str); 3] {
    let immediate = if tiers.contains(&ImpactTier::Critical) {
        "Review the critical cost drivers above and confirm the usage behind them is intended."
    } else if tiers.contains(&ImpactTier::High) {
        "Validate the high-impact drivers against expected workload changes."
    } else {
        "No immediate action required; costs are within normal variation."
    };
    let short_term = if tiers.contains(&ImpactTier::Critical) || tiers.contains(&ImpactTier::High)
    {
        "Right-size or schedule the resources behind the top drivers and set per-service budget alerts."
    } else {
        "Keep existing budget alerts in place and track the medium-impact services."
    };
    let long_term = if tiers.iter().any(|t| *t != ImpactTier::Low) {
        "Evaluate reserved capacity or savings plans for workloads with sustained growth."
    } else {
        "Continue the monthly cost review cadence."
    };
    [
        ("Immediate", immediate),
        ("Short-term", short_term),
        ("Long-term", long_term),
    ]
}

fn recommendations(mut docx: Docx, view: &ReportView<'_>) -> Docx {
    docx = docx.add_paragraph(heading("Recommendations"));
    let tiers: HashSet<ImpactTier> = view.drivers.iter().map(|d| d.tier).collect();
    for (horizon, text) in recommendation_lines(&tiers) {
        docx = docx
            .add_paragraph(subheading(horizon))
            .add_paragraph(body(text));
    }
    docx.add_paragraph(page_break())
}

fn appendix(mut docx: Docx, view: &ReportView<'_>) -> Docx {
    docx = docx.add_paragraph(heading("Appendix: Full Cost Table"));
    if view.rows.is_empty() {
        return docx.add_paragraph(body(NO_CHANGE));
    }
    docx.add_table(delta_table(view.periods, view.rows, "Service"))
}

fn build_document(view: &ReportView<'_>) -> Result<Vec<u8>, ReportError> {
    let mut docx = Docx::new();
    docx = cover(docx, view);
    docx = table_of_contents(docx);
    docx = executive_summary(docx, view);
    docx = cost_drivers(docx, view);
    docx = per_service_detail(docx, view);
    docx = regional_breakdown(docx, view);
    docx = recommendations(docx, view);
    docx = appendix(docx, view);

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| ReportError::render("document", e.to_string()))?;
    Ok(cursor.into_inner())
}

impl Renderer for DocRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Document
    }

    fn render(
        &self,
        view: &ReportView<'_>,
        _config: &AnalysisConfig,
    ) -> Result<RenderedArtifact, ReportError> {
        let bytes = build_document(view)?;
        Ok(RenderedArtifact {
            bytes,
            content_type: self.format().content_type(),
            filename: artifact_filename(view.client, view.periods, self.format()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_tier_drives_immediate_action() {
        let tiers: HashSet<ImpactTier> = [ImpactTier::Critical, ImpactTier::Low].into();
        let [(_, immediate), (_, short_term), (_, long_term)] = recommendation_lines(&tiers);
        assert!(immediate.contains("critical"));
        assert!(short_term.contains("Right-size"));
        assert!(long_term.contains("reserved capacity"));
    }

    #[test]
    fn quiet_report_recommends_no_action() {
        let tiers: HashSet<ImpactTier> = [ImpactTier::Low].into();
        let [(_, immediate), _, (_, long_term)] = recommendation_lines(&tiers);
        assert!(immediate.contains("No immediate action"));
        assert!(long_term.contains("monthly cost review"));
    }
}
