//! Spreadsheet renderer. One workbook, five worksheets: the complete table,
//! the increased/decreased/unchanged subsets, and the regional breakdown.

use common::{RenderedArtifact, ReportFormat};
use rust_xlsxwriter::{
    Color, DocProperties, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
    XlsxError,
};

use crate::analyze::{ChangeClass, DeltaRow, PctChange};
use crate::config::AnalysisConfig;
use crate::error::ReportError;
use crate::narrative;

use super::{artifact_filename, Renderer, ReportView};

const HEADER_FILL: Color = Color::RGB(0xFFFF00);
const MINIMAL_FILL: Color = Color::RGB(0xADD8E6);
const DECREASE_FILL: Color = Color::RGB(0x90EE90);
const INCREASE_FILL: Color = Color::RGB(0xFFB6C1);
const SHARP_INCREASE_FILL: Color = Color::RGB(0xFF6B6B);
const REGION_FILL: Color = Color::RGB(0x90EE90);

pub struct SheetRenderer;

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(HEADER_FILL)
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
}

fn key_format(fill: Option<Color>) -> Format {
    let format = Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    match fill {
        Some(color) => format.set_background_color(color),
        None => format,
    }
}

fn money_format(fill: Option<Color>) -> Format {
    let format = Format::new()
        .set_num_format("#,##0.00")
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    match fill {
        Some(color) => format.set_background_color(color),
        None => format,
    }
}

fn text_format(fill: Option<Color>) -> Format {
    let format = Format::new()
        .set_border(FormatBorder::Thin)
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();
    match fill {
        Some(color) => format.set_background_color(color),
        None => format,
    }
}

/// Row fill mirrors the change class; sharp increases get the darker red.
fn row_fill(row: &DeltaRow, config: &AnalysisConfig) -> Color {
    match row.change_class(config) {
        ChangeClass::Same => MINIMAL_FILL,
        ChangeClass::Decreased => DECREASE_FILL,
        ChangeClass::Increased => match row.pct {
            PctChange::New => SHARP_INCREASE_FILL,
            PctChange::Ratio(pct) if pct > config.sharp_change_pct => SHARP_INCREASE_FILL,
            _ => INCREASE_FILL,
        },
    }
}

fn write_service_sheet(
    worksheet: &mut Worksheet,
    rows: &[&DeltaRow],
    view: &ReportView<'_>,
    config: &AnalysisConfig,
) -> Result<(), XlsxError> {
    let period_count = view.periods.len();
    let total_col = (period_count + 1) as u16;
    let comparison_col = total_col + 1;
    let reason_col = total_col + 2;

    let header = header_format();
    worksheet.write_string_with_format(0, 0, "Services", &header)?;
    for (index, period) in view.periods.iter().enumerate() {
        worksheet.write_string_with_format(0, (index + 1) as u16, period.label(), &header)?;
    }
    worksheet.write_string_with_format(0, total_col, "Service Total", &header)?;
    worksheet.write_string_with_format(0, comparison_col, "Comparison", &header)?;
    worksheet.write_string_with_format(0, reason_col, "Reason", &header)?;
    worksheet.set_row_height(0, 40)?;

    let mut month_totals = vec![0.0; period_count];
    let mut excel_row: u32 = 1;

    for row in rows {
        let fill = Some(row_fill(row, config));
        worksheet.write_string_with_format(excel_row, 0, &row.key, &key_format(fill))?;
        for (index, cost) in row.costs.iter().enumerate() {
            month_totals[index] += cost;
            worksheet.write_number_with_format(
                excel_row,
                (index + 1) as u16,
                *cost,
                &money_format(fill),
            )?;
        }
        worksheet.write_number_with_format(excel_row, total_col, row.total, &money_format(fill))?;
        worksheet.write_string_with_format(
            excel_row,
            comparison_col,
            &row.comparison,
            &text_format(fill).set_font_size(10),
        )?;
        worksheet.write_string_with_format(excel_row, reason_col, &row.reason, &text_format(fill))?;

        let text_lines = row.comparison.lines().count().max(1) as f64;
        worksheet.set_row_height(excel_row, text_lines * 15.0 + 20.0)?;
        excel_row += 1;
    }

    // Totals row
    let totals_fmt = header_format();
    worksheet.write_string_with_format(excel_row, 0, "Total", &totals_fmt)?;
    let mut grand_total = 0.0;
    for (index, total) in month_totals.iter().enumerate() {
        grand_total += total;
        worksheet.write_number_with_format(
            excel_row,
            (index + 1) as u16,
            *total,
            &money_format(Some(HEADER_FILL)).set_bold(),
        )?;
    }
    worksheet.write_number_with_format(
        excel_row,
        total_col,
        grand_total,
        &money_format(Some(HEADER_FILL)).set_bold(),
    )?;

    let total_comparison = narrative::total_comparison(view.periods, &month_totals);
    worksheet.write_string_with_format(
        excel_row,
        comparison_col,
        &total_comparison,
        &text_format(Some(HEADER_FILL)).set_bold(),
    )?;
    worksheet.write_string_with_format(
        excel_row,
        reason_col,
        narrative::simple_reason(&month_totals, config),
        &text_format(Some(HEADER_FILL)).set_bold(),
    )?;
    let text_lines = total_comparison.lines().count().max(1) as f64;
    worksheet.set_row_height(excel_row, text_lines * 15.0 + 20.0)?;

    worksheet.set_column_width(0, 50)?;
    for col in 1..=total_col {
        worksheet.set_column_width(col, 20)?;
    }
    worksheet.set_column_width(comparison_col, 50)?;
    worksheet.set_column_width(reason_col, 65)?;

    Ok(())
}

fn write_regional_sheet(
    worksheet: &mut Worksheet,
    view: &ReportView<'_>,
) -> Result<(), XlsxError> {
    let period_count = view.periods.len();
    let total_col = (period_count + 1) as u16;

    let header = header_format();
    worksheet.write_string_with_format(0, 0, "Region", &header)?;
    for (index, period) in view.periods.iter().enumerate() {
        worksheet.write_string_with_format(0, (index + 1) as u16, period.label(), &header)?;
    }
    worksheet.write_string_with_format(0, total_col, "Total", &header)?;
    worksheet.set_row_height(0, 40)?;

    let fill = Some(REGION_FILL);
    let mut month_totals = vec![0.0; period_count];
    let mut excel_row: u32 = 1;

    for row in view.regional {
        worksheet.write_string_with_format(excel_row, 0, &row.key, &key_format(fill))?;
        for (index, cost) in row.costs.iter().enumerate() {
            month_totals[index] += cost;
            worksheet.write_number_with_format(
                excel_row,
                (index + 1) as u16,
                *cost,
                &money_format(fill),
            )?;
        }
        worksheet.write_number_with_format(excel_row, total_col, row.total, &money_format(fill))?;
        excel_row += 1;
    }

    worksheet.write_string_with_format(excel_row, 0, "Total", &header)?;
    let mut grand_total = 0.0;
    for (index, total) in month_totals.iter().enumerate() {
        grand_total += total;
        worksheet.write_number_with_format(
            excel_row,
            (index + 1) as u16,
            *total,
            &money_format(Some(HEADER_FILL)).set_bold(),
        )?;
    }
    worksheet.write_number_with_format(
        excel_row,
        total_col,
        grand_total,
        &money_format(Some(HEADER_FILL)).set_bold(),
    )?;

    worksheet.set_column_width(0, 30)?;
    for col in 1..=total_col {
        worksheet.set_column_width(col, 15)?;
    }

    Ok(())
}

fn build_workbook(view: &ReportView<'_>, config: &AnalysisConfig) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    // Fixed creation time keeps identical requests byte-identical.
    let properties = DocProperties::new()
        .set_creation_datetime(&ExcelDateTime::from_timestamp(view.generated_at.timestamp())?);
    workbook.set_properties(&properties);

    let all: Vec<&DeltaRow> = view.rows.iter().collect();
    let increased: Vec<&DeltaRow> = view
        .rows
        .iter()
        .filter(|r| r.change_class(config) == ChangeClass::Increased)
        .collect();
    let decreased: Vec<&DeltaRow> = view
        .rows
        .iter()
        .filter(|r| r.change_class(config) == ChangeClass::Decreased)
        .collect();
    let same: Vec<&DeltaRow> = view
        .rows
        .iter()
        .filter(|r| r.change_class(config) == ChangeClass::Same)
        .collect();

    let sheets: [(&str, &[&DeltaRow]); 4] = [
        ("Complete Service Costs", &all),
        ("Increased Service Costs", &increased),
        ("Decreased Service Costs", &decreased),
        ("Same Service Costs", &same),
    ];
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet().set_name(name)?;
        write_service_sheet(worksheet, rows, view, config)?;
    }

    let worksheet = workbook.add_worksheet().set_name("Per-region Costs")?;
    write_regional_sheet(worksheet, view)?;

    workbook.save_to_buffer()
}

impl Renderer for SheetRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Spreadsheet
    }

    fn render(
        &self,
        view: &ReportView<'_>,
        config: &AnalysisConfig,
    ) -> Result<RenderedArtifact, ReportError> {
        let bytes = build_workbook(view, config)
            .map_err(|e| ReportError::render("spreadsheet", e.to_string()))?;
        Ok(RenderedArtifact {
            bytes,
            content_type: self.format().content_type(),
            filename: artifact_filename(view.client, view.periods, self.format()),
        })
    }
}
