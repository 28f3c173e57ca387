//! Spreadsheet rendering of a scored record set.

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use tracing::info;

use super::record::{FieldValue, RecordSet};
use crate::error::DistributionError;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const REPORT_FILE_NAME: &str = "lead_report.xlsx";

const SHEET_NAME: &str = "Sheet1";

/// Render the record set as a single-sheet xlsx workbook held in memory.
///
/// Row 0 is the header in column order; each lead follows in set order.
pub fn render_workbook(set: &RecordSet) -> Result<Vec<u8>, DistributionError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in set.columns().iter().enumerate() {
        sheet.write_string(0, column_index(col)?, name)?;
    }

    for (idx, lead) in set.leads().iter().enumerate() {
        let row = row_index(idx + 1)?;
        for (col, value) in set.row(lead).enumerate() {
            if let Some(value) = value {
                write_cell(sheet, row, column_index(col)?, value)?;
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    info!(records = set.len(), bytes = bytes.len(), "Rendered workbook");
    Ok(bytes)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, value: &FieldValue) -> Result<(), XlsxError> {
    match value {
        FieldValue::Text(s) if s.is_empty() => {}
        FieldValue::Text(s) => {
            sheet.write_string(row, col, s)?;
        }
        FieldValue::Integer(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        FieldValue::Float(f) => {
            sheet.write_number(row, col, *f)?;
        }
    }
    Ok(())
}

fn column_index(col: usize) -> Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}

fn row_index(row: usize) -> Result<u32, XlsxError> {
    u32::try_from(row).map_err(|_| XlsxError::RowColumnLimitError)
}
