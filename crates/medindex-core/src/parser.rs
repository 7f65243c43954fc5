//! Spreadsheet parser for the agency's medicine workbook.
//!
//! Reads the first worksheet only and maps twelve fixed columns by
//! position. The row tolerance policy degrades malformed cells instead of
//! aborting the parse:
//! - text cells that are not strings are treated as absent
//! - numeric flag cells that fail base-10 parsing coerce to 0
//! - unparsable dates are logged and left empty
//! - rows without a brand name are dropped entirely

use std::path::Path;

use calamine::{open_workbook, Data, DataType, Reader, Xlsx};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::models::MedicineRecord;

/// Header/metadata rows at the top of every published workbook. Fixed by
/// the source format, not auto-detected.
const HEADER_ROWS: usize = 3;

/// Parser errors.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unreadable spreadsheet: {0}")]
    UnreadableSpreadsheet(String),
}

/// Decodes a spreadsheet payload into medicine records.
pub trait ParseSpreadsheet {
    fn parse(&self, path: &Path) -> Result<Vec<MedicineRecord>, ParseError>;
}

/// XLSX parser for the twelve-column agency layout.
pub struct XlsxParser;

impl ParseSpreadsheet for XlsxParser {
    fn parse(&self, path: &Path) -> Result<Vec<MedicineRecord>, ParseError> {
        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e: calamine::XlsxError| ParseError::UnreadableSpreadsheet(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| {
                ParseError::UnreadableSpreadsheet("workbook has no worksheets".into())
            })?
            .map_err(|e| ParseError::UnreadableSpreadsheet(e.to_string()))?;

        Ok(parse_rows(range.rows()))
    }
}

/// Map worksheet rows to records, skipping the fixed header block.
/// Output preserves worksheet order; duplicates are left for the store's
/// key-based reconciliation to resolve.
fn parse_rows<'a, I>(rows: I) -> Vec<MedicineRecord>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut records = Vec::new();
    for (idx, row) in rows.into_iter().enumerate() {
        if idx < HEADER_ROWS {
            continue;
        }
        if let Some(record) = record_from_row(row, idx + 1) {
            records.push(record);
        }
    }
    records
}

/// Build a record from one worksheet row, or `None` when the brand-name
/// column is empty or not text.
fn record_from_row(row: &[Data], row_number: usize) -> Option<MedicineRecord> {
    let brand_name = cell_text(row, 0)?;

    Some(MedicineRecord {
        brand_name,
        barcode: cell_text(row, 1),
        atc_code: cell_text(row, 2),
        atc_name: cell_text(row, 3),
        company_name: cell_text(row, 4),
        prescription_type: cell_text(row, 5),
        status: cell_text(row, 6),
        description: cell_text(row, 7),
        basic_medicine_list: cell_flag(row, 8),
        child_medicine_list: cell_flag(row, 9),
        newborn_medicine_list: cell_flag(row, 10),
        active_product_date: cell_date(row, 11, row_number),
    })
}

/// Extract trimmed text from a string cell; anything else is absent.
/// Rich-text cells arrive from calamine already flattened to strings.
fn cell_text(row: &[Data], idx: usize) -> Option<String> {
    match row.get(idx) {
        Some(Data::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

/// Base-10 list-membership flag; any parse failure or negative coerces to 0.
fn cell_flag(row: &[Data], idx: usize) -> u32 {
    match row.get(idx) {
        Some(Data::Int(i)) => u32::try_from(*i).unwrap_or(0),
        Some(Data::Float(f)) if *f >= 0.0 && f.is_finite() => *f as u32,
        Some(Data::String(s)) => s.trim().parse::<u32>().unwrap_or(0),
        _ => 0,
    }
}

/// Active-product date: native spreadsheet date, or month/day/year text.
/// Unparsable values are logged and yield `None`, never an error.
fn cell_date(row: &[Data], idx: usize, row_number: usize) -> Option<NaiveDate> {
    match row.get(idx) {
        Some(cell @ (Data::DateTime(_) | Data::DateTimeIso(_))) => cell.as_date(),
        Some(Data::String(s)) => {
            let text = s.trim();
            if text.is_empty() {
                return None;
            }
            match NaiveDate::parse_from_str(text, "%m/%d/%Y") {
                Ok(date) => Some(date),
                Err(_) => {
                    warn!(row = row_number, value = text, "invalid active-product date");
                    None
                }
            }
        }
        _ => None,
    }
}
