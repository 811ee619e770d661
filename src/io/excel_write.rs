use std::path::Path;

use rust_xlsxwriter::{Workbook, XlsxError};

use crate::error::Result;
use crate::model::Table;

/// Sheet name used when the caller does not pick one.
pub const DEFAULT_SHEET_NAME: &str = "Merged";

/// Writes the table to a single-sheet workbook at the given path. Absent
/// cells are left blank.
pub fn write_workbook(path: &Path, table: &Table, sheet_name: &str) -> Result<()> {
    let col_count = column_number(table.columns().len())?;
    let last_row = row_number(table.len())?;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col_idx, header) in table.columns().iter().enumerate() {
        worksheet.write_string(0, column_number(col_idx)?, header)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let excel_row = row_number(row_idx + 1)?;
        for (col_idx, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                worksheet.write_string(excel_row, column_number(col_idx)?, value)?;
            }
        }
    }

    if col_count > 0 {
        worksheet.autofilter(0, 0, last_row, col_count - 1)?;
        worksheet.set_freeze_panes(1, 0)?;
    }

    workbook.save(path)?;
    Ok(())
}

fn column_number(index: usize) -> Result<u16> {
    Ok(u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)?)
}

fn row_number(index: usize) -> Result<u32> {
    Ok(u32::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)?)
}
