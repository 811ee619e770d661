use std::path::Path;

use crate::error::{Result, ToolError};
use crate::model::Table;

/// Writes the table as comma-separated UTF-8 text with a header row.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    write_records(&mut writer, table)?;
    writer.flush()?;
    Ok(())
}

/// Serialises the table into an in-memory CSV string.
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_records(&mut writer, table)?;
    let bytes = writer
        .into_inner()
        .map_err(|error| ToolError::Io(error.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|error| ToolError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, error)))
}

fn write_records<W: std::io::Write>(writer: &mut csv::Writer<W>, table: &Table) -> Result<()> {
    if table.columns().is_empty() {
        return Ok(());
    }
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    Ok(())
}
