//! Bounded previews of a table for human inspection.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::Table;

/// Number of records shown when the caller does not choose.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;
/// Widest a column is allowed to grow in the text grid.
pub const MAX_COLUMN_WIDTH: usize = 24;

/// Renders the first `limit` records as an aligned text grid.
pub fn render_text(table: &Table, limit: usize) -> String {
    let shown = table.head(limit);
    let mut widths: Vec<usize> = table
        .columns()
        .iter()
        .map(|column| display_width(column))
        .collect();
    for row in shown.rows() {
        for (idx, cell) in row.iter().enumerate() {
            let width = cell.as_deref().map(display_width).unwrap_or(0);
            widths[idx] = widths[idx].max(width);
        }
    }

    let mut out = String::new();
    push_line(&mut out, table.columns().iter().map(String::as_str), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in shown.rows() {
        push_line(
            &mut out,
            row.iter().map(|cell| cell.as_deref().unwrap_or("")),
            &widths,
        );
    }
    out.push_str(&format!("({} of {} rows)\n", shown.len(), table.len()));
    out
}

/// Renders the first `limit` records as a JSON array of objects. Absent
/// cells become `null`.
pub fn render_json(table: &Table, limit: usize) -> Result<String> {
    let records: Vec<Value> = table
        .records()
        .take(limit)
        .map(|record| {
            let object: Map<String, Value> = record
                .fields()
                .map(|(name, value)| {
                    let value = value.map_or(Value::Null, |v| Value::String(v.to_string()));
                    (name.to_string(), value)
                })
                .collect();
            Value::Object(object)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&Value::Array(records))?)
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| {
            let cell = truncate(cell);
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

fn display_width(value: &str) -> usize {
    value.chars().count().min(MAX_COLUMN_WIDTH)
}

fn truncate(value: &str) -> String {
    if value.chars().count() <= MAX_COLUMN_WIDTH {
        return value.to_string();
    }
    let mut short: String = value.chars().take(MAX_COLUMN_WIDTH - 3).collect();
    short.push_str("...");
    short
}
