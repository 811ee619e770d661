use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use crate::error::{Result, ToolError};
use crate::model::{Cell, Table};

/// Encoding used when the caller does not choose one.
pub const DEFAULT_PRIMARY_ENCODING: &str = "utf-8";
/// Permissive single-byte encoding tried once when the primary one fails.
pub const DEFAULT_FALLBACK_ENCODING: &str = "latin1";

/// Text encodings to try, as WHATWG labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    pub primary: String,
    pub fallback: String,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_ENCODING.to_string(),
            fallback: DEFAULT_FALLBACK_ENCODING.to_string(),
        }
    }
}

/// A table together with the encoding that successfully decoded it.
#[derive(Debug, Clone)]
pub struct DecodedTable {
    pub table: Table,
    pub encoding: &'static str,
    pub used_fallback: bool,
}

/// Reads a comma-separated file into a table. Every cell stays text.
pub fn read_table(path: &Path, options: &DecodeOptions) -> Result<DecodedTable> {
    let bytes = fs::read(path)?;
    read_table_from_bytes(&bytes, options).map_err(|error| match error {
        ToolError::Decode {
            primary, fallback, ..
        } => ToolError::Decode {
            path: path.to_path_buf(),
            primary,
            fallback,
        },
        other => other,
    })
}

/// Same as [`read_table`] for an in-memory buffer.
pub fn read_table_from_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<DecodedTable> {
    let primary = lookup_encoding(&options.primary)?;
    let fallback = lookup_encoding(&options.fallback)?;

    let (content, encoding, used_fallback) = match decode_strict(bytes, primary) {
        Some(content) => (content, primary, false),
        None => match decode_strict(bytes, fallback) {
            Some(content) => (content, fallback, true),
            None => {
                return Err(ToolError::Decode {
                    path: PathBuf::from("<memory>"),
                    primary: primary.name().to_string(),
                    fallback: fallback.name().to_string(),
                });
            }
        },
    };

    let table = parse_csv(&content)?;
    Ok(DecodedTable {
        table,
        encoding: encoding.name(),
        used_fallback,
    })
}

fn lookup_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ToolError::UnknownEncoding(label.to_string()))
}

/// Decodes without replacement characters, dropping a BOM of the same encoding.
fn decode_strict<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    let body = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) if bom_encoding == encoding => &bytes[bom_len..],
        _ => bytes,
    };
    encoding.decode_without_bom_handling_and_without_replacement(body)
}

fn parse_csv(content: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let width = headers.len();
    let mut table = Table::new(&headers);

    for result in reader.records() {
        let record = result?;
        if record.len() > width {
            return Err(ToolError::MalformedRow {
                line: record.position().map(|p| p.line()).unwrap_or_default(),
                expected: width,
                found: record.len(),
            });
        }
        let row: Vec<Cell> = record.iter().map(to_cell).collect();
        table.push_row(row);
    }

    Ok(table)
}

fn to_cell(field: &str) -> Cell {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}
