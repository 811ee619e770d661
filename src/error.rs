use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur when the
/// tool reads snapshots, reconciles them, or writes the merged output.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when the CSV reader or writer fails.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Raised when JSON serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Neither the primary nor the fallback encoding could decode the file.
    #[error("file unreadable: {path} is neither valid {primary} nor valid {fallback}")]
    Decode {
        path: PathBuf,
        primary: String,
        fallback: String,
    },

    /// Raised when an encoding label is not recognised.
    #[error("unknown text encoding '{0}'")]
    UnknownEncoding(String),

    /// Raised when a data row carries more fields than the header.
    #[error("malformed row at line {line}: expected at most {expected} fields, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// A key column is missing from one or both snapshots.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Raised when a merge is requested without any key column.
    #[error("no key columns given; at least one column is needed to match records")]
    EmptyKey,

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// Which snapshot lacks a key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Old,
    New,
    Both,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => write!(f, "old"),
            Side::New => write!(f, "new"),
            Side::Both => write!(f, "old and new"),
        }
    }
}

/// A key column that could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingColumn {
    pub column: String,
    pub missing_from: Side,
}

/// Diagnostic raised when key columns are absent. Carries both column lists
/// so the caller can tell the user what the files actually contain.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error(
    "key column(s) not found: {}\n  columns in OLD file: {:?}\n  columns in NEW file: {:?}\n\
     column names are case-sensitive; surrounding whitespace is ignored",
    describe_missing(.missing),
    .old_columns,
    .new_columns
)]
pub struct SchemaError {
    pub missing: Vec<MissingColumn>,
    pub old_columns: Vec<String>,
    pub new_columns: Vec<String>,
}

impl SchemaError {
    /// Names of the missing key columns, in key order.
    pub fn missing_names(&self) -> Vec<&str> {
        self.missing.iter().map(|m| m.column.as_str()).collect()
    }
}

fn describe_missing(missing: &[MissingColumn]) -> String {
    missing
        .iter()
        .map(|m| format!("'{}' (missing from {})", m.column, m.missing_from))
        .collect::<Vec<_>>()
        .join(", ")
}
