use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::io::csv_read::{self, DecodeOptions};
use crate::io::csv_write;
use crate::io::excel_write::{self, DEFAULT_SHEET_NAME};
use crate::model::Table;
use crate::reconcile::{
    KeyColumns, KeyPolicy, MergeOutcome, MergeSummary, NullKeyPolicy, Reconciler,
};

/// Serialisation used for the merged snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Xlsx,
}

impl OutputFormat {
    /// Picks Excel for `.xlsx` paths and CSV for everything else.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("xlsx") => OutputFormat::Xlsx,
            _ => OutputFormat::Csv,
        }
    }
}

/// How the key columns for a merge are chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelection {
    /// Resolve against the old snapshot's header.
    Policy(KeyPolicy),
    /// Use exactly these columns.
    Explicit(Vec<String>),
}

impl Default for KeySelection {
    fn default() -> Self {
        KeySelection::Policy(KeyPolicy::default())
    }
}

impl KeySelection {
    pub fn resolve(&self, old: &Table) -> KeyColumns {
        match self {
            KeySelection::Policy(policy) => policy.resolve(old.columns()),
            KeySelection::Explicit(columns) => KeyColumns::Explicit(columns.clone()),
        }
    }
}

/// Everything needed to merge two snapshot files into one output file.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub old: PathBuf,
    pub new: PathBuf,
    pub output: PathBuf,
    pub keys: KeySelection,
    pub null_keys: NullKeyPolicy,
    pub decode: DecodeOptions,
    pub format: Option<OutputFormat>,
    pub summary: Option<PathBuf>,
}

impl MergeRequest {
    pub fn new(
        old: impl Into<PathBuf>,
        new: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            output: output.into(),
            keys: KeySelection::default(),
            null_keys: NullKeyPolicy::default(),
            decode: DecodeOptions::default(),
            format: None,
            summary: None,
        }
    }

    fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_else(|| OutputFormat::from_path(&self.output))
    }
}

/// Reads both snapshots, merges new over old and writes the result.
#[instrument(
    level = "info",
    skip_all,
    fields(
        old = %request.old.display(),
        new = %request.new.display(),
        output = %request.output.display()
    )
)]
pub fn merge_files(request: &MergeRequest) -> Result<MergeOutcome> {
    let old = load_snapshot(&request.old, &request.decode)?;
    let new = load_snapshot(&request.new, &request.decode)?;

    let key_columns = request.keys.resolve(&old).to_vec();
    debug!(?key_columns, null_keys = ?request.null_keys, "resolved key columns");

    let outcome = Reconciler::new()
        .with_null_keys(request.null_keys)
        .reconcile(&old, &new, &key_columns)?;
    info!(
        superseded = outcome.summary.superseded_rows,
        retained = outcome.summary.retained_rows,
        output_rows = outcome.summary.output_rows,
        "merge complete"
    );

    write_output(&request.output, &outcome.table, request.output_format())?;
    if let Some(path) = &request.summary {
        write_summary(path, &outcome.summary)?;
    }
    Ok(outcome)
}

/// Reads one snapshot, logging when the fallback encoding had to be used.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn load_snapshot(path: &Path, decode: &DecodeOptions) -> Result<Table> {
    let decoded = csv_read::read_table(path, decode)?;
    if decoded.used_fallback {
        warn!(
            encoding = decoded.encoding,
            "primary encoding failed, decoded with fallback"
        );
    }
    info!(
        row_count = decoded.table.len(),
        column_count = decoded.table.columns().len(),
        "read snapshot"
    );
    Ok(decoded.table)
}

/// Writes a table in the requested format.
#[instrument(level = "debug", skip_all, fields(path = %path.display(), ?format))]
pub fn write_output(path: &Path, table: &Table, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => csv_write::write_table(path, table),
        OutputFormat::Xlsx => excel_write::write_workbook(path, table, DEFAULT_SHEET_NAME),
    }
}

/// Persists the merge summary as pretty-printed JSON.
pub fn write_summary(path: &Path, summary: &MergeSummary) -> Result<()> {
    let json_string = serde_json::to_string_pretty(summary)?;
    fs::write(path, json_string)?;
    Ok(())
}
