//! Row reconciliation between an old and a new snapshot.
//!
//! New records supersede old records that share their key; every other old
//! record is kept in its original position, and all new records follow. The
//! reconciler is pure: it borrows both tables and returns a fresh one.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{MissingColumn, Result, SchemaError, Side, ToolError};
use crate::model::{Cell, Table};

/// Primary key column of a Shopify product export.
pub const DEFAULT_PRIMARY_KEY: &str = "Handle";
/// Column distinguishing variants of the same product.
pub const DEFAULT_SECONDARY_KEY: &str = "Option1 Value";

/// Which columns identify a record, before looking at any data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPolicy {
    pub primary: String,
    pub secondary: Option<String>,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_KEY.to_string(),
            secondary: Some(DEFAULT_SECONDARY_KEY.to_string()),
        }
    }
}

impl KeyPolicy {
    pub fn new(primary: impl Into<String>, secondary: Option<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary,
        }
    }

    /// Resolves the policy against the old snapshot's header. The secondary
    /// column is only used when the old table carries it.
    pub fn resolve(&self, old_columns: &[String]) -> KeyColumns {
        let primary = self.primary.trim().to_string();
        match &self.secondary {
            Some(secondary) if old_columns.iter().any(|c| c == secondary.trim()) => {
                KeyColumns::Composite {
                    primary,
                    secondary: secondary.trim().to_string(),
                }
            }
            _ => KeyColumns::Single(primary),
        }
    }
}

/// Resolved key columns, fixed once before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyColumns {
    Composite { primary: String, secondary: String },
    Single(String),
    /// Caller-supplied list that bypasses the policy.
    Explicit(Vec<String>),
}

impl KeyColumns {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            KeyColumns::Composite { primary, secondary } => {
                vec![primary.clone(), secondary.clone()]
            }
            KeyColumns::Single(primary) => vec![primary.clone()],
            KeyColumns::Explicit(columns) => columns.clone(),
        }
    }
}

/// Resolves the key columns for a merge from the old snapshot's header.
pub fn resolve_key_columns(old_columns: &[String], policy: &KeyPolicy) -> Vec<String> {
    policy.resolve(old_columns).to_vec()
}

/// How absent cells in key columns take part in matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NullKeyPolicy {
    /// An absent cell equals another absent cell at the same key position.
    #[default]
    Match,
    /// A key with any absent cell matches nothing.
    NeverMatch,
}

/// Counts describing one merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub key_columns: Vec<String>,
    pub null_keys: NullKeyPolicy,
    pub old_rows: usize,
    pub new_rows: usize,
    pub superseded_rows: usize,
    pub retained_rows: usize,
    pub output_rows: usize,
    pub added_columns: Vec<String>,
}

/// The merged table together with its summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub table: Table,
    pub summary: MergeSummary,
}

/// Merges a new snapshot over an old one under a configured null-key policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    null_keys: NullKeyPolicy,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_null_keys(mut self, policy: NullKeyPolicy) -> Self {
        self.null_keys = policy;
        self
    }

    pub fn null_keys(&self) -> NullKeyPolicy {
        self.null_keys
    }

    /// Merges `new` over `old` using `key_columns` as record identity.
    ///
    /// Fails without producing any output when the key list is empty or a
    /// key column is missing from either table.
    pub fn reconcile(
        &self,
        old: &Table,
        new: &Table,
        key_columns: &[String],
    ) -> Result<MergeOutcome> {
        let key_columns: Vec<String> = key_columns
            .iter()
            .map(|column| column.trim().to_string())
            .collect();
        let (old_idx, new_idx) = locate_keys(old, new, &key_columns)?;

        let new_keys: HashSet<Vec<Option<&str>>> = new
            .rows()
            .iter()
            .filter_map(|row| self.key_of(row, &new_idx))
            .collect();

        let retained: Vec<&Vec<Cell>> = old
            .rows()
            .iter()
            .filter(|row| match self.key_of(row, &old_idx) {
                Some(key) => !new_keys.contains(&key),
                None => true,
            })
            .collect();

        let columns = union_columns(old.columns(), new.columns());
        let old_map = projection(old.columns(), &columns);
        let new_map = projection(new.columns(), &columns);

        let mut rows = Vec::with_capacity(retained.len() + new.len());
        rows.extend(retained.iter().map(|row| project(row, &old_map)));
        rows.extend(new.rows().iter().map(|row| project(row, &new_map)));

        let summary = MergeSummary {
            key_columns,
            null_keys: self.null_keys,
            old_rows: old.len(),
            new_rows: new.len(),
            superseded_rows: old.len() - retained.len(),
            retained_rows: retained.len(),
            output_rows: rows.len(),
            added_columns: columns[old.columns().len()..].to_vec(),
        };

        Ok(MergeOutcome {
            table: Table::from_parts(columns, rows),
            summary,
        })
    }

    /// Key of a row, or `None` when the row cannot match under the policy.
    fn key_of<'a>(&self, row: &'a [Cell], indices: &[usize]) -> Option<Vec<Option<&'a str>>> {
        let key: Vec<Option<&str>> = indices
            .iter()
            .map(|&idx| row.get(idx).and_then(|cell| cell.as_deref()))
            .collect();
        if self.null_keys == NullKeyPolicy::NeverMatch && key.iter().any(Option::is_none) {
            return None;
        }
        Some(key)
    }
}

/// Merges with the literal null-matching policy and returns only the table.
pub fn merge(old: &Table, new: &Table, key_columns: &[String]) -> Result<Table> {
    Reconciler::new()
        .reconcile(old, new, key_columns)
        .map(|outcome| outcome.table)
}

fn locate_keys(
    old: &Table,
    new: &Table,
    key_columns: &[String],
) -> Result<(Vec<usize>, Vec<usize>)> {
    if key_columns.is_empty() {
        return Err(ToolError::EmptyKey);
    }

    let mut old_idx = Vec::with_capacity(key_columns.len());
    let mut new_idx = Vec::with_capacity(key_columns.len());
    let mut missing = Vec::new();

    for column in key_columns {
        match (old.column_index(column), new.column_index(column)) {
            (Some(o), Some(n)) => {
                old_idx.push(o);
                new_idx.push(n);
            }
            (o, n) => {
                let missing_from = match (o, n) {
                    (None, None) => Side::Both,
                    (None, Some(_)) => Side::Old,
                    _ => Side::New,
                };
                missing.push(MissingColumn {
                    column: column.clone(),
                    missing_from,
                });
            }
        }
    }

    if !missing.is_empty() {
        return Err(SchemaError {
            missing,
            old_columns: old.columns().to_vec(),
            new_columns: new.columns().to_vec(),
        }
        .into());
    }

    Ok((old_idx, new_idx))
}

/// Old columns in order, then columns only the new table has.
fn union_columns(old: &[String], new: &[String]) -> Vec<String> {
    let mut columns = old.to_vec();
    for column in new {
        if !old.contains(column) {
            columns.push(column.clone());
        }
    }
    columns
}

/// For each output column, the source position it is read from.
fn projection(source: &[String], target: &[String]) -> Vec<Option<usize>> {
    target
        .iter()
        .map(|column| source.iter().position(|c| c == column))
        .collect()
}

fn project(row: &[Cell], map: &[Option<usize>]) -> Vec<Cell> {
    map.iter()
        .map(|idx| idx.and_then(|i| row.get(i).cloned().flatten()))
        .collect()
}
