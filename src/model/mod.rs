use std::collections::HashSet;

use serde::Serialize;

/// A single cell. `None` is the absent value, distinct from any string.
pub type Cell = Option<String>;

/// An ordered sequence of records sharing one column set.
///
/// Rows are stored positionally against `columns`. Column names are trimmed
/// and made unique on construction, so every column can be addressed by name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates an empty table with the given header.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            columns: normalize_columns(columns),
            rows: Vec::new(),
        }
    }

    /// Creates a table from a header and positional rows. Short rows are
    /// padded with absent cells; long rows are truncated to the header width.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Cell>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Builds a table from records given as `(column, value)` pairs. Columns
    /// are collected in first-seen order and missing values become absent.
    pub fn from_records<R, K, V>(records: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = (K, Option<V>)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut staged: Vec<Vec<(String, Cell)>> = Vec::new();
        for record in records {
            let mut fields = Vec::new();
            for (name, value) in record {
                let name = name.as_ref().trim().to_string();
                if !columns.contains(&name) {
                    columns.push(name.clone());
                }
                fields.push((name, value.map(Into::into)));
            }
            staged.push(fields);
        }

        let mut table = Self::new(&columns);
        for fields in staged {
            let mut row = vec![None; columns.len()];
            for (name, value) in fields {
                if let Some(idx) = table.column_index(&name) {
                    row[idx] = value;
                }
            }
            table.rows.push(row);
        }
        table
    }

    /// Appends a positional row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column. The name is trimmed before lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Borrowed view of the record at `index`.
    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        self.rows.get(index).map(|cells| Record {
            columns: &self.columns,
            cells,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        self.rows.iter().map(move |cells| Record {
            columns: &self.columns,
            cells,
        })
    }

    /// First `limit` records as a new table with the same header.
    pub fn head(&self, limit: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }

    pub(crate) fn from_parts(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }
}

/// A record borrowed from a [`Table`]: an ordered column → cell mapping.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl<'a> Record<'a> {
    /// Value of the named column. Returns `None` both for an absent cell and
    /// an unknown column; use [`Table::has_column`] to tell them apart.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let column = column.trim();
        self.columns
            .iter()
            .position(|name| name == column)
            .and_then(|idx| self.cells.get(idx))
            .and_then(|cell| cell.as_deref())
    }

    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    /// Iterates `(column, value)` pairs in column order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, Option<&'a str>)> + 'a {
        let columns = self.columns;
        let cells = self.cells;
        columns
            .iter()
            .zip(cells.iter())
            .map(|(name, cell)| (name.as_str(), cell.as_deref()))
    }
}

/// Trims header names and suffixes repeats with `.1`, `.2`, ... so that
/// every column stays addressable.
fn normalize_columns<I, S>(columns: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut used: HashSet<String> = HashSet::new();
    let mut normalized = Vec::new();
    for column in columns {
        let base = column.as_ref().trim().to_string();
        let mut candidate = base.clone();
        let mut counter = 1;
        while used.contains(&candidate) {
            candidate = format!("{base}.{counter}");
            counter += 1;
        }
        used.insert(candidate.clone());
        normalized.push(candidate);
    }
    normalized
}
