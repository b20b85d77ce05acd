//! Tabular file codec.
//!
//! Rows read back with normalized headers (lowercase, whitespace runs
//! replaced by `_`) and optional list columns split on commas. Rows are
//! written with the first row's columns as the header.

use crate::error::{PipelineError, Result};

/// One cell value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    List(Vec<String>),
}

impl Cell {
    fn to_field(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::List(items) => items.join(", "),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for Cell {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// An ordered set of named cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append (or replace) a cell, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Cell>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Cell>) {
        let key = key.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| *k == key) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Text of a cell; lists are joined with `, `. Blank cells read as `None`.
    pub fn text(&self, key: &str) -> Option<String> {
        let text = self.get(key)?.to_field();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Items of a list cell. Text cells are split on commas.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Cell::List(items)) => items.clone(),
            Some(Cell::Text(text)) => split_list(text),
            None => Vec::new(),
        }
    }

    /// Whether a cell holds a truthy value (`true`, `yes`, `1`, `y`).
    pub fn flag(&self, key: &str) -> bool {
        self.text(key).is_some_and(|value| {
            matches!(value.to_lowercase().as_str(), "true" | "yes" | "y" | "1")
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Lowercase a header and replace whitespace runs with `_`.
#[must_use]
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads and writes rows from and to bytes.
pub trait TabularCodec: Send + Sync {
    /// Parse rows; columns named in `list_columns` (raw or normalized) are
    /// split into lists.
    fn read(&self, bytes: &[u8], list_columns: &[&str]) -> Result<Vec<Row>>;

    /// Serialize rows. Fails when there is nothing to write.
    fn write(&self, rows: &[Row]) -> Result<Vec<u8>>;
}

/// Comma-separated values with a header line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl TabularCodec for CsvCodec {
    fn read(&self, bytes: &[u8], list_columns: &[&str]) -> Result<Vec<Row>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(bytes);

        let raw_headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let list_keys: Vec<String> = list_columns.iter().map(|c| normalize_header(c)).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let mut row = Row::new();
            for (index, raw) in raw_headers.iter().enumerate() {
                let key = normalize_header(raw);
                let value = record.get(index).unwrap_or_default();
                if list_keys.contains(&key) {
                    row.set(key, Cell::List(split_list(value)));
                } else {
                    row.set(key, value);
                }
            }
            rows.push(row);
        }
        Ok(rows)
    }

    fn write(&self, rows: &[Row]) -> Result<Vec<u8>> {
        let Some(first) = rows.first() else {
            return Err(PipelineError::Table("no rows to write".to_string()));
        };
        let headers: Vec<&str> = first.keys().collect();
        if headers.is_empty() {
            return Err(PipelineError::Table("rows have no columns".to_string()));
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&headers)?;
        for row in rows {
            writer.write_record(
                headers
                    .iter()
                    .map(|key| row.get(key).map(Cell::to_field).unwrap_or_default()),
            )?;
        }
        writer
            .into_inner()
            .map_err(|e| PipelineError::Table(e.to_string()))
    }
}
