use crate::error::{Result, SweepError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Columns written by the iostat sampler, one row per device sample
pub const IOSTATS_COLUMNS: &[&str] = &[
    "timestamp",
    "devname",
    "rrqm/s",
    "wrqm/s",
    "r/s",
    "w/s",
    "rMB/s",
    "wMB/s",
    "avgrq-sz",
    "avgqu-sz",
    "await",
    "r_await",
    "w_await",
    "util",
];

/// Columns written by the search run, one summary row per L
pub const SEARCH_STATS_COLUMNS: &[&str] = &[
    "L",
    "Beamwidth",
    "QPS / thread",
    "Mean Latency",
    "99.9 Latency",
    "Mean IOs",
    "CPU (us)",
    "ComputeDist (us)",
    "PQDist (us)",
    "SinglePQDist (us) & chunks",
    "IO Time(us)",
    "Mean IO 4k",
    "Mean Nnbrs",
    "Mean Ncompdist",
    "Recall@10",
];

/// A single cell. Numeric text is parsed eagerly so grouping compares by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// Ordered column names. Equality is order-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema(Vec<String>);

impl Schema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(columns.into_iter().map(Into::into).collect())
    }

    pub fn iostats() -> Self {
        Self::new(IOSTATS_COLUMNS.iter().copied())
    }

    pub fn search_stats() -> Self {
        Self::new(SEARCH_STATS_COLUMNS.iter().copied())
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.0.iter().position(|c| c == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.index_of(column).is_some()
    }

    /// Returns a new schema with `extra` appended after the existing columns
    pub fn extended<I, S>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns = self.0.clone();
        columns.extend(extra.into_iter().map(Into::into));
        Self(columns)
    }
}

/// An in-memory table of measurement rows in source order.
///
/// Tables are never mutated in place: tagging, merging and filtering all
/// return a new `Table`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    schema: Schema,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, checking that every row is as wide as the schema
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != schema.len())
        {
            return Err(SweepError::RaggedRow {
                row: idx,
                expected: schema.len(),
                found: row.len(),
            });
        }
        Ok(Self { schema, rows })
    }

    pub(crate) fn from_parts(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == schema.len()));
        Self { schema, rows }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of `column`, or a `SchemaMismatch` naming the missing column
    pub fn require_column(&self, column: &str) -> Result<usize> {
        self.schema
            .index_of(column)
            .ok_or_else(|| SweepError::SchemaMismatch {
                location: format!("column '{}'", column),
                expected: vec![column.to_string()],
                found: self.schema.columns().to_vec(),
            })
    }

    /// All values of one column, in row order
    pub fn column(&self, column: &str) -> Result<Vec<&Value>> {
        let idx = self.require_column(column)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Rows whose `column` equals `value` exactly, as a new table
    pub fn filter_eq(&self, column: &str, value: &Value) -> Result<Table> {
        let idx = self.require_column(column)?;
        let rows = self
            .rows
            .iter()
            .filter(|row| row[idx] == *value)
            .cloned()
            .collect();
        Ok(Self::from_parts(self.schema.clone(), rows))
    }
}
