use crate::error::{Result, SweepError};
use crate::table::{Table, Value};
use serde::{Deserialize, Serialize};

pub const POINTS_COLUMN: &str = "# points";
pub const THREADS_COLUMN: &str = "# threads";
pub const LIST_LEN_COLUMN: &str = "L";

/// Sweep coordinates identifying the run that produced a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigTag {
    /// Cardinality of the indexed corpus
    pub dataset_size: u64,
    /// Concurrency of the search workload
    pub threads: u32,
    /// Search list length, when the file itself doesn't carry it
    pub list_len: Option<u32>,
}

impl ConfigTag {
    pub fn new(dataset_size: u64, threads: u32) -> Self {
        Self {
            dataset_size,
            threads,
            list_len: None,
        }
    }

    pub fn with_list_len(mut self, list_len: u32) -> Self {
        self.list_len = Some(list_len);
        self
    }

    /// Column names this tag adds, in append order
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec![POINTS_COLUMN, THREADS_COLUMN];
        if self.list_len.is_some() {
            columns.push(LIST_LEN_COLUMN);
        }
        columns
    }

    pub fn values(&self) -> Vec<Value> {
        let mut values = vec![Value::from(self.dataset_size), Value::from(self.threads)];
        if let Some(l) = self.list_len {
            values.push(Value::from(l));
        }
        values
    }
}

/// Append the tag's columns to every row of `table`.
///
/// Fails with `TagCollision` if any tag column already exists, which also
/// catches a table being tagged twice.
pub fn tag_table(table: &Table, tag: &ConfigTag) -> Result<Table> {
    let columns = tag.columns();
    if let Some(column) = columns.iter().find(|c| table.schema().contains(c)) {
        return Err(SweepError::TagCollision {
            column: column.to_string(),
        });
    }

    let values = tag.values();
    let rows = table
        .rows()
        .iter()
        .map(|row| row.iter().chain(values.iter()).cloned().collect())
        .collect();

    Ok(Table::from_parts(table.schema().extended(columns), rows))
}
