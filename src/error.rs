use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading, tagging, merging and grouping sweep tables.
#[derive(Error, Debug)]
pub enum SweepError {
    /// Expected input file is absent or unreadable
    #[error("input not found: {}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Columns don't match the expected schema, or merge inputs disagree
    #[error("schema mismatch in {location}: expected [{}], found [{}]", .expected.join(", "), .found.join(", "))]
    SchemaMismatch {
        location: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A row's width disagrees with its table's column count
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("malformed CSV in {}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A tag column would overwrite an existing column
    #[error("tag column '{column}' already exists")]
    TagCollision { column: String },

    #[error("non-numeric value in column '{column}' at row {row}")]
    NonNumeric { column: String, row: usize },
}

pub type Result<T> = std::result::Result<T, SweepError>;
