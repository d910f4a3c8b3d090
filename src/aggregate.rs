use crate::error::{Result, SweepError};
use crate::table::Table;

/// Concatenate tables into a new one, keeping row order within and across
/// inputs.
///
/// Every input must share the first input's schema exactly (names and
/// order). A mismatch fails the whole merge; no partial table is returned.
/// An empty input yields an empty table with no columns.
pub fn aggregate(tables: &[Table]) -> Result<Table> {
    let Some(first) = tables.first() else {
        return Ok(Table::default());
    };

    if let Some((idx, other)) = tables
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, t)| t.schema() != first.schema())
    {
        return Err(SweepError::SchemaMismatch {
            location: format!("aggregate input #{}", idx),
            expected: first.schema().columns().to_vec(),
            found: other.schema().columns().to_vec(),
        });
    }

    let total = tables.iter().map(Table::len).sum();
    let mut rows = Vec::with_capacity(total);
    for table in tables {
        rows.extend(table.rows().iter().cloned());
    }

    Ok(Table::from_parts(first.schema().clone(), rows))
}
