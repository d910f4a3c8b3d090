use crate::error::{Result, SweepError};
use crate::table::{Schema, Table, Value};
use crate::tag::{tag_table, ConfigTag};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Load a CSV file and project it onto `schema`.
///
/// The returned table has exactly the columns of `schema`, in schema order,
/// and the rows in file order. Extra columns in the file are dropped.
pub fn load_table(path: &Path, schema: &Schema) -> Result<Table> {
    let file = File::open(path).map_err(|source| SweepError::NotFound {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| read_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let indices = schema
        .columns()
        .iter()
        .map(|column| headers.iter().position(|h| h == column))
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(|| SweepError::SchemaMismatch {
            location: path.display().to_string(),
            expected: schema.columns().to_vec(),
            found: headers.clone(),
        })?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| read_error(path, e))?;
        let row = indices
            .iter()
            .map(|&idx| Value::parse(record.get(idx).unwrap_or_default()))
            .collect();
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "loaded table");
    Ok(Table::from_parts(schema.clone(), rows))
}

/// Load a CSV file and attach the configuration it was produced under
pub fn load_tagged(path: &Path, schema: &Schema, tag: &ConfigTag) -> Result<Table> {
    let table = load_table(path, schema)?;
    tag_table(&table, tag)
}

// I/O failures mid-read (e.g. the path is a directory) mean the location
// isn't readable data; everything else is a malformed file.
fn read_error(path: &Path, err: csv::Error) -> SweepError {
    if err.is_io_error() {
        SweepError::NotFound {
            path: path.to_path_buf(),
            source: err.into(),
        }
    } else {
        SweepError::Malformed {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_projects_onto_schema() {
        let file = write_csv(
            "timestamp,devname,extra,rMB/s\n\
             1000,nvme3n1,x,12.5\n\
             2000,nvme3n1,y,13.0\n",
        );
        let schema = Schema::new(["timestamp", "rMB/s", "devname"]);
        let table = load_table(file.path(), &schema).unwrap();

        assert_eq!(table.schema(), &schema);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows()[0],
            vec![
                Value::Number(1000.0),
                Value::Number(12.5),
                Value::Text("nvme3n1".into())
            ]
        );
        assert_eq!(table.rows()[1][0], Value::Number(2000.0));
    }

    #[test]
    fn test_load_search_stats_header() {
        let header = crate::table::SEARCH_STATS_COLUMNS.join(",");
        let file = write_csv(&format!(
            "{}\n10,4,1500.5,2500,9000,12.1,300,100,50,20,1800,12.3,80,900,0.91\n",
            header
        ));
        let table = load_table(file.path(), &Schema::search_stats()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column("Recall@10").unwrap(), vec![&Value::Number(0.91)]);
        assert_eq!(
            table.column("SinglePQDist (us) & chunks").unwrap(),
            vec![&Value::Number(20.0)]
        );
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        // Search runs without ground truth don't write Recall@10
        let header = crate::table::SEARCH_STATS_COLUMNS[..14].join(",");
        let file = write_csv(&format!("{}\n", header));
        let err = load_table(file.path(), &Schema::search_stats()).unwrap_err();
        match err {
            SweepError::SchemaMismatch { found, .. } => assert_eq!(found.len(), 14),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_table(&dir.path().join("absent.csv"), &Schema::iostats()).unwrap_err();
        assert!(matches!(err, SweepError::NotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_table(dir.path(), &Schema::iostats()).unwrap_err();
        assert!(matches!(err, SweepError::NotFound { .. }));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let file = write_csv("a,b\n1,2\n3\n");
        let err = load_table(file.path(), &Schema::new(["a", "b"])).unwrap_err();
        assert!(matches!(err, SweepError::Malformed { .. }));
    }

    #[test]
    fn test_load_tagged_appends_tag() {
        let file = write_csv("a\n1\n2\n");
        let tag = ConfigTag::new(100_000, 8);
        let table = load_tagged(file.path(), &Schema::new(["a"]), &tag).unwrap();
        assert_eq!(table.schema().columns(), &["a", "# points", "# threads"]);
        assert_eq!(
            table.column("# threads").unwrap(),
            vec![&Value::Number(8.0), &Value::Number(8.0)]
        );
    }
}
