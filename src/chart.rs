use crate::error::{Result, SweepError};
use crate::render::ChartRenderer;
use crate::table::{Table, Value};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// One labelled line on a chart, points in table order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Everything a renderer needs to draw one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl Chart {
    /// (min, max) over every finite point of every series, or None if there are none.
    ///
    /// Points with a NaN or infinite coordinate are left out, as they are when drawn.
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut points = self
            .series
            .iter()
            .flat_map(|s| s.points.iter())
            .filter(|&&p| is_finite_point(p));
        let &(x0, y0) = points.next()?;
        Some(points.fold(((x0, x0), (y0, y0)), |((xl, xh), (yl, yh)), &(x, y)| {
            ((xl.min(x), xh.max(x)), (yl.min(y), yh.max(y)))
        }))
    }
}

pub(crate) fn is_finite_point((x, y): (f64, f64)) -> bool {
    x.is_finite() && y.is_finite()
}

/// Which columns to project and which to split on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub x: String,
    pub y: String,
    pub group: String,
    pub title: String,
}

impl ChartRequest {
    pub fn new(
        x: impl Into<String>,
        y: impl Into<String>,
        group: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            group: group.into(),
            title: title.into(),
        }
    }
}

/// Split `table` into one series per entry of `group_values`.
///
/// Series come out in `group_values` order, which is also draw and legend
/// order. A value with no matching rows yields an empty series that is still
/// listed. Repeated values each get their own series.
pub fn build_chart(table: &Table, request: &ChartRequest, group_values: &[Value]) -> Result<Chart> {
    let x_idx = table.require_column(&request.x)?;
    let y_idx = table.require_column(&request.y)?;
    let group_idx = table.require_column(&request.group)?;

    if has_duplicates(group_values) {
        warn!(
            group = %request.group,
            "duplicate group values; overlapping series will be drawn"
        );
    }

    let mut series = Vec::with_capacity(group_values.len());
    for value in group_values {
        let mut points = Vec::new();
        for (row_idx, row) in table.rows().iter().enumerate() {
            if row[group_idx] != *value {
                continue;
            }
            let x = numeric(&row[x_idx], &request.x, row_idx)?;
            let y = numeric(&row[y_idx], &request.y, row_idx)?;
            points.push((x, y));
        }

        if points.is_empty() {
            debug!(group = %request.group, value = %value, "no rows for group");
        }

        series.push(Series {
            label: format!("{}={}", request.group, value),
            points,
        });
    }

    Ok(Chart {
        title: request.title.clone(),
        x_label: request.x.clone(),
        y_label: request.y.clone(),
        series,
    })
}

/// Build the grouped chart and hand it to `renderer`, overwriting `dest`
pub fn plot_grouped(
    table: &Table,
    request: &ChartRequest,
    group_values: &[Value],
    dest: &Path,
    renderer: &dyn ChartRenderer,
) -> anyhow::Result<Chart> {
    let chart = build_chart(table, request, group_values)
        .with_context(|| format!("Failed to build chart '{}'", request.title))?;
    renderer
        .render(&chart, dest)
        .with_context(|| format!("Failed to render {}", dest.display()))?;
    Ok(chart)
}

fn numeric(value: &Value, column: &str, row: usize) -> Result<f64> {
    value.as_f64().ok_or_else(|| SweepError::NonNumeric {
        column: column.to_string(),
        row,
    })
}

fn has_duplicates(values: &[Value]) -> bool {
    values
        .iter()
        .enumerate()
        .any(|(i, v)| values[..i].contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Schema;
    use proptest::prelude::*;

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    fn threads_table() -> Table {
        Table::new(
            Schema::new(["timestamp", "rMB/s", "# threads"]),
            vec![
                vec![n(1.0), n(10.0), n(4.0)],
                vec![n(2.0), n(11.0), n(4.0)],
                vec![n(1.0), n(20.0), n(8.0)],
                vec![n(2.0), n(21.0), n(8.0)],
                vec![n(1.0), n(40.0), n(16.0)],
            ],
        )
        .unwrap()
    }

    fn request() -> ChartRequest {
        ChartRequest::new("timestamp", "rMB/s", "# threads", "rMB/s over timeline")
    }

    #[test]
    fn test_one_series_per_group_value_in_order() {
        let chart = build_chart(&threads_table(), &request(), &[n(8.0), n(4.0)]).unwrap();

        assert_eq!(chart.title, "rMB/s over timeline");
        assert_eq!(chart.x_label, "timestamp");
        assert_eq!(chart.y_label, "rMB/s");
        let labels: Vec<&str> = chart.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["# threads=8", "# threads=4"]);
        assert_eq!(chart.series[0].points, vec![(1.0, 20.0), (2.0, 21.0)]);
        assert_eq!(chart.series[1].points, vec![(1.0, 10.0), (2.0, 11.0)]);
    }

    #[test]
    fn test_empty_group_still_listed() {
        let chart = build_chart(&threads_table(), &request(), &[n(4.0), n(64.0)]).unwrap();
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[1].label, "# threads=64");
        assert!(chart.series[1].is_empty());
    }

    #[test]
    fn test_duplicate_group_values_render_twice() {
        let chart = build_chart(&threads_table(), &request(), &[n(4.0), n(4.0)]).unwrap();
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0], chart.series[1]);
    }

    #[test]
    fn test_points_keep_table_order() {
        let table = Table::new(
            Schema::new(["x", "y", "g"]),
            vec![
                vec![n(3.0), n(1.0), n(0.0)],
                vec![n(1.0), n(2.0), n(0.0)],
                vec![n(3.0), n(3.0), n(0.0)],
            ],
        )
        .unwrap();
        let chart = build_chart(&table, &ChartRequest::new("x", "y", "g", "t"), &[n(0.0)]).unwrap();
        assert_eq!(chart.series[0].points, vec![(3.0, 1.0), (1.0, 2.0), (3.0, 3.0)]);
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let req = ChartRequest::new("timestamp", "wMB/s", "# threads", "t");
        assert!(matches!(
            build_chart(&threads_table(), &req, &[n(4.0)]),
            Err(SweepError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_text_y_is_non_numeric() {
        let table = Table::new(
            Schema::new(["timestamp", "devname", "g"]),
            vec![vec![n(1.0), Value::from("nvme3n1"), n(1.0)]],
        )
        .unwrap();
        let req = ChartRequest::new("timestamp", "devname", "g", "t");
        match build_chart(&table, &req, &[n(1.0)]) {
            Err(SweepError::NonNumeric { column, row }) => {
                assert_eq!(column, "devname");
                assert_eq!(row, 0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_text_group_values_match() {
        let table = Table::new(
            Schema::new(["x", "y", "dev"]),
            vec![
                vec![n(1.0), n(1.0), Value::from("sda")],
                vec![n(2.0), n(2.0), Value::from("sdb")],
            ],
        )
        .unwrap();
        let chart = build_chart(
            &table,
            &ChartRequest::new("x", "y", "dev", "t"),
            &[Value::from("sdb")],
        )
        .unwrap();
        assert_eq!(chart.series[0].label, "dev=sdb");
        assert_eq!(chart.series[0].points, vec![(2.0, 2.0)]);
    }

    #[test]
    fn test_bounds() {
        let chart = build_chart(&threads_table(), &request(), &[n(4.0), n(16.0)]).unwrap();
        assert_eq!(chart.bounds(), Some(((1.0, 2.0), (10.0, 40.0))));

        let empty = build_chart(&threads_table(), &request(), &[n(99.0)]).unwrap();
        assert_eq!(empty.bounds(), None);
    }

    #[test]
    fn test_non_finite_cells_skipped_by_bounds() {
        let table = Table::new(
            Schema::new(["L", "Recall@10", "# threads"]),
            vec![
                vec![n(10.0), Value::parse("0.81"), n(4.0)],
                vec![n(20.0), Value::parse("-nan"), n(4.0)],
                vec![n(30.0), Value::parse("inf"), n(4.0)],
                vec![n(40.0), Value::parse("0.93"), n(4.0)],
            ],
        )
        .unwrap();
        let req = ChartRequest::new("L", "Recall@10", "# threads", "Recall@10 over L");
        let chart = build_chart(&table, &req, &[n(4.0)]).unwrap();

        // The cells stay in the series; only the range ignores them
        assert_eq!(chart.series[0].points.len(), 4);
        assert!(chart.series[0].points[1].1.is_nan());
        assert_eq!(chart.bounds(), Some(((10.0, 40.0), (0.81, 0.93))));
    }

    #[test]
    fn test_bounds_all_non_finite() {
        let chart = Chart {
            title: "t".into(),
            x_label: "x".into(),
            y_label: "y".into(),
            series: vec![Series {
                label: "g=1".into(),
                points: vec![(1.0, f64::NAN), (f64::NEG_INFINITY, 2.0)],
            }],
        };
        assert_eq!(chart.bounds(), None);
    }

    #[test]
    fn test_bounds_single_point_and_flat_series() {
        let table = Table::new(
            Schema::new(["x", "y", "g"]),
            vec![
                vec![n(2.0), n(0.9), n(0.0)],
                vec![n(1.0), n(5.0), n(1.0)],
                vec![n(2.0), n(5.0), n(1.0)],
                vec![n(3.0), n(5.0), n(1.0)],
            ],
        )
        .unwrap();
        let req = ChartRequest::new("x", "y", "g", "t");

        let single = build_chart(&table, &req, &[n(0.0)]).unwrap();
        assert_eq!(single.bounds(), Some(((2.0, 2.0), (0.9, 0.9))));

        let flat = build_chart(&table, &req, &[n(1.0)]).unwrap();
        assert_eq!(flat.bounds(), Some(((1.0, 3.0), (5.0, 5.0))));
    }

    #[test]
    fn test_build_is_deterministic() {
        let values = [n(4.0), n(8.0), n(16.0)];
        let a = build_chart(&threads_table(), &request(), &values).unwrap();
        let b = build_chart(&threads_table(), &request(), &values).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_grouping_partitions_rows(
            groups in prop::collection::vec(0u8..5, 0..50),
            selected in prop::collection::vec(0u8..7, 0..6),
        ) {
            let rows: Vec<Vec<Value>> = groups
                .iter()
                .enumerate()
                .map(|(i, &g)| vec![n(i as f64), n(i as f64 * 2.0), n(g as f64)])
                .collect();
            let table = Table::new(Schema::new(["x", "y", "g"]), rows).unwrap();
            let values: Vec<Value> = selected.iter().map(|&g| n(g as f64)).collect();

            let chart = build_chart(&table, &ChartRequest::new("x", "y", "g", "t"), &values).unwrap();
            prop_assert_eq!(chart.series.len(), values.len());

            for (series, &g) in chart.series.iter().zip(&selected) {
                let expected: Vec<(f64, f64)> = groups
                    .iter()
                    .enumerate()
                    .filter(|(_, rg)| **rg == g)
                    .map(|(i, _)| (i as f64, i as f64 * 2.0))
                    .collect();
                prop_assert_eq!(&series.points, &expected);
            }

            // Counted with repeats, the series cover exactly the selected rows
            let covered: usize = chart.series.iter().map(|s| s.points.len()).sum();
            let expected: usize = selected
                .iter()
                .map(|&g| groups.iter().filter(|&&rg| rg == g).count())
                .sum();
            prop_assert_eq!(covered, expected);
        }
    }
}
