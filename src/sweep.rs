use crate::aggregate::aggregate;
use crate::chart::{plot_grouped, ChartRequest};
use crate::error::Result;
use crate::loader::load_tagged;
use crate::render::ChartRenderer;
use crate::table::{Schema, Table, Value};
use crate::tag::{ConfigTag, LIST_LEN_COLUMN, POINTS_COLUMN, THREADS_COLUMN};
use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Which sweep dimension splits a chart into series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Threads,
    ListLen,
    Points,
}

impl GroupBy {
    pub fn column(self) -> &'static str {
        match self {
            GroupBy::Threads => THREADS_COLUMN,
            GroupBy::ListLen => LIST_LEN_COLUMN,
            GroupBy::Points => POINTS_COLUMN,
        }
    }
}

/// One chart in a chart set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSpec {
    pub file_stem: &'static str,
    pub title: &'static str,
    pub x: &'static str,
    pub y: &'static str,
    pub group_by: GroupBy,
}

impl ChartSpec {
    pub fn request(&self) -> ChartRequest {
        ChartRequest::new(self.x, self.y, self.group_by.column(), self.title)
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.file_stem)
    }
}

const fn spec(
    file_stem: &'static str,
    title: &'static str,
    x: &'static str,
    y: &'static str,
    group_by: GroupBy,
) -> ChartSpec {
    ChartSpec {
        file_stem,
        title,
        x,
        y,
        group_by,
    }
}

/// Device throughput over time, one line per thread count
pub const IOSTATS_CHARTS: &[ChartSpec] = &[
    spec("combined_rMBs_over_time", "rMB/s over timeline", "timestamp", "rMB/s", GroupBy::Threads),
    spec("combined_wMBs_over_time", "wMB/s over timeline", "timestamp", "wMB/s", GroupBy::Threads),
];

/// Search summary metrics against thread count (one line per L), plus recall against L
pub const SEARCH_CHARTS: &[ChartSpec] = &[
    spec(
        "combined_QPS_over_threads",
        "QPS / thread over # thread",
        THREADS_COLUMN,
        "QPS / thread",
        GroupBy::ListLen,
    ),
    spec(
        "combined_Mean_Latency_over_threads",
        "Mean Latency over # thread",
        THREADS_COLUMN,
        "Mean Latency",
        GroupBy::ListLen,
    ),
    spec(
        "combined_99.9_Latency_over_threads",
        "99.9 Latency over # thread",
        THREADS_COLUMN,
        "99.9 Latency",
        GroupBy::ListLen,
    ),
    spec(
        "combined_Mean_IOs_over_threads",
        "Mean IOs over # thread",
        THREADS_COLUMN,
        "Mean IOs",
        GroupBy::ListLen,
    ),
    spec(
        "combined_CPU_over_threads",
        "CPU (us) over # thread",
        THREADS_COLUMN,
        "CPU (us)",
        GroupBy::ListLen,
    ),
    spec(
        "combined_Recall@10_over_threads",
        "Recall@10 over L",
        LIST_LEN_COLUMN,
        "Recall@10",
        GroupBy::Threads,
    ),
];

/// Search metrics compared across dataset sizes at one fixed thread count
pub const CROSS_SIZE_CHARTS: &[ChartSpec] = &[
    spec(
        "combined_QPS_over_points",
        "QPS / thread over # points",
        POINTS_COLUMN,
        "QPS / thread",
        GroupBy::ListLen,
    ),
    spec(
        "combined_Mean_Latency_over_points",
        "Mean Latency over # points",
        POINTS_COLUMN,
        "Mean Latency",
        GroupBy::ListLen,
    ),
    spec(
        "combined_99.9_Latency_over_points",
        "99.9 Latency over # points",
        POINTS_COLUMN,
        "99.9 Latency",
        GroupBy::ListLen,
    ),
    spec(
        "combined_Recall@10_over_points",
        "Recall@10 over L by # points",
        LIST_LEN_COLUMN,
        "Recall@10",
        GroupBy::Points,
    ),
];

/// Sweep coordinates and input/output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Root of the sweep output tree
    pub base_path: PathBuf,
    /// Outer sweep dimension; one chart set per entry
    pub dataset_sizes: Vec<u64>,
    /// Thread counts run for every dataset size
    pub thread_counts: Vec<u32>,
    /// L values present in every search_stats file
    pub list_lens: Vec<u32>,
    /// Relative to `<base>/<size>/<threads>/`
    pub iostats_subpath: PathBuf,
    /// Relative to `<base>/<size>/<threads>/`
    pub search_stats_subpath: PathBuf,
    /// Emit the cross-size chart set for this thread count
    pub cross_size_threads: Option<u32>,
    /// Process sweep points on the rayon pool
    pub parallel: bool,
    /// Write each chart's series as JSON next to the PNG
    pub dump_series: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/app/DiskANN/build/data/bigann_threads_search"),
            dataset_sizes: vec![
                100_000,
                200_000,
                300_000,
                400_000,
                500_000,
                1_000_000,
                10_000_000,
                100_000_000,
            ],
            thread_counts: vec![4, 8, 16, 32, 64],
            list_lens: vec![10, 20, 30, 40, 50, 100],
            iostats_subpath: PathBuf::from("search_res/res_iostats.csv"),
            search_stats_subpath: PathBuf::from("search_stats.csv"),
            cross_size_threads: None,
            parallel: false,
            dump_series: false,
        }
    }
}

impl SweepConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// `<base>/<size>`: where a sweep point's charts go
    pub fn point_dir(&self, dataset_size: u64) -> PathBuf {
        self.base_path.join(dataset_size.to_string())
    }

    /// `<base>/<size>/<threads>`: one benchmark run's output
    pub fn run_dir(&self, dataset_size: u64, threads: u32) -> PathBuf {
        self.point_dir(dataset_size).join(threads.to_string())
    }

    pub fn iostats_path(&self, dataset_size: u64, threads: u32) -> PathBuf {
        self.run_dir(dataset_size, threads).join(&self.iostats_subpath)
    }

    pub fn search_stats_path(&self, dataset_size: u64, threads: u32) -> PathBuf {
        self.run_dir(dataset_size, threads)
            .join(&self.search_stats_subpath)
    }
}

/// Merged tables for one dataset size, every row tagged with its run
#[derive(Debug, Clone, PartialEq)]
pub struct PointTables {
    pub dataset_size: u64,
    pub iostats: Table,
    pub search: Table,
}

#[derive(Debug)]
pub struct PointOutcome {
    pub dataset_size: u64,
    /// Written chart paths, or why the point was skipped
    pub result: std::result::Result<Vec<PathBuf>, String>,
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub points: Vec<PointOutcome>,
    /// Present only when a cross-size set was requested
    pub cross_size: Option<std::result::Result<Vec<PathBuf>, String>>,
}

impl SweepReport {
    pub fn failed(&self) -> usize {
        let cross = matches!(self.cross_size, Some(Err(_))) as usize;
        self.points.iter().filter(|p| p.result.is_err()).count() + cross
    }

    pub fn charts_written(&self) -> usize {
        let cross = match &self.cross_size {
            Some(Ok(paths)) => paths.len(),
            _ => 0,
        };
        self.points
            .iter()
            .filter_map(|p| p.result.as_ref().ok())
            .map(Vec::len)
            .sum::<usize>()
            + cross
    }
}

/// Loads, merges and plots every sweep point.
///
/// Holds no state between runs, so re-running over unchanged inputs rewrites
/// the same charts.
pub struct SweepDriver<'a> {
    config: SweepConfig,
    renderer: &'a dyn ChartRenderer,
}

impl<'a> SweepDriver<'a> {
    pub fn new(config: SweepConfig, renderer: &'a dyn ChartRenderer) -> Self {
        Self { config, renderer }
    }

    /// Load and merge one dataset size's runs. Nothing is written.
    pub fn load_point(&self, dataset_size: u64) -> Result<PointTables> {
        let mut iostats = Vec::with_capacity(self.config.thread_counts.len());
        let mut search = Vec::with_capacity(self.config.thread_counts.len());

        for &threads in &self.config.thread_counts {
            let tag = ConfigTag::new(dataset_size, threads);
            iostats.push(load_tagged(
                &self.config.iostats_path(dataset_size, threads),
                &Schema::iostats(),
                &tag,
            )?);
            search.push(load_tagged(
                &self.config.search_stats_path(dataset_size, threads),
                &Schema::search_stats(),
                &tag,
            )?);
        }

        Ok(PointTables {
            dataset_size,
            iostats: aggregate(&iostats)?,
            search: aggregate(&search)?,
        })
    }

    /// Render the per-point chart set under `<base>/<size>/`
    pub fn render_point(&self, tables: &PointTables) -> anyhow::Result<Vec<PathBuf>> {
        let dir = self.config.point_dir(tables.dataset_size);
        let mut written = self.render_set(IOSTATS_CHARTS, &tables.iostats, &dir, &[])?;
        written.extend(self.render_set(SEARCH_CHARTS, &tables.search, &dir, &[])?);
        Ok(written)
    }

    pub fn run(&self) -> SweepReport {
        let sizes = &self.config.dataset_sizes;
        let processed: Vec<(u64, anyhow::Result<(Vec<PathBuf>, Table)>)> = if self.config.parallel {
            sizes
                .par_iter()
                .map(|&size| (size, self.process_point(size)))
                .collect()
        } else {
            sizes
                .iter()
                .map(|&size| (size, self.process_point(size)))
                .collect()
        };

        let mut report = SweepReport::default();
        let mut search_tables = Vec::new();
        let mut ok_sizes = Vec::new();

        for (dataset_size, result) in processed {
            let result = match result {
                Ok((paths, search)) => {
                    info!(dataset_size, charts = paths.len(), "sweep point done");
                    search_tables.push(search);
                    ok_sizes.push(dataset_size);
                    Ok(paths)
                }
                Err(e) => {
                    let msg = format!("{:#}", e);
                    error!(dataset_size, error = %msg, "skipping sweep point");
                    Err(msg)
                }
            };
            report.points.push(PointOutcome {
                dataset_size,
                result,
            });
        }

        if let Some(threads) = self.config.cross_size_threads {
            report.cross_size = Some(
                self.render_cross_size(threads, &search_tables, &ok_sizes)
                    .map_err(|e| {
                        let msg = format!("{:#}", e);
                        error!(threads, error = %msg, "cross-size charts failed");
                        msg
                    }),
            );
        }

        report
    }

    fn process_point(&self, dataset_size: u64) -> anyhow::Result<(Vec<PathBuf>, Table)> {
        let tables = self
            .load_point(dataset_size)
            .with_context(|| format!("Failed to load sweep point {}", dataset_size))?;
        let written = self.render_point(&tables)?;
        Ok((written, tables.search))
    }

    fn render_cross_size(
        &self,
        threads: u32,
        search_tables: &[Table],
        sizes: &[u64],
    ) -> anyhow::Result<Vec<PathBuf>> {
        if search_tables.is_empty() {
            warn!("no sweep point succeeded; skipping cross-size charts");
            return Ok(Vec::new());
        }
        let merged = aggregate(search_tables)?;
        let at_threads = merged.filter_eq(THREADS_COLUMN, &Value::from(threads))?;
        self.render_set(CROSS_SIZE_CHARTS, &at_threads, &self.config.base_path, sizes)
    }

    fn render_set(
        &self,
        specs: &[ChartSpec],
        table: &Table,
        dir: &Path,
        sizes: &[u64],
    ) -> anyhow::Result<Vec<PathBuf>> {
        specs
            .iter()
            .map(|spec| -> anyhow::Result<PathBuf> {
                let dest = dir.join(spec.file_name());
                let values = self.group_values(spec.group_by, sizes);
                plot_grouped(table, &spec.request(), &values, &dest, self.renderer)?;
                Ok(dest)
            })
            .collect()
    }

    fn group_values(&self, group_by: GroupBy, sizes: &[u64]) -> Vec<Value> {
        match group_by {
            GroupBy::Threads => self.config.thread_counts.iter().map(|&t| t.into()).collect(),
            GroupBy::ListLen => self.config.list_lens.iter().map(|&l| l.into()).collect(),
            GroupBy::Points => sizes.iter().map(|&s| s.into()).collect(),
        }
    }
}
