use crate::chart::{is_finite_point, Chart};
use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

const TITLE_FONT_SIZE: u32 = 28;
const AXIS_LABEL_FONT_SIZE: u32 = 20;
const TICK_LABEL_FONT_SIZE: u32 = 15;
const LEGEND_FONT_SIZE: u32 = 15;

// 10x6 inches at 100 dpi
const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;

const MARKER_SIZE: u32 = 4;

/// Series colours, cycled by series position
const COLORS: &[RGBColor] = &[
    RGBColor(31, 119, 180),  // Blue
    RGBColor(255, 127, 14),  // Orange
    RGBColor(44, 160, 44),   // Green
    RGBColor(214, 39, 40),   // Red
    RGBColor(148, 103, 189), // Purple
    RGBColor(140, 86, 75),   // Brown
    RGBColor(227, 119, 194), // Pink
    RGBColor(127, 127, 127), // Gray
    RGBColor(188, 189, 34),  // Olive
    RGBColor(23, 190, 207),  // Cyan
];

fn series_color(idx: usize) -> RGBColor {
    COLORS[idx % COLORS.len()]
}

/// Something that can turn a `Chart` into an artifact at `dest`.
///
/// Implementations must overwrite whatever already exists at `dest`.
pub trait ChartRenderer: Sync {
    fn render(&self, chart: &Chart, dest: &Path) -> Result<()>;
}

/// Draws charts as PNG line plots
#[derive(Debug, Clone, Copy, Default)]
pub struct PngRenderer {
    dump_series: bool,
}

impl PngRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write each chart's series data as JSON next to the image
    pub fn with_series_dump(mut self, dump_series: bool) -> Self {
        self.dump_series = dump_series;
        self
    }
}

impl ChartRenderer for PngRenderer {
    fn render(&self, chart: &Chart, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).context("Failed to create output directory")?;
        }

        draw_png(chart, dest)?;
        info!(path = %dest.display(), series = chart.series.len(), "generated chart");

        if self.dump_series {
            let json_path = dest.with_extension("json");
            let json = serde_json::to_string_pretty(chart)?;
            std::fs::write(&json_path, json)
                .with_context(|| format!("Failed to write {}", json_path.display()))?;
        }

        Ok(())
    }
}

fn draw_png(chart: &Chart, dest: &Path) -> Result<()> {
    let ((x_min, x_max), (y_min, y_max)) = chart
        .bounds()
        .map(|(x, y)| (pad_range(x, 0.02), pad_range(y, 0.05)))
        .unwrap_or(((0.0, 1.0), (0.0, 1.0)));
    anyhow::ensure!(
        [x_min, x_max, y_min, y_max].iter().all(|v| v.is_finite()),
        "axis range for '{}' is not finite",
        chart.title
    );

    let root = BitMapBackend::new(dest, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", TITLE_FONT_SIZE))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    // Later series land on top
    for (idx, series) in chart.series.iter().enumerate() {
        let color = series_color(idx);

        // Legend entry, drawn even when the series has nothing to plot
        ctx.draw_series(LineSeries::new(
            std::iter::empty::<(f64, f64)>(),
            color.stroke_width(2),
        ))?
        .label(series.label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        for run in finite_runs(&series.points) {
            ctx.draw_series(LineSeries::new(run.iter().copied(), color.stroke_width(2)))?;
        }

        ctx.draw_series(PointSeries::of_element(
            series.points.iter().copied().filter(|&p| is_finite_point(p)),
            MARKER_SIZE,
            color.filled(),
            &|coord, size, style| EmptyElement::at(coord) + Circle::new((0, 0), size, style),
        ))?;
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Maximal runs of finite points. A NaN or infinite point breaks the line.
fn finite_runs(points: &[(f64, f64)]) -> Vec<&[(f64, f64)]> {
    points
        .split(|&p| !is_finite_point(p))
        .filter(|run| !run.is_empty())
        .collect()
}

/// Widen `(lo, hi)` by `frac` of its span. A zero span is widened around its value.
fn pad_range((lo, hi): (f64, f64), frac: f64) -> (f64, f64) {
    let span = hi - lo;
    if span.abs() < f64::EPSILON {
        let margin = if lo.abs() > 0.0 { lo.abs() * 0.1 } else { 1.0 };
        (lo - margin, hi + margin)
    } else {
        (lo - span * frac, hi + span * frac)
    }
}
