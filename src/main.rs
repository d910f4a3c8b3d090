use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use sweep_charts::{PngRenderer, SweepConfig, SweepDriver, SweepReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sweep-charts")]
#[command(about = "Plot benchmark sweep results across dataset size, thread count and L")]
struct Cli {
    /// JSON sweep configuration; the flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root of the sweep tree (<base>/<dataset-size>/<threads>/...)
    #[arg(short, long)]
    base: Option<PathBuf>,

    /// Dataset sizes to plot, comma separated
    #[arg(long, value_delimiter = ',')]
    dataset_sizes: Vec<u64>,

    /// Thread counts run per dataset size, comma separated
    #[arg(long, value_delimiter = ',')]
    threads: Vec<u32>,

    /// L values present in each search_stats.csv, comma separated
    #[arg(long = "ls", value_delimiter = ',')]
    list_lens: Vec<u32>,

    /// Also compare dataset sizes at this thread count
    #[arg(long)]
    cross_size_threads: Option<u32>,

    /// Process dataset sizes in parallel
    #[arg(long)]
    parallel: bool,

    /// Write each chart's series as JSON next to the PNG
    #[arg(long)]
    dump_series: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<SweepConfig> {
        let mut config = match &self.config {
            Some(path) => SweepConfig::from_json_file(path)?,
            None => SweepConfig::default(),
        };

        if let Some(base) = self.base {
            config.base_path = base;
        }
        if !self.dataset_sizes.is_empty() {
            config.dataset_sizes = self.dataset_sizes;
        }
        if !self.threads.is_empty() {
            config.thread_counts = self.threads;
        }
        if !self.list_lens.is_empty() {
            config.list_lens = self.list_lens;
        }
        if self.cross_size_threads.is_some() {
            config.cross_size_threads = self.cross_size_threads;
        }
        config.parallel |= self.parallel;
        config.dump_series |= self.dump_series;

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = cli.into_config()?;
    let renderer = PngRenderer::new().with_series_dump(config.dump_series);

    println!("\nSweep Configuration:");
    println!("  Base path: {}", config.base_path.display());
    println!("  Dataset sizes: {:?}", config.dataset_sizes);
    println!("  Thread counts: {:?}", config.thread_counts);
    println!("  L values: {:?}", config.list_lens);

    let report = SweepDriver::new(config, &renderer).run();
    print_report(&report);

    if report.failed() > 0 {
        anyhow::bail!("{} sweep point(s) failed", report.failed());
    }
    Ok(())
}

fn print_report(report: &SweepReport) {
    println!("\n{:=<80}", "");
    println!("Sweep Results");
    println!("{:=<80}\n", "");

    println!("  {:>12} {:>8}  {}", "Points", "Charts", "Status");
    println!("  {:-<60}", "");
    for point in &report.points {
        match &point.result {
            Ok(paths) => println!("  {:>12} {:>8}  ok", point.dataset_size, paths.len()),
            Err(e) => println!("  {:>12} {:>8}  skipped: {}", point.dataset_size, 0, e),
        }
    }

    match &report.cross_size {
        Some(Ok(paths)) => println!("\n  Cross-size charts: {}", paths.len()),
        Some(Err(e)) => println!("\n  Cross-size charts failed: {}", e),
        None => {}
    }

    println!("\n  Total charts written: {}", report.charts_written());
}
