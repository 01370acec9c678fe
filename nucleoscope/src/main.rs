use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use nucleoscope::{
    generate_report, MultiSink, Pipeline, PipelineConfig, SqliteSink, SummaryCsvSink,
};

#[derive(Parser, Debug)]
#[command(name = "nucleoscope", version, about = "Fluorescent nucleus segmentation and measurement")]
struct Cli {
    /// Log filter, e.g. "info" or "nucleoscope=debug". RUST_LOG overrides it.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Segment every TIFF under a folder and store the results.
    Process(ProcessArgs),
    /// Build condition statistics and bar charts from a summary CSV.
    Report(ReportArgs),
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Folder searched recursively for .tif/.tiff images.
    #[arg(long)]
    root: PathBuf,

    /// Folder receiving the database, summary CSV and panels.
    #[arg(long)]
    output: PathBuf,

    /// YAML or JSON pipeline configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database path (relative paths resolve against --output).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Summary CSV path (relative paths resolve against --output).
    #[arg(long)]
    summary: Option<PathBuf>,

    #[arg(long)]
    min_area: Option<usize>,

    /// Local threshold neighbourhood, odd.
    #[arg(long)]
    block_size: Option<usize>,

    /// Delete an existing database first.
    #[arg(long)]
    overwrite_db: bool,

    /// Skip segmentation panel images.
    #[arg(long)]
    no_visualize: bool,

    /// Process files in parallel.
    #[arg(long)]
    parallel: bool,
}

impl ProcessArgs {
    fn apply_overrides(&self, config: &mut PipelineConfig) {
        if let Some(db) = &self.db {
            config.output.db_path = db.clone();
        }
        if let Some(summary) = &self.summary {
            config.output.summary_csv = summary.clone();
        }
        if let Some(min_area) = self.min_area {
            config.segmentation.min_area = min_area;
        }
        if let Some(block_size) = self.block_size {
            config.segmentation.block_size = block_size;
        }
        config.output.overwrite_db |= self.overwrite_db;
        config.output.visualize &= !self.no_visualize;
        config.output.parallel |= self.parallel;
    }
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Flat image summary written by `process`.
    #[arg(long)]
    summary: PathBuf,

    /// Folder receiving statistics CSVs and charts.
    #[arg(long)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    common::log_setup::setup_logging(&cli.log_level, Path::new("logs"), "nucleoscope")?;

    match cli.command {
        Command::Process(args) => run_process(args),
        Command::Report(args) => run_report(args),
    }
}

fn run_process(args: ProcessArgs) -> Result<()> {
    if !args.root.is_dir() {
        bail!("Input folder '{}' does not exist", args.root.display());
    }

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.check()?;

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output folder {}", args.output.display()))?;

    let db_path = config.output.resolved_db_path(&args.output);
    if config.output.overwrite_db && db_path.exists() {
        std::fs::remove_file(&db_path)
            .with_context(|| format!("Failed to remove old database {}", db_path.display()))?;
        tracing::info!("Removed old database '{}'", db_path.display());
    }
    let summary_path = config.output.resolved_summary_path(&args.output);

    let mut sink = MultiSink::new()
        .with(
            SqliteSink::open(&db_path)
                .with_context(|| format!("Failed to open database {}", db_path.display()))?,
        )
        .with(
            SummaryCsvSink::open(&summary_path)
                .with_context(|| format!("Failed to open summary {}", summary_path.display()))?,
        );

    let pipeline = Pipeline::new(config);
    let report = pipeline.run_batch(&args.root, &args.output, &mut sink);

    println!(
        "Processed {} of {} images ({} failed)",
        report.processed.len(),
        report.total(),
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  failed: {} ({})", failure.path.display(), failure.error);
    }
    println!("Results: {}, {}", db_path.display(), summary_path.display());

    Ok(())
}

fn run_report(args: ReportArgs) -> Result<()> {
    let reports = generate_report(&args.summary, &args.output)
        .with_context(|| format!("Failed to build report from {}", args.summary.display()))?;

    for report in &reports {
        println!(
            "{}: {} conditions -> {}, {}",
            report.set,
            report.stats.len(),
            report.stats_csv.display(),
            report.chart.display()
        );
    }
    Ok(())
}
