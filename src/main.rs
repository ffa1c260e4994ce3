//! CLI entry point for the chlorophyll-a decomposition tool.
//!
//! Provides one subcommand per study layout: per-region decomposition with
//! sea-ice arch markers, and single-series decomposition colored by sensor
//! coverage period.

use anyhow::{Context, Result, bail};
use chla_decomp::analyzers::annotate::Annotator;
use chla_decomp::analyzers::decompose::AdditiveDecomposer;
use chla_decomp::analyzers::pipeline::{RegionAnalysis, analyze_regions};
use chla_decomp::analyzers::types::{AnnotationTable, Component};
use chla_decomp::config::AnalysisConfig;
use chla_decomp::loader::{load_annotations, load_observations};
use chla_decomp::output::{log_summaries, print_json};
use chla_decomp::render::{Coloring, DEFAULT_SIZE, Figure, LayoutOptions, layout, render_svg};
use chla_decomp::series::align;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const REGION_PANELS: [Component; 3] = [Component::Observed, Component::Trend, Component::Residual];
const SENSOR_PANELS: [Component; 4] = [
    Component::Observed,
    Component::Trend,
    Component::Seasonal,
    Component::Residual,
];

#[derive(Parser)]
#[command(name = "chla_decomp")]
#[command(about = "Seasonal-trend decomposition of satellite chlorophyll-a series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// CSV with Year, Month, MeanChl and an optional Region column
    #[arg(value_name = "CHL_CSV")]
    input: PathBuf,

    /// Seasonal period of the decomposition (overrides the config file)
    #[arg(short, long)]
    period: Option<usize>,

    /// JSON config file; defaults to $CHLA_CONFIG when set
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SVG file to draw the chart into
    #[arg(short, long, default_value = "chla_decomposition.svg")]
    output: PathBuf,

    /// Also log the figure layout as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose each region and mark years without a sea-ice arch
    Regions {
        #[command(flatten)]
        common: CommonArgs,

        /// Semicolon-delimited arch table with Region, Year and Arch columns
        #[arg(short, long)]
        arch: PathBuf,
    },
    /// Decompose the series and color it by sensor coverage period
    Sensors {
        #[command(flatten)]
        common: CommonArgs,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/chla_decomp.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("chla_decomp.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Regions { common, arch } => run_regions(&common, &arch)?,
        Commands::Sensors { common } => run_sensors(&common)?,
    }

    Ok(())
}

/// Resolves the config file (flag, then `CHLA_CONFIG`, then defaults) and
/// applies the `--period` override.
fn load_config(common: &CommonArgs) -> Result<AnalysisConfig> {
    let path = common
        .config
        .clone()
        .or_else(|| std::env::var_os("CHLA_CONFIG").map(PathBuf::from));

    let mut config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading config");
            AnalysisConfig::load(&path)?
        }
        None => AnalysisConfig::default(),
    };

    if let Some(period) = common.period {
        config = config.with_period(period);
    }
    config.validate()?;
    Ok(config)
}

/// Per-region decomposition with arch markers on every panel.
#[tracing::instrument(skip_all, fields(input = %common.input.display(), arch = %arch.display()))]
fn run_regions(common: &CommonArgs, arch: &Path) -> Result<()> {
    let config = load_config(common)?;

    let observations = load_observations(&common.input, &config.single_series_key)?;
    if observations.is_empty() {
        bail!("{} contains no observations", common.input.display());
    }
    let table = load_annotations(arch)?;
    let series = align(&observations, config.duplicate_policy)?;

    let analyses = analyze_regions(
        series,
        &AdditiveDecomposer::new(config.period),
        &Annotator::new(&config, &table),
        &REGION_PANELS,
    );
    log_summaries(&analyses);

    let figure = layout(
        &analyses,
        &config,
        &LayoutOptions {
            title: "Chlorophyll-a: Time Series, Decomposed Trend, and Residual".to_string(),
            components: REGION_PANELS.to_vec(),
            coloring: Coloring::ByRegion,
            trend_line: false,
        },
    );

    finish(&figure, &analyses, common)
}

/// Whole-series decomposition colored by sensor period, with a linear trend line.
#[tracing::instrument(skip_all, fields(input = %common.input.display()))]
fn run_sensors(common: &CommonArgs) -> Result<()> {
    let config = load_config(common)?;

    let observations = load_observations(&common.input, &config.single_series_key)?;
    if observations.is_empty() {
        bail!("{} contains no observations", common.input.display());
    }
    let series = align(&observations, config.duplicate_policy)?;
    if series.len() > 1 {
        warn!(
            regions = series.len(),
            "Input has several regions; each is drawn with the sensor period colors"
        );
    }

    let table = AnnotationTable::default();
    let analyses = analyze_regions(
        series,
        &AdditiveDecomposer::new(config.period),
        &Annotator::new(&config, &table),
        &[],
    );
    log_summaries(&analyses);

    let figure = layout(
        &analyses,
        &config,
        &LayoutOptions {
            title: "Time Series Components of MeanChl".to_string(),
            components: SENSOR_PANELS.to_vec(),
            coloring: Coloring::ByPeriod(&config.sensor_periods),
            trend_line: true,
        },
    );

    finish(&figure, &analyses, common)
}

fn finish(figure: &Figure, analyses: &[RegionAnalysis], common: &CommonArgs) -> Result<()> {
    if common.json {
        print_json(figure)?;
    }

    render_svg(figure, &common.output, DEFAULT_SIZE)
        .with_context(|| format!("failed to render {}", common.output.display()))?;

    info!(
        regions = analyses.len(),
        output = %common.output.display(),
        "Finished"
    );
    Ok(())
}
