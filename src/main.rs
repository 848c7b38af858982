use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gpx_altitude::csv_export::{
    export_elevations, export_grid_shift, DEFAULT_ELEVATIONS_FILE, DEFAULT_GRID_FILE,
};
use gpx_altitude::grid_shift::Ntv2Reader;
use gpx_altitude::profile_chart::render_profile;
use gpx_altitude::{analyze_file, AnalysisConfig, LoopSearch, TrackAnalysis};

#[derive(Parser, Debug)]
#[command(author, version, about = "Elevation gain statistics for GPX tracks", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute ascent, descent and loops of a GPX track
    Analyze(AnalyzeArgs),
    /// Write every elevation of a GPX file to CSV
    Elevations(ElevationsArgs),
    /// Convert an NTv2 grid shift file (.gsb) to CSV
    GridShift(GridShiftArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// GPX 1.1 track to analyse
    #[arg(long, value_hint = ValueHint::FilePath)]
    gpx_file: PathBuf,

    /// Index stride between compared samples [default: 5]
    #[arg(long)]
    sampling_step: Option<usize>,

    /// Minimum elevation change to count, in meters [default: 1.0]
    #[arg(long)]
    threshold: Option<f64>,

    /// Smoothing window size in samples [default: 5]
    #[arg(long)]
    window_size: Option<usize>,

    /// Maximum plausible change between points, in meters [default: 50.0]
    #[arg(long)]
    max_change: Option<f64>,

    /// Distance that closes a loop, in kilometres [default: 0.005]
    #[arg(long)]
    loop_proximity_km: Option<f64>,

    /// Minimum loop length, in meters [default: 3.0]
    #[arg(long)]
    min_loop_distance: Option<f64>,

    /// Report every loop instead of stopping at the first proximity match
    #[arg(long, action = ArgAction::SetTrue)]
    all_loops: bool,

    /// Write the elevation profile chart (.png or .svg)
    #[arg(long, value_hint = ValueHint::FilePath)]
    chart: Option<PathBuf>,

    /// TOML file with [elevation] and [loops] settings
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ElevationsArgs {
    #[arg(long, value_hint = ValueHint::FilePath)]
    gpx_file: PathBuf,

    /// Output CSV; relative names are placed next to the GPX file
    #[arg(short, long, default_value = DEFAULT_ELEVATIONS_FILE)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct GridShiftArgs {
    #[arg(long, value_hint = ValueHint::FilePath)]
    gsb_file: PathBuf,

    /// Output CSV; relative names are placed next to the grid file
    #[arg(short, long, default_value = DEFAULT_GRID_FILE)]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Elevations(args) => handle_elevations(args),
        Command::GridShift(args) => handle_grid_shift(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<()> {
    ensure_exists(&args.gpx_file)?;

    let config = build_config(&args)?;
    let analysis = analyze_file(&args.gpx_file, &config)
        .with_context(|| format!("failed to analyse {}", args.gpx_file.display()))?;

    print_summary(&analysis);

    if let Some(chart_path) = &args.chart {
        match render_profile(&analysis, config.elevation.sampling_step, chart_path) {
            Ok(()) => info!("Wrote chart: {}", chart_path.display()),
            Err(err) => warn!("Skipping chart ({}): {}", chart_path.display(), err),
        }
    }

    Ok(())
}

/// Defaults, then the config file, then explicit flags.
fn build_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let elevation = &mut config.elevation;
    if let Some(step) = args.sampling_step {
        elevation.sampling_step = step;
    }
    if let Some(threshold) = args.threshold {
        elevation.threshold_m = threshold;
    }
    if let Some(window) = args.window_size {
        elevation.window_size = window;
    }
    if let Some(max_change) = args.max_change {
        elevation.max_change_m = max_change;
    }

    let loops = &mut config.loops;
    if let Some(proximity) = args.loop_proximity_km {
        loops.proximity_km = proximity;
    }
    if let Some(min_distance) = args.min_loop_distance {
        loops.min_loop_distance_m = min_distance;
    }
    if args.all_loops {
        loops.search = LoopSearch::AllLoops;
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(analysis: &TrackAnalysis) {
    let summary = &analysis.elevation;
    println!("Total ascent: {} m", summary.total_ascent);
    println!("Total descent: {} m", summary.total_descent);
    println!("Net elevation difference: {} m", summary.net_difference);
    println!(
        "Average distance between points: {:.2} m",
        analysis.average_spacing_m
    );
    let circles: Vec<String> = analysis
        .circles
        .iter()
        .map(|c| format!("({}, {})", c.start_index, c.end_index))
        .collect();
    println!("Detected circles: [{}]", circles.join(", "));
}

fn handle_elevations(args: ElevationsArgs) -> Result<()> {
    ensure_exists(&args.gpx_file)?;
    let written = export_elevations(&args.gpx_file, &args.output)
        .with_context(|| format!("failed to export elevations of {}", args.gpx_file.display()))?;
    println!("Elevations successfully written to {}", written.display());
    Ok(())
}

fn handle_grid_shift(args: GridShiftArgs) -> Result<()> {
    ensure_exists(&args.gsb_file)?;
    let written = export_grid_shift(&Ntv2Reader, &args.gsb_file, &args.output)
        .with_context(|| format!("failed to convert {}", args.gsb_file.display()))?;
    println!("Data successfully saved to {}", written.display());
    Ok(())
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("input file not found: {}", path.display());
    }
    Ok(())
}
