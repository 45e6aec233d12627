//! zeroset-bench: CLI tool for engine parameter experimentation and diagnostics.
//!
//! Runs the curve extraction engine on a built-in scalar field with
//! configurable parameters, printing detailed per-stage diagnostics.
//! Useful for:
//!
//! - Tuning `min_depth`, `max_cells` and the tolerance
//! - Comparing the point-budget presets (`--point-budget`, `--performance`)
//! - Measuring per-stage durations and field evaluation counts
//! - Exporting curves as SVG or JSON for inspection
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin zeroset-bench -- [OPTIONS] --field <FIELD>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod fields;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use zeroset_engine::diagnostics::{Clock, IsolineDiagnostics, plot_isoline_with_diagnostics};
use zeroset_engine::{Bounds, IsolineConfig, QualityMode};

use crate::fields::Preset;

/// Engine parameter experimentation and diagnostics for zeroset.
///
/// Extracts the zero-level curves of a built-in scalar field and prints
/// detailed per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "zeroset-bench", version)]
struct Cli {
    /// Scalar field to plot.
    #[arg(long, value_enum, default_value_t = Preset::Circle)]
    field: Preset,

    /// Plotting box as `x_min,y_min,x_max,y_max` (defaults to the field's own box).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    bounds: Option<Vec<f64>>,

    /// Refinement levels forced everywhere.
    #[arg(long, default_value_t = IsolineConfig::DEFAULT_MIN_DEPTH)]
    min_depth: u32,

    /// Soft cap on the number of leaf cells.
    #[arg(long, default_value_t = IsolineConfig::DEFAULT_MAX_CELLS)]
    max_cells: usize,

    /// Absolute tolerance, one value for both axes or `x,y`.
    #[arg(long, value_delimiter = ',')]
    tol: Option<Vec<f64>>,

    /// Derive `min_depth` and `max_cells` from a desired point count.
    ///
    /// Overrides `--min-depth` and `--max-cells`.
    #[arg(long)]
    point_budget: Option<usize>,

    /// Use the coarse preset with `--point-budget`.
    #[arg(long, requires = "point_budget")]
    performance: bool,

    /// Full engine config as a JSON string.
    ///
    /// When provided, all other engine parameter flags are ignored.
    /// The JSON must be a valid `IsolineConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Write SVG output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Grid spacing for the SVG output.
    #[arg(long, requires = "svg")]
    grid: Option<f64>,

    /// Write the curves as JSON to file.
    #[arg(long)]
    curves: Option<PathBuf>,
}

/// Build an [`IsolineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise a config is
/// assembled from `--point-budget` or the depth and cell flags, plus
/// `--tol`.
fn config_from_cli(cli: &Cli) -> Result<IsolineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let mut config = match cli.point_budget {
        Some(points) => {
            let mode = if cli.performance {
                QualityMode::Performance
            } else {
                QualityMode::Normal
            };
            IsolineConfig::for_point_budget(points, mode)
        }
        None => IsolineConfig {
            min_depth: cli.min_depth,
            max_cells: cli.max_cells,
            tolerance: None,
        },
    };
    config.tolerance = match cli.tol.as_deref() {
        None => None,
        Some(&[tol]) => Some(vec![tol, tol]),
        Some(tol) => Some(tol.to_vec()),
    };
    Ok(config)
}

/// Resolve the plotting box from `--bounds` or the field's default.
fn bounds_from_cli(cli: &Cli) -> Result<Bounds, String> {
    let [x_min, y_min, x_max, y_max] = match cli.bounds.as_deref() {
        None => cli.field.default_bounds(),
        Some(&[x_min, y_min, x_max, y_max]) => [x_min, y_min, x_max, y_max],
        Some(other) => {
            return Err(format!(
                "--bounds expects 4 values (x_min,y_min,x_max,y_max), got {}",
                other.len()
            ));
        }
    };
    Bounds::xy(x_min, y_min, x_max, y_max).map_err(|e| format!("Invalid --bounds: {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let bounds = match bounds_from_cli(&cli) {
        Ok(b) => b,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let preset = cli.field;
    let field = |p: &[f64]| preset.eval(p);

    eprintln!("Field: {preset:?} ({})", preset.expression());
    eprintln!("Bounds: {bounds:?}");
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match plot_isoline_with_diagnostics(&field, &bounds, &config, &StdClock) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write outputs on the first run only.
                if run == 0 {
                    if let Some(ref svg_path) = cli.svg {
                        write_svg(svg_path, preset, &bounds, &config, &result.curves, cli.grid);
                    }
                    if let Some(ref curves_path) = cli.curves {
                        write_curves(curves_path, &result.curves);
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Engine error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Serialize `curves` to SVG at `path`, reporting the outcome on stderr.
fn write_svg(
    path: &Path,
    preset: Preset,
    bounds: &Bounds,
    config: &IsolineConfig,
    curves: &[zeroset_engine::Polyline],
    grid: Option<f64>,
) {
    let desc = format!("{preset:?}: {}", preset.expression());
    let config_json = serde_json::to_string(config).ok();
    let metadata = zeroset_export::SvgMetadata {
        title: Some(preset.expression()),
        description: Some(&desc),
        config_json: config_json.as_deref(),
    };
    let svg = zeroset_export::to_svg(curves, bounds, &metadata, grid);
    match std::fs::write(path, &svg) {
        Ok(()) => {
            eprintln!("SVG written to {} ({} bytes)", path.display(), svg.len());
        }
        Err(e) => {
            eprintln!("Error writing SVG to {}: {e}", path.display());
        }
    }
}

/// Serialize `curves` to JSON at `path`, reporting the outcome on stderr.
fn write_curves(path: &Path, curves: &[zeroset_engine::Polyline]) {
    let json = match serde_json::to_string(curves) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing curves: {e}");
            return;
        }
    };
    match std::fs::write(path, &json) {
        Ok(()) => {
            eprintln!(
                "{} curves written to {} ({} bytes)",
                curves.len(),
                path.display(),
                json.len(),
            );
        }
        Err(e) => {
            eprintln!("Error writing curves to {}: {e}", path.display());
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&IsolineDiagnostics) -> Duration;

/// Minimum, mean and maximum of a series of measurements.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spread {
    min: f64,
    mean: f64,
    max: f64,
}

impl Spread {
    /// `None` for an empty series.
    #[allow(clippy::cast_precision_loss)]
    fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        (count > 0).then(|| Self {
            min,
            mean: sum / count as f64,
            max,
        })
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Print per-stage timing spreads across multiple runs.
fn print_multi_run_summary(all_diagnostics: &[IsolineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    let Some(first) = all_diagnostics.first() else {
        println!("Warning: no diagnostics to summarize");
        return;
    };

    println!(
        "{:<16} {:>10} {:>10} {:>10}",
        "Stage", "Min (ms)", "Mean (ms)", "Max (ms)"
    );
    println!("{}", "-".repeat(50));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Build", |d| d.build.duration),
        ("Triangulate", |d| d.triangulate.duration),
        ("Trace", |d| d.trace.duration),
        ("Total", |d| d.total_duration),
    ];

    for (name, extractor) in stage_extractors {
        if let Some(spread) = Spread::of(all_diagnostics.iter().map(|d| millis(extractor(d)))) {
            println!(
                "{name:<16} {:>10.3} {:>10.3} {:>10.3}",
                spread.min, spread.mean, spread.max
            );
        }
    }

    // The engine is deterministic, so every run does the same work.
    println!(
        "Per run: {} evaluations, {} leaves, {} points",
        first.summary.evaluations, first.summary.leaf_count, first.summary.point_count,
    );
}
