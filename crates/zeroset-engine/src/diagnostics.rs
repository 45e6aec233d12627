//! Engine diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for tuning
//! `min_depth`, `max_cells` and the tolerance. Every call to
//! [`plot_isoline_with_diagnostics`] collects them alongside the
//! staged result.
//!
//! Duration measurements use [`std::time::Duration`]. Timestamps come
//! from a caller-supplied [`Clock`], so the engine itself never reads a
//! platform timer.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::IsolineConfig;
use crate::field::{CountingField, ScalarField};
use crate::trace::trace;
use crate::tree::{build, leaf_budget};
use crate::triangulate::{Triangulation, triangulate};
use crate::types::{Bounds, IsolineError, IsolineResult, Polyline};

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolineDiagnostics {
    /// Stage 1: tree building.
    pub build: StageDiagnostics,
    /// Stage 2: dual triangulation and chain linking.
    pub triangulate: StageDiagnostics,
    /// Stage 3: curve tracing.
    pub trace: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: IsolineSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Tree building metrics.
    Build {
        /// Cells in the arena, internal nodes included.
        cell_count: usize,
        /// Leaf cells.
        leaf_count: usize,
        /// Leaf count at which refinement stops.
        leaf_budget: usize,
        /// Deepest refinement level.
        max_depth: u32,
        /// Largest depth difference between face-adjacent leaves.
        max_depth_jump: u32,
        /// Field evaluations during this stage.
        evaluations: u64,
    },
    /// Triangulation metrics.
    Triangulate {
        /// Triangles emitted.
        triangle_count: usize,
        /// Triangles with a `next` link.
        linked_count: usize,
        /// Hanging edges left unmatched.
        unmatched_edges: usize,
        /// Field evaluations during this stage.
        evaluations: u64,
    },
    /// Curve tracing metrics.
    Trace {
        /// Curves emitted.
        curve_count: usize,
        /// Curves whose last point repeats the first.
        closed_count: usize,
        /// Points across all curves.
        point_count: usize,
    },
}

impl StageMetrics {
    /// Field evaluations made by the stage (`0` for tracing).
    #[must_use]
    pub const fn evaluations(&self) -> u64 {
        match self {
            Self::Build { evaluations, .. } | Self::Triangulate { evaluations, .. } => *evaluations,
            Self::Trace { .. } => 0,
        }
    }
}

/// High-level summary counts for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolineSummary {
    /// Per-axis tolerance used.
    pub tolerance: Vec<f64>,
    /// Leaf cells in the final tree.
    pub leaf_count: usize,
    /// Triangles emitted.
    pub triangle_count: usize,
    /// Curves emitted.
    pub curve_count: usize,
    /// Points across all curves.
    pub point_count: usize,
    /// Field evaluations across all stages.
    pub evaluations: u64,
}

impl IsolineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Isoline Diagnostics Report\n{}", "=".repeat(60)));
        let tolerance: Vec<String> = self
            .summary
            .tolerance
            .iter()
            .map(|t| format!("{t:.3e}"))
            .collect();
        lines.push(format!("Tolerance: [{}]", tolerance.join(", ")));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Build", &self.build),
            ("Triangulate", &self.triangulate),
            ("Trace", &self.trace),
        ];
        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Curves: {}  |  Points: {}  |  Field evaluations: {}",
            self.summary.curve_count, self.summary.point_count, self.summary.evaluations,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Build {
            cell_count,
            leaf_count,
            leaf_budget,
            max_depth,
            max_depth_jump,
            evaluations,
        } => format!(
            "{leaf_count}/{leaf_budget} leaves ({cell_count} cells) depth={max_depth} jump={max_depth_jump} evals={evaluations}",
        ),
        StageMetrics::Triangulate {
            triangle_count,
            linked_count,
            unmatched_edges,
            evaluations,
        } => format!(
            "{triangle_count} triangles, {linked_count} linked, {unmatched_edges} unmatched evals={evaluations}",
        ),
        StageMetrics::Trace {
            curve_count,
            closed_count,
            point_count,
        } => format!("{curve_count} curves ({closed_count} closed), {point_count} pts"),
    }
}

/// Total points across a slice of polylines.
pub(crate) fn total_points(polylines: &[Polyline]) -> usize {
    polylines.iter().map(Polyline::len).sum()
}

/// Run the engine like [`plot_isoline_staged`](crate::plot_isoline_staged)
/// and collect per-stage diagnostics.
///
/// # Errors
///
/// Same as [`plot_isoline_staged`](crate::plot_isoline_staged).
pub fn plot_isoline_with_diagnostics<F, C>(
    field: &F,
    bounds: &Bounds,
    config: &IsolineConfig,
    clock: &C,
) -> Result<(IsolineResult, IsolineDiagnostics), IsolineError>
where
    F: ScalarField + ?Sized,
    C: Clock,
{
    let tolerance = config.validate(bounds)?;
    if bounds.dim() != 2 {
        return Err(IsolineError::UnsupportedDimension(bounds.dim()));
    }
    let counted = CountingField::new(field);
    let run_start = clock.now();

    // 1. Build.
    let start = clock.now();
    let tree = build(
        &counted,
        bounds,
        config.min_depth,
        config.max_cells,
        &tolerance,
    )?;
    let build_evaluations = counted.count();
    let build = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Build {
            cell_count: tree.len(),
            leaf_count: tree.leaf_count(),
            leaf_budget: leaf_budget(tree.branching_factor(), config.min_depth, config.max_cells),
            max_depth: tree.max_depth(),
            max_depth_jump: tree.max_depth_jump(),
            evaluations: build_evaluations,
        },
    };

    // 2. Triangulate.
    let start = clock.now();
    let Triangulation {
        mut triangles,
        unmatched_edges,
    } = triangulate(&tree, &counted, &tolerance)?;
    let triangulate_evaluations = counted.count() - build_evaluations;
    let triangulate = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Triangulate {
            triangle_count: triangles.len(),
            linked_count: triangles.iter().filter(|t| t.next().is_some()).count(),
            unmatched_edges,
            evaluations: triangulate_evaluations,
        },
    };

    // 3. Trace.
    let start = clock.now();
    let curves = trace(&mut triangles);
    let point_count = total_points(&curves);
    let trace = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Trace {
            curve_count: curves.len(),
            closed_count: curves.iter().filter(|c| c.is_closed()).count(),
            point_count,
        },
    };

    let summary = IsolineSummary {
        tolerance: tolerance.clone(),
        leaf_count: tree.leaf_count(),
        triangle_count: triangles.len(),
        curve_count: curves.len(),
        point_count,
        evaluations: counted.count(),
    };
    let diagnostics = IsolineDiagnostics {
        build,
        triangulate,
        trace,
        total_duration: clock.elapsed(&run_start),
        summary,
    };
    let result = IsolineResult {
        tree,
        triangles,
        curves,
        tolerance,
    };
    Ok((result, diagnostics))
}
