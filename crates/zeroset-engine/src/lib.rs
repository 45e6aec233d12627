//! zeroset-engine: adaptive extraction of implicit curves (sans-IO).
//!
//! Approximates the zero-level set `{p : f(p) = 0}` of a scalar field
//! over an axis-aligned box as a set of polylines:
//!
//! 1. Tree building: adaptive quadtree refinement around sign changes
//! 2. Triangulation: crack-free dual mesh over leaves of unequal depth,
//!    with zero crossings linked triangle to triangle
//! 3. Tracing: linked chains become open or closed polylines
//!
//! This crate has **no I/O dependencies**. The field is any
//! [`ScalarField`]; closures `Fn(&[f64]) -> f64` qualify.

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod field;
pub mod locate;
pub mod neighbor;
pub mod trace;
pub mod tree;
pub mod triangulate;
pub mod types;

pub use cache::{CacheKey, CurveCache};
pub use config::{IsolineConfig, QualityMode};
pub use field::{CountingField, ScalarField};
pub use neighbor::Direction;
pub use tree::{Cell, CellId, Quadtree};
pub use triangulate::{Triangle, TriangleId, Triangulation};
pub use types::{Bounds, IsolineError, IsolineResult, MAX_DIMENSION, Point, Polyline, Sample};

/// Extract the zero-level curves of `field` inside `bounds`.
///
/// Closed curves repeat their first point as their last. A field with no
/// sign change in the box yields an empty list.
///
/// # Errors
///
/// Returns an [`IsolineError`] if `config` is invalid for `bounds` (see
/// [`IsolineConfig::validate`]) or the box is not two-dimensional.
pub fn plot_isoline<F: ScalarField + ?Sized>(
    field: &F,
    bounds: &Bounds,
    config: &IsolineConfig,
) -> Result<Vec<Polyline>, IsolineError> {
    plot_isoline_staged(field, bounds, config).map(|result| result.curves)
}

/// Run the engine and keep the tree and triangles alongside the curves.
///
/// # Errors
///
/// Same as [`plot_isoline`].
pub fn plot_isoline_staged<F: ScalarField + ?Sized>(
    field: &F,
    bounds: &Bounds,
    config: &IsolineConfig,
) -> Result<IsolineResult, IsolineError> {
    let tolerance = config.validate(bounds)?;
    if bounds.dim() != 2 {
        return Err(IsolineError::UnsupportedDimension(bounds.dim()));
    }

    // 1. Tree building.
    let tree = tree::build(field, bounds, config.min_depth, config.max_cells, &tolerance)?;

    // 2. Triangulation and chain linking.
    let Triangulation { mut triangles, .. } = triangulate::triangulate(&tree, field, &tolerance)?;

    // 3. Curve tracing.
    let curves = trace::trace(&mut triangles);

    Ok(IsolineResult {
        tree,
        triangles,
        curves,
        tolerance,
    })
}
