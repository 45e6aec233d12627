//! End-to-end properties of the engine on fields with known zero sets.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;

use zeroset_engine::{
    Bounds, CellId, Direction, IsolineConfig, Polyline, Quadtree, plot_isoline,
    plot_isoline_staged, tree,
};

fn circle(p: &[f64]) -> f64 {
    p[0] * p[0] + p[1] * p[1] - 1.0
}

fn square(half: f64) -> Bounds {
    Bounds::xy(-half, -half, half, half).unwrap()
}

fn with_depth(min_depth: u32) -> IsolineConfig {
    IsolineConfig {
        min_depth,
        ..IsolineConfig::default()
    }
}

fn max_residual(curves: &[Polyline], field: impl Fn(&[f64]) -> f64) -> f64 {
    curves
        .iter()
        .flat_map(Polyline::points)
        .map(|p| field(p.coords()).abs())
        .fold(0.0, f64::max)
}

fn total_points(curves: &[Polyline]) -> usize {
    curves.iter().map(Polyline::len).sum()
}

#[test]
fn unit_circle_is_one_closed_curve() {
    let curves = plot_isoline(&circle, &square(3.0), &with_depth(3)).unwrap();
    assert_eq!(curves.len(), 1);
    assert!(curves[0].is_closed());
    assert!(curves[0].len() > 100, "only {} points", curves[0].len());

    // Default tolerance is span / 1000 = 0.006.
    let residual = max_residual(&curves, circle);
    assert!(residual < 0.006, "max |f| = {residual}");
}

#[test]
fn fields_without_sign_change_yield_nothing() {
    let positive = |_: &[f64]| 5.0;
    let negative = |_: &[f64]| -2.0;
    for field in [&positive as &dyn Fn(&[f64]) -> f64, &negative] {
        let curves = plot_isoline(&field, &square(1.0), &with_depth(4)).unwrap();
        assert!(curves.is_empty());
    }
}

#[test]
fn identically_zero_field_yields_nothing() {
    let zero = |_: &[f64]| 0.0;
    let result = plot_isoline_staged(&zero, &square(1.0), &with_depth(3)).unwrap();
    assert!(result.curves.is_empty());
    assert!(result.triangles.iter().all(|t| t.next().is_none()));
}

#[test]
fn diagonal_line_is_one_monotone_open_curve() {
    let line = |p: &[f64]| p[1] - p[0];
    let curves = plot_isoline(&line, &square(1.0), &with_depth(5)).unwrap();
    assert_eq!(curves.len(), 1);
    let curve = &curves[0];
    assert!(!curve.is_closed());

    for p in curve.points() {
        assert!((p.y() - p.x()).abs() < 1e-9, "off the line at {p:?}");
    }
    let xs: Vec<f64> = curve.points().iter().map(|p| p.x()).collect();
    let ascending = xs.windows(2).all(|w| w[0] <= w[1]);
    let descending = xs.windows(2).all(|w| w[0] >= w[1]);
    assert!(ascending || descending, "x is not monotone");

    // Both ends sit next to opposite corners of the box.
    let first = curve.first().unwrap();
    let last = curve.last().unwrap();
    assert!(first.x().abs() > 0.95 && last.x().abs() > 0.95);
    assert!(first.x() * last.x() < 0.0);
}

fn point_counts(
    field: &dyn Fn(&[f64]) -> f64,
    bounds: &Bounds,
    max_cells: usize,
    depths: std::ops::RangeInclusive<u32>,
) -> Vec<usize> {
    depths
        .map(|min_depth| {
            let config = IsolineConfig {
                min_depth,
                max_cells,
                ..IsolineConfig::default()
            };
            total_points(&plot_isoline(&field, bounds, &config).unwrap())
        })
        .collect()
}

#[test]
fn point_count_never_drops_as_min_depth_grows() {
    let line = |p: &[f64]| p[1] - p[0];
    let hyperbola = |p: &[f64]| p[0].mul_add(p[1], -0.5);
    let cases: [(&dyn Fn(&[f64]) -> f64, Bounds); 3] = [
        (&circle, square(3.0)),
        (&line, square(1.0)),
        (&hyperbola, square(1.0)),
    ];
    for (field, bounds) in cases {
        let counts = point_counts(field, &bounds, IsolineConfig::DEFAULT_MAX_CELLS, 1..=7);
        assert!(counts[0] > 0, "counts {counts:?}");
        assert!(counts.windows(2).all(|w| w[0] <= w[1]), "counts {counts:?}");
    }
}

#[test]
fn forced_levels_compete_with_a_tight_cell_budget() {
    // With 500 cells, uniform levels 4 and 5 spend the budget away from the
    // curve, so the adaptive pass near it gets less.
    let counts = point_counts(&circle, &square(3.0), 500, 2..=5);
    assert!(counts[3] < counts[0], "counts {counts:?}");

    // Once the budget no longer binds the same depth recovers.
    let relaxed = point_counts(&circle, &square(3.0), IsolineConfig::DEFAULT_MAX_CELLS, 5..=5);
    assert!(relaxed[0] >= counts[0], "relaxed {relaxed:?}, capped {counts:?}");
}

#[test]
fn smaller_tolerance_tightens_the_curve() {
    let residuals: Vec<f64> = [0.1, 0.01, 0.001]
        .into_iter()
        .map(|tol| {
            let config = IsolineConfig {
                min_depth: 3,
                tolerance: Some(vec![tol, tol]),
                ..IsolineConfig::default()
            };
            let curves = plot_isoline(&circle, &square(3.0), &config).unwrap();
            assert_eq!(curves.len(), 1);
            let residual = max_residual(&curves, circle);
            assert!(residual < tol, "tolerance {tol}: max |f| = {residual}");
            residual
        })
        .collect();
    assert!(
        residuals.windows(2).all(|w| w[1] < w[0]),
        "residuals {residuals:?}"
    );
}

#[test]
fn partially_undefined_field_still_closes() {
    // Undefined outside the unit disc; zero on the circle of radius sqrt(3)/2.
    let cap = |p: &[f64]| {
        let r2 = p[0] * p[0] + p[1] * p[1];
        if r2 <= 1.0 {
            (1.0 - r2).sqrt() - 0.5
        } else {
            f64::NAN
        }
    };
    let curves = plot_isoline(&cap, &square(2.0), &with_depth(4)).unwrap();
    assert_eq!(curves.len(), 1);
    assert!(curves[0].is_closed());

    let radius = 0.75_f64.sqrt();
    for p in curves[0].points() {
        let r = p.x().hypot(p.y());
        assert!((r - radius).abs() < 1e-3, "radius {r} at {p:?}");
    }
}

#[test]
fn disjoint_components_are_separate_curves() {
    let two_circles = |p: &[f64]| {
        let a = p[0] * p[0] + p[1] * p[1] - 0.25;
        let b = (p[0] - 1.5).powi(2) + p[1] * p[1] - 0.25;
        a * b
    };
    let curves = plot_isoline(&two_circles, &square(3.0), &with_depth(4)).unwrap();
    assert_eq!(curves.len(), 2);
    assert!(curves.iter().all(Polyline::is_closed));
}

#[test]
fn hyperbola_branches_are_open_curves() {
    let hyperbola = |p: &[f64]| p[0] * p[1] - 0.5;
    let curves = plot_isoline(&hyperbola, &square(2.0), &with_depth(4)).unwrap();
    assert_eq!(curves.len(), 2);
    assert!(curves.iter().all(|c| !c.is_closed()));

    // One branch per quadrant pair.
    let quadrants: BTreeSet<bool> = curves
        .iter()
        .map(|c| c.first().unwrap().x() > 0.0)
        .collect();
    assert_eq!(quadrants.len(), 2);
}

/// Leaves sharing a face of positive length with the `direction` face of
/// `id` along `axis`, found by comparing coordinates of every leaf.
fn touching_leaves(tree: &Quadtree, id: CellId, axis: usize, direction: Direction) -> Vec<CellId> {
    const EPS: f64 = 1e-12;
    let cell = tree.cell(id);
    let (lo, hi) = (&cell.min_corner().pos, &cell.max_corner().pos);
    let face = if direction.is_max() { hi[axis] } else { lo[axis] };

    let mut found: Vec<CellId> = tree
        .leaves()
        .filter(|&other| {
            let o = tree.cell(other);
            let (olo, ohi) = (&o.min_corner().pos, &o.max_corner().pos);
            let opposite = if direction.is_max() { olo[axis] } else { ohi[axis] };
            if (opposite - face).abs() > EPS {
                return false;
            }
            (0..tree.dim())
                .filter(|&b| b != axis)
                .all(|b| hi[b].min(ohi[b]) - lo[b].max(olo[b]) > EPS)
        })
        .collect();
    found.sort_by_key(|c| c.index());
    found
}

#[test]
fn neighbor_queries_match_geometric_adjacency() {
    let tree = tree::build(&circle, &square(2.0), 2, 400, &[0.02, 0.02]).unwrap();
    assert!(tree.max_depth_jump() >= 1, "tree should be uneven");

    for id in tree.leaves() {
        for axis in 0..2 {
            for direction in [Direction::Min, Direction::Max] {
                let mut walked: Vec<CellId> = tree.leaves_in_direction(id, axis, direction).collect();
                let count = walked.len();
                walked.sort_by_key(|c| c.index());
                walked.dedup();
                assert_eq!(walked.len(), count, "duplicate neighbor of {id:?}");
                assert_eq!(
                    walked,
                    touching_leaves(&tree, id, axis, direction),
                    "neighbors of {id:?} along axis {axis} {direction:?}"
                );
            }
        }
    }
}

#[test]
fn exact_zeros_on_the_lattice_leave_no_zero_extent_curves() {
    // The scaled field overflows in interpolation, so only the exact zeros
    // at (+-1, 0) and (0, +-1) survive as crossings.
    let huge = |p: &[f64]| 1e250 * circle(p);
    let result = plot_isoline_staged(&huge, &square(2.0), &with_depth(3)).unwrap();
    assert!(result.triangles.iter().any(|t| t.next().is_some()));
    for curve in &result.curves {
        let head = curve.first().unwrap();
        assert!(
            curve.points().iter().any(|p| p != head),
            "zero-extent curve at {head:?}"
        );
    }
}
