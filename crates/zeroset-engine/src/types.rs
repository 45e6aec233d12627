//! Shared types for the zeroset isoline engine.

use std::ops::{Add, Div, Index, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::field::ScalarField;
use crate::tree::Quadtree;
use crate::triangulate::Triangle;

/// Highest dimension accepted for a search box.
///
/// Cells carry `2^dim` corners and splitting samples a `3^dim` lattice,
/// so the cost grows quickly with the dimension.
pub const MAX_DIMENSION: usize = 8;

/// A point in `R^n`.
///
/// The dimension is the number of coordinates. All vector-space
/// operations assume both operands share the same dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Point(Vec<f64>);

impl Point {
    /// Create a point from its coordinates.
    #[must_use]
    pub const fn new(coords: Vec<f64>) -> Self {
        Self(coords)
    }

    /// Create a 2D point.
    #[must_use]
    pub fn xy(x: f64, y: f64) -> Self {
        Self(vec![x, y])
    }

    /// Number of coordinates.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.0.len()
    }

    /// All coordinates in axis order.
    #[must_use]
    pub fn coords(&self) -> &[f64] {
        &self.0
    }

    /// First coordinate, or `NaN` for a zero-dimensional point.
    #[must_use]
    pub fn x(&self) -> f64 {
        self.0.first().copied().unwrap_or(f64::NAN)
    }

    /// Second coordinate, or `NaN` for points with fewer than two axes.
    #[must_use]
    pub fn y(&self) -> f64 {
        self.0.get(1).copied().unwrap_or(f64::NAN)
    }

    /// Consumes the point and returns its coordinates.
    #[must_use]
    pub fn into_coords(self) -> Vec<f64> {
        self.0
    }

    /// `self * k1 + other * k2`, component-wise.
    #[must_use]
    pub fn weighted_sum(&self, k1: f64, other: &Self, k2: f64) -> Self {
        Self(
            self.0
                .iter()
                .zip(&other.0)
                .map(|(a, b)| a.mul_add(k1, b * k2))
                .collect(),
        )
    }

    /// Point at parameter `t` on the segment from `self` (`t = 0`) to
    /// `other` (`t = 1`).
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        self.weighted_sum(1.0 - t, other, t)
    }

    /// Midpoint between `self` and `other`.
    #[must_use]
    pub fn midpoint(&self, other: &Self) -> Self {
        &(self + other) / 2.0
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Returns `true` if every coordinate is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.is_finite())
    }
}

impl Index<usize> for Point {
    type Output = f64;

    fn index(&self, axis: usize) -> &f64 {
        &self.0[axis]
    }
}

impl Add for &Point {
    type Output = Point;

    fn add(self, other: Self) -> Point {
        Point(self.0.iter().zip(&other.0).map(|(a, b)| a + b).collect())
    }
}

impl Sub for &Point {
    type Output = Point;

    fn sub(self, other: Self) -> Point {
        Point(self.0.iter().zip(&other.0).map(|(a, b)| a - b).collect())
    }
}

impl Mul<f64> for &Point {
    type Output = Point;

    fn mul(self, scalar: f64) -> Point {
        Point(self.0.iter().map(|a| a * scalar).collect())
    }
}

impl Div<f64> for &Point {
    type Output = Point;

    fn div(self, scalar: f64) -> Point {
        self * (1.0 / scalar)
    }
}

/// A position paired with the field value there.
///
/// A `NaN` value means the field is undefined at this position. That is a
/// normal state for a sample, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Where the field was evaluated.
    pub pos: Point,
    /// Field value at `pos`, `NaN` if evaluation failed.
    pub value: f64,
}

impl Sample {
    /// Create a sample from a known value.
    #[must_use]
    pub const fn new(pos: Point, value: f64) -> Self {
        Self { pos, value }
    }

    /// Evaluate `field` at `pos`.
    pub fn evaluate<F: ScalarField + ?Sized>(pos: Point, field: &F) -> Self {
        let value = field.eval(pos.coords());
        Self { pos, value }
    }

    /// `value > 0`: the "outside" of the curve.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.value > 0.0
    }

    /// `value <= 0`: the "inside" of the curve. `NaN` is neither.
    #[must_use]
    pub fn is_non_positive(&self) -> bool {
        self.value <= 0.0
    }

    /// Returns `true` if the field was undefined here.
    #[must_use]
    pub const fn is_undefined(&self) -> bool {
        self.value.is_nan()
    }
}

/// Three-way sign with `0` for zero and `NaN`.
pub(crate) fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// A sequence of connected points forming one traced curve.
///
/// Closed curves repeat their first point as their last.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns `true` for a loop: at least two points and the last point
    /// repeats the first.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.len() >= 2 && self.first() == self.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Axis-aligned search box.
///
/// Construction validates that both corners share a dimension in
/// `1..=MAX_DIMENSION` and that every axis has finite `min < max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds", into = "RawBounds")]
pub struct Bounds {
    min: Point,
    max: Point,
}

#[derive(Serialize, Deserialize)]
struct RawBounds {
    min: Point,
    max: Point,
}

impl TryFrom<RawBounds> for Bounds {
    type Error = IsolineError;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        Self::new(raw.min, raw.max)
    }
}

impl From<Bounds> for RawBounds {
    fn from(bounds: Bounds) -> Self {
        Self {
            min: bounds.min,
            max: bounds.max,
        }
    }
}

impl Bounds {
    /// Create a box from its minimum and maximum corners.
    ///
    /// # Errors
    ///
    /// Returns [`IsolineError::DimensionMismatch`] if the corners have
    /// different lengths, [`IsolineError::UnsupportedDimension`] for a
    /// zero or too-large dimension, and [`IsolineError::DegenerateBounds`]
    /// if an axis is non-finite or empty.
    pub fn new(min: Point, max: Point) -> Result<Self, IsolineError> {
        if min.dim() != max.dim() {
            return Err(IsolineError::DimensionMismatch {
                min: min.dim(),
                max: max.dim(),
            });
        }
        if min.dim() == 0 || min.dim() > MAX_DIMENSION {
            return Err(IsolineError::UnsupportedDimension(min.dim()));
        }
        for (axis, (&lo, &hi)) in min.coords().iter().zip(max.coords()).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo >= hi {
                return Err(IsolineError::DegenerateBounds {
                    axis,
                    min: lo,
                    max: hi,
                });
            }
        }
        Ok(Self { min, max })
    }

    /// Create a 2D box.
    ///
    /// # Errors
    ///
    /// Returns [`IsolineError::DegenerateBounds`] if either axis is
    /// non-finite or empty.
    pub fn xy(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<Self, IsolineError> {
        Self::new(Point::xy(x_min, y_min), Point::xy(x_max, y_max))
    }

    /// Minimum corner.
    #[must_use]
    pub const fn min(&self) -> &Point {
        &self.min
    }

    /// Maximum corner.
    #[must_use]
    pub const fn max(&self) -> &Point {
        &self.max
    }

    /// Number of axes.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.min.dim()
    }

    /// Edge length along every axis.
    #[must_use]
    pub fn span(&self) -> Point {
        &self.max - &self.min
    }

    /// Returns `true` if `p` lies inside the box, boundary included.
    #[must_use]
    pub fn contains(&self, p: &Point) -> bool {
        p.dim() == self.dim()
            && p
                .coords()
                .iter()
                .zip(self.min.coords().iter().zip(self.max.coords()))
                .all(|(c, (lo, hi))| (lo..=hi).contains(&c))
    }
}

/// Result of running the engine with its intermediate structures kept.
///
/// Useful for debugging and visualization: the refinement tree and the
/// dual triangulation that produced the curves.
#[derive(Debug, Clone)]
pub struct IsolineResult {
    /// The refined quadtree.
    pub tree: Quadtree,
    /// Dual triangles with their `next`/`prev` chain links.
    pub triangles: Vec<Triangle>,
    /// Traced curves.
    pub curves: Vec<Polyline>,
    /// Per-axis tolerance actually used.
    pub tolerance: Vec<f64>,
}

/// Errors raised for malformed engine inputs.
///
/// Numerical trouble inside the algorithm (undefined samples, failed
/// interpolation, unmatched edges) never surfaces here; it only leaves
/// gaps in the output.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum IsolineError {
    /// The two box corners have different dimensions.
    #[error("box corners have different dimensions ({min} vs {max})")]
    DimensionMismatch {
        /// Dimension of the minimum corner.
        min: usize,
        /// Dimension of the maximum corner.
        max: usize,
    },

    /// The dimension is not handled by the requested operation.
    #[error("unsupported dimension {0}")]
    UnsupportedDimension(usize),

    /// An axis of the box is non-finite or empty.
    #[error("degenerate bounds on axis {axis}: min={min}, max={max}")]
    DegenerateBounds {
        /// Offending axis.
        axis: usize,
        /// Lower bound on that axis.
        min: f64,
        /// Upper bound on that axis.
        max: f64,
    },

    /// The tolerance array does not have one entry per axis.
    #[error("tolerance has {actual} entries, expected {expected}")]
    ToleranceLength {
        /// Box dimension.
        expected: usize,
        /// Number of tolerance entries supplied.
        actual: usize,
    },

    /// A tolerance entry is not a finite positive number.
    #[error("tolerance on axis {axis} must be finite and positive, got {value}")]
    InvalidTolerance {
        /// Offending axis.
        axis: usize,
        /// Supplied value.
        value: f64,
    },

    /// Any other configuration problem.
    #[error("invalid isoline configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Point tests ---

    #[test]
    fn point_arithmetic() {
        let a = Point::xy(1.0, 2.0);
        let b = Point::xy(3.0, -4.0);
        assert_eq!(&a + &b, Point::xy(4.0, -2.0));
        assert_eq!(&b - &a, Point::xy(2.0, -6.0));
        assert_eq!(&a * 2.0, Point::xy(2.0, 4.0));
        assert_eq!(&b / 2.0, Point::xy(1.5, -2.0));
    }

    #[test]
    fn point_midpoint_and_lerp() {
        let a = Point::xy(0.0, 0.0);
        let b = Point::xy(2.0, 4.0);
        assert_eq!(a.midpoint(&b), Point::xy(1.0, 2.0));
        let q = a.lerp(&b, 0.25);
        assert!((q.x() - 0.5).abs() < 1e-12);
        assert!((q.y() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn point_distance() {
        let a = Point::xy(0.0, 0.0);
        let b = Point::xy(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn point_accessors_on_short_points() {
        let p = Point::new(vec![7.0]);
        assert!((p.x() - 7.0).abs() < f64::EPSILON);
        assert!(p.y().is_nan());
        assert_eq!(p.dim(), 1);
    }

    #[test]
    fn point_serializes_as_array() {
        let json = serde_json::to_string(&Point::xy(1.5, -2.0)).unwrap();
        assert_eq!(json, "[1.5,-2.0]");
    }

    // --- Sample tests ---

    #[test]
    fn sample_sign_classes() {
        let pos = Sample::new(Point::xy(0.0, 0.0), 1.0);
        let zero = Sample::new(Point::xy(0.0, 0.0), 0.0);
        let nan = Sample::new(Point::xy(0.0, 0.0), f64::NAN);
        assert!(pos.is_positive() && !pos.is_non_positive());
        assert!(!zero.is_positive() && zero.is_non_positive());
        assert!(!nan.is_positive() && !nan.is_non_positive());
        assert!(nan.is_undefined());
    }

    #[test]
    fn sample_evaluate_calls_field() {
        let field = |p: &[f64]| p[0] * 10.0 + p[1];
        let s = Sample::evaluate(Point::xy(2.0, 3.0), &field);
        assert!((s.value - 23.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sign_treats_nan_as_zero() {
        assert_eq!(sign(2.0), 1);
        assert_eq!(sign(-0.5), -1);
        assert_eq!(sign(0.0), 0);
        assert_eq!(sign(f64::NAN), 0);
    }

    // --- Polyline tests ---

    #[test]
    fn polyline_closed_detection() {
        let open = Polyline::new(vec![Point::xy(0.0, 0.0), Point::xy(1.0, 0.0)]);
        let closed = Polyline::new(vec![
            Point::xy(0.0, 0.0),
            Point::xy(1.0, 0.0),
            Point::xy(0.0, 0.0),
        ]);
        let single = Polyline::new(vec![Point::xy(0.0, 0.0)]);
        assert!(!open.is_closed());
        assert!(closed.is_closed());
        assert!(!single.is_closed());
    }

    #[test]
    fn polyline_empty() {
        let pl = Polyline::new(vec![]);
        assert!(pl.is_empty());
        assert_eq!(pl.len(), 0);
        assert!(pl.first().is_none());
        assert!(pl.last().is_none());
    }

    // --- Bounds tests ---

    #[test]
    fn bounds_rejects_mismatched_dimensions() {
        let err = Bounds::new(Point::xy(0.0, 0.0), Point::new(vec![1.0])).unwrap_err();
        assert_eq!(err, IsolineError::DimensionMismatch { min: 2, max: 1 });
    }

    #[test]
    fn bounds_rejects_empty_axis() {
        let err = Bounds::xy(0.0, 1.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, IsolineError::DegenerateBounds { axis: 1, .. }));
    }

    #[test]
    fn bounds_rejects_non_finite() {
        let err = Bounds::xy(f64::NEG_INFINITY, 0.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, IsolineError::DegenerateBounds { axis: 0, .. }));
    }

    #[test]
    fn bounds_rejects_zero_dimension() {
        let err = Bounds::new(Point::new(vec![]), Point::new(vec![])).unwrap_err();
        assert_eq!(err, IsolineError::UnsupportedDimension(0));
    }

    #[test]
    fn bounds_span_and_contains() {
        let b = Bounds::xy(-1.0, -2.0, 3.0, 2.0).unwrap();
        assert_eq!(b.span(), Point::xy(4.0, 4.0));
        assert!(b.contains(&Point::xy(0.0, 0.0)));
        assert!(b.contains(&Point::xy(3.0, 2.0)));
        assert!(!b.contains(&Point::xy(3.1, 0.0)));
    }

    #[test]
    fn bounds_deserialize_validates() {
        let ok: Bounds = serde_json::from_str(r#"{"min":[0.0,0.0],"max":[1.0,1.0]}"#).unwrap();
        assert_eq!(ok.dim(), 2);
        let bad = serde_json::from_str::<Bounds>(r#"{"min":[1.0,0.0],"max":[0.0,1.0]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn error_display_mentions_axis() {
        let err = IsolineError::InvalidTolerance {
            axis: 1,
            value: -0.5,
        };
        assert!(err.to_string().contains("axis 1"));
    }
}
