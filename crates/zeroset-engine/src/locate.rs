//! Zero-crossing locator: bisection plus linear interpolation.
//!
//! All functions take [`Sample`]s and a field and return new, evaluated
//! samples. Sign classes follow the engine convention: `value > 0` is
//! outside, `value <= 0` is inside, and `NaN` is neither.

use crate::field::ScalarField;
use crate::types::{Sample, sign};

/// Fraction of an edge's length at which [`edge_dual`] probes a
/// same-class edge for a hidden pair of crossings.
pub const PROBE_FRACTION: f64 = 0.01;

/// Interpolated values at or above this magnitude are treated as a
/// numeric blow-up rather than a root.
pub const BLOWUP_LIMIT: f64 = 1e200;

/// Upper bound on halvings in [`bisect`]. Each step halves the bracket,
/// so this is only reached when the tolerance is far below the
/// precision of the coordinates.
pub const MAX_BISECTION_STEPS: usize = 64;

/// Outcome of [`bisect`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bisection {
    /// Best estimate of the crossing.
    pub sample: Sample,
    /// Whether `sample` is accepted as a root.
    pub is_zero: bool,
}

/// Evaluate the field halfway between `p1` and `p2`.
pub fn midpoint<F: ScalarField + ?Sized>(p1: &Sample, p2: &Sample, field: &F) -> Sample {
    Sample::evaluate(p1.pos.midpoint(&p2.pos), field)
}

/// Linear estimate of the zero of the field between `p1` and `p2`,
/// evaluated.
///
/// Uses weights `-v2 / (v1 - v2)` on `p1` and `v1 / (v1 - v2)` on `p2`.
/// Returns `None` when the weights are not finite (equal or undefined
/// endpoint values).
pub fn intersect_zero<F: ScalarField + ?Sized>(
    p1: &Sample,
    p2: &Sample,
    field: &F,
) -> Option<Sample> {
    let denom = p1.value - p2.value;
    let k1 = -p2.value / denom;
    let k2 = p1.value / denom;
    if !k1.is_finite() || !k2.is_finite() {
        return None;
    }
    Some(Sample::evaluate(p1.pos.weighted_sum(k1, &p2.pos, k2), field))
}

/// Locate the crossing between `p1` and `p2` by bisection.
///
/// Halves the bracket, keeping the half whose far end differs in class
/// from the near end, until the endpoints are closer than `tolerance` on
/// every axis. The final bracket is resolved with [`intersect_zero`]; the
/// result is accepted when its value lies strictly between the endpoint
/// values (or is exactly zero) and stays below [`BLOWUP_LIMIT`]. A
/// midpoint that evaluates to exactly zero is returned immediately.
///
/// Callers pass an outside `p1` and an inside `p2`.
pub fn bisect<F: ScalarField + ?Sized>(
    p1: &Sample,
    p2: &Sample,
    field: &F,
    tolerance: &[f64],
) -> Bisection {
    let mut lo = p1.clone();
    let mut hi = p2.clone();

    for _ in 0..MAX_BISECTION_STEPS {
        if converged(&lo, &hi, tolerance) {
            break;
        }
        let mid = midpoint(&lo, &hi, field);
        if mid.value == 0.0 {
            return Bisection {
                sample: mid,
                is_zero: true,
            };
        }
        if mid.is_positive() == lo.is_positive() {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    match intersect_zero(&lo, &hi, field) {
        Some(sample) => {
            let v = sample.value;
            let is_zero = v == 0.0
                || (sign(v - lo.value) == sign(hi.value - v) && v.abs() < BLOWUP_LIMIT);
            Bisection { sample, is_zero }
        }
        None => Bisection {
            sample: lo,
            is_zero: false,
        },
    }
}

/// Representative point on the edge from `p1` to `p2` shared by two
/// cells.
///
/// Endpoints in opposite classes give the midpoint: the crossing on that
/// edge is found later by [`bisect`] between the endpoints and the edge
/// dual, which needs the dual to sit clear of the curve. Otherwise the
/// edge is probed [`PROBE_FRACTION`] in from each end: probes in the same
/// class give the midpoint, probes in different classes are interpolated
/// between. Falls back to the midpoint whenever interpolation is
/// impossible.
pub fn edge_dual<F: ScalarField + ?Sized>(p1: &Sample, p2: &Sample, field: &F) -> Sample {
    if p1.is_positive() != p2.is_positive() {
        return midpoint(p1, p2, field);
    }

    let probe1 = Sample::evaluate(p1.pos.lerp(&p2.pos, PROBE_FRACTION), field);
    let probe2 = Sample::evaluate(p1.pos.lerp(&p2.pos, 1.0 - PROBE_FRACTION), field);
    if probe1.is_positive() == probe2.is_positive() {
        return midpoint(p1, p2, field);
    }
    intersect_zero(&probe1, &probe2, field).unwrap_or_else(|| midpoint(p1, p2, field))
}

fn converged(lo: &Sample, hi: &Sample, tolerance: &[f64]) -> bool {
    lo.pos
        .coords()
        .iter()
        .zip(hi.pos.coords())
        .zip(tolerance)
        .all(|((a, b), t)| (b - a).abs() < *t)
}
