//! Scalar fields: the caller-supplied function whose zero level is traced.
//!
//! The engine's only contract with the field provider is [`ScalarField`]:
//! a pure function of the point that returns `NaN` where it is undefined
//! instead of failing. Any closure `Fn(&[f64]) -> f64` is a field.

use std::cell::Cell;

/// A scalar function `R^n -> R`.
///
/// Implementations must be deterministic: the same point always yields
/// the same value. Return `NaN` to mark a point where the field is
/// undefined.
pub trait ScalarField {
    /// Evaluate the field at `point` (one coordinate per axis).
    fn eval(&self, point: &[f64]) -> f64;
}

impl<F> ScalarField for F
where
    F: Fn(&[f64]) -> f64,
{
    fn eval(&self, point: &[f64]) -> f64 {
        self(point)
    }
}

/// Wraps a field and counts how often it is evaluated.
///
/// Used by the diagnostics to report per-stage evaluation cost.
pub struct CountingField<'a, F: ?Sized> {
    inner: &'a F,
    count: Cell<u64>,
}

impl<'a, F: ScalarField + ?Sized> CountingField<'a, F> {
    /// Start counting evaluations of `inner` from zero.
    pub const fn new(inner: &'a F) -> Self {
        Self {
            inner,
            count: Cell::new(0),
        }
    }

    /// Number of evaluations so far.
    pub fn count(&self) -> u64 {
        self.count.get()
    }
}

impl<F: ScalarField + ?Sized> ScalarField for CountingField<'_, F> {
    fn eval(&self, point: &[f64]) -> f64 {
        self.count.set(self.count.get() + 1);
        self.inner.eval(point)
    }
}
