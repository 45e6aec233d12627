//! Engine configuration and resolution presets.

use serde::{Deserialize, Serialize};

use crate::types::{Bounds, IsolineError};

/// Selects a resolution preset for [`IsolineConfig::for_point_budget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QualityMode {
    /// Balanced resolution for interactive plotting.
    #[default]
    Normal,
    /// Very coarse resolution for fast redraws.
    Performance,
}

/// Configuration for [`plot_isoline`](crate::plot_isoline).
///
/// # Invariants
///
/// Checked by [`validate`](Self::validate) before any work is done:
/// `min_depth <= MAX_MIN_DEPTH`, `max_cells >= 1`, and when a tolerance
/// is given it has one finite positive entry per axis of the box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolineConfig {
    /// Refinement levels forced everywhere, regardless of sign changes.
    pub min_depth: u32,

    /// Soft cap on the number of leaf cells. Raised automatically to
    /// `2^(dim * min_depth)` so that `min_depth` can always be met.
    pub max_cells: usize,

    /// Per-axis absolute tolerance. `None` means `(max - min) / 1000`
    /// on every axis.
    pub tolerance: Option<Vec<f64>>,
}

impl IsolineConfig {
    /// Default forced refinement depth.
    pub const DEFAULT_MIN_DEPTH: u32 = 5;

    /// Default leaf budget.
    pub const DEFAULT_MAX_CELLS: usize = 10_000;

    /// Largest accepted `min_depth`.
    ///
    /// A 2D tree forced to this depth already holds `4^12` (about 16.7
    /// million) leaves.
    pub const MAX_MIN_DEPTH: u32 = 12;

    /// Divisor of the box span used for the default tolerance.
    pub const DEFAULT_TOLERANCE_DIVISOR: f64 = 1000.0;

    /// Derive `min_depth` and `max_cells` from a desired point count.
    ///
    /// The presets trade resolution for speed: [`QualityMode::Performance`]
    /// keeps the tree shallow and small, [`QualityMode::Normal`] scales
    /// with the budget within sane limits.
    #[must_use]
    pub fn for_point_budget(point_count: usize, mode: QualityMode) -> Self {
        let (min_depth, max_cells) = match mode {
            QualityMode::Performance => (
                depth_from_budget(point_count / 500, 1, 3),
                point_count.clamp(100, 2000),
            ),
            QualityMode::Normal => (
                depth_from_budget(point_count / 200, 3, 6),
                point_count.saturating_mul(5).clamp(1000, 20_000),
            ),
        };
        Self {
            min_depth,
            max_cells,
            tolerance: None,
        }
    }

    /// Resolve the per-axis tolerance for `bounds`, applying the default
    /// when none was given. Does not validate.
    #[must_use]
    pub fn resolved_tolerance(&self, bounds: &Bounds) -> Vec<f64> {
        self.tolerance.clone().unwrap_or_else(|| {
            bounds
                .span()
                .coords()
                .iter()
                .map(|s| s / Self::DEFAULT_TOLERANCE_DIVISOR)
                .collect()
        })
    }

    /// Check the configuration against `bounds` and return the tolerance
    /// to use.
    ///
    /// # Errors
    ///
    /// Returns [`IsolineError::InvalidConfig`] if `min_depth` exceeds
    /// [`MAX_MIN_DEPTH`](Self::MAX_MIN_DEPTH) or `max_cells` is zero,
    /// [`IsolineError::ToleranceLength`] if the tolerance does not have
    /// one entry per axis, and [`IsolineError::InvalidTolerance`] for a
    /// non-finite or non-positive entry.
    pub fn validate(&self, bounds: &Bounds) -> Result<Vec<f64>, IsolineError> {
        check_min_depth(self.min_depth)?;
        if self.max_cells == 0 {
            return Err(IsolineError::InvalidConfig(
                "max_cells must be at least 1".to_string(),
            ));
        }
        let tolerance = self.resolved_tolerance(bounds);
        check_tolerance(&tolerance, bounds.dim())?;
        Ok(tolerance)
    }
}

impl Default for IsolineConfig {
    fn default() -> Self {
        Self {
            min_depth: Self::DEFAULT_MIN_DEPTH,
            max_cells: Self::DEFAULT_MAX_CELLS,
            tolerance: None,
        }
    }
}

/// Check that `tolerance` has `dim` finite positive entries.
pub(crate) fn check_min_depth(min_depth: u32) -> Result<(), IsolineError> {
    if min_depth > IsolineConfig::MAX_MIN_DEPTH {
        return Err(IsolineError::InvalidConfig(format!(
            "min_depth {min_depth} exceeds the maximum of {}",
            IsolineConfig::MAX_MIN_DEPTH
        )));
    }
    Ok(())
}

pub(crate) fn check_tolerance(tolerance: &[f64], dim: usize) -> Result<(), IsolineError> {
    if tolerance.len() != dim {
        return Err(IsolineError::ToleranceLength {
            expected: dim,
            actual: tolerance.len(),
        });
    }
    for (axis, &value) in tolerance.iter().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(IsolineError::InvalidTolerance { axis, value });
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn depth_from_budget(quotient: usize, lo: u32, hi: u32) -> u32 {
    quotient.clamp(lo as usize, hi as usize) as u32
}
