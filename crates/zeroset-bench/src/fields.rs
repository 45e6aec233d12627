//! Built-in catalogue of scalar fields.

use clap::ValueEnum;

/// A named scalar field with a box that frames its zero set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Unit circle: one closed curve.
    Circle,
    /// Diagonal line: one open curve from corner to corner.
    Line,
    /// Rectangular hyperbola: two open branches.
    Hyperbola,
    /// Lemniscate of Bernoulli: a figure eight crossing itself at the origin.
    Lemniscate,
    /// Heart curve with a cusp at the top.
    Heart,
    /// Periodic pattern with many components.
    Waves,
    /// Undefined outside the unit disc, zero on a smaller circle.
    Punctured,
}

impl Preset {
    /// Human-readable expression of the field.
    pub const fn expression(self) -> &'static str {
        match self {
            Self::Circle => "x^2 + y^2 - 1",
            Self::Line => "y - x",
            Self::Hyperbola => "x*y - 0.5",
            Self::Lemniscate => "(x^2 + y^2)^2 - 2*(x^2 - y^2)",
            Self::Heart => "(x^2 + y^2 - 1)^3 - x^2*y^3",
            Self::Waves => "sin(x)*cos(y) - 0.2",
            Self::Punctured => "sqrt(1 - x^2 - y^2) - 0.5",
        }
    }

    /// Default plotting box as `[x_min, y_min, x_max, y_max]`.
    pub const fn default_bounds(self) -> [f64; 4] {
        match self {
            Self::Circle | Self::Hyperbola | Self::Lemniscate | Self::Punctured => {
                [-2.0, -2.0, 2.0, 2.0]
            }
            Self::Line => [-1.0, -1.0, 1.0, 1.0],
            Self::Heart => [-1.5, -1.5, 1.5, 1.5],
            Self::Waves => [-6.0, -6.0, 6.0, 6.0],
        }
    }

    /// Evaluate the field at `p = [x, y]`.
    ///
    /// [`Preset::Punctured`] returns `NaN` outside the unit disc.
    pub fn eval(self, p: &[f64]) -> f64 {
        let (x, y) = (p[0], p[1]);
        match self {
            Self::Circle => x.mul_add(x, y * y) - 1.0,
            Self::Line => y - x,
            Self::Hyperbola => x.mul_add(y, -0.5),
            Self::Lemniscate => {
                let r2 = x.mul_add(x, y * y);
                r2.mul_add(r2, -2.0 * (x * x - y * y))
            }
            Self::Heart => {
                let r2 = x.mul_add(x, y * y) - 1.0;
                r2.powi(3) - x * x * y.powi(3)
            }
            Self::Waves => x.sin().mul_add(y.cos(), -0.2),
            Self::Punctured => (1.0 - x.mul_add(x, y * y)).sqrt() - 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_vanish_on_known_points() {
        let cases = [
            (Preset::Circle, [1.0, 0.0]),
            (Preset::Line, [0.3, 0.3]),
            (Preset::Hyperbola, [1.0, 0.5]),
            (Preset::Lemniscate, [2.0_f64.sqrt(), 0.0]),
            (Preset::Heart, [0.0, 1.0]),
            (Preset::Waves, [0.2_f64.asin(), 0.0]),
            (Preset::Punctured, [0.75_f64.sqrt(), 0.0]),
        ];
        for (preset, p) in cases {
            let value = preset.eval(&p);
            assert!(value.abs() < 1e-12, "{preset:?} at {p:?} = {value}");
        }
    }

    #[test]
    fn punctured_is_undefined_outside_the_disc() {
        assert!(Preset::Punctured.eval(&[1.5, 0.0]).is_nan());
        assert!(Preset::Punctured.eval(&[0.0, 0.0]) > 0.0);
    }

    #[test]
    fn default_bounds_are_proper_boxes() {
        for preset in Preset::value_variants() {
            let [x_min, y_min, x_max, y_max] = preset.default_bounds();
            assert!(x_min < x_max && y_min < y_max, "{preset:?}");
        }
    }
}
