//! Tolerance-aware numerical predicates for periodic geometry.
//!
//! Every comparison performed during lattice classification and space-group detection goes
//! through a [`Tolerance`] value, which is passed explicitly to the routines that need it. The
//! conventions used throughout the crate are:
//!
//! - fractional atomic positions live in the half-open interval $`[-0.5, 0.5)`$, with any
//!   coordinate within the tolerance of $`\pm 0.5`$ mapped onto $`-0.5`$;
//! - fractional translations live in $`[0, 1)`$, with any component within half the tolerance of
//!   $`1`$ mapped onto $`0`$.

use std::cmp::Ordering;
use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "tolerance_tests.rs"]
mod tolerance_tests;

/// A structure holding the numerical tolerance $`\epsilon`$ used for all geometric comparisons
/// during one symmetry-analysis pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// The absolute tolerance for comparisons.
    pub epsilon: f64,
}

impl Tolerance {
    /// Creates a new tolerance.
    ///
    /// # Panics
    ///
    /// Panics if `epsilon` is not a positive finite number.
    #[must_use]
    pub fn new(epsilon: f64) -> Self {
        assert!(
            epsilon.is_finite() && epsilon > 0.0,
            "Tolerance `{epsilon}` is invalid. The tolerance must be positive and finite."
        );
        Self { epsilon }
    }

    /// Returns a new tolerance whose value is scaled by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.epsilon * factor)
    }

    /// Checks if `x` and `y` differ by less than $`\epsilon`$.
    #[must_use]
    pub fn equal(&self, x: f64, y: f64) -> bool {
        (x - y).abs() < self.epsilon
    }

    /// Checks if two vectors are component-wise equal.
    #[must_use]
    pub fn equal_vectors(&self, x: &Vector3<f64>, y: &Vector3<f64>) -> bool {
        x.iter().zip(y.iter()).all(|(a, b)| self.equal(*a, *b))
    }

    /// Maps a fractional coordinate lying on the cell boundary ($`\pm 0.5`$ within tolerance) onto
    /// $`-0.5`$.
    #[must_use]
    pub fn check_boundary(&self, x: f64) -> f64 {
        if self.equal(x, -0.5) || self.equal(x, 0.5) {
            -0.5
        } else {
            x
        }
    }

    /// Wraps a fractional coordinate into $`[-0.5, 0.5)`$ and applies
    /// [`Self::check_boundary`].
    #[must_use]
    pub fn wrap_position(&self, x: f64) -> f64 {
        self.check_boundary(x - (x + 0.5).floor())
    }

    /// Wraps all three components of a fractional position. See [`Self::wrap_position`].
    #[must_use]
    pub fn wrap_position_vector(&self, x: &Vector3<f64>) -> Vector3<f64> {
        x.map(|xi| self.wrap_position(xi))
    }

    /// Wraps a fractional translation component into $`[0, 1)`$. Values within half the tolerance
    /// of $`1`$ are mapped onto $`0`$.
    #[must_use]
    pub fn wrap_translation(&self, t: f64) -> f64 {
        let t = t - t.floor();
        if (t - 1.0).abs() < self.epsilon * 0.5 {
            0.0
        } else {
            t
        }
    }

    /// Returns the translation $`\mathbf{t} = \mathbf{x}_2 - \mathbf{x}_1`$ wrapped into
    /// $`[0, 1)^3`$.
    #[must_use]
    pub fn translation_between(&self, x1: &Vector3<f64>, x2: &Vector3<f64>) -> Vector3<f64> {
        (x2 - x1).map(|t| self.wrap_translation(t))
    }

    /// Returns the periodic difference $`x_1 - x_2`$ reduced to the nearest integer, *i.e.* a
    /// value in $`[-0.5, 0.5]`$.
    #[must_use]
    pub fn periodic_difference(&self, x1: f64, x2: f64) -> f64 {
        let d = x1 - x2;
        d - d.round()
    }

    /// Checks if two fractional positions coincide modulo lattice translations.
    #[must_use]
    pub fn periodic_equal(&self, x1: &Vector3<f64>, x2: &Vector3<f64>) -> bool {
        x1.iter()
            .zip(x2.iter())
            .all(|(a, b)| self.periodic_difference(*a, *b).abs() < self.epsilon)
    }

    /// Checks if a fractional translation is a pure lattice translation.
    #[must_use]
    pub fn is_lattice_translation(&self, t: &Vector3<f64>) -> bool {
        self.periodic_equal(t, &Vector3::zeros())
    }

    /// Compares two vectors lexicographically, treating components within tolerance as equal.
    #[must_use]
    pub fn lexicographic_cmp(&self, x: &Vector3<f64>, y: &Vector3<f64>) -> Ordering {
        x.iter()
            .zip(y.iter())
            .find(|(a, b)| !self.equal(**a, **b))
            .map_or(Ordering::Equal, |(a, b)| a.total_cmp(b))
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3e}", self.epsilon)
    }
}
