//! Crystallographic symmetry operations and their basis conversions.

use std::fmt;

use anyhow::{self, format_err};
use itertools::Itertools;
use nalgebra::{Matrix3, Vector3};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::auxiliary::geometry::{invert_lattice, reciprocal_matrix};
use crate::symmetry::tolerance::Tolerance;

#[cfg(test)]
#[path = "symmetry_operation_tests.rs"]
mod symmetry_operation_tests;

/// The maximum number of operations in any crystallographic point group, and hence the capacity
/// of every operation pool.
pub const MAX_SYMMETRY_OPERATIONS: usize = 48;

// ==================
// Struct definitions
// ==================

/// A space-group operation $`\{\mathbf{W} | \mathbf{t}\}`$ acting on fractional coordinates as
/// $`\mathbf{x}' = \mathbf{W}\mathbf{x} + \mathbf{t}`$.
///
/// The rotation part is integer-valued in any lattice basis but is stored as floating-point
/// values so that it can be transformed between bases.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymmetryOperation {
    /// The rotation part $`\mathbf{W}`$.
    pub rotation: Matrix3<f64>,

    /// The fractional translation part $`\mathbf{t}`$.
    pub translation: Vector3<f64>,
}

impl SymmetryOperation {
    /// Creates a new operation.
    #[must_use]
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Creates a point operation with zero translation.
    #[must_use]
    pub fn from_rotation(rotation: Matrix3<f64>) -> Self {
        Self::new(rotation, Vector3::zeros())
    }

    /// The identity operation.
    #[must_use]
    pub fn identity() -> Self {
        Self::from_rotation(Matrix3::identity())
    }

    /// The all-zero placeholder used to pad fixed-capacity operation tables.
    #[must_use]
    pub fn zero() -> Self {
        Self::new(Matrix3::zeros(), Vector3::zeros())
    }

    /// Applies this operation to fractional coordinates.
    #[must_use]
    pub fn apply(&self, x: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * x + self.translation
    }

    /// Checks if the translation part is a lattice translation.
    #[must_use]
    pub fn is_point_operation(&self, tol: Tolerance) -> bool {
        tol.is_lattice_translation(&self.translation)
    }

    /// The determinant of the rotation part.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.rotation.determinant()
    }

    /// Returns the rotation part rounded to integers.
    ///
    /// # Errors
    ///
    /// Errors if an entry cannot be represented as an `i64`.
    pub fn integer_rotation(&self) -> Result<Matrix3<i64>, anyhow::Error> {
        round_matrix(&self.rotation)
    }

    /// Re-expresses this operation in another lattice basis. See [`gmatrix_convert_int`] and
    /// [`gtrans_convert`].
    ///
    /// # Errors
    ///
    /// Errors if either lattice is singular.
    pub fn convert_basis(
        &self,
        from: &Matrix3<f64>,
        to: &Matrix3<f64>,
    ) -> Result<Self, anyhow::Error> {
        Ok(Self::new(
            gmatrix_convert_int(&self.rotation, from, to)?,
            gtrans_convert(&self.translation, from, to)?,
        ))
    }
}

impl fmt::Display for SymmetryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..3 {
            writeln!(
                f,
                "  {:>3} {:>3} {:>3}  | {:>+10.6}",
                self.rotation[(i, 0)].round(),
                self.rotation[(i, 1)].round(),
                self.rotation[(i, 2)].round(),
                self.translation[i],
            )?;
        }
        Ok(())
    }
}

// =========
// Functions
// =========

/// Rounds every entry of a real matrix to the nearest integer.
///
/// # Errors
///
/// Errors if an entry cannot be represented as an `i64`.
pub fn round_matrix(mat: &Matrix3<f64>) -> Result<Matrix3<i64>, anyhow::Error> {
    let entries = mat
        .iter()
        .map(|x| {
            x.round()
                .to_i64()
                .ok_or_else(|| format_err!("Unable to convert `{x}` to `i64`."))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Matrix3::from_column_slice(&entries))
}

/// Re-expresses a rotation given in lattice basis $`\mathbf{A}`$ in lattice basis
/// $`\mathbf{B}`$:
///
/// ```math
/// \mathbf{W}_B = \mathbf{B}^{-1} \mathbf{A} \mathbf{W}_A \mathbf{A}^{-1} \mathbf{B}.
/// ```
///
/// # Errors
///
/// Errors if either lattice is singular.
pub fn gmatrix_convert(
    rotation: &Matrix3<f64>,
    from: &Matrix3<f64>,
    to: &Matrix3<f64>,
) -> Result<Matrix3<f64>, anyhow::Error> {
    Ok(invert_lattice(to)? * from * rotation * invert_lattice(from)? * to)
}

/// Same as [`gmatrix_convert`], but with the result rounded to the nearest integers. This is
/// exact whenever the two bases describe the same lattice.
///
/// # Errors
///
/// Errors if either lattice is singular.
pub fn gmatrix_convert_int(
    rotation: &Matrix3<f64>,
    from: &Matrix3<f64>,
    to: &Matrix3<f64>,
) -> Result<Matrix3<f64>, anyhow::Error> {
    Ok(gmatrix_convert(rotation, from, to)?.map(f64::round))
}

/// Re-expresses a fractional translation given in lattice basis $`\mathbf{A}`$ in lattice basis
/// $`\mathbf{B}`$, *i.e.* $`\mathbf{t}_B = \mathbf{B}^{-1} \mathbf{A} \mathbf{t}_A`$.
///
/// # Errors
///
/// Errors if the target lattice is singular.
pub fn gtrans_convert(
    translation: &Vector3<f64>,
    from: &Matrix3<f64>,
    to: &Matrix3<f64>,
) -> Result<Vector3<f64>, anyhow::Error> {
    Ok(invert_lattice(to)? * from * translation)
}

/// Converts a rotation given in a direct lattice basis into the corresponding rotation of
/// reciprocal-lattice coordinates (Miller indices), rounded to integers.
///
/// # Errors
///
/// Errors if the lattice is singular.
pub fn reciprocal_rotation(
    rotation: &Matrix3<f64>,
    lattice: &Matrix3<f64>,
) -> Result<Matrix3<f64>, anyhow::Error> {
    gmatrix_convert_int(rotation, lattice, &reciprocal_matrix(lattice)?)
}

/// Finds, for every rotation in a list, the index of its inverse in the same list.
///
/// # Returns
///
/// A vector whose $`i`$-th entry is the index $`j`$ with $`\mathbf{W}_i \mathbf{W}_j =
/// \mathbf{E}`$, or `None` if the inverse of $`\mathbf{W}_i`$ is absent.
#[must_use]
pub fn gmatrix_invmap(rotations: &[Matrix3<f64>], tol: Tolerance) -> Vec<Option<usize>> {
    let identity = Matrix3::<f64>::identity();
    rotations
        .iter()
        .map(|wi| {
            rotations.iter().position(|wj| {
                (wi * wj)
                    .iter()
                    .zip(identity.iter())
                    .all(|(a, b)| tol.equal(*a, *b))
            })
        })
        .collect_vec()
}
