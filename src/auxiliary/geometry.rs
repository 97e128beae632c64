//! Geometrical helpers for lattices and fractional coordinates.
//!
//! A lattice is represented by a [`Matrix3`] whose *columns* are the three lattice vectors
//! $`\mathbf{a}_1, \mathbf{a}_2, \mathbf{a}_3`$ in Cartesian coordinates, so that the Cartesian
//! position of a point with fractional coordinates $`\mathbf{x}`$ is $`\mathbf{M}\mathbf{x}`$.

use anyhow::format_err;
use nalgebra::{Matrix3, Vector3};

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod geometry_tests;

// =================
// Utility functions
// =================

/// Assembles a lattice matrix from three lattice vectors.
#[must_use]
pub fn lattice_matrix(vectors: &[Vector3<f64>; 3]) -> Matrix3<f64> {
    Matrix3::from_columns(vectors)
}

/// Splits a lattice matrix into its three lattice vectors.
#[must_use]
pub fn lattice_vectors(matrix: &Matrix3<f64>) -> [Vector3<f64>; 3] {
    [
        matrix.column(0).into_owned(),
        matrix.column(1).into_owned(),
        matrix.column(2).into_owned(),
    ]
}

/// Returns the triple product $`\mathbf{a}_1 \cdot (\mathbf{a}_2 \times \mathbf{a}_3)`$.
#[must_use]
pub fn triple_product(vectors: &[Vector3<f64>; 3]) -> f64 {
    vectors[0].dot(&vectors[1].cross(&vectors[2]))
}

/// Ensures that three lattice vectors form a right-handed set by negating all of them if their
/// triple product is negative.
///
/// # Returns
///
/// `true` if the vectors were already right-handed, `false` if they have been negated.
pub fn right_hand_sense(vectors: &mut [Vector3<f64>; 3]) -> bool {
    if triple_product(vectors) < 0.0 {
        vectors.iter_mut().for_each(|v| *v = -*v);
        false
    } else {
        true
    }
}

/// Inverts a lattice matrix.
///
/// # Errors
///
/// Errors if the lattice is singular.
pub fn invert_lattice(matrix: &Matrix3<f64>) -> Result<Matrix3<f64>, anyhow::Error> {
    matrix
        .try_inverse()
        .ok_or_else(|| format_err!("Lattice matrix {matrix} is singular."))
}

/// Converts a Cartesian position to fractional coordinates given the inverse lattice matrix.
#[must_use]
pub fn cartesian_to_fractional(
    inverse_lattice: &Matrix3<f64>,
    position: &Vector3<f64>,
) -> Vector3<f64> {
    inverse_lattice * position
}

/// Converts fractional coordinates to a Cartesian position.
#[must_use]
pub fn fractional_to_cartesian(lattice: &Matrix3<f64>, position: &Vector3<f64>) -> Vector3<f64> {
    lattice * position
}

/// Returns the reciprocal-lattice matrix $`\mathbf{N} = \mathbf{M}^{-\mathsf{T}}`$ whose columns
/// $`\mathbf{b}_j`$ satisfy $`\mathbf{a}_i \cdot \mathbf{b}_j = \delta_{ij}`$. No factor of
/// $`2\pi`$ is included.
///
/// # Errors
///
/// Errors if the lattice is singular.
pub fn reciprocal_matrix(lattice: &Matrix3<f64>) -> Result<Matrix3<f64>, anyhow::Error> {
    Ok(invert_lattice(lattice)?.transpose())
}

/// Returns the cosine of the angle between two vectors.
#[must_use]
pub fn cosine(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    u.dot(v) / (u.norm() * v.norm())
}
