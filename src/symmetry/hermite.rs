//! Hermite normal form of integer $`3 \times 3`$ matrices.

use std::error::Error;
use std::fmt;

use nalgebra::Matrix3;
use num_traits::ToPrimitive;

use crate::symmetry::tolerance::Tolerance;

#[cfg(test)]
#[path = "hermite_tests.rs"]
mod hermite_tests;

#[derive(Debug, Clone)]
pub struct HermiteNormalFormError(pub String);

impl fmt::Display for HermiteNormalFormError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Hermite normal form error: {}", self.0)
    }
}

impl Error for HermiteNormalFormError {}

/// The lower-triangular Hermite normal form $`\mathbf{H}`$ of an integer matrix
/// $`\mathbf{S}`$, together with the unimodular matrix $`\mathbf{B}`$ of accumulated column
/// operations such that $`\mathbf{S}\mathbf{B} = \mathbf{H}`$.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HermiteNormalForm {
    /// The lower-triangular form, with positive diagonal entries and every off-diagonal entry of
    /// row $`i`$ reduced into $`[0, h_{ii})`$.
    pub h: Matrix3<i64>,

    /// The accumulated column operations.
    pub b: Matrix3<i64>,
}

impl HermiteNormalForm {
    /// The product of the diagonal entries of $`\mathbf{H}`$, *i.e.* $`|\det \mathbf{S}|`$.
    #[must_use]
    pub fn diagonal_product(&self) -> i64 {
        self.h[(0, 0)] * self.h[(1, 1)] * self.h[(2, 2)]
    }
}

fn swap_columns(m: &mut Matrix3<i64>, i: usize, j: usize) {
    if i != j {
        m.swap_columns(i, j);
    }
}

/// Subtracts `q` times column `src` from column `dst`.
fn column_axpy(m: &mut Matrix3<i64>, dst: usize, src: usize, q: i64) {
    for r in 0..3 {
        m[(r, dst)] -= q * m[(r, src)];
    }
}

fn negate_column(m: &mut Matrix3<i64>, i: usize) {
    for r in 0..3 {
        m[(r, i)] = -m[(r, i)];
    }
}

/// Computes the Hermite normal form of an integer matrix by exact column operations.
///
/// Row by row, the entries to the right of the diagonal are eliminated with Euclid's algorithm,
/// always taking the column with the smallest non-zero entry in the current row as pivot. The
/// diagonal entry is then made positive and the entries to its left are reduced modulo it.
///
/// # Errors
///
/// Errors if the matrix is singular.
pub fn hermite_normal_form_int(
    s: &Matrix3<i64>,
) -> Result<HermiteNormalForm, HermiteNormalFormError> {
    let mut h = *s;
    let mut b = Matrix3::<i64>::identity();
    for i in 0..3 {
        loop {
            let nonzero = (i..3).filter(|&j| h[(i, j)] != 0).collect::<Vec<_>>();
            let Some(&pivot) = nonzero.iter().min_by_key(|&&j| h[(i, j)].abs()) else {
                return Err(HermiteNormalFormError(format!(
                    "the matrix\n{s}is singular (zero pivot in row {i})."
                )));
            };
            swap_columns(&mut h, i, pivot);
            swap_columns(&mut b, i, pivot);
            if nonzero.len() == 1 {
                break;
            }
            for j in (i + 1)..3 {
                let q = h[(i, j)].div_euclid(h[(i, i)]);
                column_axpy(&mut h, j, i, q);
                column_axpy(&mut b, j, i, q);
            }
        }
        if h[(i, i)] < 0 {
            negate_column(&mut h, i);
            negate_column(&mut b, i);
        }
        for j in 0..i {
            let q = h[(i, j)].div_euclid(h[(i, i)]);
            column_axpy(&mut h, j, i, q);
            column_axpy(&mut b, j, i, q);
        }
    }
    Ok(HermiteNormalForm { h, b })
}

/// Computes the Hermite normal form of a real matrix whose entries should be integers.
///
/// # Errors
///
/// Errors if an entry differs from the nearest integer by more than $`10\epsilon`$, or if the
/// matrix is singular.
pub fn hermite_normal_form(
    s: &Matrix3<f64>,
    tol: Tolerance,
) -> Result<HermiteNormalForm, HermiteNormalFormError> {
    let threshold = 10.0 * tol.epsilon;
    let entries = s
        .iter()
        .map(|x| {
            let rounded = x.round();
            if (x - rounded).abs() > threshold {
                Err(HermiteNormalFormError(format!(
                    "entry `{x}` is not an integer within {threshold:.3e}."
                )))
            } else {
                rounded.to_i64().ok_or_else(|| {
                    HermiteNormalFormError(format!("entry `{x}` cannot be represented as `i64`."))
                })
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    hermite_normal_form_int(&Matrix3::from_column_slice(&entries))
}
