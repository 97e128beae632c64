//! Symmetrisation of fields and per-atom quantities with a detected space group.
//!
//! All routines work on the caller's lattice basis: rotations, translations and internal
//! translations are taken from the input-basis parts of a
//! [`SymmetryAnalysis`](crate::symmetry::symmetry_core::SymmetryAnalysis), gathered into a
//! [`SymmetrisationGroup`].

use std::error::Error;
use std::fmt;

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::symmetry::symmetry_operation::{gmatrix_invmap, SymmetryOperation};
use crate::symmetry::tolerance::Tolerance;

mod density;
mod tensors;

pub use density::{rho_symmetry, rhog_symmetry, PlaneWaveGrid};
pub use tensors::{symmetrize_cartesian_vec3_nat, symmetrize_mat3, symmetrize_vec3_nat};


#[derive(Debug, Clone)]
pub struct SymmetrisationError(pub String);

impl fmt::Display for SymmetrisationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Symmetrisation error: {}", self.0)
    }
}

impl Error for SymmetrisationError {}

/// The parts of a space group needed for symmetrisation, all in the input lattice basis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymmetrisationGroup {
    /// The space-group operations.
    pub operations: Vec<SymmetryOperation>,

    /// The rotations of reciprocal-lattice coordinates, one per operation.
    pub kgmatrix: Vec<Matrix3<f64>>,

    /// The internal translations of the cell.
    pub ptrans: Vec<Vector3<f64>>,

    /// Whether the internal translations are to be included when symmetrising reciprocal-space
    /// fields.
    pub pricell_loop: bool,

    /// The tolerance of the analysis that produced the group.
    pub tolerance: Tolerance,
}

impl SymmetrisationGroup {
    /// The number of operations.
    #[must_use]
    pub fn nrotk(&self) -> usize {
        self.operations.len()
    }

    /// For each operation, the index of its inverse.
    pub(crate) fn invmap(&self) -> Vec<Option<usize>> {
        gmatrix_invmap(&self.kgmatrix, self.tolerance)
    }

    fn ensure_nonempty(&self) -> Result<(), SymmetrisationError> {
        if self.operations.is_empty() {
            Err(SymmetrisationError(
                "no symmetry operations are available.".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}
