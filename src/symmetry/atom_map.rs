//! Images of atoms under symmetry operations.

use itertools::Itertools;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::symmetry::symmetry_operation::SymmetryOperation;
use crate::symmetry::tolerance::Tolerance;

#[cfg(test)]
#[path = "atom_map_tests.rs"]
mod atom_map_tests;

/// For every operation and every atom (global species-major index), the global index of the image
/// atom, or `None` if no atom of the same species sits at the image position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtomMap(pub Vec<Vec<Option<usize>>>);

impl AtomMap {
    /// The number of operations covered by this map.
    #[must_use]
    pub fn n_operations(&self) -> usize {
        self.0.len()
    }

    /// The image of atom `iat` under operation `iop`.
    #[must_use]
    pub fn image(&self, iop: usize, iat: usize) -> Option<usize> {
        self.0.get(iop).and_then(|row| row.get(iat).copied().flatten())
    }

    /// Checks if every operation maps every atom onto some atom.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.0.iter().flatten().all(Option::is_some)
    }
}

/// Builds the atom map of a set of operations.
///
/// # Arguments
///
/// * `operations` - The operations, in the basis of `positions`.
/// * `positions` - Fractional positions grouped by species.
/// * `tol` - The comparison tolerance.
#[must_use]
pub fn set_atom_map(
    operations: &[SymmetryOperation],
    positions: &[Vec<Vector3<f64>>],
    tol: Tolerance,
) -> AtomMap {
    let wrapped = positions
        .iter()
        .map(|sp| sp.iter().map(|x| tol.wrap_position_vector(x)).collect_vec())
        .collect_vec();
    let starts = wrapped
        .iter()
        .scan(0, |acc, sp| {
            let start = *acc;
            *acc += sp.len();
            Some(start)
        })
        .collect_vec();
    let rows = operations
        .iter()
        .map(|op| {
            wrapped
                .iter()
                .zip(starts.iter())
                .flat_map(|(sp, start)| {
                    sp.iter().map(move |x| {
                        let image = tol.wrap_position_vector(&op.apply(x));
                        sp.iter()
                            .position(|y| tol.periodic_equal(y, &image))
                            .map(|ja| start + ja)
                    })
                })
                .collect_vec()
        })
        .collect_vec();
    AtomMap(rows)
}
