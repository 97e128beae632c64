//! Filtering of lattice point operations against the atomic decoration.

use std::cmp::Ordering;
use std::fmt;

use itertools::Itertools;
use log;
use nalgebra::{Matrix3, Vector3};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::symmetry::symmetry_operation::{SymmetryOperation, MAX_SYMMETRY_OPERATIONS};
use crate::symmetry::tolerance::Tolerance;

#[cfg(test)]
#[path = "space_group_tests.rs"]
mod space_group_tests;

// ==================
// Struct definitions
// ==================

// ---------------
// PositionLookup
// ---------------

/// A per-species table of fractional positions sorted by their first component, allowing
/// periodic matches to be found by a binary search over a window of width $`2\epsilon`$.
#[derive(Clone, Debug)]
pub(crate) struct PositionLookup {
    /// The wrapped positions, sorted by their first component.
    positions: Vec<Vector3<f64>>,

    /// The first components of [`Self::positions`].
    keys: Vec<f64>,
}

impl PositionLookup {
    /// Constructs a lookup table from positions already wrapped into $`[-0.5, 0.5)`$.
    pub(crate) fn new(positions: &[Vector3<f64>]) -> Self {
        let positions = positions
            .iter()
            .copied()
            .sorted_by_key(|x| OrderedFloat(x[0]))
            .collect_vec();
        let keys = positions.iter().map(|x| x[0]).collect_vec();
        Self { positions, keys }
    }

    fn len(&self) -> usize {
        self.positions.len()
    }

    /// Index ranges of the positions whose first component lies within $`\epsilon`$ of `x`,
    /// including the periodic images across the $`\pm 0.5`$ boundary.
    fn windows(&self, x: f64, tol: Tolerance) -> Vec<std::ops::Range<usize>> {
        let eps = tol.epsilon;
        let window = |centre: f64| {
            let lo = self.keys.partition_point(|k| *k < centre - eps);
            let hi = self.keys.partition_point(|k| *k <= centre + eps);
            lo..hi
        };
        let mut ranges = vec![window(x)];
        if x - eps < -0.5 {
            ranges.push(window(x + 1.0));
        }
        if x + eps >= 0.5 {
            ranges.push(window(x - 1.0));
        }
        ranges
    }

    /// Finds an unused position periodically equal to `target`, marks it as used and returns
    /// `true`, or returns `false` if none exists.
    fn claim(&self, target: &Vector3<f64>, used: &mut [bool], tol: Tolerance) -> bool {
        let found = self
            .windows(target[0], tol)
            .into_iter()
            .flatten()
            .find(|&i| !used[i] && tol.periodic_equal(&self.positions[i], target));
        if let Some(i) = found {
            used[i] = true;
            true
        } else {
            false
        }
    }

    /// Checks if a set of positions, shifted by `translation`, coincides with the positions of
    /// this table as a multiset.
    pub(crate) fn matches(
        &self,
        images: &[Vector3<f64>],
        translation: &Vector3<f64>,
        tol: Tolerance,
    ) -> bool {
        if images.len() != self.len() {
            return false;
        }
        let mut used = vec![false; self.len()];
        images.iter().all(|x| {
            let target = tol.wrap_position_vector(&(x + translation));
            self.claim(&target, &mut used, tol)
        })
    }
}

/// Returns the index of the species (or magnetic sub-type) with the fewest atoms, which serves as
/// the anchor for generating trial translations.
pub(crate) fn anchor_species(positions: &[Vec<Vector3<f64>>]) -> Option<usize> {
    positions
        .iter()
        .enumerate()
        .filter(|(_, sp)| !sp.is_empty())
        .min_by_key(|(_, sp)| sp.len())
        .map(|(i, _)| i)
}

// ---------------------
// SpaceGroupOperations
// ---------------------

/// The operations of a space group: `nrot` pure point operations followed by the operations
/// carrying a non-lattice fractional translation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpaceGroupOperations {
    /// All operations, pure rotations first.
    pub operations: Vec<SymmetryOperation>,

    /// The number of leading operations with zero translation.
    pub nrot: usize,
}

impl SpaceGroupOperations {
    /// Total number of operations.
    #[must_use]
    pub fn nrotk(&self) -> usize {
        self.operations.len()
    }

    /// The pure point operations.
    #[must_use]
    pub fn point_operations(&self) -> &[SymmetryOperation] {
        &self.operations[..self.nrot]
    }

    /// The rotation parts of all operations.
    #[must_use]
    pub fn rotations(&self) -> Vec<Matrix3<f64>> {
        self.operations.iter().map(|op| op.rotation).collect_vec()
    }

    /// The translation parts of all operations.
    #[must_use]
    pub fn translations(&self) -> Vec<Vector3<f64>> {
        self.operations.iter().map(|op| op.translation).collect_vec()
    }

    /// Exports the operations into a table of exactly [`MAX_SYMMETRY_OPERATIONS`] entries, the
    /// unused tail being filled with all-zero placeholders.
    #[must_use]
    pub fn padded(&self) -> Vec<SymmetryOperation> {
        self.operations
            .iter()
            .copied()
            .chain(std::iter::repeat(SymmetryOperation::zero()))
            .take(MAX_SYMMETRY_OPERATIONS)
            .collect_vec()
    }
}

impl fmt::Display for SpaceGroupOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.operations.iter().enumerate() {
            writeln!(
                f,
                "Operation {:>2}{}",
                i + 1,
                if i < self.nrot { "" } else { " (with translation)" }
            )?;
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

// =========
// Functions
// =========

/// Determines whether a rotation, combined with some fractional translation, maps the structure
/// onto itself.
///
/// Trial translations are generated by mapping the first rotated atom of the anchor species onto
/// every atom of that species. A trial is only examined if it is lexicographically smaller than
/// the best translation found so far, so that the smallest valid translation in $`[0, 1)^3`$ is
/// returned.
///
/// # Arguments
///
/// * `rotation` - The rotation in the basis of the positions.
/// * `positions` - Fractional positions grouped by species, wrapped into $`[-0.5, 0.5)`$.
/// * `lookups` - The lookup tables built from `positions`.
/// * `tol` - The comparison tolerance.
///
/// # Returns
///
/// The smallest valid translation, or `None` if the rotation is not a symmetry of the structure.
pub(crate) fn checksym_with_lookups(
    rotation: &Matrix3<f64>,
    positions: &[Vec<Vector3<f64>>],
    lookups: &[PositionLookup],
    tol: Tolerance,
) -> Option<Vector3<f64>> {
    let Some(anchor) = anchor_species(positions) else {
        return Some(Vector3::zeros());
    };
    let rotated = positions
        .iter()
        .map(|sp| {
            sp.iter()
                .map(|x| tol.wrap_position_vector(&(rotation * x)))
                .collect_vec()
        })
        .collect_vec();

    let mut best: Option<Vector3<f64>> = None;
    for x_i in positions[anchor].iter() {
        let trial = tol.translation_between(&rotated[anchor][0], x_i);
        if let Some(current) = best {
            if tol.lexicographic_cmp(&trial, &current) != Ordering::Less {
                continue;
            }
        }
        let valid = rotated
            .iter()
            .zip(lookups.iter())
            .all(|(images, lookup)| lookup.matches(images, &trial, tol));
        if valid {
            best = Some(trial);
        }
    }
    best
}

/// Determines whether a rotation, combined with some fractional translation, maps the structure
/// onto itself. See [`getgroup`] for the meaning of the arguments.
///
/// # Returns
///
/// The smallest valid translation in $`[0, 1)^3`$, or `None`.
#[must_use]
pub fn checksym(
    rotation: &Matrix3<f64>,
    positions: &[Vec<Vector3<f64>>],
    tol: Tolerance,
) -> Option<Vector3<f64>> {
    let lookups = positions
        .iter()
        .map(|sp| PositionLookup::new(sp))
        .collect_vec();
    checksym_with_lookups(rotation, positions, &lookups, tol)
}

/// Filters a pool of point operations down to the space group of a structure.
///
/// # Arguments
///
/// * `pool` - Candidate rotations, normally the holohedry of the lattice, in the basis of the
///   positions.
/// * `positions` - Fractional positions grouped by species (or magnetic sub-type), wrapped into
///   $`[-0.5, 0.5)`$.
/// * `tol` - The comparison tolerance.
///
/// # Returns
///
/// The accepted operations, pure rotations first, each group in pool order. An empty result is
/// valid.
#[must_use]
pub fn getgroup(
    pool: &[Matrix3<f64>],
    positions: &[Vec<Vector3<f64>>],
    tol: Tolerance,
) -> SpaceGroupOperations {
    let lookups = positions
        .iter()
        .map(|sp| PositionLookup::new(sp))
        .collect_vec();
    let (pure, translated): (Vec<_>, Vec<_>) = pool
        .iter()
        .filter_map(|w| {
            checksym_with_lookups(w, positions, &lookups, tol)
                .map(|t| SymmetryOperation::new(*w, t))
        })
        .partition(|op| op.is_point_operation(tol));
    let nrot = pure.len();
    let operations = pure
        .into_iter()
        .map(|op| SymmetryOperation::from_rotation(op.rotation))
        .chain(translated)
        .collect_vec();
    log::debug!(
        "{} of {} point operations accepted ({nrot} without translation).",
        operations.len(),
        pool.len()
    );
    SpaceGroupOperations { operations, nrot }
}
