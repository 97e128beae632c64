//! Lattice holohedries and identification of crystallographic point groups.

use std::fmt;

use anyhow::{self, ensure, format_err};
use counter::Counter;
use itertools::Itertools;
use log;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::auxiliary::geometry::{cosine, lattice_matrix, right_hand_sense};
use crate::symmetry::bravais::BravaisType;
use crate::symmetry::lattice_search::get_shortest_latvec;
use crate::symmetry::symmetry_operation::{gmatrix_convert_int, MAX_SYMMETRY_OPERATIONS};
use crate::symmetry::tolerance::Tolerance;

#[cfg(test)]
#[path = "point_group_tests.rs"]
mod point_group_tests;

// ================
// Enum definitions
// ================

/// An enumerated type classifying crystallographic rotations and rotoinversions by their
/// Hermann–Mauguin symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RotationKind {
    /// $`\bar{6}`$, *i.e.* $`S_3`$.
    RotoInversion6,
    /// $`\bar{4}`$, *i.e.* $`S_4`$.
    RotoInversion4,
    /// $`\bar{3}`$, *i.e.* $`S_6`$.
    RotoInversion3,
    /// $`\bar{2}`$, *i.e.* a mirror plane.
    Mirror,
    /// $`\bar{1}`$, *i.e.* the inversion.
    Inversion,
    /// The identity.
    Identity,
    /// Two-fold rotation.
    Rotation2,
    /// Three-fold rotation.
    Rotation3,
    /// Four-fold rotation.
    Rotation4,
    /// Six-fold rotation.
    Rotation6,
}

impl RotationKind {
    /// All kinds, in the column order of the point-group signature table.
    pub const ALL: [RotationKind; 10] = [
        RotationKind::RotoInversion6,
        RotationKind::RotoInversion4,
        RotationKind::RotoInversion3,
        RotationKind::Mirror,
        RotationKind::Inversion,
        RotationKind::Identity,
        RotationKind::Rotation2,
        RotationKind::Rotation3,
        RotationKind::Rotation4,
        RotationKind::Rotation6,
    ];

    /// Classifies an integer-valued rotation matrix by its determinant and trace.
    ///
    /// # Errors
    ///
    /// Errors if the matrix is not a crystallographic rotation or rotoinversion.
    pub fn from_rotation(rotation: &Matrix3<f64>) -> Result<Self, anyhow::Error> {
        let det = rotation.determinant().round();
        let trace = rotation.trace().round();
        let kind = if det > 0.0 {
            match trace as i64 {
                3 => RotationKind::Identity,
                -1 => RotationKind::Rotation2,
                0 => RotationKind::Rotation3,
                1 => RotationKind::Rotation4,
                2 => RotationKind::Rotation6,
                _ => return Err(format_err!("Invalid proper rotation with trace {trace}.")),
            }
        } else {
            match trace as i64 {
                -3 => RotationKind::Inversion,
                1 => RotationKind::Mirror,
                0 => RotationKind::RotoInversion3,
                -1 => RotationKind::RotoInversion4,
                -2 => RotationKind::RotoInversion6,
                _ => return Err(format_err!("Invalid improper rotation with trace {trace}.")),
            }
        };
        Ok(kind)
    }
}

// ==================
// Struct definitions
// ==================

/// One of the 32 crystallographic point groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrystallographicPointGroup {
    /// The conventional number of the group, from 1 ($`C_1`$) to 32 ($`O_h`$).
    pub number: usize,

    /// The Schoenflies symbol.
    pub schoenflies: String,

    /// The Hermann–Mauguin symbol.
    pub hermann_mauguin: String,

    /// The order of the group.
    pub order: usize,
}

impl fmt::Display for CrystallographicPointGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, #{}, order {})",
            self.schoenflies, self.hermann_mauguin, self.number, self.order
        )
    }
}

/// Number of operations of each [`RotationKind`] (in [`RotationKind::ALL`] order) for every
/// crystallographic point group.
const POINT_GROUP_SIGNATURES: [(&str, &str, [usize; 10]); 32] = [
    ("C1", "1", [0, 0, 0, 0, 0, 1, 0, 0, 0, 0]),
    ("Ci", "-1", [0, 0, 0, 0, 1, 1, 0, 0, 0, 0]),
    ("C2", "2", [0, 0, 0, 0, 0, 1, 1, 0, 0, 0]),
    ("Cs", "m", [0, 0, 0, 1, 0, 1, 0, 0, 0, 0]),
    ("C2h", "2/m", [0, 0, 0, 1, 1, 1, 1, 0, 0, 0]),
    ("D2", "222", [0, 0, 0, 0, 0, 1, 3, 0, 0, 0]),
    ("C2v", "mm2", [0, 0, 0, 2, 0, 1, 1, 0, 0, 0]),
    ("D2h", "mmm", [0, 0, 0, 3, 1, 1, 3, 0, 0, 0]),
    ("C4", "4", [0, 0, 0, 0, 0, 1, 1, 0, 2, 0]),
    ("S4", "-4", [0, 2, 0, 0, 0, 1, 1, 0, 0, 0]),
    ("C4h", "4/m", [0, 2, 0, 1, 1, 1, 1, 0, 2, 0]),
    ("D4", "422", [0, 0, 0, 0, 0, 1, 5, 0, 2, 0]),
    ("C4v", "4mm", [0, 0, 0, 4, 0, 1, 1, 0, 2, 0]),
    ("D2d", "-42m", [0, 2, 0, 2, 0, 1, 3, 0, 0, 0]),
    ("D4h", "4/mmm", [0, 2, 0, 5, 1, 1, 5, 0, 2, 0]),
    ("C3", "3", [0, 0, 0, 0, 0, 1, 0, 2, 0, 0]),
    ("S6", "-3", [0, 0, 2, 0, 1, 1, 0, 2, 0, 0]),
    ("D3", "32", [0, 0, 0, 0, 0, 1, 3, 2, 0, 0]),
    ("C3v", "3m", [0, 0, 0, 3, 0, 1, 0, 2, 0, 0]),
    ("D3d", "-3m", [0, 0, 2, 3, 1, 1, 3, 2, 0, 0]),
    ("C6", "6", [0, 0, 0, 0, 0, 1, 1, 2, 0, 2]),
    ("C3h", "-6", [2, 0, 0, 1, 0, 1, 0, 2, 0, 0]),
    ("C6h", "6/m", [2, 0, 2, 1, 1, 1, 1, 2, 0, 2]),
    ("D6", "622", [0, 0, 0, 0, 0, 1, 7, 2, 0, 2]),
    ("C6v", "6mm", [0, 0, 0, 6, 0, 1, 1, 2, 0, 2]),
    ("D3h", "-62m", [2, 0, 0, 4, 0, 1, 3, 2, 0, 0]),
    ("D6h", "6/mmm", [2, 0, 2, 7, 1, 1, 7, 2, 0, 2]),
    ("T", "23", [0, 0, 0, 0, 0, 1, 3, 8, 0, 0]),
    ("Th", "m-3", [0, 0, 8, 3, 1, 1, 3, 8, 0, 0]),
    ("O", "432", [0, 0, 0, 0, 0, 1, 9, 8, 6, 0]),
    ("Td", "-43m", [0, 6, 0, 6, 0, 1, 3, 8, 0, 0]),
    ("Oh", "m-3m", [0, 6, 8, 9, 1, 1, 9, 8, 6, 0]),
];

// =========
// Functions
// =========

/// Identifies the crystallographic point group formed by a set of rotations from the number of
/// rotations of each kind.
///
/// # Returns
///
/// The point group, or `None` if the set does not match any of the 32 crystallographic point
/// groups (*e.g.* because precision loss dropped some operations) or contains a
/// non-crystallographic matrix.
#[must_use]
pub fn pointgroup(rotations: &[Matrix3<f64>]) -> Option<CrystallographicPointGroup> {
    let kinds = rotations
        .iter()
        .map(RotationKind::from_rotation)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    let tally = kinds.into_iter().collect::<Counter<RotationKind>>();
    let signature = RotationKind::ALL.map(|kind| tally[&kind]);
    POINT_GROUP_SIGNATURES
        .iter()
        .position(|(_, _, sig)| *sig == signature)
        .map(|i| {
            let (schoenflies, hermann_mauguin, sig) = POINT_GROUP_SIGNATURES[i];
            CrystallographicPointGroup {
                number: i + 1,
                schoenflies: schoenflies.to_string(),
                hermann_mauguin: hermann_mauguin.to_string(),
                order: sig.iter().sum(),
            }
        })
}

/// Checks if a candidate set of basis-vector images preserves all lengths and inter-vector angles
/// of a basis.
fn preserves_metric(
    basis: &[Vector3<f64>; 3],
    images: &[Vector3<f64>; 3],
    tol: Tolerance,
) -> bool {
    (0..3).all(|i| tol.equal(images[i].norm(), basis[i].norm()))
        && [(0, 1), (1, 2), (2, 0)].iter().all(|&(i, j)| {
            tol.equal(cosine(&images[i], &images[j]), cosine(&basis[i], &basis[j]))
        })
}

/// Generates the holohedry of a lattice, *i.e.* all integer rotations (proper and improper)
/// that map the lattice onto itself.
///
/// The lattice is first reduced with [`get_shortest_latvec`]. For each reduced basis vector, all
/// lattice vectors with integer coordinates in $`[-2, 2]`$ and the same length are collected;
/// every triple of such images that preserves the inter-vector angles defines one operation.
/// The operations are returned in the basis of `lattice`, with the identity first.
///
/// # Arguments
///
/// * `lattice` - The lattice matrix (columns are lattice vectors), normally the optimised one.
/// * `bravais` - The Bravais type of the lattice, used to check the number of operations found.
/// * `tol` - The comparison tolerance.
///
/// # Returns
///
/// The rotation matrices of the holohedry in the basis of `lattice`.
///
/// # Errors
///
/// Errors if the lattice is singular, or if the tolerance is so loose that more point operations
/// than any lattice can have are found.
pub fn setgroup(
    lattice: &Matrix3<f64>,
    bravais: BravaisType,
    tol: Tolerance,
) -> Result<Vec<Matrix3<f64>>, anyhow::Error> {
    let mut reduced = [
        lattice.column(0).into_owned(),
        lattice.column(1).into_owned(),
        lattice.column(2).into_owned(),
    ];
    get_shortest_latvec(&mut reduced, tol);
    right_hand_sense(&mut reduced);
    let reduced_lattice = lattice_matrix(&reduced);

    let coefficient_range = -2..=2_i64;
    let lattice_points = coefficient_range
        .clone()
        .cartesian_product(coefficient_range.clone())
        .cartesian_product(coefficient_range)
        .map(|((x, y), z)| Vector3::new(x as f64, y as f64, z as f64))
        .filter(|n| n.iter().any(|x| *x != 0.0))
        .collect_vec();
    let candidates = reduced
        .iter()
        .map(|a| {
            lattice_points
                .iter()
                .filter(|n| tol.equal((reduced_lattice * *n).norm(), a.norm()))
                .copied()
                .collect_vec()
        })
        .collect_vec();

    let mut rotations = candidates[0]
        .iter()
        .cartesian_product(candidates[1].iter())
        .cartesian_product(candidates[2].iter())
        .filter_map(|((n1, n2), n3)| {
            let images = [
                reduced_lattice * *n1,
                reduced_lattice * *n2,
                reduced_lattice * *n3,
            ];
            if preserves_metric(&reduced, &images, tol) {
                let w_reduced = Matrix3::from_columns(&[*n1, *n2, *n3]);
                Some(gmatrix_convert_int(&w_reduced, &reduced_lattice, lattice))
            } else {
                None
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(pos) = rotations
        .iter()
        .position(|w| *w == Matrix3::identity())
    {
        rotations[..=pos].rotate_right(1);
    }
    ensure!(
        rotations.len() <= MAX_SYMMETRY_OPERATIONS,
        "{} point operations found for a {} lattice, but a lattice cannot have more than \
        {MAX_SYMMETRY_OPERATIONS}. The tolerance {:.3e} is too loose.",
        rotations.len(),
        bravais.name(),
        tol.epsilon
    );

    match bravais.holohedry_order() {
        Some(order) if order != rotations.len() => log::warn!(
            "The holohedry of a {} lattice should have {order} operations, but {} have been found.",
            bravais.name(),
            rotations.len()
        ),
        _ => log::debug!(
            "{} point operations found for a {} lattice.",
            rotations.len(),
            bravais.name()
        ),
    }
    Ok(rotations)
}
