//! Search for the most symmetric setting of a lattice.
//!
//! The classifier in [`crate::symmetry::bravais`] only recognises a lattice in its canonical
//! setting. This module reduces a lattice to short vectors, enumerates all unimodular integer
//! transformations with small entries, and keeps the basis that classifies to the most symmetric
//! Bravais type.

use std::cmp::Ordering;
use std::fmt;

use anyhow;
use itertools::Itertools;
use log;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::auxiliary::geometry::{lattice_matrix, right_hand_sense};
use crate::auxiliary::structure::Structure;
use crate::symmetry::bravais::{standard_lat, BravaisType, CellConstants};
use crate::symmetry::tolerance::Tolerance;

#[cfg(test)]
#[path = "lattice_search_tests.rs"]
mod lattice_search_tests;

/// The range of each integer entry of the enumerated basis transformations.
const TRANSFORM_ENTRY_RANGE: std::ops::RangeInclusive<i64> = -2..=2;

// ==================
// Struct definitions
// ==================

// ---------------------
// UnimodularTransforms
// ---------------------

/// An iterator over all integer $`3 \times 3`$ matrices with entries in $`[-2, 2]`$ and
/// determinant $`+1`$.
///
/// Matrices are visited in a fixed order: the first row varies fastest (with its first entry
/// varying fastest within the row) and the third row slowest. Before any first row is tried, the
/// cofactor vector $`\mathbf{r}_2 \times \mathbf{r}_3`$ of the current second and third rows is
/// computed, and the whole block of first rows is skipped unless the components of this cofactor
/// are coprime, since otherwise no first row can give a unit determinant.
pub struct UnimodularTransforms {
    rows: Vec<Vector3<i64>>,
    i1: usize,
    i2: usize,
    i3: usize,
    cofactor: Option<Vector3<i64>>,
}

impl UnimodularTransforms {
    /// Creates a new generator positioned before the first matrix.
    #[must_use]
    pub fn new() -> Self {
        let rows = TRANSFORM_ENTRY_RANGE
            .cartesian_product(TRANSFORM_ENTRY_RANGE)
            .cartesian_product(TRANSFORM_ENTRY_RANGE)
            .map(|((z, y), x)| Vector3::new(x, y, z))
            .collect_vec();
        Self {
            rows,
            i1: 0,
            i2: 0,
            i3: 0,
            cofactor: None,
        }
    }

    /// Advances to the next pair of second and third rows whose cofactor admits a unit
    /// determinant. Returns `false` once all pairs are exhausted.
    fn advance_block(&mut self) -> bool {
        let n = self.rows.len();
        while self.i3 < n {
            if self.cofactor.is_none() {
                let cofactor = self.rows[self.i2].cross(&self.rows[self.i3]);
                if gcd3(&cofactor) == 1 {
                    self.cofactor = Some(cofactor);
                    self.i1 = 0;
                    return true;
                }
            } else {
                return true;
            }
            self.next_block();
        }
        false
    }

    fn next_block(&mut self) {
        self.cofactor = None;
        self.i2 += 1;
        if self.i2 == self.rows.len() {
            self.i2 = 0;
            self.i3 += 1;
        }
    }
}

impl Default for UnimodularTransforms {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for UnimodularTransforms {
    type Item = Matrix3<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if !self.advance_block() {
                return None;
            }
            let cofactor = self.cofactor?;
            while self.i1 < self.rows.len() {
                let r1 = self.rows[self.i1];
                self.i1 += 1;
                if r1.dot(&cofactor) == 1 {
                    let (r2, r3) = (self.rows[self.i2], self.rows[self.i3]);
                    return Some(Matrix3::from_rows(&[
                        r1.transpose(),
                        r2.transpose(),
                        r3.transpose(),
                    ]));
                }
            }
            self.next_block();
        }
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a.abs()
    } else {
        gcd(b, a % b)
    }
}

fn gcd3(v: &Vector3<i64>) -> i64 {
    gcd(gcd(v[0], v[1]), v[2])
}

// --------------
// OptimalLattice
// --------------

/// The outcome of the search for the most symmetric setting of a lattice.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimalLattice {
    /// The lattice vectors of the best setting found.
    pub vectors: [Vector3<f64>; 3],

    /// The integer transformation whose rows give the best vectors in terms of the searched
    /// vectors.
    pub transform: Matrix3<i64>,

    /// The Bravais type of the best setting.
    pub bravais: BravaisType,

    /// The cell constants of the best setting.
    pub constants: CellConstants,
}

// ---------------------
// LatticeClassification
// ---------------------

/// The outcome of the lattice-type pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatticeClassification {
    /// The input lattice vectors after handedness normalisation.
    pub input_vectors: [Vector3<f64>; 3],

    /// The Bravais type obtained by classifying the input vectors as they are.
    pub input_bravais: BravaisType,

    /// The cell constants obtained by classifying the input vectors as they are.
    pub input_constants: CellConstants,

    /// The adopted lattice vectors.
    pub vectors: [Vector3<f64>; 3],

    /// The Bravais type of the adopted lattice.
    pub bravais: BravaisType,

    /// The cell constants of the adopted lattice.
    pub constants: CellConstants,

    /// Boolean indicating if the adopted lattice differs from the input one.
    pub changed: bool,
}

impl LatticeClassification {
    /// The adopted lattice matrix whose columns are the adopted lattice vectors.
    #[must_use]
    pub fn lattice(&self) -> Matrix3<f64> {
        lattice_matrix(&self.vectors)
    }
}

impl fmt::Display for LatticeClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bravais type as given: {}", self.input_bravais)?;
        writeln!(f, "Bravais type found   : {}", self.bravais)?;
        writeln!(f, "Cell constants       : {}", self.constants)?;
        writeln!(
            f,
            "Lattice vectors {}:",
            if self.changed { "changed" } else { "kept" }
        )?;
        for (i, v) in self.vectors.iter().enumerate() {
            writeln!(
                f,
                "  a{} = ({:>+12.7}, {:>+12.7}, {:>+12.7})",
                i + 1,
                v[0],
                v[1],
                v[2]
            )?;
        }
        Ok(())
    }
}

// =========
// Functions
// =========

/// Reduces three lattice vectors pairwise until none of them can be shortened by adding or
/// subtracting another.
///
/// Each directed pair $`(\mathbf{v}_i, \mathbf{v}_j)`$ is visited in the order $`(1,2), (1,3),
/// (2,1), (2,3), (3,1), (3,2)`$; $`\mathbf{v}_i`$ is replaced by $`\mathbf{v}_i - \mathbf{v}_j`$
/// while this shortens it by more than the tolerance, then by $`\mathbf{v}_i + \mathbf{v}_j`$
/// likewise. The cycle is repeated until a full pass changes nothing.
pub fn get_shortest_latvec(vectors: &mut [Vector3<f64>; 3], tol: Tolerance) {
    const PAIRS: [(usize, usize); 6] = [(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)];
    let mut changed = true;
    while changed {
        changed = false;
        for (i, j) in PAIRS {
            let vj = vectors[j];
            let vi = &mut vectors[i];
            let mut len = vi.norm();
            while (*vi - vj).norm() < len - tol.epsilon {
                *vi -= vj;
                len = vi.norm();
                changed = true;
            }
            while (*vi + vj).norm() < len - tol.epsilon {
                *vi += vj;
                len = vi.norm();
                changed = true;
            }
        }
    }
}

/// Compares the tie-break keys of two settings of the same Bravais type. Settings whose cosines
/// are closer to zero come first, then settings with smaller lengths and ratios.
fn tie_break_cmp(candidate: &CellConstants, incumbent: &CellConstants, tol: Tolerance) -> Ordering {
    let key = |c: &CellConstants| {
        [
            c.cosines().iter().map(|x| x.abs()).sum::<f64>(),
            c.0[0],
            c.0[1],
            c.0[2],
        ]
    };
    key(candidate)
        .iter()
        .zip(key(incumbent).iter())
        .find(|(a, b)| !tol.equal(**a, **b))
        .map_or(Ordering::Equal, |(a, b)| a.total_cmp(b))
}

/// Searches all unimodular transformations of a lattice with entries in $`[-2, 2]`$ for the
/// setting that classifies to the most symmetric Bravais type.
///
/// A candidate replaces the incumbent if its type code is lower, or if the codes are equal and
/// the candidate wins the tie-break on cell constants. The first setting found is kept among
/// settings that tie within tolerance.
///
/// # Arguments
///
/// * `vectors` - The lattice vectors to transform, ideally pre-reduced by
/// [`get_shortest_latvec`] and right-handed.
/// * `tol` - The comparison tolerance.
///
/// # Returns
///
/// The best setting found. Its vectors are the transformed vectors *before* any relabelling
/// by the classifier.
#[must_use]
pub fn get_optlat(vectors: &[Vector3<f64>; 3], tol: Tolerance) -> OptimalLattice {
    let mut best = OptimalLattice {
        vectors: *vectors,
        transform: Matrix3::identity(),
        bravais: BravaisType::Undetermined,
        constants: CellConstants::default(),
    };
    let mut n_candidates = 0_usize;
    for transform in UnimodularTransforms::new() {
        n_candidates += 1;
        let candidate: [Vector3<f64>; 3] = [0, 1, 2].map(|i| {
            vectors[0] * transform[(i, 0)] as f64
                + vectors[1] * transform[(i, 1)] as f64
                + vectors[2] * transform[(i, 2)] as f64
        });
        let mut scratch = candidate;
        let (bravais, constants) = standard_lat(&mut scratch, tol);
        let better = match bravais.cmp(&best.bravais) {
            Ordering::Less => true,
            Ordering::Equal if bravais != BravaisType::Undetermined => {
                tie_break_cmp(&constants, &best.constants, tol) == Ordering::Less
            }
            _ => false,
        };
        if better {
            best = OptimalLattice {
                vectors: candidate,
                transform,
                bravais,
                constants,
            };
        }
    }
    log::debug!(
        "Optimal-lattice search visited {n_candidates} unimodular transformations; best type: {}.",
        best.bravais
    );
    best
}

/// Determines the Bravais type of a lattice, adopting a more symmetric setting if one exists.
///
/// The input vectors are first made right-handed and classified as they are. They are then
/// reduced with [`get_shortest_latvec`] and searched with [`get_optlat`]. The optimal setting is
/// adopted if its type is more symmetric or its cell constants differ from the as-is ones;
/// otherwise the (right-handed) input vectors are kept. Feeding the adopted vectors back in
/// reproduces them.
///
/// # Arguments
///
/// * `vectors` - The input lattice vectors.
/// * `tol` - The comparison tolerance.
///
/// # Returns
///
/// The classification outcome.
#[must_use]
pub fn lattice_type(vectors: &[Vector3<f64>; 3], tol: Tolerance) -> LatticeClassification {
    let mut input_vectors = *vectors;
    right_hand_sense(&mut input_vectors);

    let mut scratch = input_vectors;
    let (input_bravais, input_constants) = standard_lat(&mut scratch, tol);

    let mut reduced = input_vectors;
    get_shortest_latvec(&mut reduced, tol);
    right_hand_sense(&mut reduced);
    let optimal = get_optlat(&reduced, tol);

    let changed = optimal.bravais < input_bravais
        || !optimal.constants.approx_eq(&input_constants, tol);
    if changed {
        LatticeClassification {
            input_vectors,
            input_bravais,
            input_constants,
            vectors: optimal.vectors,
            bravais: optimal.bravais,
            constants: optimal.constants,
            changed,
        }
    } else {
        LatticeClassification {
            input_vectors,
            input_bravais,
            input_constants,
            vectors: input_vectors,
            bravais: input_bravais,
            constants: input_constants,
            changed,
        }
    }
}

/// Runs [`lattice_type`] on the lattice of a structure and re-expresses the atomic positions as
/// fractional coordinates of the adopted lattice, wrapped into $`[-0.5, 0.5)`$.
///
/// # Errors
///
/// Errors if the adopted lattice is singular.
pub fn lattice_type_with_atoms(
    structure: &Structure,
    tol: Tolerance,
) -> Result<(LatticeClassification, Vec<Vec<Vector3<f64>>>), anyhow::Error> {
    let classification = lattice_type(structure.lattice_vectors(), tol);
    let positions = structure
        .fractional_positions_in(&classification.lattice())?
        .into_iter()
        .map(|sp| {
            sp.iter()
                .map(|x| tol.wrap_position_vector(x))
                .collect_vec()
        })
        .collect_vec();
    Ok((classification, positions))
}
