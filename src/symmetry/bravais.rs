//! Bravais-lattice classification.

use std::fmt;

use anyhow::{self, bail};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::auxiliary::geometry::{cosine, right_hand_sense};
use crate::symmetry::tolerance::Tolerance;

#[cfg(test)]
#[path = "bravais_tests.rs"]
mod bravais_tests;

// ================
// Enum definitions
// ================

/// An enumerated type for the fourteen Bravais lattice types, plus a catch-all for lattices that
/// cannot be classified in the given setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BravaisType {
    CubicP,
    CubicI,
    CubicF,
    Hexagonal,
    TetragonalP,
    TetragonalI,
    Rhombohedral,
    OrthorhombicP,
    OrthorhombicI,
    OrthorhombicF,
    OrthorhombicC,
    MonoclinicP,
    MonoclinicA,
    Triclinic,
    Undetermined,
}

impl BravaisType {
    /// All fourteen proper Bravais types, in ascending order of their codes.
    pub const ALL: [BravaisType; 14] = [
        BravaisType::CubicP,
        BravaisType::CubicI,
        BravaisType::CubicF,
        BravaisType::Hexagonal,
        BravaisType::TetragonalP,
        BravaisType::TetragonalI,
        BravaisType::Rhombohedral,
        BravaisType::OrthorhombicP,
        BravaisType::OrthorhombicI,
        BravaisType::OrthorhombicF,
        BravaisType::OrthorhombicC,
        BravaisType::MonoclinicP,
        BravaisType::MonoclinicA,
        BravaisType::Triclinic,
    ];

    /// The integer code of this type, from 1 (most symmetric) to 15 (undetermined).
    #[must_use]
    pub fn code(&self) -> usize {
        match self {
            BravaisType::CubicP => 1,
            BravaisType::CubicI => 2,
            BravaisType::CubicF => 3,
            BravaisType::Hexagonal => 4,
            BravaisType::TetragonalP => 5,
            BravaisType::TetragonalI => 6,
            BravaisType::Rhombohedral => 7,
            BravaisType::OrthorhombicP => 8,
            BravaisType::OrthorhombicI => 9,
            BravaisType::OrthorhombicF => 10,
            BravaisType::OrthorhombicC => 11,
            BravaisType::MonoclinicP => 12,
            BravaisType::MonoclinicA => 13,
            BravaisType::Triclinic => 14,
            BravaisType::Undetermined => 15,
        }
    }

    /// Converts an integer code back into a Bravais type.
    ///
    /// # Errors
    ///
    /// Errors if the code is not in $`[1, 15]`$.
    pub fn from_code(code: usize) -> Result<Self, anyhow::Error> {
        match code {
            1..=14 => Ok(Self::ALL[code - 1]),
            15 => Ok(BravaisType::Undetermined),
            _ => bail!("Invalid Bravais type code `{code}`."),
        }
    }

    /// The descriptive name of this type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            BravaisType::CubicP => "Cubic P (simple)",
            BravaisType::CubicI => "Cubic I (body-centred)",
            BravaisType::CubicF => "Cubic F (face-centred)",
            BravaisType::Hexagonal => "Hexagonal",
            BravaisType::TetragonalP => "Tetragonal P (simple)",
            BravaisType::TetragonalI => "Tetragonal I (body-centred)",
            BravaisType::Rhombohedral => "Rhombohedral (R)",
            BravaisType::OrthorhombicP => "Orthorhombic P (simple)",
            BravaisType::OrthorhombicI => "Orthorhombic I (body-centred)",
            BravaisType::OrthorhombicF => "Orthorhombic F (face-centred)",
            BravaisType::OrthorhombicC => "Orthorhombic C (base-centred)",
            BravaisType::MonoclinicP => "Monoclinic P (simple)",
            BravaisType::MonoclinicA => "Monoclinic A (base-centred)",
            BravaisType::Triclinic => "Triclinic",
            BravaisType::Undetermined => "Undetermined",
        }
    }

    /// The order of the holohedry (full point group) of lattices of this type, or `None` for an
    /// undetermined lattice.
    #[must_use]
    pub fn holohedry_order(&self) -> Option<usize> {
        match self {
            BravaisType::CubicP | BravaisType::CubicI | BravaisType::CubicF => Some(48),
            BravaisType::Hexagonal => Some(24),
            BravaisType::TetragonalP | BravaisType::TetragonalI => Some(16),
            BravaisType::Rhombohedral => Some(12),
            BravaisType::OrthorhombicP
            | BravaisType::OrthorhombicI
            | BravaisType::OrthorhombicF
            | BravaisType::OrthorhombicC => Some(8),
            BravaisType::MonoclinicP | BravaisType::MonoclinicA => Some(4),
            BravaisType::Triclinic => Some(2),
            BravaisType::Undetermined => None,
        }
    }
}

impl fmt::Display for BravaisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}. {}", self.code(), self.name())
    }
}

// ==================
// Struct definitions
// ==================

/// The six canonical cell constants of a classified lattice.
///
/// The meaning of each slot depends on the Bravais type. In general, slot 0 is a length, slots 1
/// and 2 are length ratios, and slots 3 to 5 are cosines; unused slots are zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CellConstants(pub [f64; 6]);

impl CellConstants {
    /// Checks if all six constants agree within tolerance.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tol: Tolerance) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| tol.equal(*a, *b))
    }

    /// The three cosine slots.
    #[must_use]
    pub fn cosines(&self) -> [f64; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }
}

impl fmt::Display for CellConstants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.6}, {:.6}, {:.6}, {:.6}, {:.6}, {:.6}]",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

// =========
// Functions
// =========

/// Classifies a lattice into one of the fourteen Bravais types and computes its canonical cell
/// constants.
///
/// The classification is sensitive to the order and setting of the supplied vectors: it only
/// recognises a lattice when the vectors are already in the type's canonical setting, which is
/// why [`crate::symmetry::lattice_search::get_optlat`] searches over equivalent bases.
///
/// # Arguments
///
/// * `vectors` - The three lattice vectors. These are negated if they form a left-handed set,
/// and for [`BravaisType::MonoclinicP`] they are relabelled so that $`\mathbf{a} \leftarrow
/// \mathbf{b}`$, $`\mathbf{b} \leftarrow \mathbf{c}`$, $`\mathbf{c} \leftarrow \mathbf{a}`$.
/// * `tol` - The comparison tolerance.
///
/// # Returns
///
/// The Bravais type and the cell constants.
pub fn standard_lat(vectors: &mut [Vector3<f64>; 3], tol: Tolerance) -> (BravaisType, CellConstants) {
    let [a, b, c] = *vectors;
    let norm_a = a.norm();
    let norm_b = b.norm();
    let norm_c = c.norm();
    let gamma = cosine(&a, &b);
    let alpha = cosine(&b, &c);
    let beta = cosine(&c, &a);
    let amb = (a - b).norm();
    let bmc = (b - c).norm();
    let cma = (c - a).norm();
    let apb = (a + b).norm();
    let bpc = (b + c).norm();
    let cpa = (c + a).norm();
    let apbmc = (a + b - c).norm();
    let bpcma = (b + c - a).norm();
    let cpamb = (c + a - b).norm();
    let abc = a.dot(&b) + b.dot(&c) + c.dot(&a);
    let small = tol.epsilon;

    right_hand_sense(vectors);

    let mut cel = [0.0; 6];
    let brav = if tol.equal(alpha, gamma) && tol.equal(alpha, beta) {
        // All three angles are equal.
        if tol.equal(norm_a, norm_b) && tol.equal(norm_b, norm_c) {
            cel[0] = norm_a;
            if tol.equal(alpha, 0.0) {
                BravaisType::CubicP
            } else if tol.equal(alpha, -1.0 / 3.0) {
                cel[0] = norm_a * 2.0 / 3.0_f64.sqrt();
                BravaisType::CubicI
            } else if tol.equal(alpha, 0.5) {
                cel[0] = norm_a * 2.0_f64.sqrt();
                BravaisType::CubicF
            } else {
                cel[3] = alpha;
                BravaisType::Rhombohedral
            }
        } else if tol.equal(gamma, 0.0) {
            if tol.equal(norm_a, norm_b) {
                cel = [norm_a, 0.0, norm_c / norm_a, 0.0, 0.0, 0.0];
                BravaisType::TetragonalP
            } else if norm_c - norm_b > small && norm_b - norm_a > small {
                cel = [norm_a, norm_b / norm_a, norm_c / norm_a, 0.0, 0.0, 0.0];
                BravaisType::OrthorhombicP
            } else {
                BravaisType::Undetermined
            }
        } else {
            BravaisType::Undetermined
        }
    } else if tol.equal(alpha, beta) {
        // Two angles are equal.
        if tol.equal(alpha, 0.0) {
            if tol.equal(norm_a, norm_b) {
                if tol.equal(gamma, -0.5) {
                    cel = [norm_a, 0.0, norm_c / norm_a, 0.0, 0.0, 0.0];
                    BravaisType::Hexagonal
                } else if gamma < -small {
                    cel = [apb, amb / apb, norm_c / apb, 0.0, 0.0, gamma];
                    BravaisType::OrthorhombicC
                } else {
                    BravaisType::Undetermined
                }
            } else if gamma < -small && norm_a - norm_b > small {
                cel = [norm_b, norm_c / norm_b, norm_a / norm_b, 0.0, gamma, 0.0];
                *vectors = [vectors[1], vectors[2], vectors[0]];
                BravaisType::MonoclinicP
            } else {
                BravaisType::Undetermined
            }
        } else if tol.equal(norm_a, norm_b)
            && tol.equal(norm_b, norm_c)
            && tol.equal(cpa, bpc)
            && !tol.equal(apb, cpa)
            && tol.equal(norm_c * norm_c + abc, 0.0)
        {
            cel = [cpa, 0.0, apb / cpa, 0.0, 0.0, 0.0];
            BravaisType::TetragonalI
        } else if tol.equal(norm_a, norm_b) && alpha < -small && beta < -small {
            cel = [apb, amb / apb, norm_c / apb, 0.0, (a + b).dot(&c) / apb / norm_c, 0.0];
            BravaisType::MonoclinicA
        } else {
            BravaisType::Undetermined
        }
    } else if tol.equal(norm_a, norm_b)
        && tol.equal(norm_b, norm_c)
        && cpa - bpc > small
        && apb - cpa > small
        && tol.equal(norm_c * norm_c + abc, 0.0)
    {
        // All three angles are different.
        cel = [bpc, cpa / bpc, apb / bpc, 0.0, 0.0, 0.0];
        BravaisType::OrthorhombicI
    } else if tol.equal(amb, norm_c)
        && tol.equal(cma, norm_b)
        && tol.equal(bmc, norm_a)
        && apbmc - cpamb > small
        && cpamb - bpcma > small
    {
        cel = [bpcma, cpamb / bpcma, apbmc / bpcma, 0.0, 0.0, 0.0];
        BravaisType::OrthorhombicF
    } else if gamma > beta && beta > alpha && alpha > small {
        cel = [norm_a, norm_b / norm_a, norm_c / norm_a, alpha, beta, gamma];
        BravaisType::Triclinic
    } else {
        BravaisType::Undetermined
    };

    if brav == BravaisType::Undetermined {
        (brav, CellConstants::default())
    } else {
        (brav, CellConstants(cel))
    }
}

/// Constructs three lattice vectors in the canonical setting of a Bravais type from its cell
/// constants. Classifying the returned vectors with [`standard_lat`] recovers the same type and
/// constants.
///
/// The constants used for each type are those produced by [`standard_lat`]. For
/// [`BravaisType::OrthorhombicC`], the cosine slot is implied by the two length ratios and is
/// ignored.
///
/// # Errors
///
/// Errors if `brav` is [`BravaisType::Undetermined`] or if the constants do not describe a
/// lattice of the requested type (*e.g.* non-increasing orthorhombic axes).
pub fn canonical_lattice_vectors(
    brav: BravaisType,
    constants: &CellConstants,
) -> Result<[Vector3<f64>; 3], anyhow::Error> {
    let [c0, c1, c2, c3, c4, c5] = constants.0;
    if c0 <= 0.0 {
        bail!("The reference length of a lattice must be positive.");
    }
    let vectors = match brav {
        BravaisType::CubicP => [
            Vector3::new(c0, 0.0, 0.0),
            Vector3::new(0.0, c0, 0.0),
            Vector3::new(0.0, 0.0, c0),
        ],
        BravaisType::CubicI => [
            Vector3::new(-0.5, 0.5, 0.5) * c0,
            Vector3::new(0.5, -0.5, 0.5) * c0,
            Vector3::new(0.5, 0.5, -0.5) * c0,
        ],
        BravaisType::CubicF => [
            Vector3::new(0.0, 0.5, 0.5) * c0,
            Vector3::new(0.5, 0.0, 0.5) * c0,
            Vector3::new(0.5, 0.5, 0.0) * c0,
        ],
        BravaisType::Hexagonal => [
            Vector3::new(c0, 0.0, 0.0),
            Vector3::new(-0.5 * c0, 0.5 * 3.0_f64.sqrt() * c0, 0.0),
            Vector3::new(0.0, 0.0, c2 * c0),
        ],
        BravaisType::TetragonalP => [
            Vector3::new(c0, 0.0, 0.0),
            Vector3::new(0.0, c0, 0.0),
            Vector3::new(0.0, 0.0, c2 * c0),
        ],
        BravaisType::TetragonalI => {
            let (a, c) = (c0, c2 * c0);
            [
                Vector3::new(-0.5 * a, 0.5 * a, 0.5 * c),
                Vector3::new(0.5 * a, -0.5 * a, 0.5 * c),
                Vector3::new(0.5 * a, 0.5 * a, -0.5 * c),
            ]
        }
        BravaisType::Rhombohedral => {
            if !(-0.5..1.0).contains(&c3) {
                bail!("Invalid rhombohedral cosine `{c3}`.");
            }
            let tx = ((1.0 - c3) / 2.0).sqrt();
            let ty = ((1.0 - c3) / 6.0).sqrt();
            let tz = ((1.0 + 2.0 * c3) / 3.0).sqrt();
            [
                Vector3::new(tx, -ty, tz) * c0,
                Vector3::new(0.0, 2.0 * ty, tz) * c0,
                Vector3::new(-tx, -ty, tz) * c0,
            ]
        }
        BravaisType::OrthorhombicP => {
            ensure_increasing(c1, c2)?;
            [
                Vector3::new(c0, 0.0, 0.0),
                Vector3::new(0.0, c1 * c0, 0.0),
                Vector3::new(0.0, 0.0, c2 * c0),
            ]
        }
        BravaisType::OrthorhombicI => {
            ensure_increasing(c1, c2)?;
            let (a, b, c) = (c0, c1 * c0, c2 * c0);
            [
                Vector3::new(-a, b, c) * 0.5,
                Vector3::new(a, -b, c) * 0.5,
                Vector3::new(a, b, -c) * 0.5,
            ]
        }
        BravaisType::OrthorhombicF => {
            ensure_increasing(c1, c2)?;
            let (a, b, c) = (c0, c1 * c0, c2 * c0);
            [
                Vector3::new(0.0, b, c) * 0.5,
                Vector3::new(a, 0.0, c) * 0.5,
                Vector3::new(a, b, 0.0) * 0.5,
            ]
        }
        BravaisType::OrthorhombicC => {
            if c1 <= 1.0 {
                bail!("The base-centred orthorhombic ratio |a-b|/|a+b| must exceed one.");
            }
            let (a, b, c) = (c0, c1 * c0, c2 * c0);
            [
                Vector3::new(0.5 * a, -0.5 * b, 0.0),
                Vector3::new(0.5 * a, 0.5 * b, 0.0),
                Vector3::new(0.0, 0.0, c),
            ]
        }
        BravaisType::MonoclinicP => {
            // Input order (a, b, c) with c perpendicular to the obtuse (a, b) pair and |a| > |b|;
            // the classifier relabels these back onto the constants' setting.
            if c2 <= 1.0 || c4 >= 0.0 || c4 <= -1.0 {
                bail!("Invalid monoclinic constants {constants}.");
            }
            let (b, c, a) = (c0, c1 * c0, c2 * c0);
            let sin_g = (1.0 - c4 * c4).sqrt();
            [
                Vector3::new(a * c4, a * sin_g, 0.0),
                Vector3::new(b, 0.0, 0.0),
                Vector3::new(0.0, 0.0, -c),
            ]
        }
        BravaisType::MonoclinicA => {
            if c4 >= 0.0 || c4 <= -1.0 {
                bail!("Invalid monoclinic constants {constants}.");
            }
            let (a, b, c) = (c0, c1 * c0, c2 * c0);
            let sin_b = (1.0 - c4 * c4).sqrt();
            [
                Vector3::new(0.5 * a, -0.5 * b, 0.0),
                Vector3::new(0.5 * a, 0.5 * b, 0.0),
                Vector3::new(c * c4, 0.0, c * sin_b),
            ]
        }
        BravaisType::Triclinic => {
            let (a, b, c) = (c0, c1 * c0, c2 * c0);
            let (cos_a, cos_b, cos_g) = (c3, c4, c5);
            let sin_g = (1.0 - cos_g * cos_g).sqrt();
            let cy = (cos_a - cos_b * cos_g) / sin_g;
            let cz2 = 1.0 - cos_b * cos_b - cy * cy;
            if cz2 <= 0.0 {
                bail!("Triclinic constants {constants} do not describe a three-dimensional lattice.");
            }
            [
                Vector3::new(a, 0.0, 0.0),
                Vector3::new(b * cos_g, b * sin_g, 0.0),
                Vector3::new(c * cos_b, c * cy, c * cz2.sqrt()),
            ]
        }
        BravaisType::Undetermined => bail!("Cannot construct an undetermined lattice."),
    };
    Ok(vectors)
}

fn ensure_increasing(ratio_b: f64, ratio_c: f64) -> Result<(), anyhow::Error> {
    if 1.0 < ratio_b && ratio_b < ratio_c {
        Ok(())
    } else {
        bail!("Orthorhombic axis ratios must satisfy 1 < b/a < c/a.")
    }
}
