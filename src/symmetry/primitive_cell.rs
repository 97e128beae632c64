//! Detection of non-primitive cells and construction of the primitive cell.

use std::fmt;

use anyhow;
use itertools::Itertools;
use log;
use nalgebra::{Matrix3, Vector3};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::auxiliary::geometry::{invert_lattice, lattice_vectors, triple_product};
use crate::io::format::crysym_warn;
use crate::symmetry::bravais::{BravaisType, CellConstants};
use crate::symmetry::hermite::hermite_normal_form;
use crate::symmetry::lattice_search::{lattice_type, LatticeClassification};
use crate::symmetry::space_group::{anchor_species, PositionLookup};
use crate::symmetry::symmetry_operation::gtrans_convert;
use crate::symmetry::tolerance::Tolerance;

#[cfg(test)]
#[path = "primitive_cell_tests.rs"]
mod primitive_cell_tests;

/// The primitive cell of a structure and the internal translations of the given cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveCell {
    /// The number of primitive cells contained in the optimised cell.
    pub ncell: usize,

    /// The internal lattice translations of the optimised cell, in its own basis, sorted
    /// canonically. The first one is always zero.
    pub ptrans: Vec<Vector3<f64>>,

    /// [`Self::ptrans`] expressed in the input basis, wrapped into $`[0, 1)`$.
    pub ptrans_input: Vec<Vector3<f64>>,

    /// The classification of the primitive lattice.
    pub classification: LatticeClassification,

    /// The lower-triangular Hermite normal form relating the optimised cell to the primitive
    /// one, if the cell is not primitive.
    pub hnf: Option<Matrix3<i64>>,

    /// The reason for treating the cell as primitive despite extra translations having been
    /// found, if this happened.
    pub fallback: Option<String>,
}

impl PrimitiveCell {
    /// The primitive lattice vectors.
    #[must_use]
    pub fn vectors(&self) -> &[Vector3<f64>; 3] {
        &self.classification.vectors
    }

    /// The primitive lattice matrix.
    #[must_use]
    pub fn lattice(&self) -> Matrix3<f64> {
        self.classification.lattice()
    }

    /// The Bravais type of the primitive lattice.
    #[must_use]
    pub fn bravais(&self) -> BravaisType {
        self.classification.bravais
    }

    /// The cell constants of the primitive lattice.
    #[must_use]
    pub fn constants(&self) -> &CellConstants {
        &self.classification.constants
    }

    /// The primitive cell of an already primitive lattice.
    fn trivial(optimised: &LatticeClassification, fallback: Option<String>) -> Self {
        Self {
            ncell: 1,
            ptrans: vec![Vector3::zeros()],
            ptrans_input: vec![Vector3::zeros()],
            classification: optimised.clone(),
            hnf: None,
            fallback,
        }
    }
}

impl fmt::Display for PrimitiveCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of primitive cells: {}", self.ncell)?;
        writeln!(f, "Primitive Bravais type   : {}", self.bravais())?;
        writeln!(f, "Primitive cell constants : {}", self.constants())?;
        if self.ncell > 1 {
            writeln!(f, "Internal translations:")?;
            for t in self.ptrans.iter() {
                writeln!(f, "  ({:>+10.6}, {:>+10.6}, {:>+10.6})", t[0], t[1], t[2])?;
            }
        }
        Ok(())
    }
}

/// Finds all internal translations of a structure, *i.e.* fractional translations that map the
/// structure onto itself with the identity rotation.
///
/// # Returns
///
/// The translations in $`[0, 1)^3`$, sorted by their components snapped to the tolerance grid.
/// The zero translation is always first.
#[must_use]
pub fn internal_translations(positions: &[Vec<Vector3<f64>>], tol: Tolerance) -> Vec<Vector3<f64>> {
    let Some(anchor) = anchor_species(positions) else {
        return vec![Vector3::zeros()];
    };
    let lookups = positions
        .iter()
        .map(|sp| PositionLookup::new(sp))
        .collect_vec();
    let x0 = positions[anchor][0];
    positions[anchor]
        .iter()
        .map(|x_i| tol.translation_between(x_i, &x0))
        .filter(|t| {
            positions
                .iter()
                .zip(lookups.iter())
                .all(|(sp, lookup)| lookup.matches(sp, t, tol))
        })
        .sorted_by_key(|t| [0, 1, 2].map(|i| OrderedFloat((t[i] / tol.epsilon).round())))
        .collect_vec()
}

/// Chooses three primitive basis vectors (in the basis of the given cell) among the internal
/// translations.
///
/// # Returns
///
/// The basis, or `None` if all candidate triples are degenerate.
fn select_primitive_basis(ptrans: &[Vector3<f64>], tol: Tolerance) -> Option<[Vector3<f64>; 3]> {
    let differs = |x: f64, y: f64| tol.periodic_difference(x, y).abs() >= tol.epsilon;
    let e = [Vector3::x(), Vector3::y(), Vector3::z()];
    let origin = ptrans.first().copied().unwrap_or_else(Vector3::zeros);

    let b3 = ptrans
        .iter()
        .find(|t| differs(t[2], origin[2]))
        .copied()
        .unwrap_or(e[2]);
    let b2 = ptrans
        .iter()
        .find(|t| differs(t[1], origin[1]) && t.cross(&b3).norm() >= tol.epsilon)
        .copied()
        .unwrap_or(e[1]);
    let b1 = ptrans
        .iter()
        .find(|t| differs(t[0], origin[0]) && triple_product(&[**t, b2, b3]).abs() >= tol.epsilon)
        .copied()
        .unwrap_or(e[0]);

    [
        [b1, b2, b3],
        [e[2], b2, b3],
        [b1, e[2], b3],
        [b1, b2, e[1]],
        [b1, b2, e[0]],
    ]
    .into_iter()
    .find(|basis| triple_product(basis).abs() >= tol.epsilon)
}

/// Determines the primitive cell of a structure.
///
/// # Arguments
///
/// * `optimised` - The classification of the optimised lattice.
/// * `positions` - Fractional positions in the optimised basis grouped by species, wrapped into
///   $`[-0.5, 0.5)`$.
/// * `input_lattice` - The lattice as given by the caller, for re-expressing the internal
///   translations.
/// * `tol` - The comparison tolerance.
///
/// # Returns
///
/// The primitive cell. If the internal translations, the volume ratio and the Hermite normal form
/// disagree on the number of primitive cells, the optimised cell is taken as primitive, a warning
/// is logged and the reason is recorded in [`PrimitiveCell::fallback`].
///
/// # Errors
///
/// Errors if a lattice is singular.
pub fn pricell(
    optimised: &LatticeClassification,
    positions: &[Vec<Vector3<f64>>],
    input_lattice: &Matrix3<f64>,
    tol: Tolerance,
) -> Result<PrimitiveCell, anyhow::Error> {
    let ptrans = internal_translations(positions, tol);
    if ptrans.len() <= 1 {
        log::debug!("No internal translations found: the cell is primitive.");
        return Ok(PrimitiveCell::trivial(optimised, None));
    }

    let fall_back = |reason: String| -> Result<PrimitiveCell, anyhow::Error> {
        crysym_warn!("Primitive cell search failed ({reason}). The cell is taken as primitive.");
        Ok(PrimitiveCell::trivial(optimised, Some(reason)))
    };

    let m_opt = optimised.lattice();
    let Some(basis) = select_primitive_basis(&ptrans, tol) else {
        return fall_back("no non-degenerate primitive basis".to_string());
    };
    let m_prim_raw = m_opt * Matrix3::from_columns(&basis);
    let classification = lattice_type(&lattice_vectors(&m_prim_raw), tol);
    let m_prim = classification.lattice();

    let ncell_double = (m_opt.determinant() / m_prim.determinant()).abs();
    let ncell_rounded = ncell_double.round();
    if (ncell_double - ncell_rounded).abs() > 100.0 * tol.epsilon || ncell_rounded < 1.0 {
        return fall_back(format!(
            "the volume ratio {ncell_double:.6} is not an integer"
        ));
    }
    let ncell = ncell_rounded as usize;
    if ncell != ptrans.len() {
        return fall_back(format!(
            "{} internal translations but a volume ratio of {ncell}",
            ptrans.len()
        ));
    }

    let n = (invert_lattice(&m_prim)? * m_opt).transpose();
    let hnf = match hermite_normal_form(&n, tol) {
        Ok(hnf) => hnf,
        Err(err) => return fall_back(err.to_string()),
    };
    if hnf.diagonal_product() != ncell as i64 {
        return fall_back(format!(
            "the Hermite normal form gives {} cells instead of {ncell}",
            hnf.diagonal_product()
        ));
    }

    let ptrans_input = ptrans
        .iter()
        .map(|t| {
            gtrans_convert(t, &m_opt, input_lattice).map(|t_in| t_in.map(|x| tol.wrap_translation(x)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "Primitive cell found: {ncell} cells, Bravais type {}.",
        classification.bravais
    );
    Ok(PrimitiveCell {
        ncell,
        ptrans,
        ptrans_input,
        classification,
        hnf: Some(hnf.h),
        fallback: None,
    })
}
