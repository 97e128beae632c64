//! Partitioning of species into magnetic sub-types.

use anyhow;
use itertools::Itertools;
use log;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::auxiliary::structure::Structure;
use crate::symmetry::space_group::{getgroup, SpaceGroupOperations};
use crate::symmetry::tolerance::Tolerance;

#[cfg(test)]
#[path = "magnetic_tests.rs"]
mod magnetic_tests;

/// A group of atoms of one species carrying the same magnetic moment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MagneticSubtype {
    /// The index of the species.
    pub species: usize,

    /// The common magnetic moment.
    pub moment: Vector3<f64>,

    /// The within-species indices of the atoms.
    pub atoms: Vec<usize>,
}

/// Checks if all atoms of every species carry the same magnetic moment.
#[must_use]
pub fn magmom_same_check(structure: &Structure, tol: Tolerance) -> bool {
    structure.species().iter().all(|sp| {
        let first = sp.magnetic_moment(0);
        (1..sp.n_atoms()).all(|ia| tol.equal_vectors(&sp.magnetic_moment(ia), &first))
    })
}

/// Groups the atoms of every species by magnetic moment, in order of first appearance.
#[must_use]
pub fn magnetic_subtypes(structure: &Structure, tol: Tolerance) -> Vec<MagneticSubtype> {
    structure
        .species()
        .iter()
        .enumerate()
        .flat_map(|(it, sp)| {
            let mut subtypes: Vec<MagneticSubtype> = vec![];
            for ia in 0..sp.n_atoms() {
                let moment = sp.magnetic_moment(ia);
                match subtypes
                    .iter_mut()
                    .find(|st| tol.equal_vectors(&st.moment, &moment))
                {
                    Some(st) => st.atoms.push(ia),
                    None => subtypes.push(MagneticSubtype {
                        species: it,
                        moment,
                        atoms: vec![ia],
                    }),
                }
            }
            subtypes
        })
        .collect_vec()
}

/// Determines the space group of a structure in which atoms of the same species but different
/// magnetic moments are treated as distinct.
///
/// # Arguments
///
/// * `structure` - The structure.
/// * `optimised_lattice` - The optimised lattice in whose basis `pool` is expressed.
/// * `pool` - The candidate point operations, normally the holohedry of the optimised lattice.
/// * `tol` - The comparison tolerance.
///
/// # Returns
///
/// The magnetic sub-types and the operations preserving them.
///
/// # Errors
///
/// Errors if the optimised lattice is singular.
pub fn analyze_magnetic_group(
    structure: &Structure,
    optimised_lattice: &Matrix3<f64>,
    pool: &[Matrix3<f64>],
    tol: Tolerance,
) -> Result<(Vec<MagneticSubtype>, SpaceGroupOperations), anyhow::Error> {
    let subtypes = magnetic_subtypes(structure, tol);
    let fractional = structure.fractional_positions_in(optimised_lattice)?;
    let positions = subtypes
        .iter()
        .map(|st| {
            st.atoms
                .iter()
                .map(|&ia| tol.wrap_position_vector(&fractional[st.species][ia]))
                .collect_vec()
        })
        .collect_vec();
    let group = getgroup(pool, &positions, tol);
    log::debug!(
        "{} magnetic sub-types from {} species; {} operations preserve them.",
        subtypes.len(),
        structure.n_species(),
        group.nrotk()
    );
    Ok((subtypes, group))
}
