//! Periodic atomic structures.

use std::fmt;

use anyhow::{self, ensure, format_err};
use derive_builder::Builder;
use itertools::Itertools;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::auxiliary::geometry::{self, lattice_matrix};

#[cfg(test)]
#[path = "structure_tests.rs"]
mod structure_tests;

// ==================
// Struct definitions
// ==================

// -------
// Species
// -------

/// A structure containing all atoms of one chemical species.
#[derive(Clone, Builder, Debug, PartialEq, Serialize, Deserialize)]
pub struct Species {
    /// The label of the species.
    #[builder(setter(into))]
    pub label: String,

    /// The Cartesian positions of the atoms of this species.
    pub positions: Vec<Vector3<f64>>,

    /// The magnetic moments of the atoms of this species. If empty, all moments are taken to
    /// be zero.
    #[builder(default = "vec![]")]
    #[serde(default)]
    pub magnetic_moments: Vec<Vector3<f64>>,

    /// Per-atom, per-component mobility flags. If empty, all atoms are taken to be fully
    /// movable.
    #[builder(default = "vec![]")]
    #[serde(default)]
    pub mobility: Vec<[bool; 3]>,
}

impl Species {
    /// Returns a builder to construct a new species.
    #[must_use]
    pub fn builder() -> SpeciesBuilder {
        SpeciesBuilder::default()
    }

    /// Creates a non-magnetic, fully movable species from Cartesian positions.
    pub fn new(label: &str, positions: Vec<Vector3<f64>>) -> Self {
        Self {
            label: label.to_string(),
            positions,
            magnetic_moments: vec![],
            mobility: vec![],
        }
    }

    /// The number of atoms of this species.
    #[must_use]
    pub fn n_atoms(&self) -> usize {
        self.positions.len()
    }

    /// Returns the magnetic moment of atom `ia`.
    #[must_use]
    pub fn magnetic_moment(&self, ia: usize) -> Vector3<f64> {
        self.magnetic_moments
            .get(ia)
            .copied()
            .unwrap_or_else(Vector3::zeros)
    }

    /// Returns the mobility flags of atom `ia`.
    #[must_use]
    pub fn mobility_of(&self, ia: usize) -> [bool; 3] {
        self.mobility.get(ia).copied().unwrap_or([true; 3])
    }
}

// ---------
// Structure
// ---------

/// A read-only snapshot of a periodic structure: three lattice vectors and the atoms in the cell,
/// grouped by species.
///
/// Atoms are indexed species-major, atom-minor; [`Self::istart`] gives the global index of the
/// first atom of each species.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// The three lattice vectors in Cartesian coordinates.
    lattice_vectors: [Vector3<f64>; 3],

    /// The species in the cell.
    species: Vec<Species>,
}

impl Structure {
    /// Creates a new structure from Cartesian atomic positions.
    ///
    /// # Errors
    ///
    /// Errors if the lattice is singular, if there are no atoms, or if the magnetic-moment or
    /// mobility specifications of any species do not match its number of atoms.
    pub fn new(
        lattice_vectors: [Vector3<f64>; 3],
        species: Vec<Species>,
    ) -> Result<Self, anyhow::Error> {
        geometry::invert_lattice(&lattice_matrix(&lattice_vectors))?;
        ensure!(
            species.iter().any(|sp| sp.n_atoms() > 0),
            "A structure must contain at least one atom."
        );
        for sp in species.iter() {
            ensure!(
                sp.magnetic_moments.is_empty() || sp.magnetic_moments.len() == sp.n_atoms(),
                "Species `{}` has {} atoms but {} magnetic moments.",
                sp.label,
                sp.n_atoms(),
                sp.magnetic_moments.len()
            );
            ensure!(
                sp.mobility.is_empty() || sp.mobility.len() == sp.n_atoms(),
                "Species `{}` has {} atoms but {} mobility specifications.",
                sp.label,
                sp.n_atoms(),
                sp.mobility.len()
            );
        }
        Ok(Self {
            lattice_vectors,
            species,
        })
    }

    /// Creates a new structure from fractional atomic positions given per species.
    ///
    /// # Errors
    ///
    /// Errors under the same conditions as [`Self::new`].
    pub fn from_fractional(
        lattice_vectors: [Vector3<f64>; 3],
        species: Vec<(&str, Vec<Vector3<f64>>)>,
    ) -> Result<Self, anyhow::Error> {
        let lattice = lattice_matrix(&lattice_vectors);
        let species = species
            .into_iter()
            .map(|(label, fracs)| {
                Species::new(
                    label,
                    fracs
                        .iter()
                        .map(|x| geometry::fractional_to_cartesian(&lattice, x))
                        .collect_vec(),
                )
            })
            .collect_vec();
        Self::new(lattice_vectors, species)
    }

    /// Returns a copy of this structure with the given lattice vectors and the same Cartesian
    /// atomic positions.
    ///
    /// # Errors
    ///
    /// Errors if the new lattice is singular.
    pub fn with_lattice_vectors(
        &self,
        lattice_vectors: [Vector3<f64>; 3],
    ) -> Result<Self, anyhow::Error> {
        Self::new(lattice_vectors, self.species.clone())
    }

    /// The three lattice vectors.
    #[must_use]
    pub fn lattice_vectors(&self) -> &[Vector3<f64>; 3] {
        &self.lattice_vectors
    }

    /// The lattice matrix whose columns are the lattice vectors.
    #[must_use]
    pub fn lattice(&self) -> Matrix3<f64> {
        lattice_matrix(&self.lattice_vectors)
    }

    /// The species in the cell.
    #[must_use]
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// The number of species.
    #[must_use]
    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    /// The total number of atoms.
    #[must_use]
    pub fn n_atoms(&self) -> usize {
        self.species.iter().map(Species::n_atoms).sum()
    }

    /// The global index of the first atom of each species.
    #[must_use]
    pub fn istart(&self) -> Vec<usize> {
        self.species
            .iter()
            .scan(0, |acc, sp| {
                let start = *acc;
                *acc += sp.n_atoms();
                Some(start)
            })
            .collect_vec()
    }

    /// The species index of each atom, in global atom order.
    #[must_use]
    pub fn iat2it(&self) -> Vec<usize> {
        self.species
            .iter()
            .enumerate()
            .flat_map(|(it, sp)| std::iter::repeat(it).take(sp.n_atoms()))
            .collect_vec()
    }

    /// Returns the fractional positions of all atoms in a given basis, grouped by species and
    /// left unwrapped.
    ///
    /// # Errors
    ///
    /// Errors if the basis is singular.
    pub fn fractional_positions_in(
        &self,
        basis: &Matrix3<f64>,
    ) -> Result<Vec<Vec<Vector3<f64>>>, anyhow::Error> {
        let inverse = geometry::invert_lattice(basis)?;
        Ok(self
            .species
            .iter()
            .map(|sp| {
                sp.positions
                    .iter()
                    .map(|r| geometry::cartesian_to_fractional(&inverse, r))
                    .collect_vec()
            })
            .collect_vec())
    }

    /// Returns the fractional positions of all atoms in the structure's own lattice.
    ///
    /// # Errors
    ///
    /// Errors if the lattice is singular.
    pub fn fractional_positions(&self) -> Result<Vec<Vec<Vector3<f64>>>, anyhow::Error> {
        self.fractional_positions_in(&self.lattice())
    }

    /// Checks if every component of every atom is allowed to move.
    #[must_use]
    pub fn is_all_movable(&self) -> bool {
        self.species
            .iter()
            .all(|sp| (0..sp.n_atoms()).all(|ia| sp.mobility_of(ia).iter().all(|m| *m)))
    }

    /// Returns the species index and the within-species index of a global atom index.
    ///
    /// # Errors
    ///
    /// Errors if the index is out of range.
    pub fn locate_atom(&self, iat: usize) -> Result<(usize, usize), anyhow::Error> {
        self.istart()
            .iter()
            .zip(self.species.iter())
            .enumerate()
            .find_map(|(it, (start, sp))| {
                (iat >= *start && iat < start + sp.n_atoms()).then_some((it, iat - start))
            })
            .ok_or_else(|| format_err!("Atom index {iat} is out of range."))
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lattice vectors (Cartesian):")?;
        for (i, v) in self.lattice_vectors.iter().enumerate() {
            writeln!(
                f,
                "  a{} = ({:>+12.7}, {:>+12.7}, {:>+12.7})",
                i + 1,
                v[0],
                v[1],
                v[2]
            )?;
        }
        writeln!(
            f,
            "Species: {}",
            self.species
                .iter()
                .map(|sp| format!("{} × {}", sp.label, sp.n_atoms()))
                .join(", ")
        )?;
        Ok(())
    }
}
