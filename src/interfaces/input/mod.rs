//! Input specification for `crysym` calculations via YAML files.

use std::path::Path;

use anyhow::{self, ensure, format_err, Context};
use itertools::Itertools;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::auxiliary::geometry::{fractional_to_cartesian, lattice_matrix};
use crate::auxiliary::structure::{Species, Structure};
use crate::drivers::space_group_detection::{
    SpaceGroupDetectionDriver, SpaceGroupDetectionParams, SpaceGroupDetectionResult,
};
use crate::drivers::CrysymDriver;
use crate::interfaces::InputHandle;
use crate::io::format::{crysym_output, log_subtitle, CrysymOutput};
use crate::io::{read_crysym_binary, write_crysym_yaml, CrysymFileType};

#[cfg(test)]
#[path = "input_tests.rs"]
mod input_tests;

// ==================
// Struct definitions
// ==================

// ---------
// Structure
// ---------

/// An enumerated type indicating how atomic positions are given in the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateKind {
    /// Positions are fractional coordinates along the lattice vectors of their step.
    Direct,

    /// Positions are Cartesian, in units of the lattice constant.
    Cartesian,
}

impl Default for CoordinateKind {
    fn default() -> Self {
        CoordinateKind::Direct
    }
}

fn default_lattice_constant() -> f64 {
    1.0
}

/// One structural step: a cell and its atoms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructureStep {
    /// The three lattice vectors, in units of the lattice constant.
    pub lattice_vectors: [Vector3<f64>; 3],

    /// The atomic species. Positions are interpreted according to [`StructureInput::coordinates`].
    pub species: Vec<Species>,
}

/// The `structure` section of an input file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructureInput {
    /// The length unit of the lattice vectors and Cartesian positions. Structures are analysed in
    /// this unit, so the symmetry tolerance is relative to it and the analysis does not depend on
    /// its value.
    #[serde(default = "default_lattice_constant")]
    pub lattice_constant: f64,

    /// How atomic positions are given.
    #[serde(default)]
    pub coordinates: CoordinateKind,

    /// The structural steps, in order. A single-point calculation has exactly one.
    pub steps: Vec<StructureStep>,
}

impl StructureInput {
    /// Converts the input steps into [`Structure`]s with Cartesian positions, both expressed in
    /// units of [`Self::lattice_constant`].
    ///
    /// # Errors
    ///
    /// Errors if the lattice constant is not positive, if there are no steps, or if any step does
    /// not describe a valid structure.
    pub fn to_structures(&self) -> Result<Vec<Structure>, anyhow::Error> {
        ensure!(
            self.lattice_constant > 0.0,
            "The lattice constant must be positive, but {} was given.",
            self.lattice_constant
        );
        ensure!(!self.steps.is_empty(), "No structural steps are specified.");
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let lattice = lattice_matrix(&step.lattice_vectors);
                let species = step
                    .species
                    .iter()
                    .map(|sp| {
                        let positions = sp
                            .positions
                            .iter()
                            .map(|r| match self.coordinates {
                                CoordinateKind::Direct => fractional_to_cartesian(&lattice, r),
                                CoordinateKind::Cartesian => *r,
                            })
                            .collect_vec();
                        Species {
                            positions,
                            ..sp.clone()
                        }
                    })
                    .collect_vec();
                Structure::new(step.lattice_vectors, species)
                    .with_context(|| format!("Invalid structural step {}.", i + 1))
            })
            .collect()
    }
}

impl Default for StructureInput {
    fn default() -> Self {
        StructureInput {
            lattice_constant: default_lattice_constant(),
            coordinates: CoordinateKind::Direct,
            steps: vec![StructureStep {
                lattice_vectors: [
                    Vector3::new(1.0, 0.0, 0.0),
                    Vector3::new(0.0, 1.0, 0.0),
                    Vector3::new(0.0, 0.0, 1.0),
                ],
                species: vec![Species::new("Po", vec![Vector3::zeros()])],
            }],
        }
    }
}

// --------------------
// Space-group detection
// --------------------

/// An enumerated type representing possible input kinds for space-group detection from a YAML
/// input file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SpaceGroupDetectionInputKind {
    /// Variant indicating that the parameters for the space-group detection driver will be
    /// specified.
    Parameters(SpaceGroupDetectionParams),

    /// Variant indicating that the space-group detection results will be read in from a
    /// [`CrysymFileType::Sym`] binary file. The associated string gives the name of the file
    /// without its `.crysym.sym` extension.
    FromFile(String),
}

impl Default for SpaceGroupDetectionInputKind {
    fn default() -> Self {
        SpaceGroupDetectionInputKind::Parameters(SpaceGroupDetectionParams::default())
    }
}

// -----
// Input
// -----

/// A structure containing `crysym` input parameters which can be serialised into and
/// deserialised from a YAML input file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Input {
    /// The structures to be analysed. Not needed when results are read in from a file.
    #[serde(default)]
    pub structure: Option<StructureInput>,

    /// Specification for space-group detection.
    #[serde(default)]
    pub space_group_detection: SpaceGroupDetectionInputKind,
}

impl Default for Input {
    fn default() -> Self {
        Input {
            structure: Some(StructureInput::default()),
            space_group_detection: SpaceGroupDetectionInputKind::default(),
        }
    }
}

impl InputHandle for Input {
    fn handle(&self) -> Result<(), anyhow::Error> {
        match &self.space_group_detection {
            SpaceGroupDetectionInputKind::Parameters(params) => {
                let structure = self.structure.as_ref().ok_or_else(|| {
                    format_err!("A `structure` section is required for space-group detection.")
                })?;
                let structures = structure.to_structures()?;
                crysym_output!(
                    "Structures are analysed in units of the lattice constant ({}).",
                    structure.lattice_constant
                );
                crysym_output!("");
                let mut driver = SpaceGroupDetectionDriver::builder()
                    .parameters(params)
                    .structures(&structures)
                    .build()
                    .map_err(|err| format_err!(err))?;
                driver.run()
            }
            SpaceGroupDetectionInputKind::FromFile(name) => {
                let result: SpaceGroupDetectionResult =
                    read_crysym_binary(name, CrysymFileType::Sym).with_context(|| {
                        format!(
                            "Unable to read space-group detection results from {name}{}.",
                            CrysymFileType::Sym.ext()
                        )
                    })?;
                log_subtitle(&format!(
                    "Space-group detection results read in from {name}{}",
                    CrysymFileType::Sym.ext()
                ));
                crysym_output!("");
                result.parameters.log_output_display();
                result.log_output_display();
                Ok(())
            }
        }
    }
}

/// Writes a template input file with default values.
///
/// # Arguments
///
/// * `name` - The name of the template file without extensions. The `.yml` extension is appended.
pub fn write_input_template<P: AsRef<Path>>(name: P) -> Result<(), anyhow::Error> {
    write_crysym_yaml(name, &Input::default())
}
