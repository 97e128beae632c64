//! Orchestration of a full space-group analysis of a periodic structure.
//!
//! A [`SymmetryAnalyser`] lives for the duration of a whole calculation (possibly spanning many
//! ionic steps) and owns the state carried from one step to the next: the current tolerance, the
//! numbers of operations found so far and the memoised atom map. Each call to
//! [`SymmetryAnalyser::analyse`] runs one or more passes of
//!
//! 1. lattice classification in the optimal setting,
//! 2. holohedry generation,
//! 3. space-group filtering (by species, or by magnetic sub-type for collinear spin-polarised
//!    structures with unequal moments),
//! 4. primitive-cell reduction,
//!
//! and then post-processes the operations of the committed pass into a [`SymmetryAnalysis`].

use std::fmt;

use anyhow::{self, format_err};
use derive_builder::Builder;
use itertools::Itertools;
use log;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::auxiliary::geometry::reciprocal_matrix;
use crate::auxiliary::structure::Structure;
use crate::io::format::{crysym_output, crysym_warn, nice_bool};
use crate::symmetrisation::SymmetrisationGroup;
use crate::symmetry::atom_map::{set_atom_map, AtomMap};
use crate::symmetry::lattice_search::{lattice_type_with_atoms, LatticeClassification};
use crate::symmetry::magnetic::{analyze_magnetic_group, magmom_same_check, MagneticSubtype};
use crate::symmetry::point_group::{pointgroup, setgroup, CrystallographicPointGroup};
use crate::symmetry::precision_control::{
    transition, ControllerAction, ControllerState, PrecisionControlConfig, Trial,
};
use crate::symmetry::primitive_cell::{pricell, PrimitiveCell};
use crate::symmetry::space_group::{getgroup, SpaceGroupOperations};
use crate::symmetry::symmetry_operation::{gmatrix_convert_int, gmatrix_invmap, SymmetryOperation};
use crate::symmetry::tolerance::Tolerance;


// ================
// Enum definitions
// ================

/// The kinds of calculation a structure can be part of. Only cell relaxations engage the
/// adaptive precision control.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalculationMode {
    /// A self-consistent calculation on a fixed structure.
    Scf,

    /// A non-self-consistent calculation on a fixed structure.
    Nscf,

    /// A relaxation of the atomic positions in a fixed cell.
    Relax,

    /// A relaxation of both the atomic positions and the cell.
    CellRelax,

    /// A molecular-dynamics trajectory.
    Md,
}

impl fmt::Display for CalculationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scf => write!(f, "scf"),
            Self::Nscf => write!(f, "nscf"),
            Self::Relax => write!(f, "relax"),
            Self::CellRelax => write!(f, "cell-relax"),
            Self::Md => write!(f, "md"),
        }
    }
}

/// Recoverable problems met during an analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SymmetryWarning {
    /// Fewer operations than found at an earlier step could be recovered, and the calculation
    /// continues with lower symmetry.
    LostOperations {
        epsilon: f64,
        nrotk: usize,
        max_nrotk: usize,
    },

    /// The primitive-cell search failed and the optimised cell is taken as primitive.
    PrimitiveCellFallback(String),

    /// The operations found do not form a group; those without an inverse have been dropped.
    IncompleteGroup { kept: usize, dropped: usize },

    /// Some atoms have frozen coordinates in a relaxation, so symmetry is not enforced.
    FrozenAtoms,
}

impl fmt::Display for SymmetryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LostOperations {
                epsilon,
                nrotk,
                max_nrotk,
            } => write!(
                f,
                "Symmetry cannot be kept due to the loss of accuracy of the atomic positions: \
                {nrotk} of {max_nrotk} operations found with tolerance {epsilon:.3e}. \
                Continuing with a lower symmetry."
            ),
            Self::PrimitiveCellFallback(reason) => write!(
                f,
                "Primitive cell search failed ({reason}). The cell is taken as primitive."
            ),
            Self::IncompleteGroup { kept, dropped } => write!(
                f,
                "The operations found do not form a group. {dropped} operation(s) without an \
                inverse dropped, {kept} kept."
            ),
            Self::FrozenAtoms => write!(
                f,
                "Symmetry cannot be kept when not all atoms are movable. Symmetry is disabled."
            ),
        }
    }
}

// ==================
// Struct definitions
// ==================

// ----
// Pass
// ----

/// The outcome of one analysis pass with a fixed tolerance.
#[derive(Clone, Debug)]
struct SymmetryPass {
    /// The tolerance of the pass.
    tolerance: Tolerance,

    /// The lattice classification.
    lattice: LatticeClassification,

    /// The atomic positions in the optimised lattice basis.
    positions: Vec<Vec<Vector3<f64>>>,

    /// The space-group operations in the optimised lattice basis.
    space_group: SpaceGroupOperations,

    /// The primitive cell.
    primitive: PrimitiveCell,

    /// The magnetic sub-types, if the space group was filtered by them.
    magnetic_subtypes: Option<Vec<MagneticSubtype>>,

    /// Whether internal translations are looped over when symmetrising reciprocal-space fields.
    pricell_loop: bool,
}

/// Runs one analysis pass.
fn run_pass(
    structure: &Structure,
    nspin: usize,
    tol: Tolerance,
) -> Result<SymmetryPass, anyhow::Error> {
    let (lattice, positions) = lattice_type_with_atoms(structure, tol)?;
    let m_opt = lattice.lattice();
    let holohedry = setgroup(&m_opt, lattice.bravais, tol)?;
    let primitive = pricell(&lattice, &positions, &structure.lattice(), tol)?;

    let pricell_loop = nspin <= 1 || magmom_same_check(structure, tol);
    let (space_group, magnetic_subtypes) = if !pricell_loop && nspin == 2 {
        let (subtypes, group) = analyze_magnetic_group(structure, &m_opt, &holohedry, tol)?;
        (group, Some(subtypes))
    } else {
        (getgroup(&holohedry, &positions, tol), None)
    };
    log::debug!(
        "Pass with tolerance {tol}: Bravais type {}, {} lattice operations, {} space-group \
        operations, {} primitive cell(s).",
        lattice.bravais,
        holohedry.len(),
        space_group.nrotk(),
        primitive.ncell
    );
    Ok(SymmetryPass {
        tolerance: tol,
        lattice,
        positions,
        space_group,
        primitive,
        magnetic_subtypes,
        pricell_loop,
    })
}

// ---------------------
// Simplified structure
// ---------------------

/// The structure as seen by the analysis: the optimised lattice and the reduced fractional
/// positions in it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimplifiedStructure {
    /// The optimised lattice vectors.
    pub lattice_vectors: [Vector3<f64>; 3],

    /// The species labels.
    pub labels: Vec<String>,

    /// The number of atoms of each species.
    pub counts: Vec<usize>,

    /// The fractional positions in the optimised lattice, wrapped into $`[-0.5, 0.5)`$.
    pub positions: Vec<Vec<Vector3<f64>>>,
}

impl fmt::Display for SimplifiedStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimised lattice vectors:")?;
        for v in self.lattice_vectors.iter() {
            writeln!(f, "  ({:>+12.7}, {:>+12.7}, {:>+12.7})", v[0], v[1], v[2])?;
        }
        for ((label, count), positions) in self
            .labels
            .iter()
            .zip(self.counts.iter())
            .zip(self.positions.iter())
        {
            writeln!(f, "Species {label} ({count} atom(s)):")?;
            for x in positions {
                writeln!(f, "  ({:>+10.6}, {:>+10.6}, {:>+10.6})", x[0], x[1], x[2])?;
            }
        }
        Ok(())
    }
}

// --------
// Analysis
// --------

/// The outcome of a full space-group analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymmetryAnalysis {
    /// The tolerance of the committed pass.
    pub tolerance: Tolerance,

    /// The tolerances tried and the numbers of operations found with them, the committed one
    /// among them.
    pub trials: Vec<Trial>,

    /// The as-is and optimised lattice classifications.
    pub lattice: LatticeClassification,

    /// The primitive cell.
    pub primitive: PrimitiveCell,

    /// The number of operations without fractional translation.
    pub nrot: usize,

    /// The space-group operations in the optimised lattice basis, pure rotations first.
    pub operations: Vec<SymmetryOperation>,

    /// The space-group operations in the input lattice basis, in the same order.
    pub operations_input: Vec<SymmetryOperation>,

    /// The rotations of reciprocal-lattice coordinates in the input reciprocal basis.
    pub kgmatrix: Vec<Matrix3<f64>>,

    /// The point group of the operations without fractional translation.
    pub point_group: Option<CrystallographicPointGroup>,

    /// The point group of the space group, *i.e.* of the rotation parts of all operations.
    pub space_group_point_group: Option<CrystallographicPointGroup>,

    /// The magnetic sub-types, if the space group was filtered by them.
    pub magnetic_subtypes: Option<Vec<MagneticSubtype>>,

    /// Whether internal translations are looped over when symmetrising reciprocal-space fields.
    pub pricell_loop: bool,

    /// The images of all atoms under all operations.
    pub atom_map: AtomMap,

    /// Whether every coordinate of every atom is movable.
    pub all_movable: bool,

    /// Whether symmetry is to be enforced on the structure.
    pub symmetry_enabled: bool,

    /// The structure in the optimised lattice.
    pub simplified_structure: SimplifiedStructure,

    /// The warnings raised during the analysis.
    pub warnings: Vec<SymmetryWarning>,
}

impl SymmetryAnalysis {
    /// The total number of space-group operations.
    #[must_use]
    pub fn nrotk(&self) -> usize {
        self.operations.len()
    }

    /// Gathers the input-basis parts of this analysis needed for symmetrising fields.
    #[must_use]
    pub fn symmetrisation_group(&self) -> SymmetrisationGroup {
        SymmetrisationGroup {
            operations: self.operations_input.clone(),
            kgmatrix: self.kgmatrix.clone(),
            ptrans: self.primitive.ptrans_input.clone(),
            pricell_loop: self.pricell_loop,
            tolerance: self.tolerance,
        }
    }
}

impl fmt::Display for SymmetryAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Symmetry tolerance: {:.3e}", self.tolerance.epsilon)?;
        writeln!(f)?;
        write!(f, "{}", self.lattice)?;
        writeln!(f)?;
        write!(f, "{}", self.primitive)?;
        writeln!(f)?;
        writeln!(
            f,
            "Point group              : {}",
            self.point_group
                .as_ref()
                .map_or_else(|| "?".to_string(), ToString::to_string)
        )?;
        writeln!(
            f,
            "Point group of space group: {}",
            self.space_group_point_group
                .as_ref()
                .map_or_else(|| "?".to_string(), ToString::to_string)
        )?;
        writeln!(
            f,
            "Number of operations     : {} (lattice: {})",
            self.nrotk(),
            self.nrot
        )?;
        if let Some(subtypes) = self.magnetic_subtypes.as_ref() {
            writeln!(f, "Magnetic sub-types       : {}", subtypes.len())?;
        }
        writeln!(
            f,
            "All atoms movable        : {}",
            nice_bool(self.all_movable)
        )?;
        writeln!(
            f,
            "Symmetry enabled         : {}",
            nice_bool(self.symmetry_enabled)
        )?;
        Ok(())
    }
}

// --------
// Analyser
// --------

/// A structure carrying the symmetry state of a calculation from one structural step to the
/// next.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct SymmetryAnalyser {
    /// The tolerance requested by the user.
    symmetry_prec: f64,

    /// The number of spin channels.
    #[builder(default = "1")]
    nspin: usize,

    /// The kind of calculation.
    #[builder(default = "CalculationMode::Scf")]
    calculation: CalculationMode,

    /// The current tolerance, which the precision control may have changed.
    #[builder(setter(skip), default = "self.symmetry_prec.unwrap_or(1e-6)")]
    epsilon: f64,

    /// The number of operations found at the last step.
    #[builder(setter(skip), default = "0")]
    nrotk: usize,

    /// The largest number of operations found at any step.
    #[builder(setter(skip), default = "0")]
    max_nrotk: usize,

    /// The atom map of the last step.
    #[builder(setter(skip), default = "None")]
    atom_map: Option<AtomMap>,
}

/// The largest accepted tolerance. Fractional positions are compared within $`[-0.5, 0.5)`$, so a
/// tolerance beyond a quarter of the cell identifies unrelated atoms and lattice vectors.
pub const MAX_SYMMETRY_PREC: f64 = 0.25;

impl SymmetryAnalyserBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.symmetry_prec {
            Some(prec) if !(prec.is_finite() && prec > 0.0) => Err(format!(
                "Symmetry tolerance `{prec}` is invalid. The tolerance must be positive and finite."
            )),
            Some(prec) if prec > MAX_SYMMETRY_PREC => Err(format!(
                "Symmetry tolerance `{prec}` is invalid. The tolerance must not exceed \
                {MAX_SYMMETRY_PREC}."
            )),
            _ => Ok(()),
        }
    }
}

impl SymmetryAnalyser {
    /// Returns a builder to construct a new analyser.
    #[must_use]
    pub fn builder() -> SymmetryAnalyserBuilder {
        SymmetryAnalyserBuilder::default()
    }

    /// The current tolerance.
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// The number of operations found at the last step.
    #[must_use]
    pub fn nrotk(&self) -> usize {
        self.nrotk
    }

    /// The largest number of operations found along the trajectory so far.
    #[must_use]
    pub fn max_nrotk(&self) -> usize {
        self.max_nrotk
    }

    /// Analyses the symmetry of one structural step.
    ///
    /// For cell relaxations after the first step, the tolerance is adapted by the precision
    /// controller to recover the operations of earlier steps; otherwise a single pass is run with
    /// the current tolerance.
    ///
    /// # Errors
    ///
    /// Errors if any lattice met during the analysis is singular.
    pub fn analyse(&mut self, structure: &Structure) -> Result<SymmetryAnalysis, anyhow::Error> {
        let mut warnings = vec![];
        let (pass, trials) = if self.calculation == CalculationMode::CellRelax && self.nrotk > 0
        {
            self.max_nrotk = self.max_nrotk.max(self.nrotk);
            self.controlled_pass(structure, &mut warnings)?
        } else {
            let pass = run_pass(structure, self.nspin, Tolerance::new(self.epsilon))?;
            let trial = Trial {
                epsilon: self.epsilon,
                nrotk: pass.space_group.nrotk(),
            };
            (pass, vec![trial])
        };

        if let Some(reason) = pass.primitive.fallback.as_ref() {
            warnings.push(SymmetryWarning::PrimitiveCellFallback(reason.clone()));
        }
        let analysis = self.post_pass(structure, pass, trials, warnings)?;
        self.nrotk = analysis.nrotk();
        Ok(analysis)
    }

    /// Runs passes as directed by the precision controller until a tolerance is committed.
    fn controlled_pass(
        &mut self,
        structure: &Structure,
        warnings: &mut Vec<SymmetryWarning>,
    ) -> Result<(SymmetryPass, Vec<Trial>), anyhow::Error> {
        let config = PrecisionControlConfig::new(self.symmetry_prec, self.max_nrotk);
        let initial_epsilon = self.epsilon;
        let mut passes = vec![run_pass(
            structure,
            self.nspin,
            Tolerance::new(initial_epsilon),
        )?];
        let mut history = vec![Trial {
            epsilon: initial_epsilon,
            nrotk: passes[0].space_group.nrotk(),
        }];
        let mut state = ControllerState::Stable;
        let committed = loop {
            let (next, action) = transition(state, &history, &config);
            log::debug!("Precision controller: {state} -> {next}, {action:?}.");
            state = next;
            match action {
                ControllerAction::Run(epsilon) => {
                    let pass = run_pass(structure, self.nspin, Tolerance::new(epsilon))?;
                    history.push(Trial {
                        epsilon,
                        nrotk: pass.space_group.nrotk(),
                    });
                    passes.push(pass);
                }
                ControllerAction::Commit(epsilon) => break epsilon,
            }
        };

        let ipass = history
            .iter()
            .rposition(|trial| (trial.epsilon - committed).abs() <= f64::EPSILON * committed)
            .ok_or_else(|| {
                format_err!("The committed tolerance {committed:.3e} has not been tried.")
            })?;
        let pass = passes.swap_remove(ipass);
        let nrotk = pass.space_group.nrotk();

        if committed > initial_epsilon {
            crysym_output!("Enlarging the symmetry tolerance to {committed:.3e} ...");
        } else if committed < initial_epsilon {
            crysym_output!(
                "Narrowing the symmetry tolerance from {initial_epsilon:.3e} to {committed:.3e} ..."
            );
        }
        if nrotk > self.max_nrotk {
            crysym_output!("New symmetry operations found during cell relaxation.");
            self.max_nrotk = nrotk;
        } else if nrotk < self.max_nrotk {
            let warning = SymmetryWarning::LostOperations {
                epsilon: committed,
                nrotk,
                max_nrotk: self.max_nrotk,
            };
            crysym_warn!("{warning}");
            warnings.push(warning);
        }
        self.epsilon = committed;
        Ok((pass, history))
    }

    /// Identifies the point groups, repairs an incomplete operation set, and converts the
    /// operations to the input basis and to reciprocal space.
    fn post_pass(
        &mut self,
        structure: &Structure,
        pass: SymmetryPass,
        trials: Vec<Trial>,
        mut warnings: Vec<SymmetryWarning>,
    ) -> Result<SymmetryAnalysis, anyhow::Error> {
        let tol = pass.tolerance;
        let SpaceGroupOperations {
            mut operations,
            mut nrot,
        } = pass.space_group;

        let rotations = operations.iter().map(|op| op.rotation).collect_vec();
        let point_group = pointgroup(&rotations[..nrot]);
        let mut space_group_point_group = pointgroup(&rotations);
        if space_group_point_group.is_none() && !operations.is_empty() {
            let invmap = gmatrix_invmap(&rotations, tol);
            let total = operations.len();
            nrot = invmap[..nrot].iter().flatten().count();
            operations = operations
                .into_iter()
                .zip(invmap.iter())
                .filter_map(|(op, inverse)| inverse.map(|_| op))
                .collect_vec();
            let warning = SymmetryWarning::IncompleteGroup {
                kept: operations.len(),
                dropped: total - operations.len(),
            };
            crysym_warn!("{warning}");
            warnings.push(warning);
            space_group_point_group =
                pointgroup(&operations.iter().map(|op| op.rotation).collect_vec());
        }

        let m_opt = pass.lattice.lattice();
        let m_in = structure.lattice();
        let g_in = reciprocal_matrix(&m_in)?;
        let kgmatrix = operations
            .iter()
            .map(|op| gmatrix_convert_int(&op.rotation, &m_opt, &g_in))
            .collect::<Result<Vec<_>, _>>()?;
        let operations_input = operations
            .iter()
            .map(|op| {
                op.convert_basis(&m_opt, &m_in).map(|converted| {
                    SymmetryOperation::new(
                        converted.rotation,
                        converted.translation.map(|t| tol.wrap_translation(t)),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let atom_map = match self.atom_map.as_ref() {
            Some(map) if map.n_operations() == operations_input.len() => {
                log::debug!("Reusing the atom map of the previous step.");
                map.clone()
            }
            _ => set_atom_map(&operations_input, &structure.fractional_positions()?, tol),
        };
        self.atom_map = Some(atom_map.clone());

        let all_movable = structure.is_all_movable();
        let symmetry_enabled = if self.calculation == CalculationMode::Relax && !all_movable {
            crysym_warn!("{}", SymmetryWarning::FrozenAtoms);
            warnings.push(SymmetryWarning::FrozenAtoms);
            false
        } else {
            true
        };

        let simplified_structure = SimplifiedStructure {
            lattice_vectors: pass.lattice.vectors,
            labels: structure
                .species()
                .iter()
                .map(|sp| sp.label.clone())
                .collect_vec(),
            counts: structure.species().iter().map(|sp| sp.n_atoms()).collect_vec(),
            positions: pass.positions,
        };

        Ok(SymmetryAnalysis {
            tolerance: tol,
            trials,
            lattice: pass.lattice,
            primitive: pass.primitive,
            nrot,
            operations,
            operations_input,
            kgmatrix,
            point_group,
            space_group_point_group,
            magnetic_subtypes: pass.magnetic_subtypes,
            pricell_loop: pass.pricell_loop,
            atom_map,
            all_movable,
            symmetry_enabled,
            simplified_structure,
            warnings,
        })
    }
}
