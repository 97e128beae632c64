use std::fmt;

use anyhow::{bail, format_err};
use derive_builder::Builder;
use itertools::Itertools;
use log;
use serde::{Deserialize, Serialize};

use crate::auxiliary::structure::Structure;
use crate::drivers::CrysymDriver;
use crate::io::format::{
    crysym_error, crysym_output, log_block_begin, log_block_end, log_subtitle, log_title, nice_bool,
    CrysymOutput,
};
use crate::io::{write_crysym_binary, CrysymFileType};
use crate::symmetry::symmetry_core::{CalculationMode, SymmetryAnalyser, SymmetryAnalysis};


// ==================
// Struct definitions
// ==================

// ----------
// Parameters
// ----------

fn default_symmetry_prec() -> f64 {
    1e-6
}

fn default_nspin() -> usize {
    1
}

fn default_calculation() -> CalculationMode {
    CalculationMode::Scf
}

/// A structure containing control parameters for space-group detection.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct SpaceGroupDetectionParams {
    /// The tolerance for all geometric comparisons, in the units of the lattice vectors.
    #[builder(default = "default_symmetry_prec()")]
    #[serde(default = "default_symmetry_prec")]
    pub symmetry_prec: f64,

    /// The number of spin channels. With two channels and unequal moments within a species, the
    /// space group is restricted to operations preserving the magnetic sub-types.
    #[builder(default = "default_nspin()")]
    #[serde(default = "default_nspin")]
    pub nspin: usize,

    /// The kind of calculation the structures belong to.
    #[builder(default = "default_calculation()")]
    #[serde(default = "default_calculation")]
    pub calculation: CalculationMode,

    /// Boolean indicating if the space-group operations are to be written to the output.
    #[builder(default = "false")]
    #[serde(default)]
    pub write_operations: bool,

    /// Optional name for saving the result as a binary file of type [`CrysymFileType::Sym`]. If
    /// `None`, the result will not be saved.
    #[builder(default = "None")]
    #[serde(default)]
    pub result_save_name: Option<String>,
}

impl SpaceGroupDetectionParams {
    /// Returns a builder to construct a [`SpaceGroupDetectionParams`] structure.
    pub fn builder() -> SpaceGroupDetectionParamsBuilder {
        SpaceGroupDetectionParamsBuilder::default()
    }
}

impl Default for SpaceGroupDetectionParams {
    fn default() -> Self {
        Self {
            symmetry_prec: default_symmetry_prec(),
            nspin: default_nspin(),
            calculation: default_calculation(),
            write_operations: false,
            result_save_name: None,
        }
    }
}

impl fmt::Display for SpaceGroupDetectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Symmetry tolerance: {:.3e}", self.symmetry_prec)?;
        writeln!(f, "Number of spin channels: {}", self.nspin)?;
        writeln!(f, "Calculation: {}", self.calculation)?;
        writeln!(
            f,
            "Report space-group operations: {}",
            nice_bool(self.write_operations)
        )?;
        writeln!(
            f,
            "Save space-group detection results to file: {}",
            if let Some(name) = self.result_save_name.as_ref() {
                format!("{name}{}", CrysymFileType::Sym.ext())
            } else {
                nice_bool(false)
            }
        )?;
        writeln!(f)?;
        Ok(())
    }
}

// ------
// Result
// ------

/// A structure to contain space-group detection results.
#[derive(Clone, Builder, Debug, Serialize, Deserialize)]
pub struct SpaceGroupDetectionResult {
    /// The control parameters used to obtain this set of results.
    pub parameters: SpaceGroupDetectionParams,

    /// The analyses of the structural steps, in order.
    pub analyses: Vec<SymmetryAnalysis>,
}

impl SpaceGroupDetectionResult {
    /// Returns a builder to construct a [`SpaceGroupDetectionResult`] structure.
    fn builder() -> SpaceGroupDetectionResultBuilder {
        SpaceGroupDetectionResultBuilder::default()
    }

    /// The analysis of the last structural step.
    pub fn last(&self) -> Option<&SymmetryAnalysis> {
        self.analyses.last()
    }
}

impl fmt::Display for SpaceGroupDetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count_length = self.analyses.len().to_string().len().max(1);
        writeln!(f, "{}", "┈".repeat(count_length + 66))?;
        writeln!(
            f,
            "{:>width$} {:>11} {:>14} {:>14} {:>8} {:>6} {:>8}",
            "#",
            "Tolerance",
            "Point group",
            "Space PG",
            "Ops",
            "Cells",
            "Enabled",
            width = count_length
        )?;
        writeln!(f, "{}", "┈".repeat(count_length + 66))?;
        for (i, analysis) in self.analyses.iter().enumerate() {
            writeln!(
                f,
                "{:>width$} {:>11.3e} {:>14} {:>14} {:>8} {:>6} {:>8}",
                i + 1,
                analysis.tolerance.epsilon,
                analysis
                    .point_group
                    .as_ref()
                    .map_or_else(|| "?".to_string(), |pg| pg.schoenflies.clone()),
                analysis
                    .space_group_point_group
                    .as_ref()
                    .map_or_else(|| "?".to_string(), |pg| pg.schoenflies.clone()),
                analysis.nrotk(),
                analysis.primitive.ncell,
                nice_bool(analysis.symmetry_enabled),
                width = count_length
            )?;
        }
        writeln!(f, "{}", "┈".repeat(count_length + 66))?;
        writeln!(f)?;

        if self.parameters.write_operations {
            if let Some(analysis) = self.last() {
                writeln!(
                    f,
                    "Space-group operations of the last step (input lattice basis):"
                )?;
                for (i, op) in analysis.operations_input.iter().enumerate() {
                    writeln!(f, "Operation {}:", i + 1)?;
                    write!(f, "{op}")?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

// ------
// Driver
// ------

/// A driver for space-group detection along a sequence of structural steps.
#[derive(Clone, Builder)]
pub struct SpaceGroupDetectionDriver<'a> {
    /// The control parameters for space-group detection.
    parameters: &'a SpaceGroupDetectionParams,

    /// The structures to be analysed, one per structural step. A single-point calculation has
    /// just one.
    structures: &'a [Structure],

    /// The result of the space-group detection.
    #[builder(setter(skip), default = "None")]
    result: Option<SpaceGroupDetectionResult>,
}

impl<'a> SpaceGroupDetectionDriver<'a> {
    /// Returns a builder to construct a [`SpaceGroupDetectionDriver`] structure.
    pub fn builder() -> SpaceGroupDetectionDriverBuilder<'a> {
        SpaceGroupDetectionDriverBuilder::default()
    }

    /// Executes space-group detection.
    fn detect_space_group(&mut self) -> Result<(), anyhow::Error> {
        log_title("Space-Group Detection");
        crysym_output!("");
        let params = self.parameters;
        params.log_output_display();

        if self.structures.is_empty() {
            bail!("No structures are specified for space-group detection.");
        }

        let mut analyser = SymmetryAnalyser::builder()
            .symmetry_prec(params.symmetry_prec)
            .nspin(params.nspin)
            .calculation(params.calculation)
            .build()
            .map_err(|err| format_err!(err))?;

        let analyses = self
            .structures
            .iter()
            .enumerate()
            .map(|(i, structure)| {
                let step = format!("Structural step {}", i + 1);
                log_block_begin(&step);
                crysym_output!("");
                structure.log_output_display();
                crysym_output!("");
                let analysis = analyser.analyse(structure).map_err(|err| {
                    crysym_error!("Space-group detection failed at step {}: {err}", i + 1);
                    err
                })?;
                analysis.log_output_display();
                log_block_end(&step);
                crysym_output!("");
                log::debug!(
                    "Step {}: {} trial(s), tolerance {:.3e}.",
                    i + 1,
                    analysis.trials.len(),
                    analysis.tolerance.epsilon
                );
                Ok::<_, anyhow::Error>(analysis)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = SpaceGroupDetectionResult::builder()
            .parameters(params.clone())
            .analyses(analyses)
            .build()
            .map_err(|err| format_err!(err))?;

        log_subtitle("Space-group detection summary");
        crysym_output!("");
        result.log_output_display();
        let nwarnings = result
            .analyses
            .iter()
            .map(|analysis| analysis.warnings.len())
            .sum::<usize>();
        if nwarnings > 0 {
            crysym_output!(
                "{nwarnings} warning(s) raised: {}.",
                result
                    .analyses
                    .iter()
                    .flat_map(|analysis| analysis.warnings.iter())
                    .map(ToString::to_string)
                    .unique()
                    .join(" ")
            );
            crysym_output!("");
        }

        // Save space-group detection result, if requested
        if let Some(name) = params.result_save_name.as_ref() {
            write_crysym_binary(name, CrysymFileType::Sym, &result)?;
            crysym_output!(
                "Space-group detection results saved as {name}{}.",
                CrysymFileType::Sym.ext()
            );
            crysym_output!("");
        }

        self.result = Some(result);
        Ok(())
    }
}

impl CrysymDriver for SpaceGroupDetectionDriver<'_> {
    type Params = SpaceGroupDetectionParams;

    type Outcome = SpaceGroupDetectionResult;

    fn result(&self) -> Result<&Self::Outcome, anyhow::Error> {
        self.result
            .as_ref()
            .ok_or_else(|| format_err!("No space-group detection results found."))
    }

    fn run(&mut self) -> Result<(), anyhow::Error> {
        self.detect_space_group()
    }
}
