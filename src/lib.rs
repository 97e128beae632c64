//! # crysym: Space-Group Detection for Periodic Structures
//!
//! `crysym` determines the crystallographic symmetry of periodic structures as they are set up
//! for plane-wave electronic-structure calculations. Given three lattice vectors and the atoms in
//! the cell, it
//! - classifies the lattice into one of the fourteen Bravais types and finds an optimised
//!   conventional cell,
//! - enumerates the point-group operations of that lattice and tests each against the atomic
//!   arrangement to obtain the space-group operations together with their fractional
//!   translations,
//! - detects whether the cell is a supercell of a smaller primitive cell and constructs that
//!   primitive cell via a Hermite normal form,
//! - optionally restricts the group to operations preserving collinear magnetic moments,
//! - identifies the crystallographic point groups of the lattice and of the space group, and
//! - maps every atom onto its image under every operation.
//!
//! Along a relaxation trajectory, the tolerance of the comparisons is adjusted by a small
//! controller so that operations lost to numerical drift in the cell can be recovered.
//!
//! The detected group can then be used to symmetrise real-space and reciprocal-space densities,
//! per-atom vectors such as forces, and rank-two tensors such as stresses.
//!
//! ## Usage
//!
//! The compiled `crysym` binary takes a YAML input file:
//!
//! ```text
//! crysym --config input.yml --output crysym.out
//! ```
//!
//! Running it without `--config` writes a template input file. Within Rust, the entry point is
//! [`symmetry::symmetry_core::SymmetryAnalyser`], or the driver
//! [`drivers::space_group_detection::SpaceGroupDetectionDriver`] for a sequence of structural
//! steps.
//!
//! ## License
//!
//! GNU Lesser General Public License v3.0.

pub mod auxiliary;
pub mod drivers;
pub mod interfaces;
pub mod io;
pub mod symmetrisation;
pub mod symmetry;
