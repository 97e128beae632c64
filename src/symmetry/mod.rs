//! Lattice classification and space-group detection for periodic structures.

pub mod atom_map;
pub mod bravais;
pub mod hermite;
pub mod lattice_search;
pub mod magnetic;
pub mod point_group;
pub mod precision_control;
pub mod primitive_cell;
pub mod space_group;
pub mod symmetry_core;
pub mod symmetry_operation;
pub mod tolerance;
