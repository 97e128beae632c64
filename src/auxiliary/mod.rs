//! Helper items to describe periodic structures.

pub mod geometry;
pub mod structure;
