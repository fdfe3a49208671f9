//! compose-ir: translate one service of a compose file into a
//! cluster-oriented intermediate representation.
//!
//! Loading and interpolation live in [`core::parser`], the per-concern rules
//! in [`resolvers`], and [`core::assembler::convert_to_ir`] ties them together.

pub mod cli;
pub mod containerizer;
pub mod core;
pub mod resolvers;
