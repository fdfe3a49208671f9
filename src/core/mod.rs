//! Core translation logic: descriptor model, loading, IR, and assembly.

pub mod assembler;
pub mod diagnostics;
pub mod error;
pub mod interpolate;
pub mod ir;
pub mod naming;
pub mod parser;
pub mod plan;
pub mod syntax;
pub mod translator;
pub mod types;
