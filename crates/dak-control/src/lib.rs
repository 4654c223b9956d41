//! # dak-control
//!
//! Control-file generation for the Dakota optimizer.
//!
//! Assembles the declarative input file (strategy, method, variables,
//! interface, responses) from a run configuration, with the method block
//! supplied by a [`MethodSpec`] specialization.

mod control;
mod method;

pub use control::{tabular_file_name, ControlFile, TABULAR_CONTINUATION, TABULAR_FRESH};
pub use method::{CvtTrialType, FsuDaceAlgorithm, FsuDaceMethod, MethodSpec};
