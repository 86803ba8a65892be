//! Post-processing of a bias sweep into a capacitance-voltage curve, and comparison of that curve with a
//! measured one
mod cv;
mod numerics;

pub use cv::{CvComparison, CvCurve, CvPoint, PostProcessor};
pub use numerics::{deriv, error_l2, interp1, linspace, trapz};

use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum PostProcessorError {
    #[error("Series of length {actual} cannot be paired with a series of length {expected}")]
    InconsistentDimensions { expected: usize, actual: usize },
    #[error("At least two points are needed to differentiate a curve, found {0}")]
    TooFewPoints(usize),
    #[error("The sweep produced no converged bias points")]
    EmptySweep,
}
