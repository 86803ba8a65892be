// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use dosextract_mesher::MeshError;
use dosextract_poisson::PoissonError;
use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised while assembling a simulation from its parameters
pub enum BuildError {
    #[error("Invalid parameter `{name}`: {reason}")]
    #[diagnostic(code(dosextract::invalid_parameter))]
    InvalidParameter { name: String, reason: String },
    #[error("Unknown {kind} `{name}`")]
    #[diagnostic(
        code(dosextract::unknown_variant),
        help("expected one of: {expected}")
    )]
    UnknownVariant {
        kind: &'static str,
        name: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Quadrature(#[from] QuadratureError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
    #[error(transparent)]
    Poisson(#[from] PoissonError<f64>),
}

impl BuildError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Error for the generation of quadrature rules
pub enum QuadratureError {
    #[error("A quadrature rule needs at least one node, requested order {0}")]
    #[diagnostic(code(dosextract::invalid_order))]
    InvalidOrder(usize),
    #[error("Root {root} of the order {order} rule did not converge")]
    RootNotConverged { order: usize, root: usize },
    #[error("Eigendecomposition of the order {order} Jacobi matrix did not converge")]
    EigenNotConverged { order: usize },
}

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Error for IO events
pub enum IOError {
    #[error("IO Failue: {0}")]
    IO(#[from] std::io::Error),
    #[error("CSV Failure: {0}")]
    Csv(#[from] csv::Error),
    #[error("Could not detect a separator in the first line of {0}")]
    #[diagnostic(help("columns must be separated by ',', tabs, ':' or spaces"))]
    UnknownSeparator(String),
    #[error("Malformed record at row {row}: {reason}")]
    #[diagnostic(code(dosextract::malformed_record))]
    MalformedRecord { row: usize, reason: String },
}
