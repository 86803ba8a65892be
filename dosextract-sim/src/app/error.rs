// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Error
//! Failures of a single simulation, collected by the binary

use miette::Diagnostic;

#[derive(thiserror::Error, Debug, Diagnostic)]
pub(crate) enum DosExtractError {
    #[error(transparent)]
    #[diagnostic(code(dosextract::io_error))]
    IoError(#[from] crate::error::IOError),
    #[error(transparent)]
    Build(#[from] crate::error::BuildError),
    #[error(transparent)]
    PostProcess(#[from] crate::postprocessor::PostProcessorError),
    #[error("No row {0} in the parameter table")]
    #[diagnostic(
        code(dosextract::missing_row),
        help("rows are counted from one, excluding the header, and malformed rows are skipped")
    )]
    MissingRow(usize),
}
