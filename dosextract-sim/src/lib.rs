// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Dosextract solves the nonlinear Poisson equation across a trap-limited semiconductor / insulator stack
//!
//! # Overview
//! Organic and amorphous semiconductors host a broad density of localised states. Under an applied gate bias
//! these states fill according to the Fermi-Dirac occupation, so the space charge in the semiconductor is a
//! nonlinear function of the local electrostatic potential. Dosextract computes the potential profile and the
//! small signal capacitance of a metal / semiconductor / insulator / metal stack over a sweep of gate voltages,
//! and compares the simulated capacitance-voltage curve with a measured one. Fitting the density of states
//! parameters to the measurement extracts the trap distribution.
//!
//! The density of states is a superposition of up to four Gaussian components, optionally with an exponential
//! tail. The occupied density of each component is an improper integral over energy which is evaluated with
//! Gauss-Hermite or Gauss-Laguerre quadrature.
//!
//! # Usage
//! Dosextract is distributed as a binary crate. A single device is described in a `.toml` file:
//!
//! ```toml
//! simulation = 1
//!
//! [geometry]
//! semiconductor_thickness = 3.0e-8
//! insulator_thickness = 4.5e-8
//! semiconductor_permittivity = 2.9
//! insulator_permittivity = 2.5
//!
//! [electrostatics]
//! workfunction = 4.7
//! electron_affinity = 2.6
//!
//! [[dos.components]]
//! density = 1.0e27
//! spread = 4.0
//!
//! [mesh]
//! nodes = 101
//!
//! [sweep]
//! steps = 41
//! minimum_voltage = -10.0
//! maximum_voltage = 10.0
//! ```
//!
//! while a batch of devices is given as a `.csv` table whose header names the parameters of each row.
//! Solver settings such as the quadrature order and Newton tolerance are read from `.config/default.toml`.

pub mod app;
pub mod charge;
pub mod constants;
pub mod device;
pub mod dos;
mod error;
pub mod io;
pub mod params;
pub mod postprocessor;
pub mod quadrature;
pub mod sweep;

pub use error::{BuildError, IOError, QuadratureError};
