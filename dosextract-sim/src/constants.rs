// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Constants
//!
//! Defines physical constants used in the simulation

pub const BOLTZMANN: f64 = 1.3806505e-23; // The Boltzmann constant in J / K
pub const ELECTRON_CHARGE: f64 = 1.60217653e-19; // Single electron charge in C
pub const EPSILON_0: f64 = 8.854187817e-12; // Permitivitty of free space in F / m
pub const ROOM_TEMPERATURE: f64 = 300.; // Default lattice temperature in K

/// Fraction of the mesh nodes placed in the semiconductor
pub const SEMICONDUCTOR_NODE_FRACTION: f64 = 0.6;

/// The thermal voltage `k_B T / q` in V
pub fn thermal_voltage(temperature: f64) -> f64 {
    BOLTZMANN * temperature / ELECTRON_CHARGE
}
