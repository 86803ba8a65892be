//! This crate solves the nonlinear Poisson equation on a one dimensional layered stack.
//!
//! In 1-dimension the equation is
//! $ - \mathrm{d} / \mathrm{d} x \left(\epsilon \mathrm{d} \phi / \mathrm{d} x\right) = \rho(\phi)$
//!
//! The linear operator is discretised with the box integration method in [`Bim1d`], which has no knowledge
//! of the space charge. The charge enters through an implementation of [`PoissonMethods`], and the two
//! are coupled by the Newton driver [`NonLinearPoisson1d`].
mod error;
mod jacobian;
mod operator;
mod solve;

pub use error::PoissonError;
pub use jacobian::Jacobian;
pub use operator::{harmonic_mean, Bim1d, Bim1dBuilder};
pub use solve::{NewtonReport, NewtonSettings, NewtonState, NonLinearPoisson1d, NonLinearPoissonBuilder};

use nalgebra::{DVector, RealField};

/// Material information needed to assemble the electrostatic operator
pub trait PoissonInfoDesk<T: Copy + RealField> {
    /// The absolute permittivity of the region at `region_index` in F / m
    fn get_permittivity(&self, region_index: usize) -> T;
    /// Whether the region at `region_index` hosts the potential dependent space charge
    fn hosts_space_charge(&self, region_index: usize) -> bool;
}

/// A potential dependent space charge, evaluated node by node
pub trait PoissonMethods<T: Copy + RealField> {
    /// Fills `output` with the charge density at each node for the potential `solution`
    fn update_charge_density(&self, solution: &DVector<T>, output: &mut DVector<T>);
    /// Fills `output` with the derivative of the charge density with respect to the potential
    fn update_jacobian_diagonal(&self, solution: &DVector<T>, output: &mut DVector<T>);
}
