//! The density of states as a superposition of trap distributions
use crate::{
    charge::{ChargeDistribution, ChargeModel, TrapComponent},
    error::BuildError,
    params::DensityOfStates,
    quadrature::QuadratureRule,
};
use dosextract_poisson::PoissonMethods;
use nalgebra::DVector;
use std::sync::Arc;

/// The largest number of Gaussian components a density of states may hold
pub const MAXIMUM_COMPONENTS: usize = 4;

/// An ordered set of trap distributions sharing a single quadrature rule
#[derive(Clone, Debug)]
pub struct DosModel {
    components: Vec<ChargeDistribution>,
}

impl DosModel {
    /// Builds the components selected by `model` from the parameter snapshot.
    ///
    /// A Gaussian model uses every entry of `dos.components`, an exponential model uses the tail in
    /// `dos.exponential`.
    pub fn from_params(
        dos: &DensityOfStates,
        model: ChargeModel,
        rule: Arc<QuadratureRule>,
        thermal_voltage: f64,
    ) -> Result<Self, BuildError> {
        let components: Vec<TrapComponent> = match model {
            ChargeModel::Gaussian => dos.components.clone(),
            ChargeModel::Exponential => vec![dos.exponential.ok_or_else(|| {
                BuildError::invalid("dos.exponential", "an exponential model needs an exponential tail")
            })?],
        };
        Self::new(model, &components, rule, thermal_voltage)
    }

    pub fn new(
        model: ChargeModel,
        components: &[TrapComponent],
        rule: Arc<QuadratureRule>,
        thermal_voltage: f64,
    ) -> Result<Self, BuildError> {
        if components.is_empty() || components.len() > MAXIMUM_COMPONENTS {
            return Err(BuildError::invalid(
                "dos.components",
                format!(
                    "between 1 and {MAXIMUM_COMPONENTS} components are supported, found {}",
                    components.len()
                ),
            ));
        }
        let components = components
            .iter()
            .map(|component| model.build(*component, rule.clone(), thermal_voltage))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }

    pub fn components(&self) -> &[ChargeDistribution] {
        &self.components
    }

    /// The total charge density at `potential` and its derivative with respect to the potential
    pub fn total_charge(&self, potential: f64) -> (f64, f64) {
        self.components
            .iter()
            .map(|component| component.density(potential))
            .fold((0., 0.), |(rho, drho), (r, dr)| (rho + r, drho + dr))
    }
}

impl PoissonMethods<f64> for DosModel {
    fn update_charge_density(&self, solution: &DVector<f64>, output: &mut DVector<f64>) {
        for (out, &potential) in output.iter_mut().zip(solution.iter()) {
            *out = self.total_charge(potential).0;
        }
    }

    fn update_jacobian_diagonal(&self, solution: &DVector<f64>, output: &mut DVector<f64>) {
        for (out, &potential) in output.iter_mut().zip(solution.iter()) {
            *out = self.total_charge(potential).1;
        }
    }
}
