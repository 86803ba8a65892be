//! Occupied trap densities for a single component of the density of states
//!
//! A component of total density `N0` distributed in energy with density `g(E)` holds
//! `n(V) = N0 \int g(E) f(E - V) dE` electrons at potential `V`, where `f` is the Fermi-Dirac occupation.
//! Mapping the integral onto the canonical domain of a quadrature rule gives
//!
//! - Gaussian: `n = N0 / sqrt(pi) sum_i w_i f(sqrt(2) sigma x_i - V)` with a Gauss-Hermite rule
//! - Exponential: `n = N0 sum_i w_i f(lambda x_i - V)` with a Gauss-Laguerre rule
//!
//! The derivative returned with the density is the derivative of the discrete sum, so the Newton Jacobian
//! stays consistent with the residual at any quadrature order.
use crate::{
    constants::ELECTRON_CHARGE,
    error::BuildError,
    quadrature::{QuadratureFamily, QuadratureRule},
};
use serde::Deserialize;
use std::{str::FromStr, sync::Arc};

/// Exponents are clamped to this magnitude before evaluation of the occupation
const MAXIMUM_EXPONENT: f64 = 500.;

/// The parameters of one trap distribution
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct TrapComponent {
    /// Total trap density in m^-3
    pub density: f64,
    /// Width of the distribution in units of `k_B T`, the standard deviation for a Gaussian and the decay
    /// energy for an exponential tail
    pub spread: f64,
    /// Energy shift of the distribution centre in eV
    #[serde(default)]
    pub shift: f64,
}

/// The shape of the trap distributions in a density of states
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeModel {
    Gaussian,
    Exponential,
}

impl Default for ChargeModel {
    fn default() -> Self {
        Self::Gaussian
    }
}

impl FromStr for ChargeModel {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" => Ok(Self::Gaussian),
            "exponential" => Ok(Self::Exponential),
            _ => Err(BuildError::UnknownVariant {
                kind: "charge model",
                name: s.to_string(),
                expected: "gaussian, exponential",
            }),
        }
    }
}

impl ChargeModel {
    /// The quadrature family matching the support of the distribution
    pub fn quadrature_family(&self) -> QuadratureFamily {
        match self {
            ChargeModel::Gaussian => QuadratureFamily::Hermite,
            ChargeModel::Exponential => QuadratureFamily::Laguerre,
        }
    }

    /// Pairs `component` with a quadrature rule of the matching family
    pub fn build(
        &self,
        component: TrapComponent,
        rule: Arc<QuadratureRule>,
        thermal_voltage: f64,
    ) -> Result<ChargeDistribution, BuildError> {
        if rule.family() != self.quadrature_family() {
            return Err(BuildError::invalid(
                "quadrature",
                format!(
                    "a {:?} distribution needs a {:?} rule, found {:?}",
                    self,
                    self.quadrature_family(),
                    rule.family()
                ),
            ));
        }
        let occupation = Occupation {
            component,
            rule,
            thermal_voltage,
        };
        Ok(match self {
            ChargeModel::Gaussian => ChargeDistribution::Gaussian(occupation),
            ChargeModel::Exponential => ChargeDistribution::Exponential(occupation),
        })
    }
}

/// A trap component bound to its quadrature rule
#[derive(Clone, Debug)]
pub struct Occupation {
    component: TrapComponent,
    rule: Arc<QuadratureRule>,
    thermal_voltage: f64,
}

#[derive(Clone, Debug)]
pub enum ChargeDistribution {
    Gaussian(Occupation),
    Exponential(Occupation),
}

impl ChargeDistribution {
    pub fn component(&self) -> &TrapComponent {
        match self {
            ChargeDistribution::Gaussian(occupation) | ChargeDistribution::Exponential(occupation) => {
                &occupation.component
            }
        }
    }

    /// The charge density `rho = -q n` in C / m^3 and its derivative with respect to `potential`
    pub fn density(&self, potential: f64) -> (f64, f64) {
        let (occupation, scale, width) = match self {
            ChargeDistribution::Gaussian(occupation) => (
                occupation,
                occupation.component.density / std::f64::consts::PI.sqrt(),
                std::f64::consts::SQRT_2 * occupation.component.spread * occupation.thermal_voltage,
            ),
            ChargeDistribution::Exponential(occupation) => (
                occupation,
                occupation.component.density,
                occupation.component.spread * occupation.thermal_voltage,
            ),
        };
        if occupation.component.density == 0. {
            return (0., 0.);
        }
        let (n, dn) = occupation.occupied(scale, width, potential - occupation.component.shift);
        (-ELECTRON_CHARGE * n, -ELECTRON_CHARGE * dn)
    }
}

impl Occupation {
    /// The occupied density `scale sum_i w_i f(width x_i - potential)` and its derivative
    fn occupied(&self, scale: f64, width: f64, potential: f64) -> (f64, f64) {
        let thermal_voltage = self.thermal_voltage;
        self.rule
            .nodes()
            .iter()
            .zip(self.rule.weights().iter())
            .fold((0., 0.), |(n, dn), (&x, &w)| {
                let exponent =
                    ((width * x - potential) / thermal_voltage).clamp(-MAXIMUM_EXPONENT, MAXIMUM_EXPONENT);
                let e = exponent.exp();
                let occupied = 1. / (1. + e);
                let empty = e / (1. + e);
                (
                    n + w * scale * occupied,
                    dn + w * scale * occupied * empty / thermal_voltage,
                )
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::{thermal_voltage, ROOM_TEMPERATURE};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn gaussian(density: f64, spread: f64, shift: f64) -> ChargeDistribution {
        let rule = Arc::new(QuadratureRule::gauss_hermite(61).unwrap());
        ChargeModel::Gaussian
            .build(
                TrapComponent { density, spread, shift },
                rule,
                thermal_voltage(ROOM_TEMPERATURE),
            )
            .unwrap()
    }

    #[test]
    fn deep_potential_fills_every_trap() {
        let distribution = gaussian(1e24, 4., 0.);
        let (rho, drho) = distribution.density(5.);
        assert_relative_eq!(rho, -ELECTRON_CHARGE * 1e24, max_relative = 1e-10);
        assert!(drho.abs() < 1e-10 * rho.abs());
    }

    #[test]
    fn half_of_a_gaussian_is_filled_at_its_centre() {
        let distribution = gaussian(1e24, 4., 0.3);
        let (rho, _) = distribution.density(0.3);
        assert_relative_eq!(rho, -0.5 * ELECTRON_CHARGE * 1e24, max_relative = 1e-8);
    }

    #[test]
    fn empty_component_is_exactly_zero() {
        let distribution = gaussian(0., 4., -0.2);
        for potential in [-10., -0.2, 0., 1e3] {
            assert_eq!(distribution.density(potential), (0., 0.));
        }
    }

    #[test]
    fn overflowing_exponents_stay_finite() {
        let distribution = gaussian(1e24, 4., 0.);
        for potential in [-1e4, 1e4] {
            let (rho, drho) = distribution.density(potential);
            assert!(rho.is_finite() && drho.is_finite());
        }
    }

    #[test]
    fn mismatched_rule_is_rejected() {
        let rule = Arc::new(QuadratureRule::gauss_hermite(5).unwrap());
        let component = TrapComponent {
            density: 1.,
            spread: 1.,
            shift: 0.,
        };
        assert!(ChargeModel::Exponential.build(component, rule, 0.025).is_err());
    }

    #[test]
    fn unknown_model_names_are_rejected() {
        assert_eq!("Gaussian".parse::<ChargeModel>().unwrap(), ChargeModel::Gaussian);
        assert!(matches!(
            "lorentzian".parse::<ChargeModel>(),
            Err(BuildError::UnknownVariant { .. })
        ));
    }

    /// The analytic derivative and a central difference of the density at `potential`, with the tolerance
    /// allowed between them. The step is wide enough that cancellation in `rho(V + h) - rho(V - h)` stays
    /// below the truncation error.
    fn central_difference(distribution: &ChargeDistribution, potential: f64) -> (f64, f64, f64) {
        let h = 1e-4;
        let (rho, drho) = distribution.density(potential);
        let (upper, _) = distribution.density(potential + h);
        let (lower, _) = distribution.density(potential - h);
        let finite_difference = (upper - lower) / (2. * h);
        let tolerance = 1e-5 * drho.abs().max(1.) + 8. * rho.abs() * f64::EPSILON / h;
        (drho, finite_difference, tolerance)
    }

    fn distribution_for(exponential: bool, spread: f64) -> ChargeDistribution {
        let (model, rule) = if exponential {
            (ChargeModel::Exponential, QuadratureRule::gauss_laguerre(41).unwrap())
        } else {
            (ChargeModel::Gaussian, QuadratureRule::gauss_hermite(41).unwrap())
        };
        model
            .build(
                TrapComponent {
                    density: 1e24,
                    spread,
                    shift: 0.05,
                },
                Arc::new(rule),
                thermal_voltage(ROOM_TEMPERATURE),
            )
            .unwrap()
    }

    #[test]
    fn derivative_of_a_nearly_full_narrow_gaussian_matches_a_central_difference() {
        // The density is close to saturation so the difference of two densities loses most of its digits
        let distribution = distribution_for(false, 1.6385039221286306);
        let (drho, finite_difference, tolerance) = central_difference(&distribution, 0.5725283236125295);
        assert!(drho < 0.);
        assert!((drho - finite_difference).abs() <= tolerance);
    }

    proptest! {
        #[test]
        fn derivative_matches_a_central_difference(potential in -0.6f64..0.6, spread in 1f64..8., exponential in any::<bool>()) {
            let distribution = distribution_for(exponential, spread);
            let (drho, finite_difference, tolerance) = central_difference(&distribution, potential);
            prop_assert!(drho <= 0.);
            prop_assert!((drho - finite_difference).abs() <= tolerance);
        }
    }
}
