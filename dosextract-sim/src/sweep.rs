//! Continuation of the Newton solution across a sweep of gate voltages
//!
//! The first bias point is seeded with the potential varying linearly between the two contacts. Every later
//! point is seeded with the previous converged profile plus a linear ramp of the bias increment, which keeps
//! the seed close to the solution when the voltage steps are small. The sweep stops at the first bias point
//! which fails to converge and keeps everything solved before it.
use crate::{device::Device, dos::DosModel, error::BuildError, postprocessor::trapz};
use dosextract_poisson::{Bim1d, Bim1dBuilder, NewtonSettings, NonLinearPoissonBuilder, PoissonError};
use nalgebra::DVector;
use std::marker::PhantomData;

/// The converged state at one gate voltage
#[derive(Clone, Debug)]
pub struct BiasPoint {
    /// Gate voltage in V
    pub voltage: f64,
    /// Potential at every mesh vertex in V
    pub potential: DVector<f64>,
    /// Space charge density at the semiconductor vertices in C / m^3
    pub charge_density: DVector<f64>,
    /// Small signal capacitance per unit area in F / m^2
    pub capacitance: f64,
    /// Space charge per unit area in the semiconductor in C / m^2
    pub integrated_charge: f64,
    pub iterations: usize,
}

#[derive(Debug)]
pub struct SweepFailure {
    pub voltage: f64,
    pub error: PoissonError<f64>,
}

/// Every converged bias point, in sweep order, and the failure which ended the sweep early
#[derive(Debug)]
pub struct SweepOutcome {
    pub points: Vec<BiasPoint>,
    pub failure: Option<SweepFailure>,
}

impl SweepOutcome {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Factory builder for a `BiasSweep`
pub struct BiasSweepBuilder<RefDevice, RefDos, RefSettings> {
    device: RefDevice,
    dos: RefDos,
    settings: RefSettings,
    marker: PhantomData<f64>,
}

impl BiasSweepBuilder<(), (), ()> {
    pub fn new() -> Self {
        Self {
            device: (),
            dos: (),
            settings: (),
            marker: PhantomData,
        }
    }
}

impl Default for BiasSweepBuilder<(), (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<RefDevice, RefDos, RefSettings> BiasSweepBuilder<RefDevice, RefDos, RefSettings> {
    pub fn with_device<Device>(self, device: &Device) -> BiasSweepBuilder<&Device, RefDos, RefSettings> {
        BiasSweepBuilder {
            device,
            dos: self.dos,
            settings: self.settings,
            marker: PhantomData,
        }
    }

    pub fn with_dos<Dos>(self, dos: &Dos) -> BiasSweepBuilder<RefDevice, &Dos, RefSettings> {
        BiasSweepBuilder {
            device: self.device,
            dos,
            settings: self.settings,
            marker: PhantomData,
        }
    }

    pub fn with_settings<Settings>(self, settings: &Settings) -> BiasSweepBuilder<RefDevice, RefDos, &Settings> {
        BiasSweepBuilder {
            device: self.device,
            dos: self.dos,
            settings,
            marker: PhantomData,
        }
    }
}

impl<'a> BiasSweepBuilder<&'a Device, &'a DosModel, &'a NewtonSettings<f64>> {
    /// Assembles the electrostatic operator of the device, which is shared by every bias point
    pub fn build(self) -> Result<BiasSweep<'a>, BuildError> {
        let operator = Bim1dBuilder::new()
            .with_mesh(self.device.mesh())
            .with_info_desk(self.device.info_desk())
            .build()?;
        Ok(BiasSweep {
            device: self.device,
            dos: self.dos,
            settings: self.settings,
            operator,
        })
    }
}

pub struct BiasSweep<'a> {
    device: &'a Device,
    dos: &'a DosModel,
    settings: &'a NewtonSettings<f64>,
    operator: Bim1d<f64>,
}

impl<'a> BiasSweep<'a> {
    pub fn operator(&self) -> &Bim1d<f64> {
        &self.operator
    }

    /// A potential rising linearly in position from `start` on the grounded contact to `end` on the gate
    fn ramp(&self, start: f64, end: f64) -> DVector<f64> {
        let positions = self.operator.positions();
        let (left, right) = (positions[0], positions[positions.len() - 1]);
        positions.map(|x| {
            let t = (x - left) / (right - left);
            (1. - t) * start + t * end
        })
    }

    /// Solves at each of `voltages` in turn. `contact_potential` is the potential of the grounded contact, so
    /// the gate sits at `contact_potential + voltage`.
    #[tracing::instrument(name = "Bias sweep", level = "info", skip_all)]
    pub fn run(&self, voltages: &[f64], contact_potential: f64) -> SweepOutcome {
        let semiconductor = self.device.semiconductor_vertices();
        let positions = self.operator.positions().rows(0, semiconductor.len()).into_owned();
        let n = self.operator.num_nodes();

        let mut points: Vec<BiasPoint> = Vec::with_capacity(voltages.len());
        for (idx, &voltage) in voltages.iter().enumerate() {
            let mut seed = match points.last() {
                None => self.ramp(contact_potential, contact_potential + voltage),
                Some(previous) => &previous.potential + self.ramp(0., voltage - previous.voltage),
            };
            seed[0] = contact_potential;
            seed[n - 1] = contact_potential + voltage;

            let mut solver = NonLinearPoissonBuilder::new()
                .with_operator(&self.operator)
                .with_charge_model(self.dos)
                .with_settings(self.settings)
                .build();
            let report = match solver.solve(seed) {
                Ok(report) => report,
                Err(error) => {
                    tracing::warn!("Bias point {} at {voltage} V failed: {error}", idx + 1);
                    return SweepOutcome {
                        points,
                        failure: Some(SweepFailure { voltage, error }),
                    };
                }
            };

            let charge_density = report.charge_density.rows(0, semiconductor.len()).into_owned();
            let integrated_charge = trapz(positions.as_slice(), charge_density.as_slice());
            tracing::info!(
                "Bias point {}/{} at {voltage} V converged in {} iterations, capacitance {:.6e} F/m^2",
                idx + 1,
                voltages.len(),
                report.iterations,
                report.capacitance
            );
            points.push(BiasPoint {
                voltage,
                potential: report.potential,
                charge_density,
                capacitance: report.capacitance,
                integrated_charge,
                iterations: report.iterations,
            });
        }

        SweepOutcome { points, failure: None }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        charge::ChargeModel,
        constants::{thermal_voltage, EPSILON_0, ROOM_TEMPERATURE},
        params::{test::record, ParamList},
        quadrature::QuadratureRule,
    };
    use approx::assert_relative_eq;
    use std::{convert::TryFrom, sync::Arc};

    fn dos_for(params: &ParamList) -> DosModel {
        DosModel::from_params(
            params.dos(),
            ChargeModel::Gaussian,
            Arc::new(QuadratureRule::gauss_hermite(41).unwrap()),
            thermal_voltage(ROOM_TEMPERATURE),
        )
        .unwrap()
    }

    #[test]
    fn trap_free_stack_divides_the_bias_like_series_capacitors() {
        let mut row = record();
        row.n0 = 0.;
        row.steps = 2;
        row.nodes = 31;
        let params = ParamList::try_from(row).unwrap();
        let device = Device::build(&params).unwrap();
        let dos = dos_for(&params);
        let settings = NewtonSettings::new(20, 1e-10);
        let sweep = BiasSweepBuilder::new()
            .with_device(&device)
            .with_dos(&dos)
            .with_settings(&settings)
            .build()
            .unwrap();

        let contact = params.electrostatics().contact_potential();
        let outcome = sweep.run(&params.sweep().voltages(), contact);
        assert!(outcome.is_complete());
        assert_eq!(outcome.points.len(), 2);

        let geometry = params.geometry();
        let (t_s, t_i) = (geometry.semiconductor_thickness, geometry.insulator_thickness);
        let (eps_s, eps_i) = (geometry.semiconductor_permittivity, geometry.insulator_permittivity);
        let resistance = t_s / eps_s + t_i / eps_i;
        let positions = sweep.operator().positions();

        for (point, voltage) in outcome.points.iter().zip([-1., 1.]) {
            assert_eq!(point.voltage, voltage);
            let interface = contact + voltage * (t_s / eps_s) / resistance;
            for (x, phi) in positions.iter().zip(point.potential.iter()) {
                let expected = if *x <= 0. {
                    contact + voltage * ((x + t_s) / eps_s) / resistance
                } else {
                    interface + voltage * (x / eps_i) / resistance
                };
                assert_relative_eq!(*phi, expected, epsilon = 1e-9);
            }
            assert_relative_eq!(point.capacitance, EPSILON_0 / resistance, max_relative = 1e-8);
            assert_eq!(point.integrated_charge, 0.);
            assert_eq!(point.charge_density.len(), device.semiconductor_vertices().len());
        }
    }

    #[test]
    fn trapped_charge_lowers_the_capacitance_below_the_insulator() {
        let mut row = record();
        row.steps = 6;
        row.minimum_voltage = -2.;
        row.maximum_voltage = 8.;
        let params = ParamList::try_from(row).unwrap();
        let device = Device::build(&params).unwrap();
        let dos = dos_for(&params);
        let settings = NewtonSettings::new(100, 1e-8);
        let sweep = BiasSweepBuilder::new()
            .with_device(&device)
            .with_dos(&dos)
            .with_settings(&settings)
            .build()
            .unwrap();

        let outcome = sweep.run(&params.sweep().voltages(), params.electrostatics().contact_potential());
        assert!(outcome.is_complete());

        let geometry = params.geometry();
        let insulator = EPSILON_0 * geometry.insulator_permittivity / geometry.insulator_thickness;
        let series = EPSILON_0
            / (geometry.semiconductor_thickness / geometry.semiconductor_permittivity
                + geometry.insulator_thickness / geometry.insulator_permittivity);
        for point in &outcome.points {
            assert!(point.capacitance >= series * (1. - 1e-6));
            assert!(point.capacitance <= insulator * (1. + 1e-6));
            assert!(point.integrated_charge <= 0.);
        }
        // Filling the traps pulls the charge, and the capacitance, up with the gate
        let first = &outcome.points[0];
        let last = &outcome.points[outcome.points.len() - 1];
        assert!(last.integrated_charge < first.integrated_charge);
        assert!(last.capacitance > first.capacitance);
    }

    #[test]
    fn sweep_keeps_points_before_a_failure() {
        let mut row = record();
        row.eps_ins = row.eps_semic;
        row.n0 = 1e26;
        row.steps = 2;
        row.minimum_voltage = -3.;
        row.maximum_voltage = 8.;
        let params = ParamList::try_from(row).unwrap();
        let device = Device::build(&params).unwrap();
        let dos = dos_for(&params);
        // A single step only suffices where the traps are empty and the seed is already the solution
        let settings = NewtonSettings::new(1, 1e-8);
        let sweep = BiasSweepBuilder::new()
            .with_device(&device)
            .with_dos(&dos)
            .with_settings(&settings)
            .build()
            .unwrap();

        let outcome = sweep.run(&params.sweep().voltages(), params.electrostatics().contact_potential());
        assert_eq!(outcome.points.len(), 1);
        assert_eq!(outcome.points[0].voltage, -3.);
        let failure = outcome.failure.unwrap();
        assert_eq!(failure.voltage, 8.);
        assert!(matches!(failure.error, PoissonError::NonConvergence { .. }));
    }
}
