//! Newton iteration for the nonlinear Poisson problem at a single bias point
use crate::{Bim1d, Jacobian, PoissonError, PoissonMethods};
use nalgebra::{DVector, RealField};
use std::marker::PhantomData;

/// Where the Newton driver is in its life cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NewtonState {
    /// A seed potential has been set but no step has been taken
    Initialized,
    Iterating,
    /// The update norm fell below the tolerance
    Converged,
    /// The iteration cap was reached, or the residual became non-finite
    Diverged,
}

/// Convergence and damping settings for the Newton iteration
#[derive(Clone, Debug)]
pub struct NewtonSettings<T> {
    maximum_iterations: usize,
    tolerance: T,
    armijo_parameter: T,
    minimum_step: T,
    maximum_update: Option<T>,
}

impl<T: Copy + RealField> NewtonSettings<T> {
    pub fn new(maximum_iterations: usize, tolerance: T) -> Self {
        Self {
            maximum_iterations,
            tolerance,
            armijo_parameter: nalgebra::convert(1e-4),
            minimum_step: nalgebra::convert(1. / 1024.),
            maximum_update: None,
        }
    }

    pub fn with_armijo_parameter(mut self, armijo_parameter: T) -> Self {
        self.armijo_parameter = armijo_parameter;
        self
    }

    pub fn with_minimum_step(mut self, minimum_step: T) -> Self {
        self.minimum_step = minimum_step;
        self
    }

    /// Caps the largest entry of each Newton update, in volts
    pub fn with_maximum_update(mut self, maximum_update: Option<T>) -> Self {
        self.maximum_update = maximum_update;
        self
    }

    pub fn maximum_iterations(&self) -> usize {
        self.maximum_iterations
    }

    pub fn tolerance(&self) -> T {
        self.tolerance
    }

    pub fn armijo_parameter(&self) -> T {
        self.armijo_parameter
    }

    pub fn minimum_step(&self) -> T {
        self.minimum_step
    }

    pub fn maximum_update(&self) -> Option<T> {
        self.maximum_update
    }
}

/// The outcome of a converged Newton solve
#[derive(Clone, Debug)]
pub struct NewtonReport<T: RealField> {
    /// The converged potential at every vertex
    pub potential: DVector<T>,
    /// The space charge density at the converged potential
    pub charge_density: DVector<T>,
    /// Number of Newton steps taken, including the one that met the tolerance
    pub iterations: usize,
    /// The residual norm at the start of every iteration
    pub residual_norms: Vec<T>,
    /// The maximum norm of every Newton update
    pub update_norms: Vec<T>,
    /// Small signal capacitance per unit area seen from the final contact
    pub capacitance: T,
    /// Charge per unit area induced on the final contact
    pub contact_charge: T,
}

/// Factory builder for a `NonLinearPoisson1d`
pub struct NonLinearPoissonBuilder<T, RefOperator, RefCharge, RefSettings> {
    operator: RefOperator,
    charge: RefCharge,
    settings: RefSettings,
    marker: PhantomData<T>,
}

impl<T> NonLinearPoissonBuilder<T, (), (), ()> {
    pub fn new() -> Self {
        Self {
            operator: (),
            charge: (),
            settings: (),
            marker: PhantomData,
        }
    }
}

impl<T> Default for NonLinearPoissonBuilder<T, (), (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, RefOperator, RefCharge, RefSettings> NonLinearPoissonBuilder<T, RefOperator, RefCharge, RefSettings> {
    /// Attach the assembled linear operator
    pub fn with_operator<Operator>(
        self,
        operator: &Operator,
    ) -> NonLinearPoissonBuilder<T, &Operator, RefCharge, RefSettings> {
        NonLinearPoissonBuilder {
            operator,
            charge: self.charge,
            settings: self.settings,
            marker: PhantomData,
        }
    }

    /// Attach the model providing the space charge and its derivative
    pub fn with_charge_model<Charge>(
        self,
        charge: &Charge,
    ) -> NonLinearPoissonBuilder<T, RefOperator, &Charge, RefSettings> {
        NonLinearPoissonBuilder {
            operator: self.operator,
            charge,
            settings: self.settings,
            marker: PhantomData,
        }
    }

    pub fn with_settings<Settings>(
        self,
        settings: &Settings,
    ) -> NonLinearPoissonBuilder<T, RefOperator, RefCharge, &Settings> {
        NonLinearPoissonBuilder {
            operator: self.operator,
            charge: self.charge,
            settings,
            marker: PhantomData,
        }
    }
}

impl<'a, T, Charge> NonLinearPoissonBuilder<T, &'a Bim1d<T>, &'a Charge, &'a NewtonSettings<T>>
where
    T: Copy + RealField,
    Charge: PoissonMethods<T>,
{
    pub fn build(self) -> NonLinearPoisson1d<'a, T, Charge> {
        NonLinearPoisson1d {
            operator: self.operator,
            charge: self.charge,
            settings: self.settings,
            state: NewtonState::Initialized,
        }
    }
}

/// Couples the linear operator to a nonlinear space charge and iterates the potential to convergence
pub struct NonLinearPoisson1d<'a, T: RealField, Charge> {
    operator: &'a Bim1d<T>,
    charge: &'a Charge,
    settings: &'a NewtonSettings<T>,
    state: NewtonState,
}

/// A candidate potential with its residual, produced by the line search
struct Step<T: RealField> {
    potential: DVector<T>,
    residual: DVector<T>,
    residual_norm: T,
}

impl<'a, T, Charge> NonLinearPoisson1d<'a, T, Charge>
where
    T: Copy + RealField,
    Charge: PoissonMethods<T>,
{
    pub fn state(&self) -> NewtonState {
        self.state
    }

    pub fn operator(&self) -> &Bim1d<T> {
        self.operator
    }

    /// Iterates from `seed` until the update norm falls below the tolerance.
    ///
    /// The contact values of `seed` are the Dirichlet data and are never updated.
    #[tracing::instrument(name = "Newton", level = "debug", skip_all)]
    pub fn solve(&mut self, seed: DVector<T>) -> Result<NewtonReport<T>, PoissonError<T>> {
        let n = self.operator.num_nodes();
        if seed.len() != n {
            return Err(PoissonError::Dimension {
                expected: n,
                actual: seed.len(),
            });
        }
        self.state = NewtonState::Initialized;

        let mut charge_derivative = DVector::zeros(n);
        let mut step = self.evaluate(seed);
        let mut residual_norms = Vec::new();
        let mut update_norms = Vec::new();

        for iteration in 1..=self.settings.maximum_iterations() {
            self.state = NewtonState::Iterating;
            residual_norms.push(step.residual_norm);
            if !step.residual_norm.is_finite() {
                tracing::warn!("Residual became non-finite at iteration {iteration}");
                self.state = NewtonState::Diverged;
                return Err(PoissonError::NonConvergence {
                    iterations: iteration,
                    update_norm: step.residual_norm,
                });
            }

            self.charge
                .update_jacobian_diagonal(&step.potential, &mut charge_derivative);
            let jacobian = Jacobian::assemble(self.operator, &charge_derivative)?;
            // The residual vanishes on the contacts, so the update does too
            let mut update = -jacobian.solve(&step.residual);
            let update_norm = update.amax();
            update_norms.push(update_norm);
            tracing::trace!(
                "Iteration {iteration}: residual {}, update {}",
                step.residual_norm,
                update_norm
            );

            if update_norm < self.settings.tolerance() {
                let potential = step.potential + update;
                self.state = NewtonState::Converged;
                tracing::debug!("Converged in {iteration} iterations");
                return self.report(potential, iteration, residual_norms, update_norms);
            }

            if let Some(maximum_update) = self.settings.maximum_update() {
                if update_norm > maximum_update {
                    update *= maximum_update / update_norm;
                }
            }
            step = self.line_search(&step, &update);
        }

        self.state = NewtonState::Diverged;
        Err(PoissonError::NonConvergence {
            iterations: self.settings.maximum_iterations(),
            update_norm: update_norms.last().copied().unwrap_or_else(T::zero),
        })
    }

    fn evaluate(&self, potential: DVector<T>) -> Step<T> {
        let mut charge_density = DVector::zeros(potential.len());
        self.charge
            .update_charge_density(&potential, &mut charge_density);
        let residual = self.operator.residual(&potential, &charge_density);
        let residual_norm = residual.norm();
        Step {
            potential,
            residual,
            residual_norm,
        }
    }

    /// Backtracks along `update` until the residual norm satisfies the Armijo condition
    /// `|r(phi + a du)| <= (1 - c a) |r(phi)|`, halving `a` down to the minimum step.
    fn line_search(&self, current: &Step<T>, update: &DVector<T>) -> Step<T> {
        let half: T = nalgebra::convert(0.5);
        let mut alpha = T::one();
        loop {
            let trial = self.evaluate(&current.potential + update * alpha);
            let sufficient = (T::one() - self.settings.armijo_parameter() * alpha) * current.residual_norm;
            if trial.residual_norm.is_finite() && trial.residual_norm <= sufficient {
                return trial;
            }
            if alpha * half < self.settings.minimum_step() {
                tracing::debug!("Line search stopped at the minimum step {alpha}");
                return trial;
            }
            alpha *= half;
        }
    }

    fn report(
        &self,
        potential: DVector<T>,
        iterations: usize,
        residual_norms: Vec<T>,
        update_norms: Vec<T>,
    ) -> Result<NewtonReport<T>, PoissonError<T>> {
        let n = potential.len();
        let mut charge_density = DVector::zeros(n);
        let mut charge_derivative = DVector::zeros(n);
        self.charge
            .update_charge_density(&potential, &mut charge_density);
        self.charge
            .update_jacobian_diagonal(&potential, &mut charge_derivative);

        let capacitance = Jacobian::assemble(self.operator, &charge_derivative)?.capacitance();
        let contact_charge = self
            .operator
            .net_flux(n - 1, &potential, &charge_density);

        Ok(NewtonReport {
            potential,
            charge_density,
            iterations,
            residual_norms,
            update_norms,
            capacitance,
            contact_charge,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{NewtonSettings, NewtonState, NonLinearPoissonBuilder};
    use crate::test_support::{ScreeningCharge, TwoLayerDesk, UniformCharge};
    use crate::{Bim1d, Bim1dBuilder, PoissonError};
    use approx::assert_relative_eq;
    use dosextract_mesher::{create_line_segment_mesh_1d_from_regions, create_unit_line_segment_mesh_1d};
    use nalgebra::DVector;

    fn unit_operator(cells: usize) -> Bim1d<f64> {
        let desk = TwoLayerDesk {
            permittivity: [1.0, 1.0],
            charged: [true, true],
        };
        let mesh = create_unit_line_segment_mesh_1d::<f64>(cells).unwrap();
        Bim1dBuilder::new().with_mesh(&mesh).with_info_desk(&desk).build().unwrap()
    }

    fn ramp(operator: &Bim1d<f64>, left: f64, right: f64) -> DVector<f64> {
        let positions = operator.positions();
        let (start, end) = (positions[0], positions[positions.len() - 1]);
        positions.map(|x| left + (right - left) * (x - start) / (end - start))
    }

    #[test]
    fn uniform_charge_satisfies_the_discrete_balance() {
        let operator = unit_operator(20);
        let charge = UniformCharge(3.0);
        let settings = NewtonSettings::new(10, 1e-10);
        let mut solver = NonLinearPoissonBuilder::new()
            .with_operator(&operator)
            .with_charge_model(&charge)
            .with_settings(&settings)
            .build();
        assert_eq!(solver.state(), NewtonState::Initialized);

        let report = solver.solve(DVector::zeros(operator.num_nodes())).unwrap();
        assert_eq!(solver.state(), NewtonState::Converged);

        let residual = operator.residual(&report.potential, &report.charge_density);
        assert!(residual.amax() < 1e-10);
        // A quadratic is reproduced exactly at the vertices of a uniform mesh
        for (phi, x) in report.potential.iter().zip(operator.positions().iter()) {
            assert_relative_eq!(*phi, 1.5 * x * (1. - x), epsilon = 1e-12);
        }
    }

    #[test]
    fn residual_decreases_monotonically_for_a_screening_charge() {
        let operator = unit_operator(40);
        let charge = ScreeningCharge(50.0);
        let settings = NewtonSettings::new(50, 1e-10);
        let mut solver = NonLinearPoissonBuilder::new()
            .with_operator(&operator)
            .with_charge_model(&charge)
            .with_settings(&settings)
            .build();

        let report = solver.solve(ramp(&operator, 0., 4.)).unwrap();
        assert!(report.iterations >= 4);
        for pair in report.residual_norms.windows(2).take(3) {
            assert!(pair[1] < pair[0]);
        }
        assert_relative_eq!(report.potential[0], 0.);
        assert_relative_eq!(report.potential[40], 4.);
    }

    #[test]
    fn resolving_from_a_converged_potential_takes_one_iteration() {
        let operator = unit_operator(30);
        let charge = ScreeningCharge(20.0);
        let settings = NewtonSettings::new(50, 1e-9);
        let mut solver = NonLinearPoissonBuilder::new()
            .with_operator(&operator)
            .with_charge_model(&charge)
            .with_settings(&settings)
            .build();

        let first = solver.solve(ramp(&operator, 0., 2.)).unwrap();
        let second = solver.solve(first.potential.clone()).unwrap();
        assert_eq!(second.iterations, 1);
        assert!(second.update_norms[0] < 1e-9);
    }

    #[test]
    fn iteration_cap_is_reported_as_non_convergence() {
        let operator = unit_operator(30);
        let charge = ScreeningCharge(50.0);
        let settings = NewtonSettings::new(1, 1e-12);
        let mut solver = NonLinearPoissonBuilder::new()
            .with_operator(&operator)
            .with_charge_model(&charge)
            .with_settings(&settings)
            .build();

        let result = solver.solve(ramp(&operator, 0., 4.));
        assert!(matches!(
            result,
            Err(PoissonError::NonConvergence { iterations: 1, .. })
        ));
        assert_eq!(solver.state(), NewtonState::Diverged);
    }

    #[test]
    fn charge_free_stack_divides_the_bias_like_series_capacitors() {
        let desk = TwoLayerDesk {
            permittivity: [11.7, 3.9],
            charged: [true, false],
        };
        let mesh = create_line_segment_mesh_1d_from_regions(-2f64, &[(2.0, 10), (1.0, 6)]).unwrap();
        let operator = Bim1dBuilder::new().with_mesh(&mesh).with_info_desk(&desk).build().unwrap();
        let charge = UniformCharge(0.0);
        let settings = NewtonSettings::new(10, 1e-12);
        let mut solver = NonLinearPoissonBuilder::new()
            .with_operator(&operator)
            .with_charge_model(&charge)
            .with_settings(&settings)
            .build();

        let report = solver.solve(ramp(&operator, 0., 1.)).unwrap();
        let interface = (2. / 11.7) / (2. / 11.7 + 1. / 3.9);
        assert_relative_eq!(report.potential[10], interface, max_relative = 1e-10);
        assert_relative_eq!(
            report.capacitance,
            1. / (2. / 11.7 + 1. / 3.9),
            max_relative = 1e-10
        );
        assert_relative_eq!(report.contact_charge, report.capacitance, max_relative = 1e-10);
    }

    #[test]
    fn seeds_of_the_wrong_length_are_rejected() {
        let operator = unit_operator(8);
        let charge = UniformCharge(0.0);
        let settings = NewtonSettings::new(10, 1e-10);
        let mut solver = NonLinearPoissonBuilder::new()
            .with_operator(&operator)
            .with_charge_model(&charge)
            .with_settings(&settings)
            .build();
        assert!(matches!(
            solver.solve(DVector::zeros(4)),
            Err(PoissonError::Dimension { expected: 9, actual: 4 })
        ));
    }
}
