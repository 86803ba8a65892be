use crate::{Bim1d, PoissonError};
use nalgebra::{DVector, RealField};
use nalgebra_sparse::{factorization::CscCholesky, CooMatrix, CscMatrix};

/// The Jacobian `J = A - diag(M drho/dphi)` of the discrete Poisson residual.
///
/// `matrix` holds the full Jacobian. The factorised system has the contact rows and columns replaced by the
/// identity, which keeps it symmetric positive definite whenever the charge density decreases with the
/// potential.
pub struct Jacobian<T: RealField> {
    matrix: CscMatrix<T>,
    factorisation: CscCholesky<T>,
    contacts: Vec<usize>,
}

impl<T: Copy + RealField> Jacobian<T> {
    /// Construct the Jacobian from the stored operator, which describes the flux between control volumes, and the
    /// diagonal, which describes the response of the enclosed charge to the potential
    pub fn assemble(operator: &Bim1d<T>, charge_derivative: &DVector<T>) -> Result<Self, PoissonError<T>> {
        let n = operator.num_nodes();
        if charge_derivative.len() != n {
            return Err(PoissonError::Dimension {
                expected: n,
                actual: charge_derivative.len(),
            });
        }

        let mut full = CooMatrix::new(n, n);
        let mut reduced = CooMatrix::new(n, n);
        for (row, col, value) in operator.stiffness().triplet_iter() {
            let value = if row == col {
                *value - operator.mass()[row] * charge_derivative[row]
            } else {
                *value
            };
            full.push(row, col, value);
            if !operator.is_contact(row) && !operator.is_contact(col) {
                reduced.push(row, col, value);
            }
        }
        for &contact in operator.contacts() {
            reduced.push(contact, contact, T::one());
        }

        let factorisation =
            CscCholesky::factor(&CscMatrix::from(&reduced)).map_err(PoissonError::Factorisation)?;

        Ok(Self {
            matrix: CscMatrix::from(&full),
            factorisation,
            contacts: operator.contacts().to_vec(),
        })
    }

    pub fn matrix(&self) -> &CscMatrix<T> {
        &self.matrix
    }

    /// Solves the Dirichlet reduced system. Entries of `rhs` on the contacts are the prescribed values of the
    /// solution there, interior entries must already account for the coupling to those values.
    pub fn solve(&self, rhs: &DVector<T>) -> DVector<T> {
        self.factorisation.solve(rhs).column(0).into_owned()
    }

    /// The inner product of row `row` of the full Jacobian with `vector`
    pub fn row_dot(&self, row: usize, vector: &DVector<T>) -> T {
        self.matrix
            .triplet_iter()
            .filter(|(i, _, _)| *i == row)
            .fold(T::zero(), |acc, (_, j, value)| acc + *value * vector[j])
    }

    /// The small signal capacitance per unit area seen from the final contact.
    ///
    /// The final contact is raised by one volt with the first held fixed and the linearised problem is solved
    /// for the interior response. The charge induced on the final contact is the capacitance.
    pub fn capacitance(&self) -> T {
        let n = self.matrix.nrows();
        let (first, last) = (self.contacts[0], n - 1);
        let mut rhs = DVector::zeros(n);
        for (row, col, value) in self.matrix.triplet_iter() {
            if col == last && !self.contacts.contains(&row) {
                rhs[row] -= *value;
            }
        }
        rhs[first] = T::zero();
        rhs[last] = T::one();
        let response = self.solve(&rhs);
        self.row_dot(last, &response)
    }
}
