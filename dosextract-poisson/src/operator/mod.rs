//! Box integration assembly of the linear Poisson operator
//!
//! Every vertex owns a control volume reaching half way to each neighbour. The flux through the face
//! between two control volumes is `eps_face * (phi_i - phi_{i+1}) / h`, where the face permittivity is the
//! harmonic mean of the permittivity seen on either side of the face. Vertices on a material interface
//! report the permittivity of the region on the side of the face being assembled.
use crate::{PoissonError, PoissonInfoDesk};
use dosextract_mesher::FiniteDifferenceMesh;
use itertools::izip;
use nalgebra::{DVector, RealField};
use nalgebra_sparse::{CooMatrix, CscMatrix};
use std::marker::PhantomData;

/// The harmonic mean `2ab / (a + b)`, which is the flux continuous average of two permittivities
pub fn harmonic_mean<T: Copy + RealField>(a: T, b: T) -> T {
    let sum = a + b;
    if sum == T::zero() {
        T::zero()
    } else {
        (T::one() + T::one()) * a * b / sum
    }
}

/// Factory builder for a `Bim1d`
pub struct Bim1dBuilder<T, RefInfoDesk, RefMesh> {
    /// Reference to an `InfoDesk` which must impl `PoissonInfoDesk<T>`
    info_desk: RefInfoDesk,
    /// Reference to the structure mesh
    mesh: RefMesh,
    marker: PhantomData<T>,
}

impl<T> Bim1dBuilder<T, (), ()> {
    pub fn new() -> Self {
        Self {
            info_desk: (),
            mesh: (),
            marker: PhantomData,
        }
    }
}

impl<T> Default for Bim1dBuilder<T, (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, RefInfoDesk, RefMesh> Bim1dBuilder<T, RefInfoDesk, RefMesh> {
    /// Attach the info desk
    pub fn with_info_desk<InfoDesk>(self, info_desk: &InfoDesk) -> Bim1dBuilder<T, &InfoDesk, RefMesh> {
        Bim1dBuilder {
            info_desk,
            mesh: self.mesh,
            marker: PhantomData,
        }
    }
    /// Attach the mesh
    pub fn with_mesh<Mesh>(self, mesh: &Mesh) -> Bim1dBuilder<T, RefInfoDesk, &Mesh> {
        Bim1dBuilder {
            info_desk: self.info_desk,
            mesh,
            marker: PhantomData,
        }
    }
}

impl<'a, T, InfoDesk, Mesh> Bim1dBuilder<T, &'a InfoDesk, &'a Mesh>
where
    T: Copy + RealField,
    InfoDesk: PoissonInfoDesk<T>,
    Mesh: FiniteDifferenceMesh<T>,
{
    /// Assemble the stiffness matrix and the lumped charge weights
    #[tracing::instrument(name = "Bim1d assembly", level = "debug", skip_all)]
    pub fn build(self) -> Result<Bim1d<T>, PoissonError<T>> {
        let vertices = self.mesh.get_vertices();
        let connectivity = self.mesh.get_connectivity();
        let num_nodes = vertices.len();
        if num_nodes < 3 {
            return Err(PoissonError::TooFewNodes(num_nodes));
        }
        if connectivity.len() != num_nodes {
            return Err(PoissonError::Dimension {
                expected: num_nodes,
                actual: connectivity.len(),
            });
        }

        let two = T::one() + T::one();
        let mut stiffness = CooMatrix::new(num_nodes, num_nodes);
        let mut mass = DVector::zeros(num_nodes);
        let mut face_coefficients = DVector::zeros(num_nodes - 1);

        for (idx, (vertex, connection)) in izip!(vertices, connectivity).enumerate() {
            let right = match connection.right_neighbour() {
                Some(right) => right,
                None => continue,
            };
            let other = &vertices[right];
            let h = other.0.x - vertex.0.x;
            if h <= T::zero() {
                return Err(PoissonError::UnorderedMesh(idx));
            }

            let left_region = vertex.1.region_to_right();
            let right_region = other.1.region_to_left();
            let eps_face = harmonic_mean(
                self.info_desk.get_permittivity(left_region),
                self.info_desk.get_permittivity(right_region),
            );
            let coefficient = eps_face / h;
            face_coefficients[idx] = coefficient;

            stiffness.push(idx, idx, coefficient);
            stiffness.push(right, right, coefficient);
            stiffness.push(idx, right, -coefficient);
            stiffness.push(right, idx, -coefficient);

            // Each half of the segment belongs to the control volume at its end
            if self.info_desk.hosts_space_charge(left_region) {
                mass[idx] += h / two;
            }
            if self.info_desk.hosts_space_charge(right_region) {
                mass[right] += h / two;
            }
        }

        let contacts = connectivity
            .iter()
            .enumerate()
            .filter(|(_, connection)| connection.is_contact())
            .map(|(idx, _)| idx)
            .collect();

        Ok(Bim1d {
            positions: DVector::from_iterator(num_nodes, vertices.iter().map(|(x, _)| x.x)),
            stiffness: CscMatrix::from(&stiffness),
            mass,
            face_coefficients,
            contacts,
        })
    }
}

/// The assembled box integration discretisation of the linear Poisson operator.
///
/// The stiffness matrix is symmetric and tridiagonal. The lumped mass holds, for every vertex, the length of
/// its control volume lying inside regions which host space charge.
#[derive(Clone, Debug)]
pub struct Bim1d<T: RealField> {
    positions: DVector<T>,
    stiffness: CscMatrix<T>,
    mass: DVector<T>,
    face_coefficients: DVector<T>,
    contacts: Vec<usize>,
}

impl<T: Copy + RealField> Bim1d<T> {
    pub fn num_nodes(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &DVector<T> {
        &self.positions
    }

    pub fn stiffness(&self) -> &CscMatrix<T> {
        &self.stiffness
    }

    pub fn mass(&self) -> &DVector<T> {
        &self.mass
    }

    /// The coefficient `eps_face / h` of every segment
    pub fn face_coefficients(&self) -> &DVector<T> {
        &self.face_coefficients
    }

    /// Vertices carrying Dirichlet data
    pub fn contacts(&self) -> &[usize] {
        &self.contacts
    }

    pub fn is_contact(&self, vertex_index: usize) -> bool {
        self.contacts.contains(&vertex_index)
    }

    /// The product of the stiffness matrix with `potential`
    pub fn apply(&self, potential: &DVector<T>) -> DVector<T> {
        let mut output = DVector::zeros(self.num_nodes());
        for (row, col, value) in self.stiffness.triplet_iter() {
            output[row] += *value * potential[col];
        }
        output
    }

    /// The flux imbalance `A phi - M rho` of every control volume. Contact rows carry Dirichlet data and are zero.
    pub fn residual(&self, potential: &DVector<T>, charge_density: &DVector<T>) -> DVector<T> {
        let mut residual = self.apply(potential) - self.mass.component_mul(charge_density);
        for &contact in self.contacts.iter() {
            residual[contact] = T::zero();
        }
        residual
    }

    /// The flux leaving the control volume of `vertex_index` minus the charge it encloses
    pub fn net_flux(&self, vertex_index: usize, potential: &DVector<T>, charge_density: &DVector<T>) -> T {
        let flux = self
            .stiffness
            .triplet_iter()
            .filter(|(row, _, _)| *row == vertex_index)
            .fold(T::zero(), |acc, (_, col, value)| acc + *value * potential[col]);
        flux - self.mass[vertex_index] * charge_density[vertex_index]
    }
}
