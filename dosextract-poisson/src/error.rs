use miette::Diagnostic;
use nalgebra::RealField;
use nalgebra_sparse::factorization::CholeskyError;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Errors raised while assembling or solving the Poisson problem
pub enum PoissonError<T: RealField> {
    #[error("newton iteration failed to converge in {iterations} iterations, last update norm {update_norm}")]
    #[diagnostic(help("raise the iteration cap or refine the seed potential"))]
    NonConvergence { iterations: usize, update_norm: T },
    #[error("expected a vector of length {expected}, found {actual}")]
    Dimension { expected: usize, actual: usize },
    #[error("the mesh needs at least three vertices, found {0}")]
    TooFewNodes(usize),
    #[error("mesh vertex {0} does not lie to the left of its successor")]
    UnorderedMesh(usize),
    #[error("failed to factorise the jacobian: {0:?}")]
    Factorisation(CholeskyError),
}
