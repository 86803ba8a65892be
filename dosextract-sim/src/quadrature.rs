//! Gaussian quadrature rules for the energy integrals of the density of states
//!
//! A Gauss-Hermite rule of order `n` integrates `f(x) exp(-x^2)` over the real line, a Gauss-Laguerre rule
//! integrates `f(x) exp(-x)` over the positive half line. Both are exact when `f` is a polynomial of degree
//! `2n - 1` or lower.
//!
//! The nodes are the roots of the orthogonal polynomial of degree `n`. They are found either by Newton
//! refinement of asymptotic initial guesses, with the polynomial evaluated through its three term recurrence,
//! or as the eigenvalues of the symmetric tridiagonal Jacobi matrix of the recurrence (Golub-Welsch).
use crate::error::{BuildError, QuadratureError};
use nalgebra::{linalg::SymmetricEigen, DMatrix, DVector};
use serde::Deserialize;
use std::str::FromStr;

/// pi^(-1/4), the normalisation of the zeroth orthonormal Hermite polynomial
const PI_M4: f64 = 0.7511255444649425;

/// The weight function and support a rule integrates against
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuadratureFamily {
    /// `exp(-x^2)` on the real line
    Hermite,
    /// `exp(-x)` on the positive half line
    Laguerre,
}

/// How the nodes and weights of a rule are generated
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuadratureAlgorithm {
    Iterative,
    Eigendecomposition,
}

impl Default for QuadratureAlgorithm {
    fn default() -> Self {
        Self::Iterative
    }
}

impl FromStr for QuadratureFamily {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hermite" => Ok(Self::Hermite),
            "laguerre" => Ok(Self::Laguerre),
            _ => Err(BuildError::UnknownVariant {
                kind: "quadrature family",
                name: s.to_string(),
                expected: "hermite, laguerre",
            }),
        }
    }
}

impl FromStr for QuadratureAlgorithm {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iterative" => Ok(Self::Iterative),
            "eigendecomposition" => Ok(Self::Eigendecomposition),
            _ => Err(BuildError::UnknownVariant {
                kind: "quadrature algorithm",
                name: s.to_string(),
                expected: "iterative, eigendecomposition",
            }),
        }
    }
}

/// Newton refinement settings for the iterative algorithm
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct QuadratureSettings {
    pub maximum_iterations: usize,
    /// Relative to `max(1, |z|)` for a root `z`
    pub tolerance: f64,
}

impl Default for QuadratureSettings {
    fn default() -> Self {
        Self {
            maximum_iterations: 1000,
            tolerance: 1e-14,
        }
    }
}

/// An immutable set of quadrature nodes, in ascending order, and their weights
#[derive(Clone, Debug)]
pub struct QuadratureRule {
    family: QuadratureFamily,
    nodes: DVector<f64>,
    weights: DVector<f64>,
}

impl QuadratureRule {
    #[tracing::instrument(name = "Quadrature", level = "debug", skip(settings))]
    pub fn generate(
        family: QuadratureFamily,
        order: usize,
        algorithm: QuadratureAlgorithm,
        settings: &QuadratureSettings,
    ) -> Result<Self, QuadratureError> {
        if order == 0 {
            return Err(QuadratureError::InvalidOrder(order));
        }
        let (nodes, weights) = match (family, algorithm) {
            (QuadratureFamily::Hermite, QuadratureAlgorithm::Iterative) => hermite_roots(order, settings)?,
            (QuadratureFamily::Laguerre, QuadratureAlgorithm::Iterative) => laguerre_roots(order, settings)?,
            (_, QuadratureAlgorithm::Eigendecomposition) => golub_welsch(family, order)?,
        };
        Ok(Self {
            family,
            nodes,
            weights,
        })
    }

    /// The Gauss-Hermite rule of `order` from the iterative algorithm with default settings
    pub fn gauss_hermite(order: usize) -> Result<Self, QuadratureError> {
        Self::generate(
            QuadratureFamily::Hermite,
            order,
            QuadratureAlgorithm::Iterative,
            &QuadratureSettings::default(),
        )
    }

    /// The Gauss-Laguerre rule of `order` from the iterative algorithm with default settings
    pub fn gauss_laguerre(order: usize) -> Result<Self, QuadratureError> {
        Self::generate(
            QuadratureFamily::Laguerre,
            order,
            QuadratureAlgorithm::Iterative,
            &QuadratureSettings::default(),
        )
    }

    pub fn family(&self) -> QuadratureFamily {
        self.family
    }

    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &DVector<f64> {
        &self.nodes
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Applies the rule to `f`, the integrand with the weight function removed
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.nodes
            .iter()
            .zip(self.weights.iter())
            .fold(0., |acc, (&x, &w)| acc + w * f(x))
    }
}

fn converged(z: f64, previous: f64, settings: &QuadratureSettings) -> bool {
    (z - previous).abs() <= settings.tolerance * z.abs().max(1.)
}

/// Roots of the Hermite polynomial `H_n`, found pairwise from the largest inwards
fn hermite_roots(
    order: usize,
    settings: &QuadratureSettings,
) -> Result<(DVector<f64>, DVector<f64>), QuadratureError> {
    let n = order as f64;
    let mut nodes = vec![0.; order];
    let mut weights = vec![0.; order];
    let mut z = 0.;

    for i in 0..(order + 1) / 2 {
        z = match i {
            0 => (2. * n + 1.).sqrt() - 1.85575 * (2. * n + 1.).powf(-0.16667),
            1 => z - 1.14 * n.powf(0.426) / z,
            2 => 1.86 * z - 0.86 * nodes[0],
            3 => 1.91 * z - 0.91 * nodes[1],
            _ => 2. * z - nodes[i - 2],
        };

        let mut derivative = None;
        for _ in 0..settings.maximum_iterations {
            // Orthonormal recurrence, p1 holds the degree n polynomial and p2 the degree n - 1
            let (mut p1, mut p2) = (PI_M4, 0.);
            for j in 0..order {
                let p3 = p2;
                p2 = p1;
                let j = j as f64;
                p1 = z * (2. / (j + 1.)).sqrt() * p2 - (j / (j + 1.)).sqrt() * p3;
            }
            let pp = (2. * n).sqrt() * p2;
            let previous = z;
            z = previous - p1 / pp;
            if converged(z, previous, settings) {
                derivative = Some(pp);
                break;
            }
        }
        let pp = derivative.ok_or(QuadratureError::RootNotConverged { order, root: i })?;

        nodes[i] = z;
        nodes[order - 1 - i] = -z;
        weights[i] = 2. / (pp * pp);
        weights[order - 1 - i] = weights[i];
    }

    nodes.reverse();
    weights.reverse();
    Ok((DVector::from_vec(nodes), DVector::from_vec(weights)))
}

/// Roots of the Laguerre polynomial `L_n`, found from the smallest upwards
fn laguerre_roots(
    order: usize,
    settings: &QuadratureSettings,
) -> Result<(DVector<f64>, DVector<f64>), QuadratureError> {
    let n = order as f64;
    let mut nodes = vec![0.; order];
    let mut weights = vec![0.; order];
    let mut z = 0.;

    for i in 0..order {
        z = match i {
            0 => 3. / (1. + 2.4 * n),
            1 => z + 15. / (1. + 2.5 * n),
            _ => {
                let ai = (i - 1) as f64;
                z + (1. + 2.55 * ai) / (1.9 * ai) * (z - nodes[i - 2])
            }
        };

        let mut evaluation = None;
        for _ in 0..settings.maximum_iterations {
            let (mut p1, mut p2) = (1., 0.);
            for j in 0..order {
                let p3 = p2;
                p2 = p1;
                let j = j as f64;
                p1 = ((2. * j + 1. - z) * p2 - j * p3) / (j + 1.);
            }
            let pp = (n * p1 - n * p2) / z;
            let previous = z;
            z = previous - p1 / pp;
            if converged(z, previous, settings) {
                evaluation = Some((pp, p2));
                break;
            }
        }
        let (pp, p2) = evaluation.ok_or(QuadratureError::RootNotConverged { order, root: i })?;

        nodes[i] = z;
        weights[i] = -1. / (pp * n * p2);
    }

    Ok((DVector::from_vec(nodes), DVector::from_vec(weights)))
}

/// Nodes and weights from the eigendecomposition of the Jacobi matrix.
///
/// The nodes are the eigenvalues and each weight is the zeroth moment of the weight function multiplied by
/// the square of the first component of the normalised eigenvector.
fn golub_welsch(family: QuadratureFamily, order: usize) -> Result<(DVector<f64>, DVector<f64>), QuadratureError> {
    // Recurrence coefficients a_k on the diagonal, b_k below and above it
    let coefficients = |k: usize| -> (f64, f64) {
        let k = k as f64;
        match family {
            QuadratureFamily::Hermite => (0., (k / 2.).sqrt()),
            QuadratureFamily::Laguerre => (2. * k + 1., k),
        }
    };
    let moment = match family {
        QuadratureFamily::Hermite => std::f64::consts::PI.sqrt(),
        QuadratureFamily::Laguerre => 1.,
    };

    let mut jacobi = DMatrix::zeros(order, order);
    for k in 0..order {
        let (a, b) = coefficients(k);
        jacobi[(k, k)] = a;
        if k > 0 {
            jacobi[(k, k - 1)] = b;
            jacobi[(k - 1, k)] = b;
        }
    }

    let eigen = SymmetricEigen::try_new(jacobi, f64::EPSILON, 0)
        .ok_or(QuadratureError::EigenNotConverged { order })?;

    let mut pairs = eigen
        .eigenvalues
        .iter()
        .zip(eigen.eigenvectors.row(0).iter())
        .map(|(&node, &component)| (node, moment * component * component))
        .collect::<Vec<_>>();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok((
        DVector::from_iterator(order, pairs.iter().map(|pair| pair.0)),
        DVector::from_iterator(order, pairs.iter().map(|pair| pair.1)),
    ))
}
