//! One dimensional line-segment meshes for layered device stacks.
//!
//! A mesh is an ordered list of vertices, each tagged with the material region it belongs to. Vertices
//! which sit on an interface between two regions carry both region indices so that downstream assemblers
//! can pick the material properties appropriate to either side of the interface.

mod connectivity;
mod error;
mod generate;
mod mesh;
mod primitives;

pub use connectivity::*;
pub use error::MeshError;
pub use generate::*;
pub use mesh::*;
pub use primitives::*;

use nalgebra::{Point1, RealField};

/// The interface used by discretisers to walk a one dimensional mesh.
pub trait FiniteDifferenceMesh<T>
where
    T: RealField,
{
    fn number_of_nodes(&self) -> usize;
    fn get_vertices(&self) -> &[(Point1<T>, Assignment)];
    fn get_connectivity(&self) -> &[Segment1dConnectivity];
}

impl<T> FiniteDifferenceMesh<T> for Mesh1d<T>
where
    T: Copy + RealField,
{
    fn number_of_nodes(&self) -> usize {
        self.num_nodes()
    }
    fn get_vertices(&self) -> &[(Point1<T>, Assignment)] {
        self.vertices()
    }
    fn get_connectivity(&self) -> &[Segment1dConnectivity] {
        self.connectivity()
    }
}
