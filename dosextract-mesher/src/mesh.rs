use crate::{LineSegment1d, Segment1dConnectivity};
use nalgebra::{DVector, Point1, RealField};

/// The region, or regions, a vertex belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// The vertex lies inside the region with the given index
    Core(usize),
    /// The vertex lies on the interface between the regions `[left, right]`
    Boundary([usize; 2]),
}

impl Assignment {
    /// The region occupying the half-cell to the left of the vertex
    pub fn region_to_left(&self) -> usize {
        match self {
            Assignment::Core(region) => *region,
            Assignment::Boundary([left, _]) => *left,
        }
    }

    /// The region occupying the half-cell to the right of the vertex
    pub fn region_to_right(&self) -> usize {
        match self {
            Assignment::Core(region) => *region,
            Assignment::Boundary([_, right]) => *right,
        }
    }

    pub fn touches(&self, region: usize) -> bool {
        match self {
            Assignment::Core(x) => *x == region,
            Assignment::Boundary(x) => x.contains(&region),
        }
    }
}

/// A line-segment mesh, with vertices stored in strictly increasing order
#[derive(Clone, Debug)]
pub struct Mesh1d<T: RealField> {
    vertices: Vec<(Point1<T>, Assignment)>,
    connectivity: Vec<Segment1dConnectivity>,
}

impl<T> Mesh1d<T>
where
    T: Copy + RealField,
{
    pub fn num_nodes(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[(Point1<T>, Assignment)] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Segment1dConnectivity] {
        &self.connectivity
    }

    /// The coordinates of every vertex, in mesh order
    pub fn positions(&self) -> DVector<T> {
        DVector::from_iterator(self.vertices.len(), self.vertices.iter().map(|(x, _)| x.x))
    }

    /// The line segments joining consecutive vertices
    pub fn elements(&self) -> Vec<LineSegment1d<T>> {
        self.vertices
            .windows(2)
            .enumerate()
            .map(|(idx, pair)| LineSegment1d::from_vertices(&[pair[0].0, pair[1].0], &[idx, idx + 1]))
            .collect()
    }

    /// Indices of all vertices which touch `region`, including those on its interfaces
    pub fn vertices_in_region(&self, region: usize) -> Vec<usize> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, (_, assignment))| assignment.touches(region))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn from_vertices_and_connectivity(
        vertices: Vec<(Point1<T>, Assignment)>,
        connectivity: Vec<Segment1dConnectivity>,
    ) -> Self {
        Self {
            vertices,
            connectivity,
        }
    }

    /// Builds a mesh from tagged vertices, deriving the chain connectivity
    pub fn from_vertices(vertices: Vec<(Point1<T>, Assignment)>) -> Self {
        let connectivity = Segment1dConnectivity::chain(vertices.len());
        Self::from_vertices_and_connectivity(vertices, connectivity)
    }
}
