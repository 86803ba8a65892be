/// The neighbours of a single vertex in a line-segment mesh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment1dConnectivity {
    /// An interior vertex, holding the indices of its left and right neighbours
    Core([usize; 2]),
    /// The first vertex of the mesh, holding the index of its right neighbour
    LeftContact([usize; 1]),
    /// The final vertex of the mesh, holding the index of its left neighbour
    RightContact([usize; 1]),
}

pub trait Connectivity {
    fn as_inner(&self) -> &[usize];
}

impl Connectivity for Segment1dConnectivity {
    fn as_inner(&self) -> &[usize] {
        match self {
            Segment1dConnectivity::Core(x) => x,
            Segment1dConnectivity::LeftContact(x) => x,
            Segment1dConnectivity::RightContact(x) => x,
        }
    }
}

impl Segment1dConnectivity {
    pub fn left_neighbour(&self) -> Option<usize> {
        match self {
            Segment1dConnectivity::Core([left, _]) => Some(*left),
            Segment1dConnectivity::LeftContact(_) => None,
            Segment1dConnectivity::RightContact([left]) => Some(*left),
        }
    }

    pub fn right_neighbour(&self) -> Option<usize> {
        match self {
            Segment1dConnectivity::Core([_, right]) => Some(*right),
            Segment1dConnectivity::LeftContact([right]) => Some(*right),
            Segment1dConnectivity::RightContact(_) => None,
        }
    }

    /// Whether the vertex lies on one of the two Dirichlet contacts
    pub fn is_contact(&self) -> bool {
        !matches!(self, Segment1dConnectivity::Core(_))
    }

    /// Builds the connectivity for a chain of `num_vertices` vertices
    pub(crate) fn chain(num_vertices: usize) -> Vec<Self> {
        if num_vertices < 2 {
            return Vec::new();
        }
        let mut connectivity = Vec::with_capacity(num_vertices);
        connectivity.push(Segment1dConnectivity::LeftContact([1]));
        for i in 1..num_vertices - 1 {
            connectivity.push(Segment1dConnectivity::Core([i - 1, i + 1]));
        }
        connectivity.push(Segment1dConnectivity::RightContact([num_vertices - 2]));
        connectivity
    }
}
