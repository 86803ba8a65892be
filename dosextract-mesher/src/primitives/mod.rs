use nalgebra::{Point1, RealField};

pub trait ElementMethods<T: RealField> {
    fn vertex_indices(&self) -> &[usize];
    fn midpoint(&self) -> Point1<T>;
    fn diameter(&self) -> T;
}

/// A single element of a line-segment mesh
#[derive(Clone, Debug)]
pub struct LineSegment1d<T>
where
    T: RealField,
{
    vertices: [Point1<T>; 2],
    vertex_indices: [usize; 2],
}

impl<T> LineSegment1d<T>
where
    T: Copy + RealField,
{
    pub fn from_vertices(vertices: &[Point1<T>; 2], vertex_indices: &[usize; 2]) -> Self {
        Self {
            vertices: vertices.to_owned(),
            vertex_indices: vertex_indices.to_owned(),
        }
    }
}

impl<T: Copy + RealField> ElementMethods<T> for LineSegment1d<T> {
    fn midpoint(&self) -> Point1<T> {
        Point1::new((self.vertices[0].x + self.vertices[1].x) / (T::one() + T::one()))
    }
    fn vertex_indices(&self) -> &[usize] {
        &self.vertex_indices
    }
    fn diameter(&self) -> T {
        (self.vertices[0].x - self.vertices[1].x).abs()
    }
}
