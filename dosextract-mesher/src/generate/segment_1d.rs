use crate::error::MeshError;
use crate::mesh::{Assignment, Mesh1d};
use nalgebra::{Point1, RealField};

/// A uniform mesh of the unit interval assigned entirely to region 0
pub fn create_unit_line_segment_mesh_1d<T>(cells: usize) -> Result<Mesh1d<T>, MeshError>
where
    T: Copy + RealField,
{
    create_line_segment_mesh_1d_from_regions(T::zero(), &[(T::one(), cells)])
}

/// Builds a mesh from consecutive regions, each described by its `(width, cells)`.
///
/// Every region is meshed uniformly starting at `left`. The vertex shared by two neighbouring regions
/// appears once and is assigned as a `Boundary` between them, so region interfaces always coincide with
/// a mesh vertex.
pub fn create_line_segment_mesh_1d_from_regions<T>(
    left: T,
    regions: &[(T, usize)],
) -> Result<Mesh1d<T>, MeshError>
where
    T: Copy + RealField,
{
    if regions.is_empty() {
        return Err(MeshError::NoRegions);
    }

    let mut meshes = Vec::with_capacity(regions.len());
    let mut left = left;
    for (region, &(width, cells)) in regions.iter().enumerate() {
        if width <= T::zero() {
            return Err(MeshError::NonPositiveWidth {
                region,
                width: width.to_subset().unwrap_or(f64::NAN),
            });
        }
        if cells == 0 {
            return Err(MeshError::EmptyRegion(region));
        }
        meshes.push(uniform_region(left, width, cells, region));
        left += width;
    }

    Ok(Mesh1d::dedup(meshes))
}

fn uniform_region<T>(left: T, width: T, cells: usize, region: usize) -> Vec<(Point1<T>, Assignment)>
where
    T: Copy + RealField,
{
    let cell_size = width / nalgebra::convert::<f64, T>(cells as f64);
    (0..=cells)
        .map(|i| {
            // The final vertex is pinned so accumulated rounding cannot move the interface
            let x = if i == cells {
                left + width
            } else {
                left + nalgebra::convert::<f64, T>(i as f64) * cell_size
            };
            (Point1::new(x), Assignment::Core(region))
        })
        .collect()
}

impl<T> Mesh1d<T>
where
    T: Copy + RealField,
{
    /// Joins per-region vertex lists, merging the duplicated vertex at each interface
    fn dedup(meshes: Vec<Vec<(Point1<T>, Assignment)>>) -> Mesh1d<T> {
        let mut vertices: Vec<(Point1<T>, Assignment)> = Vec::new();
        for region_vertices in meshes {
            let mut iter = region_vertices.into_iter();
            if let Some((point, assignment)) = iter.next() {
                match vertices.last_mut() {
                    // Regions are laid end to end, so this vertex repeats the last one already stored
                    Some((_, last)) => {
                        *last = Assignment::Boundary([
                            last.region_to_left(),
                            assignment.region_to_right(),
                        ])
                    }
                    None => vertices.push((point, assignment)),
                }
            }
            vertices.extend(iter);
        }
        Mesh1d::from_vertices(vertices)
    }
}

#[cfg(test)]
mod test {
    use super::{create_line_segment_mesh_1d_from_regions, create_unit_line_segment_mesh_1d};
    use crate::{Assignment, MeshError, Segment1dConnectivity};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn mesh_from_regions_eliminates_repeated_vertices() {
        let regions = [(2f64, 10), (5f64, 10), (10f64, 10), (20f64, 10)];
        let mesh = create_line_segment_mesh_1d_from_regions(0f64, &regions).unwrap();

        assert_eq!(mesh.num_nodes(), 41);
        let delta: Vec<f64> = mesh
            .vertices()
            .windows(2)
            .map(|vertices| vertices[1].0.x - vertices[0].0.x)
            .collect();
        assert!(delta.iter().all(|&x| x > 0.001));
        assert_relative_eq!(mesh.vertices()[40].0.x, 37f64);
    }

    #[test]
    fn interface_vertices_are_assigned_to_both_regions() {
        let mesh = create_line_segment_mesh_1d_from_regions(-3f64, &[(3f64, 3), (2f64, 4)]).unwrap();

        assert_eq!(mesh.num_nodes(), 8);
        assert_eq!(mesh.vertices()[0].1, Assignment::Core(0));
        assert_eq!(mesh.vertices()[3].1, Assignment::Boundary([0, 1]));
        assert_relative_eq!(mesh.vertices()[3].0.x, 0f64);
        assert_eq!(mesh.vertices()[7].1, Assignment::Core(1));
        assert_eq!(mesh.vertices_in_region(0), vec![0, 1, 2, 3]);
        assert_eq!(mesh.vertices_in_region(1), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn vertices_and_connectivity_file_correctly() {
        let mesh = create_unit_line_segment_mesh_1d::<f64>(4).unwrap();
        let connectivity = mesh.connectivity();

        assert_eq!(connectivity.len(), 5);
        assert_eq!(connectivity[0], Segment1dConnectivity::LeftContact([1]));
        assert_eq!(connectivity[2], Segment1dConnectivity::Core([1, 3]));
        assert_eq!(connectivity[4], Segment1dConnectivity::RightContact([3]));
        assert_eq!(connectivity[4].left_neighbour(), Some(3));
        assert!(connectivity[0].is_contact());
    }

    #[test]
    fn degenerate_regions_are_rejected() {
        assert!(matches!(
            create_line_segment_mesh_1d_from_regions::<f64>(0., &[]),
            Err(MeshError::NoRegions)
        ));
        assert!(matches!(
            create_line_segment_mesh_1d_from_regions(0., &[(1f64, 2), (-1f64, 2)]),
            Err(MeshError::NonPositiveWidth { region: 1, .. })
        ));
        assert!(matches!(
            create_line_segment_mesh_1d_from_regions(0., &[(1f64, 0)]),
            Err(MeshError::EmptyRegion(0))
        ));
    }

    proptest! {
        #[test]
        fn generated_meshes_are_strictly_increasing(
            widths in proptest::collection::vec(1e-9f64..1e-6, 1..5),
            cells in proptest::collection::vec(1usize..40, 5),
        ) {
            let regions: Vec<(f64, usize)> = widths.iter().cloned().zip(cells.iter().cloned()).collect();
            let mesh = create_line_segment_mesh_1d_from_regions(-1e-7, &regions).unwrap();
            let expected: usize = regions.iter().map(|(_, cells)| cells).sum::<usize>() + 1;
            prop_assert_eq!(mesh.num_nodes(), expected);
            prop_assert!(mesh.vertices().windows(2).all(|pair| pair[1].0.x > pair[0].0.x));
        }
    }
}
