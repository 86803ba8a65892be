//! The layered semiconductor / insulator stack and its mesh
//!
//! The semiconductor occupies `[-t_semic, 0]` and the insulator `[0, t_ins]`. The grounded contact sits on the
//! free face of the semiconductor and the gate on the free face of the insulator.
use crate::{
    constants::{EPSILON_0, SEMICONDUCTOR_NODE_FRACTION},
    error::BuildError,
    params::ParamList,
};
use dosextract_mesher::{create_line_segment_mesh_1d_from_regions, Mesh1d};
use dosextract_poisson::PoissonInfoDesk;
use std::ops::Range;

pub const SEMICONDUCTOR: usize = 0;
pub const INSULATOR: usize = 1;

/// Absolute permittivities of the two layers, in F / m
#[derive(Clone, Debug)]
pub struct DeviceInfoDesk {
    permittivity: [f64; 2],
}

impl PoissonInfoDesk<f64> for DeviceInfoDesk {
    fn get_permittivity(&self, region_index: usize) -> f64 {
        self.permittivity[region_index]
    }

    fn hosts_space_charge(&self, region_index: usize) -> bool {
        region_index == SEMICONDUCTOR
    }
}

#[derive(Clone, Debug)]
pub struct Device {
    mesh: Mesh1d<f64>,
    info_desk: DeviceInfoDesk,
    semiconductor_nodes: usize,
}

impl Device {
    /// Meshes the stack described by `params`.
    ///
    /// `floor(0.6 nodes)` vertices are spread uniformly over the semiconductor, including the one on the
    /// interface, and the remainder uniformly over the insulator.
    pub fn build(params: &ParamList) -> Result<Self, BuildError> {
        let geometry = params.geometry();
        let nodes = params.mesh().nodes;
        let semiconductor_nodes = (SEMICONDUCTOR_NODE_FRACTION * nodes as f64).floor() as usize;
        if semiconductor_nodes < 2 || nodes - semiconductor_nodes < 1 {
            return Err(BuildError::invalid(
                "mesh.nodes",
                format!("{nodes} nodes cannot be split between the semiconductor and the insulator"),
            ));
        }

        let mesh = create_line_segment_mesh_1d_from_regions(
            -geometry.semiconductor_thickness,
            &[
                (geometry.semiconductor_thickness, semiconductor_nodes - 1),
                (geometry.insulator_thickness, nodes - semiconductor_nodes),
            ],
        )?;
        // The semiconductor vertices run from the grounded contact up to and including the interface
        let semiconductor_nodes = mesh.vertices_in_region(SEMICONDUCTOR).len();
        tracing::debug!(
            "Meshed the stack with {} vertices, {semiconductor_nodes} in the semiconductor",
            mesh.num_nodes()
        );

        Ok(Self {
            mesh,
            info_desk: DeviceInfoDesk {
                permittivity: [
                    geometry.semiconductor_permittivity * EPSILON_0,
                    geometry.insulator_permittivity * EPSILON_0,
                ],
            },
            semiconductor_nodes,
        })
    }

    pub fn mesh(&self) -> &Mesh1d<f64> {
        &self.mesh
    }

    pub fn info_desk(&self) -> &DeviceInfoDesk {
        &self.info_desk
    }

    /// Indices of the vertices in the semiconductor, from the grounded contact to the interface
    pub fn semiconductor_vertices(&self) -> Range<usize> {
        0..self.semiconductor_nodes
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::params::test::record;
    use approx::assert_relative_eq;
    use dosextract_mesher::Assignment;
    use std::convert::TryFrom;

    #[test]
    fn semiconductor_receives_sixty_percent_of_the_nodes() {
        let mut row = record();
        row.nodes = 51;
        let params = ParamList::try_from(row).unwrap();
        let device = Device::build(&params).unwrap();

        assert_eq!(device.mesh().num_nodes(), 51);
        assert_eq!(device.semiconductor_vertices(), 0..30);
        assert_eq!(device.mesh().vertices_in_region(INSULATOR), (29..51).collect::<Vec<_>>());

        let vertices = device.mesh().vertices();
        assert_relative_eq!(vertices[0].0.x, -3e-8);
        assert_relative_eq!(vertices[29].0.x, 0., epsilon = 1e-20);
        assert_eq!(vertices[29].1, Assignment::Boundary([SEMICONDUCTOR, INSULATOR]));
        assert_relative_eq!(vertices[50].0.x, 4.5e-8);
    }

    #[test]
    fn smallest_mesh_keeps_both_layers() {
        let mut row = record();
        row.nodes = 4;
        let device = Device::build(&ParamList::try_from(row).unwrap()).unwrap();
        assert_eq!(device.mesh().num_nodes(), 4);
        assert_eq!(device.semiconductor_vertices(), 0..2);
    }

    #[test]
    fn only_the_semiconductor_is_charged() {
        let device = Device::build(&ParamList::try_from(record()).unwrap()).unwrap();
        let desk = device.info_desk();
        assert!(desk.hosts_space_charge(SEMICONDUCTOR));
        assert!(!desk.hosts_space_charge(INSULATOR));
        assert_relative_eq!(desk.get_permittivity(INSULATOR), 2.5 * EPSILON_0);
    }
}
