//! Physical parameters of a single simulated device
//!
//! A `ParamList` is validated on construction and read-only afterwards. It can be deserialised from a nested
//! `.toml` file, or converted from a flat `ParamRecord` which is one row of a parameter table.
use crate::{charge::TrapComponent, dos::MAXIMUM_COMPONENTS, error::BuildError};
use color_eyre::eyre::eyre;
use config::{Config, File};
use serde::Deserialize;
use std::{convert::TryFrom, path::Path};

#[derive(Clone, Debug, Deserialize)]
pub struct Geometry {
    /// Thickness of the semiconductor in m
    pub semiconductor_thickness: f64,
    /// Thickness of the insulator in m
    pub insulator_thickness: f64,
    /// Relative permittivity of the semiconductor
    pub semiconductor_permittivity: f64,
    /// Relative permittivity of the insulator
    pub insulator_permittivity: f64,
}

/// Energies in eV
#[derive(Clone, Debug, Deserialize)]
pub struct Electrostatics {
    pub workfunction: f64,
    pub electron_affinity: f64,
}

impl Electrostatics {
    /// The potential of the semiconductor contact at zero bias, `Ea - Wf` in V
    pub fn contact_potential(&self) -> f64 {
        self.electron_affinity - self.workfunction
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DensityOfStates {
    /// Gaussian components, in order. The first is centred on the reference energy
    pub components: Vec<TrapComponent>,
    /// Optional exponential tail, used when the charge model is exponential
    #[serde(default)]
    pub exponential: Option<TrapComponent>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeshParameters {
    /// Total number of mesh vertices across the stack
    pub nodes: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SweepParameters {
    pub steps: usize,
    pub minimum_voltage: f64,
    pub maximum_voltage: f64,
}

impl SweepParameters {
    /// The gate voltages of the sweep, evenly spaced from the minimum to the maximum
    pub fn voltages(&self) -> Vec<f64> {
        crate::postprocessor::linspace(self.minimum_voltage, self.maximum_voltage, self.steps)
    }
}

/// Device properties which only enter the comparison with a measured capacitance
#[derive(Clone, Debug, Deserialize)]
pub struct Measurement {
    /// Device area in m^2
    pub area: f64,
    /// Parasitic capacitance in parallel with the device in F
    pub stray_capacitance: f64,
}

impl Default for Measurement {
    fn default() -> Self {
        Self {
            area: 1.,
            stray_capacitance: 0.,
        }
    }
}

#[derive(Deserialize)]
struct ParamFile {
    simulation: usize,
    geometry: Geometry,
    electrostatics: Electrostatics,
    dos: DensityOfStates,
    mesh: MeshParameters,
    sweep: SweepParameters,
    #[serde(default)]
    measurement: Measurement,
}

/// A validated parameter snapshot
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "ParamFile")]
pub struct ParamList {
    simulation: usize,
    geometry: Geometry,
    electrostatics: Electrostatics,
    dos: DensityOfStates,
    mesh: MeshParameters,
    sweep: SweepParameters,
    measurement: Measurement,
}

impl TryFrom<ParamFile> for ParamList {
    type Error = BuildError;

    fn try_from(file: ParamFile) -> Result<Self, Self::Error> {
        Self::new(
            file.simulation,
            file.geometry,
            file.electrostatics,
            file.dos,
            file.mesh,
            file.sweep,
            file.measurement,
        )
    }
}

fn positive(name: &str, value: f64) -> Result<(), BuildError> {
    if value.is_finite() && value > 0. {
        Ok(())
    } else {
        Err(BuildError::invalid(name, format!("must be positive and finite, found {value}")))
    }
}

fn finite(name: &str, value: f64) -> Result<(), BuildError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BuildError::invalid(name, format!("must be finite, found {value}")))
    }
}

fn validate_component(name: &str, component: &TrapComponent) -> Result<(), BuildError> {
    finite(name, component.density)?;
    if component.density < 0. {
        return Err(BuildError::invalid(
            format!("{name}.density"),
            format!("must not be negative, found {}", component.density),
        ));
    }
    if component.density > 0. {
        positive(&format!("{name}.spread"), component.spread)?;
    }
    finite(&format!("{name}.shift"), component.shift)
}

impl ParamList {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        simulation: usize,
        geometry: Geometry,
        electrostatics: Electrostatics,
        dos: DensityOfStates,
        mesh: MeshParameters,
        sweep: SweepParameters,
        measurement: Measurement,
    ) -> Result<Self, BuildError> {
        let params = Self {
            simulation,
            geometry,
            electrostatics,
            dos,
            mesh,
            sweep,
            measurement,
        };
        params.validate()?;
        Ok(params)
    }

    /// Reads and validates a nested parameter file
    pub fn from_file(path: &Path) -> color_eyre::Result<Self> {
        let s = Config::builder().add_source(File::from(path)).build()?;
        s.try_deserialize()
            .map_err(|e| eyre!("Failed to deserialize parameters from {}: {}", path.display(), e))
    }

    fn validate(&self) -> Result<(), BuildError> {
        if self.simulation == 0 {
            return Err(BuildError::invalid("simulation", "identifiers start at 1"));
        }

        positive("geometry.semiconductor_thickness", self.geometry.semiconductor_thickness)?;
        positive("geometry.insulator_thickness", self.geometry.insulator_thickness)?;
        positive("geometry.semiconductor_permittivity", self.geometry.semiconductor_permittivity)?;
        positive("geometry.insulator_permittivity", self.geometry.insulator_permittivity)?;

        finite("electrostatics.workfunction", self.electrostatics.workfunction)?;
        finite("electrostatics.electron_affinity", self.electrostatics.electron_affinity)?;

        let components = &self.dos.components;
        if components.is_empty() || components.len() > MAXIMUM_COMPONENTS {
            return Err(BuildError::invalid(
                "dos.components",
                format!(
                    "between 1 and {MAXIMUM_COMPONENTS} components are supported, found {}",
                    components.len()
                ),
            ));
        }
        if components[0].shift != 0. {
            return Err(BuildError::invalid(
                "dos.components[0].shift",
                "the first component defines the reference energy and cannot be shifted",
            ));
        }
        for (idx, component) in components.iter().enumerate() {
            validate_component(&format!("dos.components[{idx}]"), component)?;
        }
        if let Some(exponential) = &self.dos.exponential {
            validate_component("dos.exponential", exponential)?;
        }

        if self.mesh.nodes < 4 {
            return Err(BuildError::invalid(
                "mesh.nodes",
                format!("at least 4 nodes are needed to mesh both layers, found {}", self.mesh.nodes),
            ));
        }

        if self.sweep.steps == 0 {
            return Err(BuildError::invalid("sweep.steps", "the sweep needs at least one step"));
        }
        finite("sweep.minimum_voltage", self.sweep.minimum_voltage)?;
        finite("sweep.maximum_voltage", self.sweep.maximum_voltage)?;
        if self.sweep.maximum_voltage < self.sweep.minimum_voltage {
            return Err(BuildError::invalid(
                "sweep.maximum_voltage",
                format!(
                    "must not be below the minimum voltage {}, found {}",
                    self.sweep.minimum_voltage, self.sweep.maximum_voltage
                ),
            ));
        }

        positive("measurement.area", self.measurement.area)?;
        finite("measurement.stray_capacitance", self.measurement.stray_capacitance)
    }

    pub fn simulation(&self) -> usize {
        self.simulation
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn electrostatics(&self) -> &Electrostatics {
        &self.electrostatics
    }

    pub fn dos(&self) -> &DensityOfStates {
        &self.dos
    }

    pub fn mesh(&self) -> &MeshParameters {
        &self.mesh
    }

    pub fn sweep(&self) -> &SweepParameters {
        &self.sweep
    }

    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }
}

fn unit_area() -> f64 {
    1.
}

/// One row of a parameter table, named by the column headers
#[derive(Clone, Debug, Deserialize)]
pub struct ParamRecord {
    #[serde(rename = "simulationNo")]
    pub simulation: usize,
    pub t_semic: f64,
    pub t_ins: f64,
    pub eps_semic: f64,
    pub eps_ins: f64,
    #[serde(rename = "Wf")]
    pub workfunction: f64,
    #[serde(rename = "Ea")]
    pub electron_affinity: f64,
    #[serde(rename = "N0")]
    pub n0: f64,
    pub sigma: f64,
    #[serde(rename = "N0_2", default)]
    pub n0_2: f64,
    #[serde(default)]
    pub sigma_2: f64,
    #[serde(default)]
    pub shift_2: f64,
    #[serde(rename = "N0_3", default)]
    pub n0_3: f64,
    #[serde(default)]
    pub sigma_3: f64,
    #[serde(default)]
    pub shift_3: f64,
    #[serde(rename = "N0_4", default)]
    pub n0_4: f64,
    #[serde(default)]
    pub sigma_4: f64,
    #[serde(default)]
    pub shift_4: f64,
    #[serde(rename = "N0_exp", default)]
    pub n0_exp: f64,
    #[serde(default)]
    pub lambda_exp: f64,
    #[serde(rename = "A_semic", default = "unit_area")]
    pub area: f64,
    #[serde(rename = "C_sb", default)]
    pub stray_capacitance: f64,
    #[serde(rename = "nNodes")]
    pub nodes: usize,
    #[serde(rename = "nSteps")]
    pub steps: usize,
    #[serde(rename = "V_min")]
    pub minimum_voltage: f64,
    #[serde(rename = "V_max")]
    pub maximum_voltage: f64,
}

impl TryFrom<ParamRecord> for ParamList {
    type Error = BuildError;

    fn try_from(record: ParamRecord) -> Result<Self, Self::Error> {
        let first = TrapComponent {
            density: record.n0,
            spread: record.sigma,
            shift: 0.,
        };
        // Components beyond the first are only present when they hold traps
        let components = std::iter::once(first)
            .chain(
                [
                    (record.n0_2, record.sigma_2, record.shift_2),
                    (record.n0_3, record.sigma_3, record.shift_3),
                    (record.n0_4, record.sigma_4, record.shift_4),
                ]
                .into_iter()
                .filter(|(density, _, _)| *density != 0.)
                .map(|(density, spread, shift)| TrapComponent { density, spread, shift }),
            )
            .collect();
        let exponential = (record.n0_exp != 0. || record.lambda_exp != 0.).then(|| TrapComponent {
            density: record.n0_exp,
            spread: record.lambda_exp,
            shift: 0.,
        });

        Self::new(
            record.simulation,
            Geometry {
                semiconductor_thickness: record.t_semic,
                insulator_thickness: record.t_ins,
                semiconductor_permittivity: record.eps_semic,
                insulator_permittivity: record.eps_ins,
            },
            Electrostatics {
                workfunction: record.workfunction,
                electron_affinity: record.electron_affinity,
            },
            DensityOfStates {
                components,
                exponential,
            },
            MeshParameters { nodes: record.nodes },
            SweepParameters {
                steps: record.steps,
                minimum_voltage: record.minimum_voltage,
                maximum_voltage: record.maximum_voltage,
            },
            Measurement {
                area: record.area,
                stray_capacitance: record.stray_capacitance,
            },
        )
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::io::Write;

    /// A two layer stack with a single Gaussian component
    pub(crate) fn record() -> ParamRecord {
        ParamRecord {
            simulation: 1,
            t_semic: 3e-8,
            t_ins: 4.5e-8,
            eps_semic: 2.9,
            eps_ins: 2.5,
            workfunction: 4.7,
            electron_affinity: 2.6,
            n0: 1e27,
            sigma: 4.,
            n0_2: 0.,
            sigma_2: 0.,
            shift_2: 0.,
            n0_3: 0.,
            sigma_3: 0.,
            shift_3: 0.,
            n0_4: 0.,
            sigma_4: 0.,
            shift_4: 0.,
            n0_exp: 0.,
            lambda_exp: 0.,
            area: 1.,
            stray_capacitance: 0.,
            nodes: 50,
            steps: 5,
            minimum_voltage: -1.,
            maximum_voltage: 1.,
        }
    }

    #[test]
    fn record_drops_empty_components() {
        let mut row = record();
        row.n0_3 = 2e26;
        row.sigma_3 = 2.;
        row.shift_3 = 0.1;
        let params = ParamList::try_from(row).unwrap();
        assert_eq!(params.dos().components.len(), 2);
        assert_eq!(params.dos().components[1].shift, 0.1);
        assert!(params.dos().exponential.is_none());
    }

    #[test]
    fn non_physical_values_are_rejected() {
        let cases: Vec<(&str, Box<dyn Fn(&mut ParamRecord)>)> = vec![
            ("geometry.semiconductor_thickness", Box::new(|r: &mut ParamRecord| r.t_semic = -1e-9)),
            ("geometry.insulator_permittivity", Box::new(|r: &mut ParamRecord| r.eps_ins = 0.)),
            ("dos.components[0].spread", Box::new(|r: &mut ParamRecord| r.sigma = 0.)),
            ("dos.components[1].density", Box::new(|r: &mut ParamRecord| r.n0_2 = -1.)),
            ("mesh.nodes", Box::new(|r: &mut ParamRecord| r.nodes = 3)),
            ("sweep.steps", Box::new(|r: &mut ParamRecord| r.steps = 0)),
            ("sweep.maximum_voltage", Box::new(|r: &mut ParamRecord| r.maximum_voltage = -2.)),
            ("electrostatics.workfunction", Box::new(|r: &mut ParamRecord| r.workfunction = f64::NAN)),
        ];
        for (expected, mutate) in cases {
            let mut row = record();
            mutate(&mut row);
            match ParamList::try_from(row) {
                Err(BuildError::InvalidParameter { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected {expected} to be rejected, found {other:?}"),
            }
        }
    }

    #[test]
    fn nested_file_is_read_and_validated() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
simulation = 3

[geometry]
semiconductor_thickness = 3.0e-8
insulator_thickness = 4.5e-8
semiconductor_permittivity = 2.9
insulator_permittivity = 2.5

[electrostatics]
workfunction = 4.7
electron_affinity = 2.6

[[dos.components]]
density = 1.0e27
spread = 4.0

[[dos.components]]
density = 5.0e26
spread = 2.0
shift = -0.2

[mesh]
nodes = 40

[sweep]
steps = 11
minimum_voltage = -2.0
maximum_voltage = 2.0
"#
        )
        .unwrap();

        let params = ParamList::from_file(file.path()).unwrap();
        assert_eq!(params.simulation(), 3);
        assert_eq!(params.dos().components.len(), 2);
        assert_eq!(params.dos().components[1].shift, -0.2);
        assert_eq!(params.measurement().area, 1.);
        assert_eq!(params.sweep().voltages().len(), 11);
        approx::assert_relative_eq!(params.electrostatics().contact_potential(), -2.1, epsilon = 1e-12);
    }

    #[test]
    fn invalid_file_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
simulation = 1

[geometry]
semiconductor_thickness = 3.0e-8
insulator_thickness = 4.5e-8
semiconductor_permittivity = 2.9
insulator_permittivity = 2.5

[electrostatics]
workfunction = 4.7
electron_affinity = 2.6

[dos]
components = []

[mesh]
nodes = 40

[sweep]
steps = 11
minimum_voltage = -2.0
maximum_voltage = 2.0
"#
        )
        .unwrap();

        assert!(ParamList::from_file(file.path()).is_err());
    }
}
