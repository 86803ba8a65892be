use super::{deriv, error_l2, interp1, trapz, PostProcessorError};
use crate::{
    constants::ELECTRON_CHARGE,
    device::Device,
    params::Measurement,
    sweep::{BiasPoint, SweepOutcome},
};
use serde::Deserialize;

/// A single capacitance-voltage sample
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
pub struct CvPoint {
    pub voltage: f64,
    pub capacitance: f64,
}

/// A capacitance-voltage curve ordered by voltage, with its derivative
#[derive(Clone, Debug)]
pub struct CvCurve {
    voltage: Vec<f64>,
    capacitance: Vec<f64>,
    derivative: Vec<f64>,
}

impl CvCurve {
    pub fn new(mut points: Vec<CvPoint>) -> Result<Self, PostProcessorError> {
        points.sort_by(|a, b| a.voltage.total_cmp(&b.voltage));
        let (voltage, capacitance): (Vec<f64>, Vec<f64>) =
            points.iter().map(|point| (point.voltage, point.capacitance)).unzip();
        let derivative = deriv(&capacitance, &voltage)?;
        Ok(Self {
            voltage,
            capacitance,
            derivative,
        })
    }

    pub fn voltage(&self) -> &[f64] {
        &self.voltage
    }

    pub fn capacitance(&self) -> &[f64] {
        &self.capacitance
    }

    pub fn derivative(&self) -> &[f64] {
        &self.derivative
    }

    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    /// The voltage at which the capacitance rises most steeply. The first of several equal maxima is taken.
    pub fn peak_voltage(&self) -> f64 {
        let (idx, _) = self
            .derivative
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best, max), (idx, &value)| {
                if value > max {
                    (idx, value)
                } else {
                    (best, max)
                }
            });
        self.voltage[idx]
    }
}

/// The simulated curve aligned with a measured one, and the distance between the two
#[derive(Clone, Debug)]
pub struct CvComparison {
    pub measured: CvCurve,
    pub simulated: CvCurve,
    /// Offset subtracted from the simulated voltages to align the peaks of `dC/dV`
    pub voltage_shift: f64,
    pub error_l2: f64,
    pub error_h1: f64,
}

/// Derives device level quantities from the bias points of a sweep
pub struct PostProcessor<'a> {
    device: &'a Device,
    measurement: &'a Measurement,
}

impl<'a> PostProcessor<'a> {
    pub fn new(device: &'a Device, measurement: &'a Measurement) -> Self {
        Self { device, measurement }
    }

    /// The device capacitance `A c + C_sb` at every converged bias point
    pub fn simulated_curve(&self, outcome: &SweepOutcome) -> Result<CvCurve, PostProcessorError> {
        CvCurve::new(
            outcome
                .points
                .iter()
                .map(|point| CvPoint {
                    voltage: point.voltage,
                    capacitance: self.measurement.area * point.capacitance + self.measurement.stray_capacitance,
                })
                .collect(),
        )
    }

    /// The largest capacitance per unit area reached in the sweep, in F / m^2
    pub fn maximum_capacitance(&self, outcome: &SweepOutcome) -> Result<f64, PostProcessorError> {
        outcome
            .points
            .iter()
            .map(|point| point.capacitance)
            .reduce(f64::max)
            .ok_or(PostProcessorError::EmptySweep)
    }

    /// The mean position of the trapped electrons at `point`, in m, or `None` when the semiconductor holds no
    /// trapped charge
    pub fn charge_centroid(&self, point: &BiasPoint) -> Option<f64> {
        let positions = self.device.mesh().positions();
        let x = &positions.as_slice()[..point.charge_density.len()];
        let density = point
            .charge_density
            .iter()
            .map(|rho| -rho / ELECTRON_CHARGE)
            .collect::<Vec<_>>();
        let moment = x.iter().zip(density.iter()).map(|(x, n)| x * n).collect::<Vec<_>>();
        let total = trapz(x, &density);
        (total.is_finite() && total > 0.).then(|| trapz(x, &moment) / total)
    }

    /// Aligns the simulated curve with `measured` and measures the distance between them.
    ///
    /// The simulated voltages are shifted so the peaks of `dC/dV` coincide, then the measured curve and its
    /// derivative are interpolated onto the shifted voltages. Simulated points which fall outside the measured
    /// range do not contribute.
    #[tracing::instrument(name = "CV comparison", level = "info", skip_all)]
    pub fn compare(&self, measured: CvCurve, outcome: &SweepOutcome) -> Result<CvComparison, PostProcessorError> {
        let simulated = self.simulated_curve(outcome)?;
        let voltage_shift = simulated.peak_voltage() - measured.peak_voltage();

        let (capacitance, derivative): (Vec<f64>, Vec<f64>) = simulated
            .voltage()
            .iter()
            .map(|v| {
                let v = v - voltage_shift;
                (
                    interp1(measured.voltage(), measured.capacitance(), v),
                    interp1(measured.voltage(), measured.derivative(), v),
                )
            })
            .unzip();

        let l2 = error_l2(&capacitance, simulated.capacitance(), simulated.voltage(), voltage_shift);
        let h1 = l2 + error_l2(&derivative, simulated.derivative(), simulated.voltage(), voltage_shift);
        tracing::info!(
            "Voltage shift {voltage_shift} V, L2 distance {}, H1 distance {}",
            l2.sqrt(),
            h1.sqrt()
        );

        Ok(CvComparison {
            measured,
            simulated,
            voltage_shift,
            error_l2: l2.sqrt(),
            error_h1: h1.sqrt(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn logistic(voltage: f64, centre: f64) -> f64 {
        1e-3 + 1e-3 / (1. + (-(voltage - centre) / 0.3).exp())
    }

    fn curve(centre: f64, voltages: &[f64]) -> CvCurve {
        CvCurve::new(
            voltages
                .iter()
                .map(|&voltage| CvPoint {
                    voltage,
                    capacitance: logistic(voltage, centre),
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn curves_are_sorted_by_voltage() {
        let curve = CvCurve::new(vec![
            CvPoint {
                voltage: 1.,
                capacitance: 3.,
            },
            CvPoint {
                voltage: -1.,
                capacitance: 1.,
            },
            CvPoint {
                voltage: 0.,
                capacitance: 2.,
            },
        ])
        .unwrap();
        assert_eq!(curve.voltage(), &[-1., 0., 1.]);
        assert_eq!(curve.capacitance(), &[1., 2., 3.]);
        assert_eq!(curve.derivative(), &[1., 1., 1.]);
    }

    #[test]
    fn peak_of_a_logistic_curve_is_its_centre() {
        let voltages = crate::postprocessor::linspace(-3., 3., 61);
        assert_relative_eq!(curve(0.5, &voltages).peak_voltage(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn shifted_copies_align_exactly() {
        // The simulated curve lies 0.7 V above the measured one on the same grid spacing
        let measured = curve(0.2, &crate::postprocessor::linspace(-4., 4., 81));
        let simulated = curve(0.9, &crate::postprocessor::linspace(-3.3, 4.7, 81));

        let voltage_shift = simulated.peak_voltage() - measured.peak_voltage();
        assert_relative_eq!(voltage_shift, 0.7, epsilon = 1e-9);

        let interpolated = simulated
            .voltage()
            .iter()
            .map(|v| interp1(measured.voltage(), measured.capacitance(), v - voltage_shift))
            .collect::<Vec<_>>();
        let distance = error_l2(&interpolated, simulated.capacitance(), simulated.voltage(), voltage_shift);
        assert!(distance.sqrt() < 1e-12);
    }

    fn bias_point(device: &Device, density: f64) -> BiasPoint {
        let nodes = device.mesh().num_nodes();
        let charged = device.semiconductor_vertices().len();
        BiasPoint {
            voltage: 0.,
            potential: nalgebra::DVector::zeros(nodes),
            charge_density: nalgebra::DVector::from_element(charged, -ELECTRON_CHARGE * density),
            capacitance: 1.,
            integrated_charge: 0.,
            iterations: 1,
        }
    }

    #[test]
    fn charge_centroid_is_absent_without_trapped_charge() {
        let params = crate::params::ParamList::try_from(crate::params::test::record()).unwrap();
        let device = Device::build(&params).unwrap();
        let post_processor = PostProcessor::new(&device, params.measurement());

        assert!(post_processor.charge_centroid(&bias_point(&device, 0.)).is_none());
        let centroid = post_processor.charge_centroid(&bias_point(&device, 1e24)).unwrap();
        let thickness = params.geometry().semiconductor_thickness;
        assert_relative_eq!(centroid, -thickness / 2., max_relative = 1e-10);
    }
}
