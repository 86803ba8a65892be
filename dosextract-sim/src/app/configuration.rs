use crate::{
    charge::ChargeModel,
    quadrature::{QuadratureAlgorithm, QuadratureSettings},
};
use color_eyre::eyre::eyre;
use config::{Config, Environment, File};
use dosextract_poisson::NewtonSettings;
use serde::Deserialize;
use std::{env, path::Path};

#[derive(Debug, Deserialize)]
pub(crate) struct Configuration {
    pub(crate) quadrature: QuadratureConfiguration,
    pub(crate) charge: ChargeConfiguration,
    pub(crate) newton: NewtonConfiguration,
    pub(crate) measurement: MeasurementConfiguration,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuadratureConfiguration {
    pub(crate) order: usize,
    pub(crate) algorithm: QuadratureAlgorithm,
    maximum_iterations: usize,
    tolerance: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChargeConfiguration {
    pub(crate) model: ChargeModel,
    pub(crate) temperature: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewtonConfiguration {
    maximum_iterations: usize,
    tolerance: f64,
    armijo_parameter: f64,
    minimum_step: f64,
    #[serde(default)]
    maximum_update: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MeasurementConfiguration {
    /// Whether measured tables open with a header row
    pub(crate) has_headers: bool,
}

impl QuadratureConfiguration {
    pub(crate) fn settings(&self) -> QuadratureSettings {
        QuadratureSettings {
            maximum_iterations: self.maximum_iterations,
            tolerance: self.tolerance,
        }
    }
}

impl NewtonConfiguration {
    pub(crate) fn settings(&self) -> NewtonSettings<f64> {
        NewtonSettings::new(self.maximum_iterations, self.tolerance)
            .with_armijo_parameter(self.armijo_parameter)
            .with_minimum_step(self.minimum_step)
            .with_maximum_update(self.maximum_update)
    }
}

impl Configuration {
    pub(crate) fn build(directory: &Path) -> color_eyre::Result<Self> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // The default settings for the simulation which we use in the general case
            .add_source(File::from(directory.join("default")))
            // The override settings which may be set by the user, optional
            .add_source(File::from(directory.join(&run_mode)).required(false))
            // Overrides from environment variables prefixed with DOSEXTRACT, nested keys split by `__`
            .add_source(Environment::with_prefix("DOSEXTRACT").separator("__"))
            .build()?;

        s.try_deserialize()
            .map_err(|e| eyre!(format!("Failed to deserialize the config file: {:?}", e)))
    }
}

#[cfg(test)]
mod test {
    use super::Configuration;
    use std::path::Path;

    #[test]
    fn shipped_defaults_deserialize() {
        let directory = Path::new(env!("CARGO_MANIFEST_DIR")).join("../.config");
        let config = Configuration::build(&directory).unwrap();
        assert_eq!(config.quadrature.order, 101);
        assert_eq!(config.charge.temperature, 300.);
        let settings = config.newton.settings();
        assert_eq!(settings.maximum_iterations(), 100);
        assert!(settings.maximum_update().is_none());
    }
}
