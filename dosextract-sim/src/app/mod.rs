// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! This module governs the high-level implementation of the simulation
mod configuration;
mod error;
mod telemetry;

pub(crate) use configuration::Configuration;

use crate::{
    constants::thermal_voltage,
    device::Device,
    dos::DosModel,
    io::{self, Summary},
    params::{ParamList, ParamRecord},
    postprocessor::{CvCurve, PostProcessor, PostProcessorError},
    quadrature::QuadratureRule,
    sweep::BiasSweepBuilder,
};
use clap::{ArgEnum, Parser};
use color_eyre::eyre::eyre;
use error::DosExtractError;
use itertools::Itertools;
use rayon::prelude::*;
use std::{
    convert::TryFrom,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct App {
    /// A `.toml` parameter file, or a table of parameters with one simulation per row
    file_path: PathBuf,
    /// One-based rows of the parameter table to simulate, all rows when omitted
    #[clap(short, long)]
    index: Vec<usize>,
    /// Measured capacitance-voltage table to compare against
    #[clap(short, long)]
    experimental: Option<PathBuf>,
    #[clap(short, long, default_value = "results")]
    output: PathBuf,
    #[clap(short, long, default_value = ".config")]
    config_directory: PathBuf,
    #[clap(arg_enum, short, long, default_value = "info")]
    log_level: LogLevel,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ArgEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        write!(f, "{level}")
    }
}

pub fn run() -> color_eyre::Result<()> {
    let cli = App::parse();

    std::fs::create_dir_all(&cli.output)?;
    let (subscriber, _guard) = telemetry::get_subscriber(cli.log_level, &cli.output);
    telemetry::init_subscriber(subscriber)?;

    let config = Configuration::build(&cli.config_directory)?;
    tracing::debug!("Configuration: {:?}", config);

    let simulations = load_parameters(&cli.file_path, &cli.index)?;
    let measured = cli
        .experimental
        .as_deref()
        .map(|path| load_measurement(path, config.measurement.has_headers))
        .transpose()?;

    let family = config.charge.model.quadrature_family();
    let rule = Arc::new(QuadratureRule::generate(
        family,
        config.quadrature.order,
        config.quadrature.algorithm,
        &config.quadrature.settings(),
    )?);
    tracing::info!(
        "Running {} simulations with an order {} {:?} rule",
        simulations.len(),
        rule.order(),
        family
    );

    let results = simulations
        .par_iter()
        .map(|params| {
            (
                params.simulation(),
                run_simulation(params, &config, rule.clone(), measured.as_ref(), &cli.output),
            )
        })
        .collect::<Vec<_>>();

    let mut failures = 0;
    for (simulation, result) in results {
        match result {
            Ok(summary) => tracing::info!(
                "Simulation {simulation}: {} bias points, C_acc {:.6e} F/m^2",
                summary.converged_points,
                summary.maximum_capacitance
            ),
            Err(e) => {
                failures += 1;
                tracing::error!("Simulation {simulation} failed: {e}");
            }
        }
    }

    if failures > 0 {
        return Err(eyre!("{failures} of {} simulations failed", simulations.len()));
    }
    Ok(())
}

/// Reads the simulations selected by `indices` from a parameter file.
///
/// A `.toml` file describes a single simulation, any other file is read as a table with one simulation per row.
fn load_parameters(path: &Path, indices: &[usize]) -> color_eyre::Result<Vec<ParamList>> {
    if path.extension().and_then(|extension| extension.to_str()) == Some("toml") {
        return Ok(vec![ParamList::from_file(path)?]);
    }

    let table = io::read_table::<ParamRecord>(path, true, true)?;
    for rejected in &table.rejected {
        tracing::warn!("{rejected}");
    }

    let selected = select_rows(table.records, indices)?;

    Ok(selected
        .into_iter()
        .map(|(_, record)| ParamList::try_from(record))
        .collect::<Result<Vec<_>, _>>()?)
}

/// The records at the one-based `indices`, in the order first requested, or every record when no index is given
fn select_rows<R>(records: Vec<(usize, R)>, indices: &[usize]) -> Result<Vec<(usize, R)>, DosExtractError> {
    if indices.is_empty() {
        return Ok(records);
    }
    let mut records = records.into_iter().map(|(row, record)| (row, Some(record))).collect::<Vec<_>>();
    indices
        .iter()
        .unique()
        .map(|&index| {
            records
                .iter_mut()
                .find(|(row, _)| *row == index)
                .and_then(|(_, record)| record.take())
                .map(|record| (index, record))
                .ok_or(DosExtractError::MissingRow(index))
        })
        .collect()
}

fn load_measurement(path: &Path, has_headers: bool) -> color_eyre::Result<CvCurve> {
    let table = io::read_cv_table(path, has_headers)?;
    for rejected in &table.rejected {
        tracing::warn!("{rejected}");
    }
    Ok(CvCurve::new(
        table.records.into_iter().map(|(_, point)| point).collect(),
    )?)
}

fn run_simulation(
    params: &ParamList,
    config: &Configuration,
    rule: Arc<QuadratureRule>,
    measured: Option<&CvCurve>,
    output: &Path,
) -> Result<Summary, DosExtractError> {
    let span = tracing::info_span!("Simulation", id = params.simulation());
    let _enter = span.enter();

    let device = Device::build(params)?;
    let dos = DosModel::from_params(
        params.dos(),
        config.charge.model,
        rule,
        thermal_voltage(config.charge.temperature),
    )?;
    let settings = config.newton.settings();
    let sweep = BiasSweepBuilder::new()
        .with_device(&device)
        .with_dos(&dos)
        .with_settings(&settings)
        .build()?;

    let outcome = sweep.run(&params.sweep().voltages(), params.electrostatics().contact_potential());
    if let Some(failure) = &outcome.failure {
        tracing::warn!(
            "Sweep stopped at {} V after {} converged points: {}",
            failure.voltage,
            outcome.points.len(),
            failure.error
        );
    }

    let directory = output.join(format!("simulation_{:03}", params.simulation()));
    std::fs::create_dir_all(&directory).map_err(crate::error::IOError::from)?;
    io::write_sweep(&directory.join("sweep.csv"), &outcome)?;
    io::write_potential(
        &directory.join("potential.csv"),
        sweep.operator().positions().as_slice(),
        &outcome,
    )?;

    let post_processor = PostProcessor::new(&device, params.measurement());
    let last = outcome.points.last().ok_or(PostProcessorError::EmptySweep)?;
    let mut summary = Summary {
        simulation: params.simulation(),
        converged_points: outcome.points.len(),
        maximum_capacitance: post_processor.maximum_capacitance(&outcome)?,
        charge_centroid: post_processor.charge_centroid(last),
        voltage_shift: None,
        error_l2: None,
        error_h1: None,
    };

    if outcome.points.len() > 1 {
        match measured {
            Some(measured) => {
                let comparison = post_processor.compare(measured.clone(), &outcome)?;
                io::write_cv_comparison(&directory.join("cv.csv"), &comparison)?;
                summary.voltage_shift = Some(comparison.voltage_shift);
                summary.error_l2 = Some(comparison.error_l2);
                summary.error_h1 = Some(comparison.error_h1);
            }
            None => io::write_cv(&directory.join("cv.csv"), &post_processor.simulated_curve(&outcome)?)?,
        }
    }

    io::write_summary(&directory.join("summary.csv"), &summary)?;
    Ok(summary)
}

#[cfg(test)]
mod test {
    use super::{error::DosExtractError, select_rows};

    fn rows() -> Vec<(usize, char)> {
        // Row 3 was rejected by the reader
        vec![(1, 'a'), (2, 'b'), (4, 'd')]
    }

    #[test]
    fn all_rows_are_selected_without_indices() {
        assert_eq!(select_rows(rows(), &[]).unwrap(), rows());
    }

    #[test]
    fn repeated_indices_select_the_row_once() {
        let selected = select_rows(rows(), &[4, 1, 4, 1]).unwrap();
        assert_eq!(selected, vec![(4, 'd'), (1, 'a')]);
    }

    #[test]
    fn rejected_rows_cannot_be_selected() {
        assert!(matches!(
            select_rows(rows(), &[1, 3]),
            Err(DosExtractError::MissingRow(3))
        ));
    }
}
