//! Reading parameter and measurement tables, and writing simulation results
//!
//! Tables may be separated by commas, tabs, colons or spaces. The separator is detected from the first data line
//! of the file, in that order of priority. A row which cannot be parsed is skipped and reported alongside the rows
//! which could, so a single bad row never discards the rest of a table.
use crate::{
    error::IOError,
    postprocessor::{CvComparison, CvCurve, CvPoint},
    sweep::SweepOutcome,
};
use itertools::{izip, EitherOrBoth, Itertools};
use serde::de::DeserializeOwned;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// Candidate separators, in order of priority
const SEPARATORS: [u8; 4] = [b',', b'\t', b':', b' '];

/// The rows of a table which parsed, keyed by their one-based row number, and the rows which did not
#[derive(Debug)]
pub struct TableRead<R> {
    pub records: Vec<(usize, R)>,
    pub rejected: Vec<IOError>,
}

/// The separator of a table, judged from its first line
pub fn detect_separator(line: &str) -> Option<u8> {
    SEPARATORS.into_iter().find(|separator| line.as_bytes().contains(separator))
}

/// The first non-empty line after the header, or the header itself when the table holds no data
fn first_data_line(path: &Path, skip_header: bool) -> Result<Option<String>, IOError> {
    let mut lines = BufReader::new(File::open(path)?).lines();
    let header = if skip_header { lines.next().transpose()? } else { None };
    for line in lines {
        let line = line?;
        if !line.trim().is_empty() {
            return Ok(Some(line.trim().to_string()));
        }
    }
    Ok(header)
}

/// Reads every data row of `path` into `R`.
///
/// With `by_name` the fields are matched to the header row by name, otherwise the first row is skipped when
/// `has_headers` is set and fields are taken in order.
pub fn read_table<R: DeserializeOwned>(path: &Path, has_headers: bool, by_name: bool) -> Result<TableRead<R>, IOError> {
    let separator = first_data_line(path, has_headers || by_name)?
        .as_deref()
        .and_then(detect_separator)
        .ok_or_else(|| IOError::UnknownSeparator(path.display().to_string()))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(has_headers || by_name)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;
    let headers = if by_name { Some(reader.headers()?.clone()) } else { None };

    let mut table = TableRead {
        records: Vec::new(),
        rejected: Vec::new(),
    };
    for (idx, result) in reader.records().enumerate() {
        let row = idx + 1;
        match result.and_then(|record| record.deserialize::<R>(headers.as_ref())) {
            Ok(record) => table.records.push((row, record)),
            Err(e) => {
                tracing::warn!("Skipping row {row} of {}: {e}", path.display());
                table.rejected.push(IOError::MalformedRecord {
                    row,
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(table)
}

/// Reads a measured capacitance-voltage table, voltage in the first column and capacitance in the second
pub fn read_cv_table(path: &Path, has_headers: bool) -> Result<TableRead<CvPoint>, IOError> {
    read_table(path, has_headers, false)
}

fn format(value: f64) -> String {
    format!("{value:.15e}")
}

/// Writes the gate voltage, capacitance per unit area, semiconductor charge and Newton iterations of every
/// converged bias point
pub fn write_sweep(path: &Path, outcome: &SweepOutcome) -> Result<(), IOError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["V", "C_tot", "Q_semic", "iterations"])?;
    for point in &outcome.points {
        writer.write_record([
            format(point.voltage),
            format(point.capacitance),
            format(point.integrated_charge),
            point.iterations.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the potential profile at every converged bias point, one column per gate voltage
pub fn write_potential(path: &Path, positions: &[f64], outcome: &SweepOutcome) -> Result<(), IOError> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["x".to_string()];
    header.extend(outcome.points.iter().map(|point| format!("phi({})", point.voltage)));
    writer.write_record(&header)?;
    for (idx, x) in positions.iter().enumerate() {
        let mut row = vec![format(*x)];
        row.extend(outcome.points.iter().map(|point| format(point.potential[idx])));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a simulated capacitance-voltage curve
pub fn write_cv(path: &Path, curve: &CvCurve) -> Result<(), IOError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["V_simulated", "C_simulated", "dC/dV_simulated"])?;
    for (v, c, dc) in izip!(curve.voltage(), curve.capacitance(), curve.derivative()) {
        writer.write_record([format(*v), format(*c), format(*dc)])?;
    }
    writer.flush()?;
    Ok(())
}

fn curve_fields(curve: &CvCurve, shift: f64) -> impl Iterator<Item = [String; 3]> + '_ {
    izip!(curve.voltage(), curve.capacitance(), curve.derivative())
        .map(move |(v, c, dc)| [format(*v - shift), format(*c), format(*dc)])
}

/// Writes the measured curve beside the aligned simulated curve. The shorter curve is padded with empty fields.
pub fn write_cv_comparison(path: &Path, comparison: &CvComparison) -> Result<(), IOError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "V_experim",
        "C_experim",
        "dC/dV_experim",
        "V_simulated",
        "C_simulated",
        "dC/dV_simulated",
    ])?;
    let rows = curve_fields(&comparison.measured, 0.)
        .zip_longest(curve_fields(&comparison.simulated, comparison.voltage_shift));
    for fields in rows {
        let (measured, simulated) = match fields {
            EitherOrBoth::Both(measured, simulated) => (measured, simulated),
            EitherOrBoth::Left(measured) => (measured, Default::default()),
            EitherOrBoth::Right(simulated) => (Default::default(), simulated),
        };
        writer.write_record(measured.iter().chain(simulated.iter()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Fit quality and device level quantities of one simulation
#[derive(Clone, Debug)]
pub struct Summary {
    pub simulation: usize,
    pub converged_points: usize,
    pub maximum_capacitance: f64,
    pub charge_centroid: Option<f64>,
    pub voltage_shift: Option<f64>,
    pub error_l2: Option<f64>,
    pub error_h1: Option<f64>,
}

pub fn write_summary(path: &Path, summary: &Summary) -> Result<(), IOError> {
    let optional = |value: Option<f64>| value.map(format).unwrap_or_default();
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "simulationNo",
        "converged_points",
        "C_acc",
        "charge_centroid",
        "V_shift",
        "L2_distance",
        "H1_distance",
    ])?;
    writer.write_record([
        summary.simulation.to_string(),
        summary.converged_points.to_string(),
        format(summary.maximum_capacitance),
        optional(summary.charge_centroid),
        optional(summary.voltage_shift),
        optional(summary.error_l2),
        optional(summary.error_h1),
    ])?;
    writer.flush()?;
    Ok(())
}
