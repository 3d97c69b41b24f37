// src/measurement.rs - Reading Imaris statistics exports into numeric series

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use csv::ReaderBuilder;
use log::warn;

use crate::errors::{OrgaplexError, Result};

/// Rows of header text Imaris writes before the data.
pub const PREAMBLE_ROWS: usize = 4;

/// Default ceiling above which volumes are reported as suspicious (um^3).
pub const DEFAULT_VOLUME_WARNING_CEILING: f64 = 1000.0;

/// Kind of per-surface metric stored in a measurement file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Volume,
    Sphericity,
    Distance,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Volume => "Volume",
            MetricKind::Sphericity => "Sphericity",
            MetricKind::Distance => "Distance",
        };
        f.write_str(name)
    }
}

/// Reader for measurement files, carrying the range limits used for warnings.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementReader {
    pub volume_warning_ceiling: f64,
}

impl Default for MeasurementReader {
    fn default() -> Self {
        Self {
            volume_warning_ceiling: DEFAULT_VOLUME_WARNING_CEILING,
        }
    }
}

impl MeasurementReader {
    pub fn new(volume_warning_ceiling: f64) -> Self {
        Self { volume_warning_ceiling }
    }

    /// Load a shortest-distance file. Missing values are dropped.
    pub fn load_distance_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<f64>> {
        self.load_metric_file(path, MetricKind::Distance)
    }

    /// Load a metric file with missing values dropped and kind-specific checks
    /// applied.
    pub fn load_metric_file<P: AsRef<Path>>(&self, path: P, kind: MetricKind) -> Result<Vec<f64>> {
        let path = path.as_ref();
        let values: Vec<f64> = read_first_column(path)?.into_iter().flatten().collect();

        if values.is_empty() {
            return Err(OrgaplexError::validation(
                path,
                format!("no valid {} values", kind),
            ));
        }

        self.check_values(path, kind, &values)?;
        Ok(values)
    }

    /// Load a metric file keeping missing values in place, so two series can be
    /// paired row by row before anything is dropped.
    pub fn load_raw_series<P: AsRef<Path>>(&self, path: P, kind: MetricKind) -> Result<Vec<Option<f64>>> {
        let path = path.as_ref();
        let raw = read_first_column(path)?;
        let present: Vec<f64> = raw.iter().flatten().copied().collect();

        if present.is_empty() {
            return Err(OrgaplexError::validation(
                path,
                format!("no valid {} values", kind),
            ));
        }

        self.check_values(path, kind, &present)?;
        Ok(raw)
    }

    fn check_values(&self, path: &Path, kind: MetricKind, values: &[f64]) -> Result<()> {
        if values.iter().any(|v| v.is_infinite()) {
            return Err(OrgaplexError::validation(
                path,
                format!("infinite {} values found", kind),
            ));
        }

        let (min, max) = min_max(values);
        match kind {
            MetricKind::Volume => {
                if min < 0.0 {
                    return Err(OrgaplexError::validation(path, "negative volume values found"));
                }
                if max > self.volume_warning_ceiling {
                    warn!(
                        "Unusually large volume values (>{} um^3) in {}. Max: {:.3}",
                        self.volume_warning_ceiling,
                        file_name(path),
                        max
                    );
                }
            }
            MetricKind::Sphericity => {
                if min < 0.0 || max > 1.0 {
                    warn!(
                        "Sphericity values outside expected range [0, 1] in {}. Min: {:.3}, Max: {:.3}",
                        file_name(path),
                        min,
                        max
                    );
                }
            }
            MetricKind::Distance => {}
        }

        Ok(())
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read the first column after the preamble. Empty cells and `NaN` become
/// `None`; any other unparsable cell is a validation error.
fn read_first_column(path: &Path) -> Result<Vec<Option<f64>>> {
    let mut file = BufReader::new(File::open(path)?);

    // The preamble counts physical lines; the csv reader would skip blank ones.
    let mut line = Vec::new();
    for _ in 0..PREAMBLE_ROWS {
        line.clear();
        if file.read_until(b'\n', &mut line)? == 0 {
            break;
        }
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut values = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = record.get(0).unwrap_or("").trim();
        values.push(parse_cell(cell).ok_or_else(|| {
            OrgaplexError::validation(
                path,
                format!("non-numeric value '{}' at data row {}", cell, row + 1),
            )
        })?);
    }

    if values.is_empty() {
        return Err(OrgaplexError::validation(path, "file is empty or has no data rows"));
    }

    Ok(values)
}

/// `Some(None)` for a missing value, `None` for text that is not a number.
fn parse_cell(cell: &str) -> Option<Option<f64>> {
    if cell.is_empty() {
        return Some(None);
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_nan() => Some(None),
        Ok(v) => Some(Some(v)),
        Err(_) => None,
    }
}
