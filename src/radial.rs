// src/radial.rs - Radial volume distribution around the cell origin
//
// Volumes are summed into fixed-width distance bins per cell, then averaged
// across cells bin by bin.

use log::{info, warn};
use rayon::prelude::*;

use crate::catalog::Catalog;
use crate::errors::{OrgaplexError, Result};
use crate::measurement::{MeasurementReader, MetricKind};
use crate::natural_sort::natural_cmp;
use crate::outcome::{Outcome, SkipReason};

pub const VOLUME_SUFFIX: &str = "Volume";
pub const DISTANCE_FROM_ORIGIN_SUFFIX: &str = "Distance_from_Origin_Reference_Frame";

/// Fixed-width bins over `[0, max_distance]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialBins {
    bin_width: f64,
    max_distance: f64,
    edges: Vec<f64>,
}

impl RadialBins {
    /// `n_bins = round(max_distance / bin_width)` evenly spaced bins.
    pub fn new(bin_width: f64, max_distance: f64) -> Result<Self> {
        if !(bin_width.is_finite() && bin_width > 0.0) {
            return Err(OrgaplexError::Config(format!(
                "Bin width must be positive, got {}",
                bin_width
            )));
        }
        if !max_distance.is_finite() || max_distance <= bin_width {
            return Err(OrgaplexError::Config(format!(
                "Max distance ({}) must be greater than bin width ({})",
                max_distance, bin_width
            )));
        }

        let n_bins = (max_distance / bin_width).round() as usize;
        let step = max_distance / n_bins as f64;
        let edges: Vec<f64> = (0..=n_bins)
            .map(|k| max_distance * k as f64 / n_bins as f64)
            .collect();

        if ((step - bin_width) / bin_width).abs() > 1e-9 {
            warn!(
                "Max distance {} is not a multiple of bin width {}; using {} bins of {:.6}",
                max_distance, bin_width, n_bins, step
            );
        }

        Ok(Self {
            bin_width,
            max_distance,
            edges,
        })
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn max_distance(&self) -> f64 {
        self.max_distance
    }

    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin of `distance`: `(edge[k], edge[k+1]]`, with exactly 0 in the first
    /// bin. `None` when out of range.
    pub fn locate(&self, distance: f64) -> Option<usize> {
        if distance.is_nan() || distance < 0.0 {
            return None;
        }
        let idx = self.edges.partition_point(|&e| e < distance);
        match idx {
            0 => Some(0),
            i if i <= self.n_bins() => Some(i - 1),
            _ => None,
        }
    }

    /// `[0, 0.25]` for the first bin, `(0.25, 0.5]` for the rest.
    pub fn label(&self, k: usize) -> String {
        let open = if k == 0 { '[' } else { '(' };
        format!("{}{}, {}]", open, self.edges[k], self.edges[k + 1])
    }

    pub fn labels(&self) -> Vec<String> {
        (0..self.n_bins()).map(|k| self.label(k)).collect()
    }
}

/// Summed volume per bin for one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellProfile {
    pub cell_id: String,
    /// One entry per bin; empty bins are 0.
    pub sums: Vec<f64>,
    pub rows_binned: usize,
    pub rows_out_of_range: usize,
    pub rows_missing: usize,
}

/// Bin one cell's volumes by distance. The series are paired row by row and
/// rows with a missing value on either side are dropped afterwards.
pub fn bin_cell(
    cell_id: &str,
    volumes: &[Option<f64>],
    distances: &[Option<f64>],
    bins: &RadialBins,
) -> Outcome<CellProfile> {
    if volumes.len() != distances.len() {
        warn!(
            "Row mismatch for {}: Vol={}, Dist={}",
            cell_id,
            volumes.len(),
            distances.len()
        );
        return Outcome::Skipped(SkipReason::Alignment {
            label: format!("{} volume/distance", cell_id),
            expected: volumes.len(),
            found: distances.len(),
        });
    }

    let mut sums = vec![0.0; bins.n_bins()];
    let mut rows_binned = 0;
    let mut rows_out_of_range = 0;
    let mut rows_missing = 0;

    for (volume, distance) in volumes.iter().zip(distances.iter()) {
        let (volume, distance) = match (volume, distance) {
            (Some(v), Some(d)) => (*v, *d),
            _ => {
                rows_missing += 1;
                continue;
            }
        };
        match bins.locate(distance) {
            Some(k) => {
                sums[k] += volume;
                rows_binned += 1;
            }
            None => rows_out_of_range += 1,
        }
    }

    if rows_binned + rows_out_of_range == 0 {
        warn!("No valid data after NaN removal for {}", cell_id);
        return Outcome::Skipped(SkipReason::NoValidRows(cell_id.to_string()));
    }

    if rows_out_of_range > 0 {
        warn!("{} surfaces outside bin range in {}", rows_out_of_range, cell_id);
    }

    Outcome::Done(CellProfile {
        cell_id: cell_id.to_string(),
        sums,
        rows_binned,
        rows_out_of_range,
        rows_missing,
    })
}

/// Mean and sample SD of one bin across cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinSummary {
    pub mean: Option<f64>,
    /// `None` with fewer than two contributing cells.
    pub sd: Option<f64>,
    pub n_cells: usize,
}

/// Per-bin statistics over the cells present in `profiles`.
pub fn summarize(profiles: &[CellProfile], n_bins: usize) -> Vec<BinSummary> {
    (0..n_bins)
        .map(|k| {
            let values: Vec<f64> = profiles.iter().filter_map(|p| p.sums.get(k).copied()).collect();
            let n = values.len();
            if n == 0 {
                return BinSummary { mean: None, sd: None, n_cells: 0 };
            }
            let mean = values.iter().sum::<f64>() / n as f64;
            let sd = if n > 1 {
                let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                Some((ss / (n - 1) as f64).sqrt())
            } else {
                None
            };
            BinSummary {
                mean: Some(mean),
                sd,
                n_cells: n,
            }
        })
        .collect()
}

/// Radial profiles of every cell of one organelle.
#[derive(Debug, Clone)]
pub struct RadialResult {
    pub organelle: String,
    pub bins: RadialBins,
    /// Sorted naturally by cell id.
    pub profiles: Vec<CellProfile>,
    pub summary: Vec<BinSummary>,
    pub skipped: Vec<(String, SkipReason)>,
}

pub struct RadialAnalyzer<'a> {
    catalog: &'a Catalog,
    reader: MeasurementReader,
    bins: RadialBins,
    use_parallel: bool,
}

impl<'a> RadialAnalyzer<'a> {
    pub fn new(catalog: &'a Catalog, bin_width: f64, max_distance: f64) -> Result<Self> {
        Ok(Self {
            catalog,
            reader: MeasurementReader::default(),
            bins: RadialBins::new(bin_width, max_distance)?,
            use_parallel: false,
        })
    }

    pub fn with_reader(mut self, reader: MeasurementReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    pub fn bins(&self) -> &RadialBins {
        &self.bins
    }

    pub fn analyze_cell(&self, cell_id: &str, organelle: &str) -> Outcome<CellProfile> {
        let (vol_file, dist_file) = match (
            self.catalog.metric_file(cell_id, organelle, VOLUME_SUFFIX),
            self.catalog.metric_file(cell_id, organelle, DISTANCE_FROM_ORIGIN_SUFFIX),
        ) {
            (Some(v), Some(d)) => (v, d),
            _ => {
                return Outcome::Skipped(SkipReason::MissingFolder {
                    cell_id: cell_id.to_string(),
                    organelle: organelle.to_string(),
                })
            }
        };

        for file in [&vol_file, &dist_file] {
            if !file.exists() {
                warn!("Missing file(s) for {} ({}): {}", cell_id, organelle, file.display());
                return Outcome::Skipped(SkipReason::MissingFile(file.clone()));
            }
        }

        let loaded = self
            .reader
            .load_raw_series(&vol_file, MetricKind::Volume)
            .and_then(|v| {
                self.reader
                    .load_raw_series(&dist_file, MetricKind::Distance)
                    .map(|d| (v, d))
            });

        match loaded {
            Ok((volumes, distances)) => bin_cell(cell_id, &volumes, &distances, &self.bins),
            Err(e) => {
                warn!("Failed to load data for {}: {}", cell_id, e);
                Outcome::Skipped(skip_from_error(e))
            }
        }
    }

    pub fn analyze(&self, organelle: &str) -> Result<RadialResult> {
        if !self.catalog.has_organelle(organelle) {
            return Err(OrgaplexError::UnknownOrganelle {
                name: organelle.to_string(),
                available: self.catalog.all_organelles().join(", "),
            });
        }

        let cells = self.catalog.cells_by_organelle(organelle);
        info!(
            "Analyzing {} cells for {} ({} um steps, 0 - {} um)",
            cells.len(),
            organelle,
            self.bins.bin_width(),
            self.bins.max_distance()
        );

        let outcomes: Vec<(String, Outcome<CellProfile>)> = if self.use_parallel {
            cells
                .par_iter()
                .map(|c| (c.clone(), self.analyze_cell(c, organelle)))
                .collect()
        } else {
            cells
                .iter()
                .map(|c| (c.clone(), self.analyze_cell(c, organelle)))
                .collect()
        };

        let mut profiles = Vec::new();
        let mut skipped = Vec::new();
        for (cell_id, outcome) in outcomes {
            match outcome {
                Outcome::Done(profile) => profiles.push(profile),
                Outcome::Skipped(reason) => {
                    warn!("Skipping cell {} for {}: {}", cell_id, organelle, reason);
                    skipped.push((cell_id, reason));
                }
            }
        }

        if profiles.is_empty() {
            return Err(OrgaplexError::EmptyResult(format!("organelle {}", organelle)));
        }

        profiles.sort_by(|a, b| natural_cmp(&a.cell_id, &b.cell_id));
        let summary = summarize(&profiles, self.bins.n_bins());

        info!(
            "Processed {} cells, {} bins ({} skipped)",
            profiles.len(),
            self.bins.n_bins(),
            skipped.len()
        );

        Ok(RadialResult {
            organelle: organelle.to_string(),
            bins: self.bins.clone(),
            profiles,
            summary,
            skipped,
        })
    }
}

pub(crate) fn skip_from_error(e: OrgaplexError) -> SkipReason {
    match e {
        OrgaplexError::Validation { path, reason } => SkipReason::Invalid { path, reason },
        other => SkipReason::Invalid {
            path: Default::default(),
            reason: other.to_string(),
        },
    }
}
