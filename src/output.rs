// src/output.rs - CSV export of analysis tables and metadata

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Writer};
use log::info;
use regex::Regex;

use crate::errors::{OrgaplexError, Result};
use crate::metadata::Metadata;
use crate::metrics::{MetricsTable, METRIC_ROWS};
use crate::nway::BaitTable;
use crate::oneway::Interaction;
use crate::radial::RadialResult;

/// Directory for per-cell one-way tables, under the output directory.
pub const ONEWAY_PER_CELL_DIR: &str = "Organelle_Interaction_Results";

const REQUIRED_RADIAL_KEYS: [&str; 4] = ["Organelle", "Bin_Width_um", "Max_Distance_um", "Total_Bins"];

pub fn nway_results_name(bait: &str, stamp: &str) -> String {
    format!("nway_analysis_bait-{}_{}_results.csv", bait, stamp)
}

pub fn nway_metadata_name(bait: &str, stamp: &str) -> String {
    format!("nway_analysis_bait-{}_{}_metadata.csv", bait, stamp)
}

pub fn radial_file_name(organelle: &str, part: &str) -> String {
    format!("radial_distribution_{}_{}.csv", organelle, part)
}

pub fn metrics_file_name(organelle: &str) -> String {
    format!("vol_spher_metrics_{}.csv", organelle)
}

pub const METRICS_METADATA_NAME: &str = "vol_spher_metrics_metadata.csv";

pub fn oneway_all_cells_name(stamp: &str) -> String {
    format!("Organelle_Interactions_All_Cells_{}.csv", stamp)
}

pub fn oneway_cell_name(cell_id: &str) -> String {
    format!("{}_Organelle_Interactions.csv", cell_id)
}

fn create_writer(path: &Path) -> Result<Writer<fs::File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(Writer::from_path(path)?)
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

/// Per-cell contact counts of one bait. Combinations not evaluated for a cell
/// are written as empty fields.
pub fn write_bait_table<P: AsRef<Path>>(table: &BaitTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = create_writer(path)?;

    writer.write_record(table.header())?;

    for row in &table.rows {
        let mut record = vec![row.cell_id.clone(), row.surface_count.to_string()];
        record.extend(
            row.counts
                .iter()
                .map(|c| c.map(|n| n.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!("Results written to {}", path.display());
    Ok(())
}

/// Two-column `Parameter, Value` table.
pub fn write_metadata<P: AsRef<Path>>(metadata: &Metadata, path: P) -> Result<()> {
    let mut writer = create_writer(path.as_ref())?;

    writer.write_record(["Parameter", "Value"])?;
    for (key, value) in metadata.entries() {
        writer.write_record([key, value])?;
    }

    writer.flush()?;
    Ok(())
}

/// Summed volume per bin, one column per cell.
pub fn write_radial_per_cell<P: AsRef<Path>>(result: &RadialResult, path: P) -> Result<()> {
    let mut writer = create_writer(path.as_ref())?;

    let mut header = vec!["Bin".to_string()];
    header.extend(result.profiles.iter().map(|p| p.cell_id.clone()));
    writer.write_record(&header)?;

    for (k, label) in result.bins.labels().into_iter().enumerate() {
        let mut record = vec![label];
        record.extend(result.profiles.iter().map(|p| format!("{:.6}", p.sums[k])));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Mean and SD per bin. Undefined statistics are written as empty fields.
pub fn write_radial_summary<P: AsRef<Path>>(result: &RadialResult, path: P) -> Result<()> {
    let mut writer = create_writer(path.as_ref())?;

    writer.write_record(["Bin", "Mean", "SD"])?;
    for (label, stats) in result.bins.labels().into_iter().zip(result.summary.iter()) {
        writer.write_record([label, format_value(stats.mean), format_value(stats.sd)])?;
    }

    writer.flush()?;
    Ok(())
}

/// Metrics as rows, cells as columns.
pub fn write_metrics_table<P: AsRef<Path>>(table: &MetricsTable, path: P) -> Result<()> {
    let mut writer = create_writer(path.as_ref())?;

    let mut header = vec!["Metric".to_string()];
    header.extend(table.cells.iter().map(|c| c.cell_id.clone()));
    writer.write_record(&header)?;

    for (i, name) in METRIC_ROWS.iter().enumerate() {
        let mut record = vec![name.to_string()];
        for cell in &table.cells {
            let value = cell.values()[i];
            record.push(if name.starts_with("Count_") {
                value.map(|v| format!("{}", v as usize)).unwrap_or_default()
            } else {
                format_value(value)
            });
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Long-format one-way table: `cell_id, source, target, interaction,
/// mean_distance, count`.
pub fn write_interactions<P: AsRef<Path>>(rows: &[Interaction], path: P) -> Result<()> {
    let mut writer = create_writer(path.as_ref())?;

    writer.write_record(["cell_id", "source", "target", "interaction", "mean_distance", "count"])?;
    for row in rows {
        writer.write_record([
            row.cell_id.clone(),
            row.source.clone(),
            row.target.clone(),
            row.label(),
            format!("{:.6}", row.mean_distance),
            row.count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Radial summary reloaded from a previous export.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialOutput {
    pub organelle: String,
    pub bin_width: f64,
    pub max_distance: f64,
    pub n_bins: usize,
    /// `n_bins + 1` edges starting at 0.
    pub edges: Vec<f64>,
    /// Missing means are read as 0.
    pub means: Vec<f64>,
}

fn read_metadata(path: &Path) -> Result<HashMap<String, String>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut entries = HashMap::new();
    for record in reader.records() {
        let record = record?;
        if let (Some(key), Some(value)) = (record.get(0), record.get(1)) {
            entries.insert(key.to_string(), value.to_string());
        }
    }
    Ok(entries)
}

fn parse_number<T: std::str::FromStr>(path: &Path, key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OrgaplexError::validation(path, format!("invalid value '{}' for {}", value, key)))
}

/// Reload a radial summary and its metadata table.
pub fn read_radial_output<P: AsRef<Path>, Q: AsRef<Path>>(
    summary_path: P,
    metadata_path: Q,
) -> Result<RadialOutput> {
    let summary_path = summary_path.as_ref();
    let metadata_path = metadata_path.as_ref();

    let metadata = read_metadata(metadata_path)?;
    let missing: Vec<&str> = REQUIRED_RADIAL_KEYS
        .iter()
        .copied()
        .filter(|k| !metadata.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(OrgaplexError::validation(
            metadata_path,
            format!("missing metadata keys: {}", missing.join(", ")),
        ));
    }

    let organelle = metadata["Organelle"].clone();
    let bin_width: f64 = parse_number(metadata_path, "Bin_Width_um", &metadata["Bin_Width_um"])?;
    let max_distance: f64 = parse_number(metadata_path, "Max_Distance_um", &metadata["Max_Distance_um"])?;
    let n_bins: usize = parse_number(metadata_path, "Total_Bins", &metadata["Total_Bins"])?;

    let mut reader = ReaderBuilder::new().has_headers(true).from_path(summary_path)?;
    let mean_column = reader
        .headers()?
        .iter()
        .position(|h| h == "Mean")
        .ok_or_else(|| OrgaplexError::validation(summary_path, "summary has no 'Mean' column"))?;

    let upper_edge = Regex::new(r",\s*([\d.]+)\]").map_err(|e| OrgaplexError::Other(e.to_string()))?;

    let mut edges = vec![0.0];
    let mut means = Vec::new();
    for record in reader.records() {
        let record = record?;
        let label = record.get(0).unwrap_or_default();
        let caps = upper_edge
            .captures(label)
            .ok_or_else(|| OrgaplexError::validation(summary_path, format!("unreadable bin label '{}'", label)))?;
        edges.push(parse_number(summary_path, "bin edge", &caps[1])?);

        let mean = record.get(mean_column).unwrap_or_default().trim();
        means.push(if mean.is_empty() {
            0.0
        } else {
            let value: f64 = parse_number(summary_path, "Mean", mean)?;
            if value.is_nan() { 0.0 } else { value }
        });
    }

    if means.len() != n_bins {
        return Err(OrgaplexError::validation(
            summary_path,
            format!("{} bins in summary, metadata says {}", means.len(), n_bins),
        ));
    }

    Ok(RadialOutput {
        organelle,
        bin_width,
        max_distance,
        n_bins,
        edges,
        means,
    })
}

/// Output paths of one radial export: per-cell, summary, metadata.
pub fn radial_paths(output_dir: &Path, organelle: &str) -> [PathBuf; 3] {
    [
        output_dir.join(radial_file_name(organelle, "per_cell")),
        output_dir.join(radial_file_name(organelle, "summary")),
        output_dir.join(radial_file_name(organelle, "metadata")),
    ]
}
