// src/metrics.rs - Volume and sphericity summary statistics per cell

use log::{info, warn};

use crate::catalog::Catalog;
use crate::errors::{OrgaplexError, Result};
use crate::measurement::{file_name, MeasurementReader, MetricKind};
use crate::natural_sort::natural_cmp;

/// Row names of a metrics table, in output order.
pub const METRIC_ROWS: [&str; 6] = [
    "Mean_Sphericity",
    "Count_Sphericity",
    "Mean_Volume",
    "Count_Volume",
    "Total_Volume",
    "Max_Volume",
];

/// Summary statistics of one cell for one organelle. Missing values stay
/// `None`; counts are 0 when the file was missing or invalid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellMetrics {
    pub cell_id: String,
    pub mean_sphericity: Option<f64>,
    pub count_sphericity: usize,
    pub mean_volume: Option<f64>,
    pub count_volume: usize,
    pub total_volume: Option<f64>,
    pub max_volume: Option<f64>,
}

impl CellMetrics {
    /// Values in [`METRIC_ROWS`] order.
    pub fn values(&self) -> [Option<f64>; 6] {
        [
            self.mean_sphericity,
            Some(self.count_sphericity as f64),
            self.mean_volume,
            Some(self.count_volume as f64),
            self.total_volume,
            self.max_volume,
        ]
    }
}

/// Metrics table for one organelle, cells sorted naturally.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    pub organelle: String,
    pub cells: Vec<CellMetrics>,
}

pub struct MetricsAnalyzer<'a> {
    catalog: &'a Catalog,
    reader: MeasurementReader,
}

impl<'a> MetricsAnalyzer<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            reader: MeasurementReader::default(),
        }
    }

    pub fn with_reader(mut self, reader: MeasurementReader) -> Self {
        self.reader = reader;
        self
    }

    fn load(&self, cell_id: &str, organelle: &str, kind: MetricKind) -> Option<Vec<f64>> {
        let path = self.catalog.metric_file(cell_id, organelle, &kind.to_string())?;
        if !path.exists() {
            warn!("Missing {} file for {} ({})", kind, cell_id, organelle);
            return None;
        }
        match self.reader.load_metric_file(&path, kind) {
            Ok(values) => Some(values),
            Err(e) => {
                warn!("Failed to process {}: {}", file_name(&path), e);
                None
            }
        }
    }

    pub fn analyze_cell(&self, cell_id: &str, organelle: &str) -> CellMetrics {
        let mut metrics = CellMetrics {
            cell_id: cell_id.to_string(),
            ..Default::default()
        };

        if let Some(volumes) = self.load(cell_id, organelle, MetricKind::Volume) {
            let total: f64 = volumes.iter().sum();
            metrics.count_volume = volumes.len();
            metrics.total_volume = Some(total);
            metrics.mean_volume = Some(total / volumes.len() as f64);
            metrics.max_volume = volumes.iter().copied().reduce(f64::max);
        }

        if let Some(sphericity) = self.load(cell_id, organelle, MetricKind::Sphericity) {
            metrics.count_sphericity = sphericity.len();
            metrics.mean_sphericity = Some(sphericity.iter().sum::<f64>() / sphericity.len() as f64);
        }

        metrics
    }

    /// Metrics of every cell owning `organelle`. `None` when no cell does.
    pub fn analyze_organelle(&self, organelle: &str) -> Option<MetricsTable> {
        let cells = self.catalog.cells_by_organelle(organelle);
        if cells.is_empty() {
            warn!("No cells found for organelle: {}", organelle);
            return None;
        }
        info!("Found {} cells for {}", cells.len(), organelle);

        let mut rows: Vec<CellMetrics> = cells
            .iter()
            .map(|cell_id| self.analyze_cell(cell_id, organelle))
            .collect();
        rows.sort_by(|a, b| natural_cmp(&a.cell_id, &b.cell_id));

        Some(MetricsTable {
            organelle: organelle.to_string(),
            cells: rows,
        })
    }

    /// Tables for `organelles` (every catalog organelle when empty).
    pub fn analyze(&self, organelles: &[String]) -> Result<Vec<MetricsTable>> {
        let organelles: &[String] = if organelles.is_empty() {
            self.catalog.all_organelles()
        } else {
            organelles
        };

        if organelles.is_empty() {
            return Err(OrgaplexError::EmptyResult("no organelles detected".to_string()));
        }

        let mut tables = Vec::new();
        for organelle in organelles {
            if !self.catalog.has_organelle(organelle) {
                return Err(OrgaplexError::UnknownOrganelle {
                    name: organelle.clone(),
                    available: self.catalog.all_organelles().join(", "),
                });
            }
            info!("Analyzing organelle: {}", organelle);
            match self.analyze_organelle(organelle) {
                Some(table) => {
                    info!("  Processed {} cells", table.cells.len());
                    tables.push(table);
                }
                None => warn!("  No data for {}", organelle),
            }
        }

        if tables.is_empty() {
            return Err(OrgaplexError::EmptyResult("volume/sphericity metrics".to_string()));
        }
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_series(path: &std::path::Path, values: &[&str]) {
        let mut content = String::from(" \nTitle\n====\nValue,Unit\n");
        for v in values {
            content.push_str(v);
            content.push('\n');
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_cell_metrics_from_files() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("control_1_Mito_Statistics");
        fs::create_dir(&folder).unwrap();
        write_series(&folder.join("control_1_Mito_Volume.csv"), &["1.0", "2.0", "6.0"]);
        write_series(&folder.join("control_1_Mito_Sphericity.csv"), &["0.5", "0.7"]);

        let catalog = Catalog::build(tmp.path()).unwrap();
        let metrics = MetricsAnalyzer::new(&catalog).analyze_cell("control_1", "Mito");

        assert_approx_eq!(metrics.mean_volume.unwrap(), 3.0);
        assert_eq!(metrics.count_volume, 3);
        assert_approx_eq!(metrics.total_volume.unwrap(), 9.0);
        assert_approx_eq!(metrics.max_volume.unwrap(), 6.0);
        assert_approx_eq!(metrics.mean_sphericity.unwrap(), 0.6);
        assert_eq!(metrics.count_sphericity, 2);
    }

    #[test]
    fn test_missing_and_invalid_files_leave_gaps() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("control_2_Mito_Statistics");
        fs::create_dir(&folder).unwrap();
        write_series(&folder.join("control_2_Mito_Volume.csv"), &["1.0", "-2.0"]);

        let catalog = Catalog::build(tmp.path()).unwrap();
        let metrics = MetricsAnalyzer::new(&catalog).analyze_cell("control_2", "Mito");

        assert_eq!(metrics.mean_volume, None);
        assert_eq!(metrics.count_volume, 0);
        assert_eq!(metrics.mean_sphericity, None);
        assert_eq!(metrics.values()[1], Some(0.0));
    }

    #[test]
    fn test_unknown_organelle_is_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("control_1_Mito_Statistics")).unwrap();
        let catalog = Catalog::build(tmp.path()).unwrap();

        let err = MetricsAnalyzer::new(&catalog)
            .analyze(&["ER".to_string()])
            .unwrap_err();
        assert!(matches!(err, OrgaplexError::UnknownOrganelle { .. }));
    }
}
