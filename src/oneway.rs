// src/oneway.rs - Pairwise mean shortest distance between organelles

use std::cmp::Ordering;

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::errors::{OrgaplexError, Result};
use crate::measurement::{file_name, MeasurementReader};
use crate::natural_sort::natural_cmp;

/// How one-way results are written
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One table for all cells
    #[default]
    Single,
    /// One table per cell
    PerCell,
}

/// Mean distance from one source organelle to one target in one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub cell_id: String,
    pub source: String,
    pub target: String,
    pub mean_distance: f64,
    pub count: usize,
}

impl Interaction {
    pub fn label(&self) -> String {
        format!("{}_to_{}", self.source, self.target)
    }
}

/// Ordering used for exported tables: cell (natural), source, target.
pub fn interaction_order(a: &Interaction, b: &Interaction) -> Ordering {
    natural_cmp(&a.cell_id, &b.cell_id)
        .then_with(|| a.source.cmp(&b.source))
        .then_with(|| a.target.cmp(&b.target))
}

pub struct OneWayAnalyzer<'a> {
    catalog: &'a Catalog,
    reader: MeasurementReader,
    use_parallel: bool,
}

impl<'a> OneWayAnalyzer<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            reader: MeasurementReader::default(),
            use_parallel: false,
        }
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    pub fn with_reader(mut self, reader: MeasurementReader) -> Self {
        self.reader = reader;
        self
    }

    /// Every source -> target interaction of one cell. Unreadable files are
    /// skipped with a warning.
    pub fn process_cell(&self, cell_id: &str) -> Vec<Interaction> {
        let mut interactions = Vec::new();

        for folder in self.catalog.folders_for_cell(cell_id) {
            let files = self.catalog.distance_files(cell_id, &folder.organelle);
            if files.is_empty() {
                warn!("No distance files found for {}/{}", cell_id, folder.organelle);
                continue;
            }

            for (path, target) in files {
                match self.reader.load_distance_file(&path) {
                    Ok(distances) => {
                        let count = distances.len();
                        let mean_distance = distances.iter().sum::<f64>() / count as f64;
                        let interaction = Interaction {
                            cell_id: cell_id.to_string(),
                            source: folder.organelle.clone(),
                            target,
                            mean_distance,
                            count,
                        };
                        log::debug!(
                            "{}: {}: mean={:.3}, count={}",
                            cell_id,
                            interaction.label(),
                            mean_distance,
                            count
                        );
                        interactions.push(interaction);
                    }
                    Err(e) => warn!("Error reading {}: {}", file_name(&path), e),
                }
            }
        }

        interactions.sort_by(interaction_order);
        interactions
    }

    /// Interactions of every cell, grouped per cell in natural cell order.
    pub fn process_all_cells(&self) -> Result<Vec<(String, Vec<Interaction>)>> {
        let mut cells = self.catalog.cell_ids();
        cells.sort_by(|a, b| natural_cmp(a, b));
        info!("Processing {} cells...", cells.len());

        let results: Vec<(String, Vec<Interaction>)> = if self.use_parallel {
            cells
                .par_iter()
                .map(|c| (c.clone(), self.process_cell(c)))
                .collect()
        } else {
            cells.iter().map(|c| (c.clone(), self.process_cell(c))).collect()
        };

        if results.iter().all(|(_, rows)| rows.is_empty()) {
            return Err(OrgaplexError::EmptyResult("one-way interactions".to_string()));
        }

        info!("Completed processing {} cells", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write_series(path: &std::path::Path, values: &[f64]) {
        let mut content = String::from(" \nShortest Distance\n====\nValue,Unit\n");
        for v in values {
            content.push_str(&format!("{},um\n", v));
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_process_cell_means_and_counts() {
        let tmp = TempDir::new().unwrap();
        let er = tmp.path().join("control_1_ER_Statistics");
        let ld = tmp.path().join("control_1_LD_Statistics");
        fs::create_dir(&er).unwrap();
        fs::create_dir(&ld).unwrap();
        write_series(
            &er.join("control_1_ER_Shortest_Distance_to_Surfaces_Surfaces=LD.csv"),
            &[1.0, 2.0, 3.0],
        );
        write_series(
            &ld.join("control_1_LD_Shortest_Distance_to_Surfaces_Surfaces=ER.csv"),
            &[-1.0, 1.0],
        );

        let catalog = Catalog::build(tmp.path()).unwrap();
        let rows = OneWayAnalyzer::new(&catalog).process_cell("control_1");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label(), "ER_to_LD");
        assert_approx_eq!(rows[0].mean_distance, 2.0);
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows[1].label(), "LD_to_ER");
        assert_approx_eq!(rows[1].mean_distance, 0.0);
    }

    #[test]
    fn test_all_cells_without_distances_is_empty_result() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("control_1_ER_Statistics")).unwrap();
        let catalog = Catalog::build(tmp.path()).unwrap();

        let err = OneWayAnalyzer::new(&catalog).process_all_cells().unwrap_err();
        assert!(matches!(err, OrgaplexError::EmptyResult(_)));
    }
}
