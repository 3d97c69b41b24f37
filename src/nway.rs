// src/nway.rs - N-way interaction analysis across all cells of a bait

use std::collections::BTreeSet;
use std::fmt;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::combinations::{generate_boolean_combinations, BooleanCombination, MAX_TARGETS};
use crate::contact::{evaluate_contacts, CellEvaluation, TargetSeries};
use crate::errors::{OrgaplexError, Result};
use crate::measurement::MeasurementReader;
use crate::natural_sort::natural_cmp;
use crate::outcome::{Outcome, SkipReason};

/// How cells whose usable targets differ from the bait's full target set are
/// handled.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetSetPolicy {
    /// Every row is evaluated over the bait's full target set; incomplete
    /// cells are skipped.
    Fixed,
    /// Each cell is evaluated over its own usable targets; combinations not
    /// evaluated for a cell are left empty.
    #[default]
    PerCell,
}

impl fmt::Display for TargetSetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSetPolicy::Fixed => write!(f, "fixed"),
            TargetSetPolicy::PerCell => write!(f, "per_cell"),
        }
    }
}

/// One row of a bait table. `counts` is aligned with the table's
/// combinations.
#[derive(Debug, Clone, PartialEq)]
pub struct CellResultRow {
    pub cell_id: String,
    pub surface_count: usize,
    pub counts: Vec<Option<usize>>,
}

impl CellResultRow {
    pub fn is_partition(&self) -> bool {
        self.counts.iter().flatten().sum::<usize>() == self.surface_count
    }
}

/// Results for one bait: rows sorted naturally by cell id.
#[derive(Debug, Clone)]
pub struct BaitTable {
    pub bait: String,
    pub targets: Vec<String>,
    pub combinations: Vec<BooleanCombination>,
    pub rows: Vec<CellResultRow>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl BaitTable {
    /// `Cell_ID`, `Surface_count`, then one column per combination.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec!["Cell_ID".to_string(), "Surface_count".to_string()];
        header.extend(self.combinations.iter().map(|c| c.label.clone()));
        header
    }

    pub fn row(&self, cell_id: &str) -> Option<&CellResultRow> {
        self.rows.iter().find(|r| r.cell_id == cell_id)
    }

    pub fn count(&self, cell_id: &str, label: &str) -> Option<usize> {
        let column = self.combinations.iter().position(|c| c.label == label)?;
        self.row(cell_id)?.counts[column]
    }

    pub fn total_surfaces(&self) -> usize {
        self.rows.iter().map(|r| r.surface_count).sum()
    }

    /// Share of surfaces (percent) without any contact.
    pub fn no_contact_percentage(&self) -> Option<f64> {
        let column = self.combinations.iter().position(|c| c.is_no_contact())?;
        let total = self.total_surfaces();
        if total == 0 {
            return None;
        }
        let no_contact: usize = self.rows.iter().filter_map(|r| r.counts[column]).sum();
        Some(no_contact as f64 / total as f64 * 100.0)
    }
}

/// Drives the contact evaluator over every cell of a bait.
pub struct NWayAnalyzer<'a> {
    catalog: &'a Catalog,
    reader: MeasurementReader,
    threshold: f64,
    policy: TargetSetPolicy,
    use_parallel: bool,
}

impl<'a> NWayAnalyzer<'a> {
    pub fn new(catalog: &'a Catalog, threshold: f64) -> Self {
        Self {
            catalog,
            reader: MeasurementReader::default(),
            threshold,
            policy: TargetSetPolicy::default(),
            use_parallel: false,
        }
    }

    pub fn with_policy(mut self, policy: TargetSetPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reader(mut self, reader: MeasurementReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn policy(&self) -> TargetSetPolicy {
        self.policy
    }

    /// Every organelle any cell of `bait` has a distance file for.
    pub fn bait_targets(&self, bait: &str) -> Vec<String> {
        let targets: BTreeSet<String> = self
            .catalog
            .cells_by_organelle(bait)
            .iter()
            .flat_map(|cell_id| self.catalog.distance_files(cell_id, bait))
            .map(|(_, target)| target)
            .collect();
        targets.into_iter().collect()
    }

    /// Load every distance file of one cell/bait pair. Files that fail to load
    /// drop only their own target.
    pub fn load_target_series(&self, cell_id: &str, bait: &str) -> Outcome<Vec<TargetSeries>> {
        let files = self.catalog.distance_files(cell_id, bait);
        if files.is_empty() {
            warn!("No distance files found for {}/{}", cell_id, bait);
            return Outcome::Skipped(SkipReason::NoDistanceFiles {
                cell_id: cell_id.to_string(),
                bait: bait.to_string(),
            });
        }

        let mut series = Vec::with_capacity(files.len());
        for (path, target) in files {
            match self.reader.load_distance_file(&path) {
                Ok(distances) => series.push(TargetSeries::new(target, distances)),
                Err(e) => warn!("Dropping target {} for {}/{}: {}", target, cell_id, bait, e),
            }
        }

        if series.is_empty() {
            warn!("No valid distance data for {}/{}", cell_id, bait);
            return Outcome::Skipped(SkipReason::NoUsableTargets {
                cell_id: cell_id.to_string(),
                bait: bait.to_string(),
            });
        }

        Outcome::Done(series)
    }

    /// Load and evaluate one cell/bait pair.
    pub fn analyze_cell_for_bait(&self, cell_id: &str, bait: &str) -> Outcome<CellEvaluation> {
        debug!("Processing cell {} for bait {}", cell_id, bait);
        match self.load_target_series(cell_id, bait) {
            Outcome::Done(series) => evaluate_contacts(cell_id, bait, &series, self.threshold),
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
        }
    }

    /// Evaluate every cell of `bait` and assemble the table.
    pub fn analyze_bait(&self, bait: &str) -> Result<BaitTable> {
        info!("Analyzing bait: {}", bait);

        let cells = self.catalog.cells_by_organelle(bait);
        if cells.is_empty() {
            warn!("No cells found with bait organelle: {}", bait);
            return Err(OrgaplexError::EmptyResult(format!("bait {}", bait)));
        }

        let targets = self.bait_targets(bait);
        if targets.len() > MAX_TARGETS {
            return Err(OrgaplexError::Config(format!(
                "bait {} has {} target organelles, at most {} are supported",
                bait,
                targets.len(),
                MAX_TARGETS
            )));
        }
        let combinations = generate_boolean_combinations(&targets);
        info!(
            "Found {} cells with {}; {} targets -> {} combinations",
            cells.len(),
            bait,
            targets.len(),
            combinations.len()
        );

        let evaluations: Vec<(String, Outcome<CellEvaluation>)> = if self.use_parallel {
            cells
                .par_iter()
                .map(|cell_id| (cell_id.clone(), self.analyze_cell_for_bait(cell_id, bait)))
                .collect()
        } else {
            cells
                .iter()
                .map(|cell_id| (cell_id.clone(), self.analyze_cell_for_bait(cell_id, bait)))
                .collect()
        };

        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        for (cell_id, outcome) in evaluations {
            let placed = match outcome {
                Outcome::Done(evaluation) => {
                    place_row(&cell_id, &evaluation, &targets, &combinations, self.policy)
                }
                Outcome::Skipped(reason) => Outcome::Skipped(reason),
            };
            match placed {
                Outcome::Done(row) => rows.push(row),
                Outcome::Skipped(reason) => {
                    warn!("Skipping cell {} for bait {}: {}", cell_id, bait, reason);
                    skipped.push((cell_id, reason));
                }
            }
        }

        if rows.is_empty() {
            warn!("No valid results for bait: {}", bait);
            return Err(OrgaplexError::EmptyResult(format!("bait {}", bait)));
        }

        rows.sort_by(|a, b| natural_cmp(&a.cell_id, &b.cell_id));

        info!(
            "Completed {}: {} cells, {} skipped, {} columns",
            bait,
            rows.len(),
            skipped.len(),
            combinations.len() + 1
        );

        Ok(BaitTable {
            bait: bait.to_string(),
            targets,
            combinations,
            rows,
            skipped,
        })
    }

    /// Analyze several baits. An empty bait only fails the run when it is the
    /// only one requested, or when every requested bait is empty.
    pub fn analyze_baits(&self, baits: &[String]) -> Result<Vec<BaitTable>> {
        for bait in baits {
            if !self.catalog.has_organelle(bait) {
                return Err(OrgaplexError::UnknownOrganelle {
                    name: bait.clone(),
                    available: self.catalog.all_organelles().join(", "),
                });
            }
        }

        info!("Analyzing {} bait organelle(s): {}", baits.len(), baits.join(", "));

        let mut tables = Vec::new();
        for (idx, bait) in baits.iter().enumerate() {
            info!("Bait {}/{}: {}", idx + 1, baits.len(), bait);
            match self.analyze_bait(bait) {
                Ok(table) => tables.push(table),
                Err(OrgaplexError::EmptyResult(what)) if baits.len() > 1 => {
                    warn!("No usable data for {}, continuing", what);
                }
                Err(e) => return Err(e),
            }
        }

        if tables.is_empty() {
            return Err(OrgaplexError::EmptyResult(format!(
                "all requested baits ({})",
                baits.join(", ")
            )));
        }

        info!("Analysis complete. Generated results for {} baits.", tables.len());
        Ok(tables)
    }

    /// Analyze every organelle of the catalog as a bait.
    pub fn analyze_all_baits(&self) -> Result<Vec<BaitTable>> {
        self.analyze_baits(self.catalog.all_organelles())
    }
}

/// Lay out one cell's tally along the bait's combination list.
fn place_row(
    cell_id: &str,
    evaluation: &CellEvaluation,
    targets: &[String],
    combinations: &[BooleanCombination],
    policy: TargetSetPolicy,
) -> Outcome<CellResultRow> {
    let tally = &evaluation.tally;
    let evaluated = tally.targets();

    if policy == TargetSetPolicy::Fixed && evaluated.as_slice() != targets {
        let missing = targets
            .iter()
            .filter(|t| !evaluated.contains(*t))
            .cloned()
            .collect();
        return Outcome::Skipped(SkipReason::TargetSetMismatch {
            cell_id: cell_id.to_string(),
            missing,
        });
    }

    let counts = combinations.iter().map(|c| tally.count(&c.label)).collect();

    Outcome::Done(CellResultRow {
        cell_id: cell_id.to_string(),
        surface_count: tally.surface_count,
        counts,
    })
}
