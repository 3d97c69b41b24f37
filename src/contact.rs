// src/contact.rs - Per-point contact classification for one cell/bait pair
//
// Every surface point of the bait is assigned to exactly one boolean
// combination: the set of targets it touches (`distance <= threshold`). Counts
// over all combinations therefore always add up to the surface count.

use log::warn;

use crate::combinations::{generate_boolean_combinations, BooleanCombination, MAX_TARGETS};
use crate::outcome::{Outcome, SkipReason};

/// Distances from every bait surface point to one target organelle.
#[derive(Debug, Clone)]
pub struct TargetSeries {
    pub target: String,
    pub distances: Vec<f64>,
}

impl TargetSeries {
    pub fn new(target: impl Into<String>, distances: Vec<f64>) -> Self {
        Self {
            target: target.into(),
            distances,
        }
    }
}

/// Boolean contact columns sharing one row index (the surface point).
#[derive(Debug, Clone)]
pub struct ContactMatrix {
    /// Sorted target names, one per column.
    targets: Vec<String>,
    columns: Vec<Vec<bool>>,
    n_points: usize,
}

/// Result of building a matrix: the matrix plus the targets dropped for
/// misalignment.
#[derive(Debug, Clone)]
pub struct MatrixBuild {
    pub matrix: ContactMatrix,
    pub dropped: Vec<SkipReason>,
}

impl ContactMatrix {
    /// Build the matrix from `series`, in input order. The first series sets
    /// the reference length; later series of another length are dropped.
    pub fn build(series: &[TargetSeries], threshold: f64, context: &str) -> MatrixBuild {
        let mut reference_len: Option<usize> = None;
        let mut kept: Vec<(&str, &[f64])> = Vec::new();
        let mut dropped = Vec::new();

        for s in series {
            let len = s.distances.len();
            match reference_len {
                None => reference_len = Some(len),
                Some(expected) if expected != len => {
                    let reason = SkipReason::Alignment {
                        label: format!("{} -> {}", context, s.target),
                        expected,
                        found: len,
                    };
                    warn!("Dropping target: {}", reason);
                    dropped.push(reason);
                    continue;
                }
                Some(_) => {}
            }
            kept.push((s.target.as_str(), s.distances.as_slice()));
        }

        kept.sort_by(|a, b| a.0.cmp(b.0));

        let matrix = ContactMatrix {
            targets: kept.iter().map(|(t, _)| t.to_string()).collect(),
            columns: kept
                .iter()
                .map(|(_, d)| d.iter().map(|&v| v <= threshold).collect())
                .collect(),
            n_points: reference_len.unwrap_or(0),
        };

        MatrixBuild { matrix, dropped }
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn column(&self, target: &str) -> Option<&[bool]> {
        self.targets
            .iter()
            .position(|t| t == target)
            .map(|i| self.columns[i].as_slice())
    }

    /// Contact pattern of one row as a mask over the sorted targets.
    pub fn row_mask(&self, row: usize) -> u32 {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col[row])
            .fold(0u32, |mask, (i, _)| mask | (1 << i))
    }

    /// Count rows matching each combination exactly.
    pub fn tally(&self) -> ContactTally {
        let combinations = generate_boolean_combinations(&self.targets);

        let mut per_mask = vec![0usize; 1 << self.targets.len()];
        for row in 0..self.n_points {
            per_mask[self.row_mask(row) as usize] += 1;
        }

        let counts = combinations.iter().map(|c| per_mask[c.mask as usize]).collect();

        ContactTally {
            surface_count: self.n_points,
            combinations,
            counts,
        }
    }
}

/// Counts per combination for one cell/bait pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactTally {
    pub surface_count: usize,
    pub combinations: Vec<BooleanCombination>,
    /// Aligned with `combinations`.
    pub counts: Vec<usize>,
}

impl ContactTally {
    pub fn count(&self, label: &str) -> Option<usize> {
        self.combinations
            .iter()
            .position(|c| c.label == label)
            .map(|i| self.counts[i])
    }

    pub fn targets(&self) -> Vec<String> {
        self.combinations
            .iter()
            .filter(|c| c.required.len() == 1)
            .map(|c| c.required[0].clone())
            .collect()
    }

    /// Every surface point falls in exactly one combination.
    pub fn is_partition(&self) -> bool {
        self.counts.iter().sum::<usize>() == self.surface_count
    }

    /// `(label, count)` pairs, `Surface_count` first.
    pub fn entries(&self) -> Vec<(String, usize)> {
        std::iter::once(("Surface_count".to_string(), self.surface_count))
            .chain(
                self.combinations
                    .iter()
                    .zip(self.counts.iter())
                    .map(|(c, &n)| (c.label.clone(), n)),
            )
            .collect()
    }
}

/// Evaluation of one cell/bait pair.
#[derive(Debug, Clone)]
pub struct CellEvaluation {
    pub tally: ContactTally,
    /// Targets excluded for misalignment.
    pub dropped: Vec<SkipReason>,
}

/// Classify every surface point against the targets in `series`.
///
/// Misaligned targets are excluded and reported in the result. When no target
/// survives (or none was given) the pair is skipped.
pub fn evaluate_contacts(
    cell_id: &str,
    bait: &str,
    series: &[TargetSeries],
    threshold: f64,
) -> Outcome<CellEvaluation> {
    let context = format!("{}/{}", cell_id, bait);
    let MatrixBuild { matrix, dropped } = ContactMatrix::build(series, threshold, &context);

    if matrix.targets().is_empty() {
        warn!("No target organelles left for {}", context);
        return Outcome::Skipped(SkipReason::NoUsableTargets {
            cell_id: cell_id.to_string(),
            bait: bait.to_string(),
        });
    }

    if matrix.targets().len() > MAX_TARGETS {
        warn!(
            "{} has {} targets, more than the supported {}",
            context,
            matrix.targets().len(),
            MAX_TARGETS
        );
        return Outcome::Skipped(SkipReason::NoUsableTargets {
            cell_id: cell_id.to_string(),
            bait: bait.to_string(),
        });
    }

    Outcome::Done(CellEvaluation {
        tally: matrix.tally(),
        dropped,
    })
}
