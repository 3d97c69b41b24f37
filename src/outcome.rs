// src/outcome.rs - Per-unit results for the skip-and-continue policy

use std::fmt;
use std::path::PathBuf;

/// Why a unit of work (one target, one cell/bait pair, one cell/organelle pair)
/// was left out of the results.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No folder for the organelle in this cell.
    MissingFolder { cell_id: String, organelle: String },

    /// An expected measurement file does not exist.
    MissingFile(PathBuf),

    /// The bait folder holds no shortest-distance files.
    NoDistanceFiles { cell_id: String, bait: String },

    /// A measurement file could not be read or failed validation.
    Invalid { path: PathBuf, reason: String },

    /// Two series that must be positionally aligned have different lengths.
    Alignment {
        label: String,
        expected: usize,
        found: usize,
    },

    /// Every target was dropped before evaluation.
    NoUsableTargets { cell_id: String, bait: String },

    /// The cell was evaluated over a different target set than the bait's.
    TargetSetMismatch {
        cell_id: String,
        missing: Vec<String>,
    },

    /// Nothing left after dropping missing values.
    NoValidRows(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingFolder { cell_id, organelle } => {
                write!(f, "no {} folder for cell {}", organelle, cell_id)
            }
            SkipReason::MissingFile(path) => write!(f, "missing file {}", path.display()),
            SkipReason::NoDistanceFiles { cell_id, bait } => {
                write!(f, "no distance files found for {}/{}", cell_id, bait)
            }
            SkipReason::Invalid { path, reason } => {
                write!(f, "invalid file {}: {}", path.display(), reason)
            }
            SkipReason::Alignment { label, expected, found } => write!(
                f,
                "length mismatch for {}: {} rows vs expected {}",
                label, found, expected
            ),
            SkipReason::NoUsableTargets { cell_id, bait } => {
                write!(f, "no valid distance data for {}/{}", cell_id, bait)
            }
            SkipReason::TargetSetMismatch { cell_id, missing } => write!(
                f,
                "cell {} lacks usable data for target(s) {}",
                cell_id,
                missing.join(", ")
            ),
            SkipReason::NoValidRows(what) => write!(f, "no valid data after NaN removal for {}", what),
        }
    }
}

/// Result of one unit: either a value, or the reason it was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Outcome::Done(_) => None,
            Outcome::Skipped(reason) => Some(reason),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Done(value) => Outcome::Done(f(value)),
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_skip_reason() {
        let skipped: Outcome<usize> = Outcome::Skipped(SkipReason::NoValidRows("c1".to_string()));
        let mapped = skipped.map(|n| n * 2);
        assert!(!mapped.is_done());
        assert_eq!(
            mapped.skip_reason(),
            Some(&SkipReason::NoValidRows("c1".to_string()))
        );

        let done = Outcome::Done(21).map(|n| n * 2);
        assert_eq!(done.done(), Some(42));
    }

    #[test]
    fn test_alignment_reason_message() {
        let reason = SkipReason::Alignment {
            label: "control_1/ER -> Mito".to_string(),
            expected: 10,
            found: 9,
        };
        assert_eq!(
            reason.to_string(),
            "length mismatch for control_1/ER -> Mito: 9 rows vs expected 10"
        );
    }
}
