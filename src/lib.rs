// src/lib.rs - Library interface for Orgaplex-Analyzer

pub mod catalog;
pub mod combinations;
pub mod config;
pub mod contact;
pub mod errors;
pub mod measurement;
pub mod metadata;
pub mod metrics;
pub mod natural_sort;
pub mod nway;
pub mod oneway;
pub mod outcome;
pub mod output;
pub mod pipeline;
pub mod radial;

// Re-export commonly used types and functions
pub use errors::{OrgaplexError, Result};
pub use config::{AnalysisKind, Config};
pub use catalog::{Catalog, DatasetLayout};
pub use measurement::{MeasurementReader, MetricKind};
pub use metadata::RunContext;
pub use outcome::{Outcome, SkipReason};
pub use pipeline::{run_analysis, RunSummary};

pub use combinations::{generate_boolean_combinations, BooleanCombination, NO_CONTACT_LABEL};
pub use contact::{evaluate_contacts, ContactMatrix, ContactTally, TargetSeries};
pub use nway::{BaitTable, CellResultRow, NWayAnalyzer, TargetSetPolicy};

pub use radial::{bin_cell, summarize, BinSummary, CellProfile, RadialAnalyzer, RadialBins, RadialResult};
pub use output::{read_radial_output, RadialOutput};

pub use metrics::{CellMetrics, MetricsAnalyzer, MetricsTable};
pub use oneway::{Interaction, OneWayAnalyzer};
pub use natural_sort::{natural_cmp, sort_cell_ids};
