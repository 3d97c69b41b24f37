// src/pipeline.rs - Run one configured analysis end to end

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::{AnalysisKind, Config};
use crate::errors::{OrgaplexError, Result};
use crate::measurement::MeasurementReader;
use crate::metadata::{Metadata, RunContext};
use crate::metrics::MetricsAnalyzer;
use crate::nway::{BaitTable, NWayAnalyzer};
use crate::oneway::{interaction_order, OneWayAnalyzer, OutputMode};
use crate::output::{
    metrics_file_name, nway_metadata_name, nway_results_name, oneway_all_cells_name,
    oneway_cell_name, radial_paths, write_bait_table, write_interactions, write_metadata,
    write_metrics_table, write_radial_per_cell, write_radial_summary, METRICS_METADATA_NAME,
    ONEWAY_PER_CELL_DIR,
};
use crate::radial::RadialAnalyzer;

pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// Totals of one run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunSummary {
    pub analysis: AnalysisKind,
    /// Baits, organelles or cells that produced output.
    pub units_processed: usize,
    pub cells_processed: usize,
    pub cells_skipped: usize,
    pub combinations_generated: usize,
    pub files_written: Vec<PathBuf>,
}

impl RunSummary {
    fn new(analysis: AnalysisKind) -> Self {
        Self {
            analysis,
            units_processed: 0,
            cells_processed: 0,
            cells_skipped: 0,
            combinations_generated: 0,
            files_written: Vec::new(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analysis: {}", self.analysis)?;
        writeln!(f, "Units processed: {}", self.units_processed)?;
        writeln!(f, "Cells processed: {}", self.cells_processed)?;
        writeln!(f, "Cells skipped: {}", self.cells_skipped)?;
        if self.analysis == AnalysisKind::Nway {
            writeln!(f, "Combinations generated: {}", self.combinations_generated)?;
        }
        write!(f, "Files written: {}", self.files_written.len())
    }
}

fn reader(config: &Config) -> MeasurementReader {
    MeasurementReader::new(config.volume_warning_ceiling)
}

/// Dispatch on `config.analysis`, then log (and optionally save) the summary.
pub fn run_analysis(config: &Config, ctx: &RunContext) -> Result<RunSummary> {
    let catalog = Catalog::build(&config.input_path)?;
    let output_dir = PathBuf::from(&config.output_base_dir);
    fs::create_dir_all(&output_dir)?;

    let mut summary = match config.analysis {
        AnalysisKind::Nway => run_nway(&catalog, config, ctx, &output_dir)?,
        AnalysisKind::Radial => run_radial(&catalog, config, ctx, &output_dir)?,
        AnalysisKind::Metrics => run_metrics(&catalog, config, ctx, &output_dir)?,
        AnalysisKind::Oneway => run_oneway(&catalog, config, ctx, &output_dir)?,
    };

    if config.write_run_summary {
        let path = output_dir.join(RUN_SUMMARY_FILE);
        summary.files_written.push(path.clone());
        fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
    }

    for line in summary.to_string().lines() {
        info!("{}", line);
    }
    Ok(summary)
}

fn bait_metadata(
    table: &BaitTable,
    catalog: &Catalog,
    analyzer: &NWayAnalyzer<'_>,
    ctx: &RunContext,
) -> Metadata {
    let mut metadata = ctx.metadata(AnalysisKind::Nway.title());
    metadata
        .push("Bait_Organelle", &table.bait)
        .push("Contact_Threshold", analyzer.threshold())
        .push("Target_Set_Policy", analyzer.policy())
        .push("Total_Combinations", table.combinations.len())
        .push("Total_Cells_Analyzed", table.rows.len())
        .push("Cells_Skipped", table.skipped.len())
        .push("All_Organelles", catalog.all_organelles().join(", "));
    metadata
}

/// N-way contact analysis for the configured baits (every organelle when
/// none is configured). One results and one metadata table per bait.
pub fn run_nway(catalog: &Catalog, config: &Config, ctx: &RunContext, output_dir: &Path) -> Result<RunSummary> {
    let analyzer = NWayAnalyzer::new(catalog, config.contact_threshold)
        .with_policy(config.target_set_policy)
        .with_reader(reader(config))
        .with_parallel(config.use_parallel);

    info!(
        "Contact threshold: {} um, target set policy: {}",
        analyzer.threshold(),
        analyzer.policy()
    );

    let tables = if config.bait_organelles.is_empty() {
        analyzer.analyze_all_baits()?
    } else {
        analyzer.analyze_baits(&config.bait_organelles)?
    };

    let stamp = ctx.file_stamp();
    let mut summary = RunSummary::new(AnalysisKind::Nway);

    for table in &tables {
        let results_path = output_dir.join(nway_results_name(&table.bait, &stamp));
        let metadata_path = output_dir.join(nway_metadata_name(&table.bait, &stamp));

        write_bait_table(table, &results_path)?;
        write_metadata(&bait_metadata(table, catalog, &analyzer, ctx), &metadata_path)?;

        if let Some(pct) = table.no_contact_percentage() {
            info!(
                "{}: {} surfaces over {} cells, {:.1}% without contact",
                table.bait,
                table.total_surfaces(),
                table.rows.len(),
                pct
            );
        }

        summary.units_processed += 1;
        summary.cells_processed += table.rows.len();
        summary.cells_skipped += table.skipped.len();
        summary.combinations_generated += table.combinations.len();
        summary.files_written.push(results_path);
        summary.files_written.push(metadata_path);
    }

    Ok(summary)
}

/// Radial distribution of the configured organelle.
pub fn run_radial(catalog: &Catalog, config: &Config, ctx: &RunContext, output_dir: &Path) -> Result<RunSummary> {
    let organelle = config
        .radial_organelle
        .as_deref()
        .ok_or_else(|| OrgaplexError::Config("radial analysis requires radial_organelle".to_string()))?;

    let analyzer = RadialAnalyzer::new(catalog, config.radial_bin_width, config.radial_max_distance)?
        .with_reader(reader(config))
        .with_parallel(config.use_parallel);
    let result = analyzer.analyze(organelle)?;

    let mut metadata = ctx.metadata(AnalysisKind::Radial.title());
    metadata
        .push("Organelle", organelle)
        .push("Bin_Width_um", result.bins.bin_width())
        .push("Max_Distance_um", result.bins.max_distance())
        .push("Total_Bins", result.bins.n_bins())
        .push("Cells_Analyzed", result.profiles.len());

    let [per_cell_path, summary_path, metadata_path] = radial_paths(output_dir, organelle);
    write_radial_per_cell(&result, &per_cell_path)?;
    write_radial_summary(&result, &summary_path)?;
    write_metadata(&metadata, &metadata_path)?;
    info!("Results saved to: {}", output_dir.display());

    let mut summary = RunSummary::new(AnalysisKind::Radial);
    summary.units_processed = 1;
    summary.cells_processed = result.profiles.len();
    summary.cells_skipped = result.skipped.len();
    summary.files_written = vec![per_cell_path, summary_path, metadata_path];
    Ok(summary)
}

/// Volume and sphericity metrics per organelle.
pub fn run_metrics(catalog: &Catalog, config: &Config, ctx: &RunContext, output_dir: &Path) -> Result<RunSummary> {
    let analyzer = MetricsAnalyzer::new(catalog).with_reader(reader(config));
    let tables = analyzer.analyze(&config.metrics_organelles)?;

    let mut summary = RunSummary::new(AnalysisKind::Metrics);
    for table in &tables {
        let path = output_dir.join(metrics_file_name(&table.organelle));
        write_metrics_table(table, &path)?;
        summary.units_processed += 1;
        summary.cells_processed += table.cells.len();
        summary.files_written.push(path);
    }

    let mut organelles: Vec<&str> = tables.iter().map(|t| t.organelle.as_str()).collect();
    organelles.sort();
    let total_cells = tables.iter().map(|t| t.cells.len()).max().unwrap_or(0);

    let mut metadata = ctx.metadata(AnalysisKind::Metrics.title());
    metadata
        .push("Organelles_Analyzed", organelles.join(", "))
        .push("Total_Cells", total_cells);

    let metadata_path = output_dir.join(METRICS_METADATA_NAME);
    write_metadata(&metadata, &metadata_path)?;
    summary.files_written.push(metadata_path);

    Ok(summary)
}

/// Mean distance for every organelle pair in every cell.
pub fn run_oneway(catalog: &Catalog, config: &Config, ctx: &RunContext, output_dir: &Path) -> Result<RunSummary> {
    let analyzer = OneWayAnalyzer::new(catalog)
        .with_reader(reader(config))
        .with_parallel(config.use_parallel);
    let per_cell = analyzer.process_all_cells()?;

    let mut summary = RunSummary::new(AnalysisKind::Oneway);

    match config.oneway_output_mode {
        OutputMode::Single => {
            let mut rows: Vec<_> = per_cell.iter().flat_map(|(_, rows)| rows.iter().cloned()).collect();
            rows.sort_by(interaction_order);

            let path = output_dir.join(oneway_all_cells_name(&ctx.file_stamp()));
            write_interactions(&rows, &path)?;
            info!("Saved {} interactions to {}", rows.len(), path.display());

            summary.units_processed = 1;
            summary.files_written.push(path);
            for (_, rows) in &per_cell {
                if rows.is_empty() {
                    summary.cells_skipped += 1;
                } else {
                    summary.cells_processed += 1;
                }
            }
        }
        OutputMode::PerCell => {
            let dir = output_dir.join(ONEWAY_PER_CELL_DIR);
            for (cell_id, rows) in &per_cell {
                if rows.is_empty() {
                    warn!("No data for {}, skipping", cell_id);
                    summary.cells_skipped += 1;
                    continue;
                }
                let path = dir.join(oneway_cell_name(cell_id));
                write_interactions(rows, &path)?;
                summary.units_processed += 1;
                summary.cells_processed += 1;
                summary.files_written.push(path);
            }
            info!("Saved {} cell files to {}", summary.units_processed, dir.display());
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display_mentions_combinations_only_for_nway() {
        let mut summary = RunSummary::new(AnalysisKind::Nway);
        summary.combinations_generated = 4;
        assert!(summary.to_string().contains("Combinations generated: 4"));

        let summary = RunSummary::new(AnalysisKind::Radial);
        assert!(!summary.to_string().contains("Combinations"));
        assert!(summary.to_string().ends_with("Files written: 0"));
    }
}
