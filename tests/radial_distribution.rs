mod common;

use assert_approx_eq::assert_approx_eq;
use rstest::{fixture, rstest};

use common::Dataset;
use orgaplex_analyzer_lib::output::{radial_paths, write_metadata, write_radial_summary};
use orgaplex_analyzer_lib::{read_radial_output, Catalog, OrgaplexError, RadialAnalyzer, RunContext, SkipReason};

const LD_DISTANCES: &str = "Distance_from_Origin_Reference_Frame";

#[fixture]
fn dataset() -> Dataset {
    let ds = Dataset::direct();
    ds.metric("cell_1", "LD", "Volume", &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0])
        .metric("cell_1", "LD", LD_DISTANCES, &[0.0, 0.24, 0.25, 0.26, 1.0, 1.1])
        .metric("cell_2", "LD", "Volume", &[2.0, 4.0])
        .metric("cell_2", "LD", LD_DISTANCES, &[0.1, 0.9]);
    ds
}

#[rstest]
fn per_cell_sums_and_summary(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let result = RadialAnalyzer::new(&catalog, 0.25, 1.0)
        .unwrap()
        .analyze("LD")
        .unwrap();

    assert_eq!(result.profiles.len(), 2);
    assert_eq!(result.profiles[0].cell_id, "cell_1");
    assert_eq!(result.profiles[0].sums, vec![3.0, 1.0, 0.0, 1.0]);
    assert_eq!(result.profiles[0].rows_out_of_range, 1);
    assert_eq!(result.profiles[1].sums, vec![2.0, 0.0, 0.0, 4.0]);

    assert_approx_eq!(result.summary[0].mean.unwrap(), 2.5);
    assert_approx_eq!(result.summary[0].sd.unwrap(), 0.5f64.sqrt());
    assert_approx_eq!(result.summary[2].mean.unwrap(), 0.0);
    assert!(result.skipped.is_empty());
}

#[rstest]
fn misaligned_cell_is_skipped(dataset: Dataset) {
    dataset.metric("cell_3", "LD", "Volume", &[1.0, 2.0, 3.0]);
    dataset.metric("cell_3", "LD", LD_DISTANCES, &[0.1]);

    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let result = RadialAnalyzer::new(&catalog, 0.25, 1.0)
        .unwrap()
        .analyze("LD")
        .unwrap();

    assert_eq!(result.profiles.len(), 2);
    assert_eq!(result.skipped.len(), 1);
    assert!(matches!(result.skipped[0].1, SkipReason::Alignment { .. }));
}

#[rstest]
fn missing_value_rows_are_dropped_after_pairing(dataset: Dataset) {
    dataset.metric_raw("cell_3", "LD", "Volume", &["1.0", "", "5.0"]);
    dataset.metric_raw("cell_3", "LD", LD_DISTANCES, &["0.1", "0.2", "NaN"]);

    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let result = RadialAnalyzer::new(&catalog, 0.25, 1.0)
        .unwrap()
        .analyze("LD")
        .unwrap();

    let cell_3 = result.profiles.iter().find(|p| p.cell_id == "cell_3").unwrap();
    assert_eq!(cell_3.sums, vec![1.0, 0.0, 0.0, 0.0]);
    assert_eq!(cell_3.rows_missing, 2);
}

#[rstest]
fn unknown_organelle_is_rejected(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let err = RadialAnalyzer::new(&catalog, 0.25, 1.0)
        .unwrap()
        .analyze("Mito")
        .unwrap_err();
    assert!(matches!(err, OrgaplexError::UnknownOrganelle { .. }));
}

#[rstest]
fn export_then_reload_keeps_edges_and_label(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let result = RadialAnalyzer::new(&catalog, 0.25, 1.0)
        .unwrap()
        .analyze("LD")
        .unwrap();

    let mut metadata = RunContext::new(dataset.input_dir()).metadata("Radial Distribution");
    metadata
        .push("Organelle", "LD")
        .push("Bin_Width_um", result.bins.bin_width())
        .push("Max_Distance_um", result.bins.max_distance())
        .push("Total_Bins", result.bins.n_bins());

    let out = dataset.output_dir();
    let [_, summary_path, metadata_path] = radial_paths(&out, "LD");
    write_radial_summary(&result, &summary_path).unwrap();
    write_metadata(&metadata, &metadata_path).unwrap();

    let reloaded = read_radial_output(&summary_path, &metadata_path).unwrap();
    assert_eq!(reloaded.organelle, "LD");
    assert_eq!(reloaded.n_bins, 4);
    assert_eq!(reloaded.edges, result.bins.edges().to_vec());
    assert_approx_eq!(reloaded.bin_width, 0.25);
    assert_approx_eq!(reloaded.max_distance, 1.0);
    for (reloaded, stats) in reloaded.means.iter().zip(result.summary.iter()) {
        assert_approx_eq!(*reloaded, stats.mean.unwrap_or(0.0), 1e-6);
    }
}
