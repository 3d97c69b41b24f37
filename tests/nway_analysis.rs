mod common;

use std::fs;

use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

use common::{er_dataset, Dataset};
use orgaplex_analyzer_lib::{Catalog, NWayAnalyzer, OrgaplexError, SkipReason, TargetSetPolicy};

#[fixture]
fn dataset() -> Dataset {
    er_dataset()
}

#[rstest]
fn two_target_counts_per_combination(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let table = NWayAnalyzer::new(&catalog, 0.0).analyze_bait("ER").unwrap();

    assert_eq!(table.header(), vec!["Cell_ID", "Surface_count", "LD_only", "Mito_only", "LD+Mito", "No_contact"]);
    assert_eq!(table.row("control_1").unwrap().surface_count, 4);
    for label in ["LD_only", "Mito_only", "LD+Mito", "No_contact"] {
        assert_eq!(table.count("control_1", label), Some(1), "{}", label);
    }
}

#[rstest]
fn rows_are_naturally_sorted_and_partitioned(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let table = NWayAnalyzer::new(&catalog, 0.0).analyze_bait("ER").unwrap();

    let ids: Vec<&str> = table.rows.iter().map(|r| r.cell_id.as_str()).collect();
    assert_eq!(ids, vec!["control_1", "control_2", "control_10"]);
    assert!(table.rows.iter().all(|r| r.is_partition()));

    assert_eq!(table.count("control_2", "LD_only"), Some(1));
    assert_eq!(table.count("control_2", "LD+Mito"), Some(1));
    assert_eq!(table.count("control_10", "Mito_only"), Some(1));
    assert_eq!(table.count("control_10", "No_contact"), Some(2));
}

#[rstest]
fn parallel_matches_sequential(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let sequential = NWayAnalyzer::new(&catalog, 0.0).analyze_bait("ER").unwrap();
    let parallel = NWayAnalyzer::new(&catalog, 0.0)
        .with_parallel(true)
        .analyze_bait("ER")
        .unwrap();

    assert_eq!(sequential.rows, parallel.rows);
}

#[rstest]
fn larger_threshold_moves_points_into_contact(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let table = NWayAnalyzer::new(&catalog, 1.0).analyze_bait("ER").unwrap();

    assert_eq!(table.count("control_10", "LD+Mito"), Some(3));
    assert_eq!(table.count("control_10", "No_contact"), Some(0));
}

#[rstest]
fn invalid_file_skips_cell_under_fixed_policy(dataset: Dataset) {
    let path = dataset
        .folder("control_2", "ER")
        .join("control_2_ER_Shortest_Distance_to_Surfaces_Surfaces=Mito.csv");
    fs::write(&path, " \nTitle\n====\nValue,Unit\nabc,um\n").unwrap();

    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let table = NWayAnalyzer::new(&catalog, 0.0)
        .with_policy(TargetSetPolicy::Fixed)
        .analyze_bait("ER")
        .unwrap();

    assert!(table.row("control_2").is_none());
    assert_eq!(table.rows.len(), 2);
    assert_eq!(
        table.skipped,
        vec![(
            "control_2".to_string(),
            SkipReason::TargetSetMismatch {
                cell_id: "control_2".to_string(),
                missing: vec!["Mito".to_string()],
            }
        )]
    );
}

#[rstest]
fn invalid_file_leaves_gaps_under_per_cell_policy(dataset: Dataset) {
    let path = dataset
        .folder("control_2", "ER")
        .join("control_2_ER_Shortest_Distance_to_Surfaces_Surfaces=Mito.csv");
    fs::write(&path, " \nTitle\n====\nValue,Unit\nabc,um\n").unwrap();

    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let table = NWayAnalyzer::new(&catalog, 0.0)
        .with_policy(TargetSetPolicy::PerCell)
        .analyze_bait("ER")
        .unwrap();

    assert_eq!(table.count("control_2", "LD_only"), Some(2));
    assert_eq!(table.count("control_2", "Mito_only"), None);
    assert_eq!(table.count("control_2", "No_contact"), Some(0));
    assert!(table.rows.iter().all(|r| r.is_partition()));
}

#[rstest]
fn misaligned_target_is_dropped_not_fatal(dataset: Dataset) {
    dataset.distances("control_1", "ER", "Ly", &[0.0, 0.0]);

    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let table = NWayAnalyzer::new(&catalog, 0.0).analyze_bait("ER").unwrap();

    assert_eq!(table.targets, vec!["LD", "Ly", "Mito"]);
    assert_eq!(table.combinations.len(), 8);
    assert_eq!(table.rows.len(), 3);
    assert!(table.skipped.is_empty());
    assert_eq!(table.count("control_1", "LD+Mito"), Some(1));
    assert_eq!(table.count("control_1", "Ly_only"), None);
    assert!(table.rows.iter().all(|r| r.is_partition()));
}

#[rstest]
fn cell_without_a_target_folder_keeps_its_row(dataset: Dataset) {
    dataset.distances("control_10", "ER", "Ly", &[0.0, 2.0, 2.0]);

    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let table = NWayAnalyzer::new(&catalog, 0.0).analyze_bait("ER").unwrap();

    let ids: Vec<&str> = table.rows.iter().map(|r| r.cell_id.as_str()).collect();
    assert_eq!(ids, vec!["control_1", "control_2", "control_10"]);

    // control_1 and control_2 have no Ly file: Ly columns stay empty
    assert_eq!(table.count("control_1", "LD_only"), Some(1));
    assert_eq!(table.count("control_1", "Ly_only"), None);
    assert_eq!(table.count("control_1", "LD+Ly+Mito"), None);
    assert_eq!(table.count("control_2", "LD+Mito"), Some(1));

    // control_10 over all three: Ly_only, Mito_only, No_contact
    assert_eq!(table.count("control_10", "Ly_only"), Some(1));
    assert_eq!(table.count("control_10", "Mito_only"), Some(1));
    assert_eq!(table.count("control_10", "No_contact"), Some(1));
    assert!(table.rows.iter().all(|r| r.is_partition()));
}

#[rstest]
fn unknown_bait_is_rejected(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let err = NWayAnalyzer::new(&catalog, 0.0)
        .analyze_baits(&["Golgi".to_string()])
        .unwrap_err();
    assert!(matches!(err, OrgaplexError::UnknownOrganelle { .. }));
}

#[rstest]
fn batch_tolerates_empty_baits(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let tables = NWayAnalyzer::new(&catalog, 0.0).analyze_all_baits().unwrap();

    let baits: Vec<&str> = tables.iter().map(|t| t.bait.as_str()).collect();
    assert_eq!(baits, vec!["ER"]);
}

#[rstest]
fn single_empty_bait_is_an_error(dataset: Dataset) {
    let catalog = Catalog::build(dataset.input_dir()).unwrap();
    let err = NWayAnalyzer::new(&catalog, 0.0)
        .analyze_baits(&["LD".to_string()])
        .unwrap_err();
    assert!(matches!(err, OrgaplexError::EmptyResult(_)));
}
