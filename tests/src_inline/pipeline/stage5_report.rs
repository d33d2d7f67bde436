use super::*;
use crate::config::QcConfig;
use crate::pipeline::stage1_load::{LoadedDataset, run_stage1};
use crate::pipeline::stage2_metrics::run_stage2;
use crate::pipeline::stage3_normalize::run_stage3;
use crate::pipeline::stage4_plots::run_stage4;
use std::fs;
use tempfile::tempdir;

fn write_10x(dir: &Path) {
    fs::write(
        dir.join("features.tsv"),
        "f1\tMT-CO1\nf2\tACTB\nf3\tGAPDH\n",
    )
    .expect("write");
    fs::write(dir.join("barcodes.tsv"), "c1\nc2\nc3\nc4\n").expect("write");
    fs::write(
        dir.join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n\
         3 4 10\n\
         1 1 1\n2 1 5\n3 1 4\n\
         1 2 1\n2 2 4\n3 2 5\n\
         2 3 6\n3 3 4\n\
         1 4 2\n2 4 8\n",
    )
    .expect("write");
}

fn run_all(input: &Path, out: &Path, mode: RunMode) -> (LoadedDataset, QcSummary) {
    let loaded = run_stage1(input, None, RunMode::Standalone, None).expect("stage1");
    let config = QcConfig::default();
    let (exp, metrics) = run_stage2(&loaded.experiment, &config).expect("stage2");
    let (exp, size_factors) = run_stage3(&exp).expect("stage3");
    let plots = run_stage4(&exp, &config.plot, None, out, false).expect("stage4");
    let summary = build_summary(&loaded.ctx, &metrics, &size_factors, &plots, config.nmads);
    run_stage5(&exp, &summary, out, mode).expect("stage5");
    (loaded, summary)
}

#[test]
fn quantile_interpolates_between_ranks() {
    let values = [4.0, 1.0, 3.0, 2.0];
    assert_eq!(quantile(&values, 0.5), 2.5);
    assert_eq!(quantile(&values, 0.0), 1.0);
    assert_eq!(quantile(&values, 1.0), 4.0);
    assert!((quantile(&values, 0.9) - 3.7).abs() < 1e-12);
    assert_eq!(quantile(&[f64::NAN, 5.0], 0.5), 5.0);
    assert!(quantile(&[], 0.5).is_nan());
}

#[test]
fn standalone_outputs() {
    let input = tempdir().expect("tempdir");
    let out = tempdir().expect("tempdir");
    write_10x(input.path());
    let (_, summary) = run_all(input.path(), out.path(), RunMode::Standalone);

    for file in [CELL_QC_TSV, FEATURE_QC_TSV, SUMMARY_JSON, REPORT_TXT] {
        assert!(out.path().join(file).exists(), "missing {file}");
    }
    assert!(!out.path().join(PIPELINE_STEP_JSON).exists());

    assert_eq!(summary.input.n_features, 3);
    assert_eq!(summary.input.n_cells, 4);
    assert_eq!(summary.input.nnz, 10);
    assert_eq!(summary.highest_exprs[0].name, "ACTB");
    assert_eq!(summary.highest_exprs[0].total, 23.0);
    assert!(summary.cells.subsets_percent.contains_key("mito"));
    assert_eq!(
        summary.outliers.thresholds["sum"].keys().collect::<Vec<_>>(),
        vec!["all"]
    );

    let cells = fs::read_to_string(out.path().join(CELL_QC_TSV)).expect("read");
    let mut lines = cells.lines();
    let header = lines.next().expect("header");
    assert!(header.starts_with("cell_id\tsize_factor\tsum\tdetected"));
    assert!(header.ends_with("\tdiscard"));
    assert_eq!(lines.count(), 4);

    let features = fs::read_to_string(out.path().join(FEATURE_QC_TSV)).expect("read");
    let header = features.lines().next().expect("header");
    assert!(header.starts_with("feature_id\tfeature_name\tis_mito"));
    assert!(header.contains("subsets_kept_mean"));

    let json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(out.path().join(SUMMARY_JSON)).expect("read"),
    )
    .expect("json");
    assert_eq!(json["input"]["n_cells"], 4);
    assert_eq!(json["tool"]["name"], env!("CARGO_PKG_NAME"));
}

#[test]
fn pipeline_mode_writes_step_json() {
    let input = tempdir().expect("tempdir");
    let out = tempdir().expect("tempdir");
    write_10x(input.path());
    run_all(input.path(), out.path(), RunMode::Pipeline);

    let step: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(out.path().join(PIPELINE_STEP_JSON)).expect("read"),
    )
    .expect("json");
    assert_eq!(step["tool"]["stage"], "qc");
    assert_eq!(step["artifacts"]["primary_metrics"], CELL_QC_TSV);
    assert_eq!(step["cell_metrics"]["flag_column"], "discard");
}
