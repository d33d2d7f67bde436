use super::*;
use crate::expr::csc::CscMatrix;
use crate::input::cache::write_shared_cache;
use crate::sce::ColumnData;
use std::fs;
use tempfile::tempdir;

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write file");
}

fn write_cache(path: &Path) {
    let counts = CscMatrix::from_parts(2, 2, vec![0, 1, 2], vec![0, 1], vec![3u32, 4]).expect("csc");
    write_shared_cache(
        path,
        &counts,
        &["G1".to_string(), "G2".to_string()],
        &["c1".to_string(), "c2".to_string()],
    )
    .expect("write shared cache");
}

fn write_10x(dir: &Path) {
    write_file(&dir.join("features.tsv"), "f1\tG1\nf2\tG2\n");
    write_file(&dir.join("barcodes.tsv"), "c1\nc2\nc3\n");
    write_file(
        &dir.join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n2 3 3\n1 1 1\n1 2 1\n2 3 1\n",
    );
}

#[test]
fn stage1_v3_ok() {
    let dir = tempdir().expect("tempdir");
    write_10x(dir.path());

    let loaded = run_stage1(dir.path(), None, RunMode::Standalone, None).expect("stage1 ok");
    assert_eq!(loaded.ctx.format, TenXFormat::TenXv3);
    assert_eq!(loaded.ctx.n_features, 2);
    assert_eq!(loaded.ctx.n_cells, 3);
    assert_eq!(loaded.ctx.nnz, 3);
    assert_eq!(loaded.ctx.features_path, Some(dir.path().join("features.tsv")));
    assert!(loaded.ctx.shared_cache_path.is_none());

    let exp = &loaded.experiment;
    assert_eq!(exp.feature_ids(), vec!["f1", "f2"]);
    assert_eq!(exp.feature_names(), vec!["G1", "G2"]);
    assert_eq!(exp.cell_names(), vec!["c1", "c2", "c3"]);
    assert_eq!(exp.assay("counts").expect("counts").col_sums(), vec![1.0, 1.0, 1.0]);
}

#[test]
fn stage1_dim_mismatch() {
    let dir = tempdir().expect("tempdir");
    write_file(&dir.path().join("features.tsv"), "f1\tG1\nf2\tG2\n");
    write_file(&dir.path().join("barcodes.tsv"), "c1\nc2\nc3\n");
    write_file(
        &dir.path().join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n2 4 3\n1 1 1\n1 2 1\n2 3 1\n",
    );

    let err = run_stage1(dir.path(), None, RunMode::Standalone, None).unwrap_err();
    match err {
        Stage1Error::DimensionMismatch {
            expected_cols: 3,
            found_cols: 4,
            ..
        } => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn stage1_duplicate_feature_names() {
    let dir = tempdir().expect("tempdir");
    write_file(&dir.path().join("features.tsv"), "f1\tG1\nf2\tG1\nf3\tG2\n");
    write_file(&dir.path().join("barcodes.tsv"), "c1\nc2\n");
    write_file(
        &dir.path().join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n3 2 1\n1 1 1\n",
    );

    let loaded = run_stage1(dir.path(), None, RunMode::Standalone, None).expect("stage1 ok");
    let dups = &loaded.ctx.duplicate_feature_names;
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].name, "G1");
    assert_eq!(dups[0].first_row, 1);
    assert_eq!(dups[0].dup_row, 2);
    assert_eq!(loaded.experiment.feature_index("G1"), Some(0));
}

#[test]
fn stage1_meta_columns() {
    let dir = tempdir().expect("tempdir");
    write_file(&dir.path().join("features.tsv"), "f1\tG1\n");
    write_file(&dir.path().join("barcodes.tsv"), "c1\nc2\n");
    write_file(
        &dir.path().join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n1 2 1\n1 1 1\n",
    );
    write_file(
        &dir.path().join("meta.tsv"),
        "cell_id\tsample_id\nc1\ts1\nc1\ts1\nmissing\ts2\n",
    );

    let loaded = run_stage1(
        dir.path(),
        Some(&dir.path().join("meta.tsv")),
        RunMode::Standalone,
        None,
    )
    .expect("stage1 ok");
    let meta = loaded.ctx.meta.expect("meta stats");
    assert_eq!(meta.matched, 1);
    assert_eq!(meta.missing, 1);
    assert_eq!(meta.duplicate_rows, 1);
    assert_eq!(
        loaded.experiment.col_data.get("sample_id"),
        Some(&ColumnData::Categorical(vec!["s1".into(), String::new()]))
    );
}

#[test]
fn pipeline_mode_uses_cache_when_present() {
    let dir = tempdir().expect("tempdir");
    let cache = dir.path().join("kira-organelle.bin");
    write_cache(&cache);

    let loaded = run_stage1(dir.path(), None, RunMode::Pipeline, None).expect("ctx");
    let ctx = &loaded.ctx;
    assert_eq!(ctx.format, TenXFormat::SharedCache);
    assert_eq!(ctx.shared_cache_path, Some(cache.clone()));
    assert_eq!(ctx.resolved_shared_cache_path, Some(cache));
    assert_eq!(ctx.n_features, 2);
    assert_eq!(ctx.n_cells, 2);
    assert_eq!(ctx.nnz, 2);
    assert_eq!(loaded.experiment.feature_ids(), vec!["G1", "G2"]);
}

#[test]
fn pipeline_mode_uses_suffix_cache_when_present() {
    let dir = tempdir().expect("tempdir");
    let cache = dir.path().join("GSM1.kira-organelle.bin");
    write_cache(&cache);

    let loaded = run_stage1(dir.path(), None, RunMode::Pipeline, None).expect("ctx");
    assert_eq!(loaded.ctx.shared_cache_path, Some(cache));
}

#[test]
fn pipeline_mode_cache_override() {
    let dir = tempdir().expect("tempdir");
    let other = tempdir().expect("tempdir");
    let cache = other.path().join("custom.bin");
    write_cache(&cache);

    let loaded = run_stage1(dir.path(), None, RunMode::Pipeline, Some(&cache)).expect("ctx");
    assert_eq!(loaded.ctx.shared_cache_path, Some(cache));
}

#[test]
fn pipeline_mode_falls_back_when_cache_missing() {
    let dir = tempdir().expect("tempdir");
    write_file(&dir.path().join("features.tsv"), "f1\tG1\n");
    write_file(&dir.path().join("barcodes.tsv"), "c1\n");
    write_file(
        &dir.path().join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n1 1 1\n1 1 1\n",
    );

    let loaded = run_stage1(dir.path(), None, RunMode::Pipeline, None).expect("ctx");
    assert!(loaded.ctx.shared_cache_path.is_none());
    assert_eq!(
        loaded.ctx.resolved_shared_cache_path,
        Some(dir.path().join("kira-organelle.bin"))
    );
    assert_eq!(loaded.ctx.format, TenXFormat::TenXv3);
}

#[test]
fn pipeline_mode_invalid_cache_hard_fails() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("kira-organelle.bin"), b"bad").expect("write");
    let err = run_stage1(dir.path(), None, RunMode::Pipeline, None).unwrap_err();
    match err {
        Stage1Error::Cache(_) => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn stage1_keeps_ids_for_repeated_symbols() {
    use crate::plot::highest_exprs::{HighestExprsParams, plot_highest_exprs};

    let dir = tempdir().expect("tempdir");
    write_file(&dir.path().join("features.tsv"), "ENSG1\tA\nENSG2\tA\n");
    write_file(&dir.path().join("barcodes.tsv"), "c1\nc2\n");
    write_file(
        &dir.path().join("matrix.mtx"),
        "%%MatrixMarket matrix coordinate integer general\n2 2 3\n1 1 3\n2 1 1\n2 2 1\n",
    );

    let loaded = run_stage1(dir.path(), None, RunMode::Standalone, None).expect("stage1 ok");
    assert_eq!(loaded.experiment.feature_ids(), vec!["ENSG1", "ENSG2"]);
    assert_eq!(loaded.experiment.feature_names(), vec!["A", "A"]);

    let plot = plot_highest_exprs(&loaded.experiment, &HighestExprsParams::default())
        .expect("plot");
    let labels: Vec<&str> = plot.features.iter().map(|f| f.label.as_str()).collect();
    assert_eq!(labels, vec!["A (ENSG1)", "A (ENSG2)"]);

    let params = HighestExprsParams {
        drop_features: vec!["ENSG1".to_string()],
        ..HighestExprsParams::default()
    };
    let plot = plot_highest_exprs(&loaded.experiment, &params).expect("plot");
    assert_eq!(plot.features.len(), 1);
    assert_eq!(plot.features[0].row, 1);
}
