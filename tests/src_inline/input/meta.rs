use super::*;
use std::fs;
use tempfile::tempdir;

fn barcodes() -> Vec<String> {
    vec!["c1".into(), "c2".into(), "c3".into()]
}

#[test]
fn aligns_rows_to_barcodes() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("meta.tsv");
    fs::write(
        &path,
        "sample\tcell_id\tdepth\ns2\tc3\t10\ns1\tc1\t5\ns1\tc1\t7\nsX\tmissing\t1\n",
    )
    .expect("write");

    let meta = read_cell_metadata(&path, &barcodes()).expect("meta");
    assert_eq!(
        meta.stats,
        MetaStats {
            matched: 2,
            missing: 1,
            duplicate_rows: 1,
            unannotated: 1,
        }
    );
    assert_eq!(meta.columns.len(), 2);
    assert_eq!(meta.columns[0].0, "sample");
    assert_eq!(
        meta.columns[0].1,
        ColumnData::Categorical(vec!["s1".into(), String::new(), "s2".into()])
    );
    match &meta.columns[1].1 {
        ColumnData::Numeric(v) => {
            assert_eq!(v[0], 5.0);
            assert!(v[1].is_nan());
            assert_eq!(v[2], 10.0);
        }
        other => panic!("expected numeric depth, got {other:?}"),
    }
}

#[test]
fn missing_cell_id_column() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("meta.tsv");
    fs::write(&path, "barcode\tsample\nc1\ts1\n").expect("write");
    let err = read_cell_metadata(&path, &barcodes()).unwrap_err();
    assert!(matches!(err, InputError::MissingMetaColumn(ref c) if c == CELL_ID_COLUMN));
}

#[test]
fn empty_cell_id_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("meta.tsv");
    fs::write(&path, "cell_id\tsample\nc1\ts1\n\ts2\n").expect("write");
    let err = read_cell_metadata(&path, &barcodes()).unwrap_err();
    assert!(matches!(err, InputError::MissingMetaCellId(3)));
}
