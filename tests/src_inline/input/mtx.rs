use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn reads_counts_into_csc() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("matrix.mtx");
    fs::write(
        &path,
        "%%MatrixMarket matrix coordinate integer general\n% comment\n3 2 4\n1 1 1\n2 1 2\n3 2 3\n1 2 4\n",
    )
    .expect("write file");

    let (header, counts) = read_counts(&path).expect("read");
    assert_eq!(
        header,
        MatrixHeader {
            n_rows: 3,
            n_cols: 2,
            nnz: 4
        }
    );
    assert_eq!(counts.col_ptr, vec![0, 2, 4]);
    assert_eq!(counts.row_idx, vec![0, 1, 0, 2]);
    assert_eq!(counts.values, vec![1, 2, 4, 3]);
}

#[test]
fn fractional_values_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("matrix.mtx");
    fs::write(
        &path,
        "%%MatrixMarket matrix coordinate real general\n2 1 2\n1 1 1.0\n2 1 0.5\n",
    )
    .expect("write file");

    let err = read_counts(&path).unwrap_err();
    assert!(matches!(
        err,
        InputError::NonIntegerCount { .. } | InputError::InvalidMtxHeader(_)
    ));
}

#[test]
fn malformed_header_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("matrix.mtx");
    fs::write(&path, "not a matrix\n").expect("write file");
    assert!(matches!(
        read_counts(&path).unwrap_err(),
        InputError::InvalidMtxHeader(_)
    ));
}

#[test]
fn repeated_reads_are_identical() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("matrix.mtx");
    fs::write(
        &path,
        "%%MatrixMarket matrix coordinate integer general\n3 2 3\n1 1 2\n2 2 3\n3 1 4\n",
    )
    .expect("write file");

    let (_, first) = read_counts(&path).expect("first");
    let (_, second) = read_counts(&path).expect("second");
    assert_eq!(first, second);
}

#[test]
fn header_is_read_without_entries() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("matrix.mtx");
    fs::write(
        &path,
        "%%MatrixMarket matrix coordinate integer general\n% comment\n\n5 7 2\nnot parsed\n",
    )
    .expect("write file");
    assert_eq!(
        read_mtx_header(&path).expect("header"),
        MatrixHeader {
            n_rows: 5,
            n_cols: 7,
            nnz: 2
        }
    );
}

#[test]
fn header_errors() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("matrix.mtx");

    fs::write(&path, "5 7 2\n").expect("write file");
    assert!(matches!(
        read_mtx_header(&path).unwrap_err(),
        InputError::InvalidMtxHeader(_)
    ));

    fs::write(&path, "%%MatrixMarket matrix coordinate integer general\n5 x 2\n").expect("write");
    assert!(matches!(
        read_mtx_header(&path).unwrap_err(),
        InputError::InvalidMtxDimensions(_)
    ));

    fs::write(&path, "%%MatrixMarket matrix coordinate integer general\n5 7\n").expect("write");
    assert!(matches!(
        read_mtx_header(&path).unwrap_err(),
        InputError::InvalidMtxDimensions(_)
    ));

    fs::write(&path, "%%MatrixMarket matrix coordinate integer general\n% only\n").expect("write");
    assert!(matches!(
        read_mtx_header(&path).unwrap_err(),
        InputError::InvalidMtxHeader(_)
    ));
}

#[test]
fn count_values_are_checked() {
    assert_eq!(count_value(3.0, 1, 1).expect("count"), 3);
    assert_eq!(count_value(u32::MAX as f64, 1, 1).expect("max"), u32::MAX);
    assert!(matches!(
        count_value(5_000_000_000.0, 2, 3).unwrap_err(),
        InputError::CountOverflow { row: 2, col: 3 }
    ));
    assert!(matches!(
        count_value(0.5, 1, 1).unwrap_err(),
        InputError::NonIntegerCount { .. }
    ));
    assert!(matches!(
        count_value(-1.0, 1, 1).unwrap_err(),
        InputError::NonIntegerCount { .. }
    ));
    assert!(matches!(
        count_value(f64::NAN, 1, 1).unwrap_err(),
        InputError::NonIntegerCount { .. }
    ));
}
