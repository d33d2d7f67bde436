use super::*;
use tempfile::tempdir;

#[test]
fn detects_prefix_none() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("matrix.mtx"), "x").expect("write");
    let got = detect_prefix(dir.path()).expect("prefix");
    assert_eq!(got, None);
}

#[test]
fn detects_prefix_present() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("ABC_matrix.mtx"), "x").expect("write");
    let got = detect_prefix(dir.path()).expect("prefix");
    assert_eq!(got, Some("ABC".to_string()));
}

#[test]
fn shared_cache_names() {
    assert_eq!(shared_cache_file_name(None), "kira-organelle.bin");
    assert_eq!(shared_cache_file_name(Some("XYZ")), "XYZ.kira-organelle.bin");
}

#[test]
fn finds_cache_by_suffix_when_exact_missing() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("B.kira-organelle.bin"), "x").expect("write");
    std::fs::write(dir.path().join("A.kira-organelle.bin"), "x").expect("write");
    let got = find_shared_cache_file(dir.path(), None).expect("find");
    assert_eq!(got, Some(dir.path().join("A.kira-organelle.bin")));
}

#[test]
fn finds_exact_cache_preferred() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("ABC.kira-organelle.bin"), "x").expect("write");
    std::fs::write(dir.path().join("kira-organelle.bin"), "x").expect("write");
    let got = find_shared_cache_file(dir.path(), None).expect("find");
    assert_eq!(got, Some(dir.path().join("kira-organelle.bin")));
}

#[test]
fn no_cache_found() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("matrix.mtx"), "x").expect("write");
    assert_eq!(find_shared_cache_file(dir.path(), None).expect("find"), None);
}

#[test]
fn v3_and_v2_layouts() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("matrix.mtx"), "x").expect("write");
    std::fs::write(dir.path().join("barcodes.tsv"), "c1\n").expect("write");
    std::fs::write(dir.path().join("features.tsv"), "f1\tG1\n").expect("write");
    let layout = detect_10x_dir(dir.path()).expect("layout");
    assert_eq!(layout.format, TenXFormat::TenXv3);
    assert_eq!(layout.features_path, dir.path().join("features.tsv"));

    let v2 = tempdir().expect("tempdir");
    std::fs::write(v2.path().join("matrix.mtx"), "x").expect("write");
    std::fs::write(v2.path().join("barcodes.tsv"), "c1\n").expect("write");
    std::fs::write(v2.path().join("genes.tsv"), "f1\tG1\n").expect("write");
    let layout = detect_10x_dir(v2.path()).expect("layout");
    assert_eq!(layout.format, TenXFormat::TenXv2);
    assert_eq!(layout.format.to_string(), "tenx_v2");
}

#[test]
fn missing_matrix_is_an_error() {
    let dir = tempdir().expect("tempdir");
    std::fs::write(dir.path().join("barcodes.tsv"), "c1\n").expect("write");
    assert!(matches!(
        detect_10x_dir(dir.path()),
        Err(InputError::MissingFile(_))
    ));
}
