use super::*;
use std::io::Read;
use tempfile::tempdir;

#[test]
fn opens_plain_text() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("a.tsv");
    std::fs::write(&path, "hello\n").expect("write");
    let mut text = String::new();
    open_reader(&path)
        .expect("open")
        .read_to_string(&mut text)
        .expect("read");
    assert_eq!(text, "hello\n");
}

#[cfg(feature = "gz")]
#[test]
fn opens_gzip() {
    use std::io::Write;

    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("a.tsv.gz");
    let file = std::fs::File::create(&path).expect("create");
    let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    enc.write_all(b"cell_id\nc1\n").expect("write");
    enc.finish().expect("finish");

    let mut text = String::new();
    open_reader(&path)
        .expect("open")
        .read_to_string(&mut text)
        .expect("read");
    assert_eq!(text, "cell_id\nc1\n");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempdir().expect("tempdir");
    assert!(matches!(
        open_reader(&dir.path().join("nope.tsv")),
        Err(InputError::Io(_))
    ));
}
