pub mod barcodes;
pub mod cache;
pub mod detect;
pub mod features;
pub mod meta;
pub mod mtx;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("missing required file: {0}")]
    MissingFile(String),
    #[error("invalid matrix market input: {0}")]
    InvalidMtxHeader(String),
    #[error("invalid matrix dimensions: {0}")]
    InvalidMtxDimensions(String),
    #[error("non-integer count at row {row}, column {col}")]
    NonIntegerCount { row: usize, col: usize },
    #[error("count at row {row}, column {col} exceeds {max}", max = u32::MAX)]
    CountOverflow { row: usize, col: usize },
    #[error("invalid TSV row at line {line}: {reason}")]
    InvalidTsvRow { line: usize, reason: String },
    #[error("empty barcode at line {0}")]
    EmptyBarcode(usize),
    #[error("meta file missing required column: {0}")]
    MissingMetaColumn(String),
    #[error("meta row missing cell_id at line {0}")]
    MissingMetaCellId(usize),
    #[error("unsupported gzip input without feature enabled: {0}")]
    GzipNotEnabled(PathBuf),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Opens a plain or gzip-compressed text file.
pub fn open_reader(path: &Path) -> Result<Box<dyn io::BufRead>, InputError> {
    let file = std::fs::File::open(path)?;
    let gzipped = path.extension().and_then(|s| s.to_str()) == Some("gz");
    if !gzipped {
        return Ok(Box::new(io::BufReader::new(file)));
    }
    #[cfg(feature = "gz")]
    {
        Ok(Box::new(io::BufReader::new(flate2::read::GzDecoder::new(file))))
    }
    #[cfg(not(feature = "gz"))]
    {
        Err(InputError::GzipNotEnabled(path.to_path_buf()))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/mod.rs"]
mod tests;
