use std::io::BufRead;
use std::path::Path;

use kira_scio::api::{Reader, ReaderOptions};
use kira_scio::detect::DetectedFormat;

use crate::expr::csc::CscMatrix;
use crate::input::{InputError, open_reader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixHeader {
    pub n_rows: usize,
    pub n_cols: usize,
    pub nnz: usize,
}

/// Reads a MatrixMarket count matrix (features x cells). Values must be
/// non-negative integers; repeated coordinates are summed.
pub fn read_counts(path: &Path) -> Result<(MatrixHeader, CscMatrix<u32>), InputError> {
    let matrix = Reader::with_options(
        path,
        ReaderOptions {
            force_format: Some(DetectedFormat::Mtx10x),
            strict: true,
        },
    )
    .read_matrix()
    .map_err(|e| InputError::InvalidMtxHeader(e.message))?;

    let header = MatrixHeader {
        n_rows: matrix.n_genes,
        n_cols: matrix.n_cells,
        nnz: matrix.values.len(),
    };

    let mut triplets = Vec::with_capacity(header.nnz);
    for (col, w) in matrix.col_ptr.windows(2).enumerate() {
        for idx in w[0]..w[1] {
            let row = matrix.row_idx[idx] as usize;
            let value = count_value(matrix.values[idx] as f64, row + 1, col + 1)?;
            triplets.push((col as u32, row as u32, value));
        }
    }

    let counts = CscMatrix::from_triplets(header.n_rows, header.n_cols, triplets)?;
    Ok((header, counts))
}

/// Checks one stored entry; `row` and `col` are 1-based for messages.
pub fn count_value(value: f64, row: usize, col: usize) -> Result<u32, InputError> {
    if !value.is_finite() || value < 0.0 || value.fract().abs() > 1e-6 {
        return Err(InputError::NonIntegerCount { row, col });
    }
    let rounded = value.round();
    if rounded > u32::MAX as f64 {
        return Err(InputError::CountOverflow { row, col });
    }
    Ok(rounded as u32)
}

/// Parses only the banner and size line, without reading entries.
pub fn read_mtx_header(path: &Path) -> Result<MatrixHeader, InputError> {
    let reader = open_reader(path)?;
    let mut lines = reader.lines();
    let banner = lines.next().transpose()?.unwrap_or_default();
    if !banner.starts_with("%%MatrixMarket") {
        return Err(InputError::InvalidMtxHeader(format!(
            "missing %%MatrixMarket banner in {}",
            path.display()
        )));
    }
    for line in lines {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('%') {
            continue;
        }
        let fields: Vec<usize> = trimmed
            .split_whitespace()
            .map(|f| f.parse::<usize>())
            .collect::<Result<_, _>>()
            .map_err(|_| InputError::InvalidMtxDimensions(trimmed.to_string()))?;
        let &[n_rows, n_cols, nnz] = fields.as_slice() else {
            return Err(InputError::InvalidMtxDimensions(trimmed.to_string()));
        };
        return Ok(MatrixHeader {
            n_rows,
            n_cols,
            nnz,
        });
    }
    Err(InputError::InvalidMtxHeader(format!(
        "no size line in {}",
        path.display()
    )))
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/mtx.rs"]
mod tests;
