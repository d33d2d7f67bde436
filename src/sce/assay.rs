use crate::expr::csc::{AssayValue, CscMatrix};
use crate::expr::normalize::library_size_factors;

/// A named matrix held by an [`Experiment`](crate::sce::Experiment).
#[derive(Debug, Clone, PartialEq)]
pub enum Assay {
    Counts(CscMatrix<u32>),
    Real(CscMatrix<f32>),
}

impl Assay {
    pub fn n_rows(&self) -> usize {
        match self {
            Assay::Counts(m) => m.n_rows,
            Assay::Real(m) => m.n_rows,
        }
    }

    pub fn n_cols(&self) -> usize {
        match self {
            Assay::Counts(m) => m.n_cols,
            Assay::Real(m) => m.n_cols,
        }
    }

    pub fn nnz(&self) -> usize {
        match self {
            Assay::Counts(m) => m.nnz(),
            Assay::Real(m) => m.nnz(),
        }
    }

    pub fn row_sums(&self) -> Vec<f64> {
        match self {
            Assay::Counts(m) => m.row_sums(),
            Assay::Real(m) => m.row_sums(),
        }
    }

    pub fn col_sums(&self) -> Vec<f64> {
        match self {
            Assay::Counts(m) => m.col_sums(),
            Assay::Real(m) => m.col_sums(),
        }
    }

    pub fn dense_rows(&self, rows: &[usize]) -> Vec<Vec<f64>> {
        match self {
            Assay::Counts(m) => m.dense_rows(rows),
            Assay::Real(m) => m.dense_rows(rows),
        }
    }

    pub fn dense_col(&self, col: usize) -> Vec<f64> {
        match self {
            Assay::Counts(m) => m.dense_col(col),
            Assay::Real(m) => m.dense_col(col),
        }
    }

    pub fn library_size_factors(&self) -> Vec<f64> {
        match self {
            Assay::Counts(m) => library_size_factors(m),
            Assay::Real(m) => library_size_factors(m),
        }
    }

    /// Visits the stored entries of one cell as `(row, value)`.
    pub fn for_each_in_col<F>(&self, col: usize, mut f: F)
    where
        F: FnMut(u32, f64),
    {
        match self {
            Assay::Counts(m) => visit(m, col, &mut f),
            Assay::Real(m) => visit(m, col, &mut f),
        }
    }

    pub fn map_values<F>(&self, mut f: F) -> CscMatrix<f32>
    where
        F: FnMut(u32, usize, f64) -> f32,
    {
        match self {
            Assay::Counts(m) => m.map_values(|row, col, v| f(row, col, v.to_f64())),
            Assay::Real(m) => m.map_values(|row, col, v| f(row, col, v.to_f64())),
        }
    }
}

fn visit<T: AssayValue, F: FnMut(u32, f64)>(m: &CscMatrix<T>, col: usize, f: &mut F) {
    for (row, value) in m.iter_col(col) {
        f(row, value.to_f64());
    }
}
