use crate::input::InputError;

/// Scalar stored in an assay matrix.
pub trait AssayValue: Copy + Default + PartialOrd + std::fmt::Debug {
    fn to_f64(self) -> f64;
    fn merge(self, other: Self) -> Self;
}

impl AssayValue for u32 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn merge(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl AssayValue for f32 {
    fn to_f64(self) -> f64 {
        self as f64
    }

    fn merge(self, other: Self) -> Self {
        self + other
    }
}

/// Features x cells matrix in compressed sparse column layout.
///
/// Row indices are strictly increasing inside every column.
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix<T> {
    pub n_rows: usize,
    pub n_cols: usize,
    pub col_ptr: Vec<u64>,
    pub row_idx: Vec<u32>,
    pub values: Vec<T>,
}

impl<T: AssayValue> CscMatrix<T> {
    pub fn empty(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            col_ptr: vec![0; n_cols + 1],
            row_idx: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Builds from `(col, row, value)` entries in any order; repeated
    /// coordinates are merged.
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        mut entries: Vec<(u32, u32, T)>,
    ) -> Result<Self, InputError> {
        for (col, row, _) in &entries {
            if *row as usize >= n_rows {
                return Err(InputError::InvalidMtxDimensions(
                    "row index out of bounds".to_string(),
                ));
            }
            if *col as usize >= n_cols {
                return Err(InputError::InvalidMtxDimensions(
                    "column index out of bounds".to_string(),
                ));
            }
        }

        entries.sort_by(|a, b| match a.0.cmp(&b.0) {
            std::cmp::Ordering::Equal => a.1.cmp(&b.1),
            other => other,
        });

        let mut col_counts = vec![0u64; n_cols];
        let mut row_idx: Vec<u32> = Vec::with_capacity(entries.len());
        let mut values: Vec<T> = Vec::with_capacity(entries.len());
        let mut last: Option<(u32, u32)> = None;
        for (col, row, val) in entries {
            if last == Some((col, row)) {
                if let Some(prev) = values.last_mut() {
                    *prev = prev.merge(val);
                }
                continue;
            }
            last = Some((col, row));
            col_counts[col as usize] += 1;
            row_idx.push(row);
            values.push(val);
        }

        let mut col_ptr = vec![0u64; n_cols + 1];
        for i in 0..n_cols {
            col_ptr[i + 1] = col_ptr[i] + col_counts[i];
        }

        Ok(Self {
            n_rows,
            n_cols,
            col_ptr,
            row_idx,
            values,
        })
    }

    /// Takes already-compressed arrays, checking the layout invariants.
    pub fn from_parts(
        n_rows: usize,
        n_cols: usize,
        col_ptr: Vec<u64>,
        row_idx: Vec<u32>,
        values: Vec<T>,
    ) -> Result<Self, InputError> {
        let bad = |reason: &str| InputError::InvalidMtxDimensions(reason.to_string());
        if col_ptr.len() != n_cols + 1 {
            return Err(bad("col_ptr length must be n_cols + 1"));
        }
        if row_idx.len() != values.len() {
            return Err(bad("row_idx and values lengths differ"));
        }
        if col_ptr[0] != 0 {
            return Err(bad("col_ptr[0] must be 0"));
        }
        if col_ptr.windows(2).any(|w| w[1] < w[0]) {
            return Err(bad("col_ptr must be monotonic"));
        }
        if col_ptr[n_cols] as usize != values.len() {
            return Err(bad("col_ptr[n_cols] must equal nnz"));
        }
        for w in col_ptr.windows(2) {
            let rows = &row_idx[w[0] as usize..w[1] as usize];
            if rows.iter().any(|r| *r as usize >= n_rows) {
                return Err(bad("row index out of bounds"));
            }
            if rows.windows(2).any(|p| p[1] <= p[0]) {
                return Err(bad("row indices must be strictly increasing per column"));
            }
        }
        Ok(Self {
            n_rows,
            n_cols,
            col_ptr,
            row_idx,
            values,
        })
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn col(&self, col: usize) -> (&[u32], &[T]) {
        let start = self.col_ptr[col] as usize;
        let end = self.col_ptr[col + 1] as usize;
        (&self.row_idx[start..end], &self.values[start..end])
    }

    pub fn iter_col(&self, col: usize) -> impl Iterator<Item = (u32, T)> + '_ {
        let (rows, vals) = self.col(col);
        rows.iter().copied().zip(vals.iter().copied())
    }

    pub fn col_sums(&self) -> Vec<f64> {
        (0..self.n_cols)
            .map(|c| self.col(c).1.iter().map(|v| v.to_f64()).sum())
            .collect()
    }

    pub fn row_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0f64; self.n_rows];
        for (row, val) in self.row_idx.iter().zip(self.values.iter()) {
            sums[*row as usize] += val.to_f64();
        }
        sums
    }

    /// Dense value of one cell, zero when the entry is not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (rows, vals) = self.col(col);
        match rows.binary_search(&(row as u32)) {
            Ok(pos) => vals[pos].to_f64(),
            Err(_) => 0.0,
        }
    }

    /// Dense rows for the requested features, in request order.
    pub fn dense_rows(&self, rows: &[usize]) -> Vec<Vec<f64>> {
        let mut slot = vec![usize::MAX; self.n_rows];
        for (i, row) in rows.iter().enumerate() {
            if *row < self.n_rows {
                slot[*row] = i;
            }
        }
        let mut out = vec![vec![0.0f64; self.n_cols]; rows.len()];
        for col in 0..self.n_cols {
            for (row, val) in self.iter_col(col) {
                let s = slot[row as usize];
                if s != usize::MAX {
                    out[s][col] = val.to_f64();
                }
            }
        }
        // Repeated requests share one slot above; fill the rest.
        for (i, row) in rows.iter().enumerate() {
            if *row < self.n_rows && slot[*row] != i {
                out[i] = out[slot[*row]].clone();
            }
        }
        out
    }

    pub fn dense_col(&self, col: usize) -> Vec<f64> {
        let mut out = vec![0.0f64; self.n_rows];
        for (row, val) in self.iter_col(col) {
            out[row as usize] = val.to_f64();
        }
        out
    }

    /// Applies `f(row, col, value)` to every stored entry.
    pub fn map_values<F>(&self, mut f: F) -> CscMatrix<f32>
    where
        F: FnMut(u32, usize, T) -> f32,
    {
        let mut values = Vec::with_capacity(self.values.len());
        for col in 0..self.n_cols {
            for (row, val) in self.iter_col(col) {
                values.push(f(row, col, val));
            }
        }
        CscMatrix {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            col_ptr: self.col_ptr.clone(),
            row_idx: self.row_idx.clone(),
            values,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/expr/csc.rs"]
mod tests;
