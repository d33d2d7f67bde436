use crate::qc::QcError;
use crate::qc::subsets::{ResolvedSubset, check_subset_rows};
use crate::sce::{ColumnData, Experiment};

pub const DEFAULT_PERCENT_TOP: [usize; 4] = [50, 100, 200, 500];

#[derive(Debug, Clone)]
pub struct CellQcParams {
    pub exprs_values: String,
    pub subsets: Vec<ResolvedSubset>,
    pub percent_top: Vec<usize>,
    /// Values strictly above this count as detected.
    pub detection_limit: f64,
}

impl Default for CellQcParams {
    fn default() -> Self {
        Self {
            exprs_values: "counts".to_string(),
            subsets: Vec::new(),
            percent_top: DEFAULT_PERCENT_TOP.to_vec(),
            detection_limit: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubsetCellMetrics {
    pub name: String,
    pub sum: Vec<f64>,
    pub detected: Vec<u32>,
    pub percent: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellQcTable {
    pub cell_names: Vec<String>,
    pub sum: Vec<f64>,
    pub detected: Vec<u32>,
    pub percent_top: Vec<(usize, Vec<f64>)>,
    pub subsets: Vec<SubsetCellMetrics>,
}

impl CellQcTable {
    pub fn len(&self) -> usize {
        self.cell_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_names.is_empty()
    }

    pub fn subset(&self, name: &str) -> Option<&SubsetCellMetrics> {
        self.subsets.iter().find(|s| s.name == name)
    }

    /// Metric columns in report order.
    pub fn columns(&self) -> Vec<(String, ColumnData)> {
        let mut cols = vec![
            ("sum".to_string(), ColumnData::Numeric(self.sum.clone())),
            (
                "detected".to_string(),
                ColumnData::Numeric(self.detected.iter().map(|v| *v as f64).collect()),
            ),
        ];
        for (n, values) in &self.percent_top {
            cols.push((format!("percent_top_{n}"), ColumnData::Numeric(values.clone())));
        }
        for subset in &self.subsets {
            cols.push((
                format!("subsets_{}_sum", subset.name),
                ColumnData::Numeric(subset.sum.clone()),
            ));
            cols.push((
                format!("subsets_{}_detected", subset.name),
                ColumnData::Numeric(subset.detected.iter().map(|v| *v as f64).collect()),
            ));
            cols.push((
                format!("subsets_{}_percent", subset.name),
                ColumnData::Numeric(subset.percent.clone()),
            ));
        }
        cols.push(("total".to_string(), ColumnData::Numeric(self.sum.clone())));
        cols
    }
}

pub fn per_cell_qc_metrics(exp: &Experiment, params: &CellQcParams) -> Result<CellQcTable, QcError> {
    if params.percent_top.iter().any(|n| *n == 0) {
        return Err(QcError::InvalidPercentTop);
    }
    check_subset_rows(&params.subsets, exp.n_features())?;
    let assay = exp.assay(&params.exprs_values)?;
    let n_cells = exp.n_cells();

    let mut percent_top_sizes = params.percent_top.clone();
    percent_top_sizes.sort_unstable();
    percent_top_sizes.dedup();

    let mut membership: Vec<Vec<usize>> = vec![Vec::new(); exp.n_features()];
    for (subset_idx, subset) in params.subsets.iter().enumerate() {
        for row in &subset.rows {
            membership[*row].push(subset_idx);
        }
    }

    let mut sum = vec![0.0f64; n_cells];
    let mut detected = vec![0u32; n_cells];
    let mut percent_top: Vec<Vec<f64>> = vec![vec![0.0; n_cells]; percent_top_sizes.len()];
    let mut sub_sum = vec![vec![0.0f64; n_cells]; params.subsets.len()];
    let mut sub_detected = vec![vec![0u32; n_cells]; params.subsets.len()];

    let mut cell_values: Vec<f64> = Vec::new();
    for cell in 0..n_cells {
        cell_values.clear();
        assay.for_each_in_col(cell, |row, value| {
            sum[cell] += value;
            let hit = value > params.detection_limit;
            if hit {
                detected[cell] += 1;
            }
            for subset_idx in &membership[row as usize] {
                sub_sum[*subset_idx][cell] += value;
                if hit {
                    sub_detected[*subset_idx][cell] += 1;
                }
            }
            cell_values.push(value);
        });

        let total = sum[cell];
        if total <= 0.0 || percent_top_sizes.is_empty() {
            continue;
        }
        cell_values.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let mut running = 0.0f64;
        let mut taken = 0usize;
        for (slot, n) in percent_top_sizes.iter().enumerate() {
            while taken < *n && taken < cell_values.len() {
                running += cell_values[taken];
                taken += 1;
            }
            percent_top[slot][cell] = 100.0 * running / total;
        }
    }

    let subsets = params
        .subsets
        .iter()
        .enumerate()
        .map(|(i, subset)| SubsetCellMetrics {
            name: subset.name.clone(),
            percent: sub_sum[i]
                .iter()
                .zip(sum.iter())
                .map(|(s, t)| if *t > 0.0 { 100.0 * s / t } else { 0.0 })
                .collect(),
            sum: std::mem::take(&mut sub_sum[i]),
            detected: std::mem::take(&mut sub_detected[i]),
        })
        .collect();

    Ok(CellQcTable {
        cell_names: exp.cell_names().to_vec(),
        sum,
        detected,
        percent_top: percent_top_sizes.into_iter().zip(percent_top).collect(),
        subsets,
    })
}

/// Copy of `exp` with per-cell metrics appended to the cell metadata.
pub fn add_per_cell_qc(exp: &Experiment, params: &CellQcParams) -> Result<Experiment, QcError> {
    let table = per_cell_qc_metrics(exp, params)?;
    let mut out = exp.clone();
    for (name, data) in table.columns() {
        out.col_data.insert(&name, data)?;
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/src_inline/qc/cell.rs"]
mod tests;
