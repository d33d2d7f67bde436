use crate::qc::{QcError, valid_subset_name};
use crate::sce::{ColumnData, Experiment};

#[derive(Debug, Clone)]
pub struct FeatureQcParams {
    pub exprs_values: String,
    pub detection_limit: f64,
    /// Named cell masks; each adds per-feature metrics over those cells.
    pub cell_subsets: Vec<(String, Vec<bool>)>,
}

impl Default for FeatureQcParams {
    fn default() -> Self {
        Self {
            exprs_values: "counts".to_string(),
            detection_limit: 0.0,
            cell_subsets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubsetFeatureMetrics {
    pub name: String,
    pub mean: Vec<f64>,
    pub detected: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQcTable {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    /// Percentage of cells with the feature detected.
    pub detected: Vec<f64>,
    pub n_cells_by_counts: Vec<u32>,
    pub total: Vec<f64>,
    pub pct_dropout: Vec<f64>,
    pub subsets: Vec<SubsetFeatureMetrics>,
}

impl FeatureQcTable {
    pub fn columns(&self) -> Vec<(String, ColumnData)> {
        let mut cols = vec![
            ("mean".to_string(), ColumnData::Numeric(self.mean.clone())),
            ("detected".to_string(), ColumnData::Numeric(self.detected.clone())),
            (
                "n_cells_by_counts".to_string(),
                ColumnData::Numeric(self.n_cells_by_counts.iter().map(|v| *v as f64).collect()),
            ),
            ("total".to_string(), ColumnData::Numeric(self.total.clone())),
            ("pct_dropout".to_string(), ColumnData::Numeric(self.pct_dropout.clone())),
        ];
        for subset in &self.subsets {
            cols.push((
                format!("subsets_{}_mean", subset.name),
                ColumnData::Numeric(subset.mean.clone()),
            ));
            cols.push((
                format!("subsets_{}_detected", subset.name),
                ColumnData::Numeric(subset.detected.clone()),
            ));
        }
        cols
    }
}

pub fn per_feature_qc_metrics(
    exp: &Experiment,
    params: &FeatureQcParams,
) -> Result<FeatureQcTable, QcError> {
    let assay = exp.assay(&params.exprs_values)?;
    let n_features = exp.n_features();
    let n_cells = exp.n_cells();

    for (name, mask) in &params.cell_subsets {
        if !valid_subset_name(name) {
            return Err(QcError::InvalidSubsetName(name.clone()));
        }
        if mask.len() != n_cells {
            return Err(QcError::CellSubsetLength {
                name: name.clone(),
                expected: n_cells,
                found: mask.len(),
            });
        }
    }

    let mut total = vec![0.0f64; n_features];
    let mut n_detected = vec![0u32; n_features];
    let n_subsets = params.cell_subsets.len();
    let mut sub_total = vec![vec![0.0f64; n_features]; n_subsets];
    let mut sub_detected = vec![vec![0u32; n_features]; n_subsets];
    let mut sub_cells = vec![0usize; n_subsets];

    for cell in 0..n_cells {
        let active: Vec<usize> = params
            .cell_subsets
            .iter()
            .enumerate()
            .filter(|(_, (_, mask))| mask[cell])
            .map(|(i, _)| i)
            .collect();
        for s in &active {
            sub_cells[*s] += 1;
        }
        assay.for_each_in_col(cell, |row, value| {
            let row = row as usize;
            total[row] += value;
            let hit = value > params.detection_limit;
            if hit {
                n_detected[row] += 1;
            }
            for s in &active {
                sub_total[*s][row] += value;
                if hit {
                    sub_detected[*s][row] += 1;
                }
            }
        });
    }

    let cells = n_cells as f64;
    let mean: Vec<f64> = total
        .iter()
        .map(|t| if n_cells > 0 { t / cells } else { f64::NAN })
        .collect();
    let detected: Vec<f64> = n_detected
        .iter()
        .map(|d| if n_cells > 0 { 100.0 * *d as f64 / cells } else { f64::NAN })
        .collect();
    let pct_dropout = detected.iter().map(|d| 100.0 - d).collect();

    let subsets = params
        .cell_subsets
        .iter()
        .enumerate()
        .map(|(i, (name, _))| {
            let n = sub_cells[i] as f64;
            SubsetFeatureMetrics {
                name: name.clone(),
                mean: sub_total[i]
                    .iter()
                    .map(|t| if n > 0.0 { t / n } else { f64::NAN })
                    .collect(),
                detected: sub_detected[i]
                    .iter()
                    .map(|d| if n > 0.0 { 100.0 * *d as f64 / n } else { f64::NAN })
                    .collect(),
            }
        })
        .collect();

    Ok(FeatureQcTable {
        feature_names: exp.feature_names().to_vec(),
        mean,
        detected,
        n_cells_by_counts: n_detected,
        total,
        pct_dropout,
        subsets,
    })
}

/// Copy of `exp` with per-feature metrics appended to the feature metadata.
pub fn add_per_feature_qc(
    exp: &Experiment,
    params: &FeatureQcParams,
) -> Result<Experiment, QcError> {
    let table = per_feature_qc_metrics(exp, params)?;
    let mut out = exp.clone();
    for (name, data) in table.columns() {
        out.row_data.insert(&name, data)?;
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/src_inline/qc/feature.rs"]
mod tests;
