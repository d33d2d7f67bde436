use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::qc::QcError;
use crate::qc::cell::CellQcTable;
use crate::sce::ColumnData;

/// Normal-consistency constant for the median absolute deviation.
pub const MAD_CONSTANT: f64 = 1.4826;

pub const ALL_CELLS: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierType {
    Lower,
    Higher,
    Both,
}

#[derive(Debug, Clone)]
pub struct OutlierParams {
    pub nmads: f64,
    pub kind: OutlierType,
    /// Compute the statistics on `ln(1 + x)`.
    pub log: bool,
    /// Minimum distance between the median and a threshold, in the working scale.
    pub min_diff: Option<f64>,
    pub batch: Option<Vec<String>>,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            nmads: 3.0,
            kind: OutlierType::Both,
            log: false,
            min_diff: None,
            batch: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub lower: f64,
    pub higher: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutlierResult {
    pub flags: Vec<bool>,
    /// Per batch, in the original scale. Unbatched input uses [`ALL_CELLS`].
    pub thresholds: BTreeMap<String, Thresholds>,
}

impl OutlierResult {
    pub fn n_outliers(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }
}

/// R-style median: mean of the two central values for even lengths.
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn sort_finite(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.filter(|x| x.is_finite()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    v
}

/// Median and scaled MAD of the finite values.
pub fn median_mad(values: &[f64]) -> (f64, f64) {
    let sorted = sort_finite(values.iter().copied());
    let med = median(&sorted);
    let dev = sort_finite(sorted.iter().map(|v| (v - med).abs()));
    (med, MAD_CONSTANT * median(&dev))
}

fn working_scale(v: f64, log: bool) -> f64 {
    if log { v.ln_1p() } else { v }
}

fn original_scale(v: f64, log: bool) -> f64 {
    if log { v.exp_m1() } else { v }
}

fn thresholds_for(values: &[f64], params: &OutlierParams) -> Thresholds {
    let (med, mad) = median_mad(values);
    let mut lower_gap = params.nmads * mad;
    let mut higher_gap = params.nmads * mad;
    if let Some(min_diff) = params.min_diff {
        lower_gap = lower_gap.max(min_diff);
        higher_gap = higher_gap.max(min_diff);
    }
    let lower = match params.kind {
        OutlierType::Higher => f64::NEG_INFINITY,
        _ => med - lower_gap,
    };
    let higher = match params.kind {
        OutlierType::Lower => f64::INFINITY,
        _ => med + higher_gap,
    };
    Thresholds { lower, higher }
}

/// Flags values more than `nmads` scaled MADs from the median. Non-finite
/// values are never flagged and do not contribute to the statistics.
pub fn is_outlier(values: &[f64], params: &OutlierParams) -> Result<OutlierResult, QcError> {
    let working: Vec<f64> = values.iter().map(|v| working_scale(*v, params.log)).collect();

    let groups: BTreeMap<String, Vec<usize>> = match &params.batch {
        Some(batch) => {
            if batch.len() != values.len() {
                return Err(QcError::BatchLength {
                    expected: values.len(),
                    found: batch.len(),
                });
            }
            let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for (i, b) in batch.iter().enumerate() {
                groups.entry(b.clone()).or_default().push(i);
            }
            groups
        }
        None => BTreeMap::from([(ALL_CELLS.to_string(), (0..values.len()).collect())]),
    };

    let mut flags = vec![false; values.len()];
    let mut thresholds = BTreeMap::new();
    for (label, idx) in groups {
        let group: Vec<f64> = idx.iter().map(|i| working[*i]).collect();
        let t = thresholds_for(&group, params);
        for i in idx {
            let v = working[i];
            if v.is_finite() && (v < t.lower || v > t.higher) {
                flags[i] = true;
            }
        }
        thresholds.insert(
            label,
            Thresholds {
                lower: original_scale(t.lower, params.log),
                higher: original_scale(t.higher, params.log),
            },
        );
    }

    Ok(OutlierResult { flags, thresholds })
}

#[derive(Debug, Clone)]
pub struct QuickQcParams {
    pub nmads: f64,
    /// Subsets whose percentage is checked for high outliers.
    pub sub_fields: Vec<String>,
    pub batch: Option<Vec<String>>,
}

impl Default for QuickQcParams {
    fn default() -> Self {
        Self {
            nmads: 3.0,
            sub_fields: Vec::new(),
            batch: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuickQcResult {
    pub low_lib_size: OutlierResult,
    pub low_n_features: OutlierResult,
    pub high_subsets: Vec<(String, OutlierResult)>,
    pub discard: Vec<bool>,
}

impl QuickQcResult {
    pub fn columns(&self) -> Vec<(String, ColumnData)> {
        let mut cols = vec![
            (
                "low_lib_size".to_string(),
                ColumnData::Logical(self.low_lib_size.flags.clone()),
            ),
            (
                "low_n_features".to_string(),
                ColumnData::Logical(self.low_n_features.flags.clone()),
            ),
        ];
        for (name, result) in &self.high_subsets {
            cols.push((
                format!("high_subsets_{name}_percent"),
                ColumnData::Logical(result.flags.clone()),
            ));
        }
        cols.push(("discard".to_string(), ColumnData::Logical(self.discard.clone())));
        cols
    }

    pub fn n_discarded(&self) -> usize {
        self.discard.iter().filter(|d| **d).count()
    }
}

/// Standard cell filter: small libraries, few detected features and high
/// subset percentages, each judged by MAD outliers.
pub fn quick_per_cell_qc(
    table: &CellQcTable,
    params: &QuickQcParams,
) -> Result<QuickQcResult, QcError> {
    let lower_log = OutlierParams {
        nmads: params.nmads,
        kind: OutlierType::Lower,
        log: true,
        min_diff: None,
        batch: params.batch.clone(),
    };
    let low_lib_size = is_outlier(&table.sum, &lower_log)?;
    let detected: Vec<f64> = table.detected.iter().map(|v| *v as f64).collect();
    let low_n_features = is_outlier(&detected, &lower_log)?;

    let higher = OutlierParams {
        nmads: params.nmads,
        kind: OutlierType::Higher,
        log: false,
        min_diff: None,
        batch: params.batch.clone(),
    };
    let mut high_subsets = Vec::with_capacity(params.sub_fields.len());
    for name in &params.sub_fields {
        let subset = table
            .subset(name)
            .ok_or_else(|| QcError::UnknownSubset(name.clone()))?;
        high_subsets.push((name.clone(), is_outlier(&subset.percent, &higher)?));
    }

    let mut discard: Vec<bool> = low_lib_size
        .flags
        .iter()
        .zip(low_n_features.flags.iter())
        .map(|(a, b)| *a || *b)
        .collect();
    for (_, result) in &high_subsets {
        for (d, f) in discard.iter_mut().zip(result.flags.iter()) {
            *d |= *f;
        }
    }

    Ok(QuickQcResult {
        low_lib_size,
        low_n_features,
        high_subsets,
        discard,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/qc/outliers.rs"]
mod tests;
