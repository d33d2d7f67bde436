use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::pipeline::stage1_load::{DatasetCtx, RunMode};
use crate::pipeline::stage2_metrics::MetricsCtx;
use crate::pipeline::stage3_normalize::SizeFactorSummary;
use crate::pipeline::stage4_plots::PlotsCtx;
use crate::qc::outliers::Thresholds;
use crate::report::json::write_summary;
use crate::report::text::render_report;
use crate::sce::annotations::fmt_num;
use crate::sce::{Annotations, Experiment};

pub const CELL_QC_TSV: &str = "cell_qc.tsv";
pub const FEATURE_QC_TSV: &str = "feature_qc.tsv";
pub const SUMMARY_JSON: &str = "summary.json";
pub const REPORT_TXT: &str = "report.txt";
pub const PIPELINE_STEP_JSON: &str = "pipeline_step.json";

#[derive(Debug, Error)]
pub enum Stage5Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct QcSummary {
    pub tool: ToolSummary,
    pub input: InputSummary,
    pub cells: CellSummary,
    pub outliers: OutlierSummary,
    pub size_factors: SizeFactorSummary,
    pub subsets: Vec<SubsetSummary>,
    pub highest_exprs: Vec<TopFeature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub format: String,
    pub n_features: usize,
    pub n_cells: usize,
    pub nnz: usize,
    pub duplicate_feature_names: usize,
    pub meta_cells_matched: Option<usize>,
    pub meta_rows_unmatched: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantiles {
    pub median: f64,
    pub p90: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellSummary {
    pub sum: Quantiles,
    pub detected: Quantiles,
    /// Subset percentage of counts, keyed by subset name.
    pub subsets_percent: BTreeMap<String, Quantiles>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierSummary {
    pub nmads: f64,
    pub discarded: usize,
    pub discarded_fraction: f64,
    pub low_lib_size: usize,
    pub low_n_features: usize,
    pub high_subsets_percent: BTreeMap<String, usize>,
    /// Metric -> batch -> thresholds in the metric's original scale.
    pub thresholds: BTreeMap<String, BTreeMap<String, Thresholds>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsetSummary {
    pub name: String,
    pub n_features: usize,
    pub missing_features: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopFeature {
    pub name: String,
    pub total: f64,
    pub summary: f64,
    pub is_control: bool,
}

/// Linear-interpolation quantile (R type 7) of the finite values.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return f64::NAN;
    }
    v.sort_by(|a, b| a.total_cmp(b));
    let pos = q.clamp(0.0, 1.0) * (v.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    v[lo] + (v[hi] - v[lo]) * (pos - lo as f64)
}

fn quantiles(values: &[f64]) -> Quantiles {
    Quantiles {
        median: quantile(values, 0.5),
        p90: quantile(values, 0.9),
        p99: quantile(values, 0.99),
    }
}

pub fn build_summary(
    dataset: &DatasetCtx,
    metrics: &MetricsCtx,
    size_factors: &SizeFactorSummary,
    plots: &PlotsCtx,
    nmads: f64,
) -> QcSummary {
    let detected: Vec<f64> = metrics.cells.detected.iter().map(|v| *v as f64).collect();
    let subsets_percent = metrics
        .cells
        .subsets
        .iter()
        .map(|s| (s.name.clone(), quantiles(&s.percent)))
        .collect();

    let quick = &metrics.quick;
    let mut thresholds = BTreeMap::new();
    thresholds.insert("sum".to_string(), quick.low_lib_size.thresholds.clone());
    thresholds.insert("detected".to_string(), quick.low_n_features.thresholds.clone());
    let mut high_subsets_percent = BTreeMap::new();
    for (name, result) in &quick.high_subsets {
        high_subsets_percent.insert(name.clone(), result.n_outliers());
        thresholds.insert(format!("subsets_{name}_percent"), result.thresholds.clone());
    }
    let n_cells = metrics.cells.len();

    QcSummary {
        tool: ToolSummary {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        input: InputSummary {
            format: dataset.format.to_string(),
            n_features: dataset.n_features,
            n_cells: dataset.n_cells,
            nnz: dataset.nnz,
            duplicate_feature_names: dataset.duplicate_feature_names.len(),
            meta_cells_matched: dataset.meta.as_ref().map(|m| m.matched),
            meta_rows_unmatched: dataset.meta.as_ref().map(|m| m.missing),
        },
        cells: CellSummary {
            sum: quantiles(&metrics.cells.sum),
            detected: quantiles(&detected),
            subsets_percent,
        },
        outliers: OutlierSummary {
            nmads,
            discarded: quick.n_discarded(),
            discarded_fraction: if n_cells > 0 {
                quick.n_discarded() as f64 / n_cells as f64
            } else {
                0.0
            },
            low_lib_size: quick.low_lib_size.n_outliers(),
            low_n_features: quick.low_n_features.n_outliers(),
            high_subsets_percent,
            thresholds,
        },
        size_factors: size_factors.clone(),
        subsets: metrics
            .subsets
            .iter()
            .map(|s| SubsetSummary {
                name: s.name.clone(),
                n_features: s.rows.len(),
                missing_features: s.missing.clone(),
            })
            .collect(),
        highest_exprs: plots
            .highest
            .iter()
            .map(|f| TopFeature {
                name: f.label.clone(),
                total: f.total,
                summary: f.summary,
                is_control: f.is_control,
            })
            .collect(),
    }
}

pub fn run_stage5(
    exp: &Experiment,
    summary: &QcSummary,
    out_dir: &Path,
    run_mode: RunMode,
) -> Result<(), Stage5Error> {
    std::fs::create_dir_all(out_dir)?;

    let mut cell_keys = vec![("cell_id", exp.cell_names().to_vec())];
    if let Some(sf) = &exp.size_factors {
        cell_keys.push(("size_factor", sf.iter().map(|v| fmt_num(*v)).collect()));
    }
    write_annotations(&out_dir.join(CELL_QC_TSV), &cell_keys, &exp.col_data)?;

    let feature_keys = [
        ("feature_id", exp.feature_ids().to_vec()),
        ("feature_name", exp.feature_names().to_vec()),
    ];
    write_annotations(&out_dir.join(FEATURE_QC_TSV), &feature_keys, &exp.row_data)?;

    write_summary(&out_dir.join(SUMMARY_JSON), summary)?;
    std::fs::write(out_dir.join(REPORT_TXT), render_report(summary))?;

    if run_mode == RunMode::Pipeline {
        write_pipeline_step_json(out_dir)?;
    }
    Ok(())
}

/// Key columns followed by every annotation column, one row per entry.
fn write_annotations(
    path: &Path,
    keys: &[(&str, Vec<String>)],
    annotations: &Annotations,
) -> Result<(), Stage5Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;

    let mut header: Vec<&str> = keys.iter().map(|(name, _)| *name).collect();
    header.extend(annotations.names());
    writer.write_record(&header)?;

    for i in 0..annotations.len() {
        let mut record: Vec<String> = keys.iter().map(|(_, values)| values[i].clone()).collect();
        record.extend(annotations.iter().map(|(_, data)| data.display_at(i)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_pipeline_step_json(out_dir: &Path) -> Result<(), Stage5Error> {
    let step = json!({
        "tool": {
            "name": env!("CARGO_PKG_NAME"),
            "stage": "qc",
            "version": env!("CARGO_PKG_VERSION")
        },
        "artifacts": {
            "summary": SUMMARY_JSON,
            "primary_metrics": CELL_QC_TSV,
            "feature_metrics": FEATURE_QC_TSV,
            "highest_exprs": crate::pipeline::stage4_plots::HIGHEST_EXPRS_TSV
        },
        "cell_metrics": {
            "file": CELL_QC_TSV,
            "id_column": "cell_id",
            "flag_column": "discard",
            "library_size_column": "sum",
            "detected_column": "detected"
        }
    });
    std::fs::write(
        out_dir.join(PIPELINE_STEP_JSON),
        serde_json::to_string_pretty(&step)?,
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_report.rs"]
mod tests;
