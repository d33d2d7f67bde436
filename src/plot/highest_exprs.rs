use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::warn;

use crate::plot::PlotError;
use crate::plot::chart::{Axis, Chart, LegendPosition, Layer, Mark, Shape, Theme};
use crate::plot::scale::{ALICEBLUE, ColourScale, GRAY30, GRAY35, ScaleValue, WHEAT};
use crate::sce::retrieve::{ValueSpec, retrieve_cell_info, retrieve_feature_info};
use crate::sce::{Assay, ColumnData, Experiment};

pub const PERCENT_LABEL: &str = "% of total counts";

#[derive(Debug, Clone)]
pub struct HighestExprsParams {
    pub n: usize,
    pub exprs_values: String,
    pub colour_cells_by: Option<ValueSpec>,
    /// Assay used to resolve `colour_cells_by`; `None` uses `exprs_values`.
    pub by_exprs_values: Option<String>,
    /// Feature names or ids removed before ranking. Percentages and the
    /// grand total are taken over the remaining features only.
    pub drop_features: Vec<String>,
    /// Feature metadata column used for the axis labels.
    pub feature_names_to_plot: Option<String>,
    pub as_percentage: bool,
    /// Logical feature metadata column marking control features.
    pub controls: Option<String>,
}

impl Default for HighestExprsParams {
    fn default() -> Self {
        Self {
            n: 50,
            exprs_values: "counts".to_string(),
            colour_cells_by: None,
            by_exprs_values: None,
            drop_features: Vec::new(),
            feature_names_to_plot: None,
            as_percentage: true,
            controls: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFeature {
    pub row: usize,
    pub label: String,
    pub total: f64,
    /// Share of all counts (percentage mode) or mean across cells.
    pub summary: f64,
    pub is_control: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub feature: String,
    pub cell: String,
    pub value: f64,
    pub colour_by: Option<ScaleValue>,
}

#[derive(Debug, Clone)]
pub struct HighestExprsPlot {
    pub chart: Chart,
    /// Ranked from highest to lowest.
    pub features: Vec<SelectedFeature>,
    /// One row per (cell, feature), cell-major.
    pub long: Vec<LongRow>,
}

impl HighestExprsPlot {
    pub fn write_long_tsv(&self, path: &Path) -> Result<(), PlotError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        writer.write_record(["feature", "cell", "value", "colour_by"])?;
        for row in &self.long {
            let colour = match &row.colour_by {
                Some(ScaleValue::Level(l)) => l.clone(),
                Some(ScaleValue::Value(v)) => format!("{:.6}", v),
                None => ".".to_string(),
            };
            writer.write_record([
                row.feature.as_str(),
                row.cell.as_str(),
                &format!("{:.6}", row.value),
                colour.as_str(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Ranks features by their total across cells and plots the top `n` as a
/// strip per feature: one tick per cell plus a summary point.
pub fn plot_highest_exprs(
    exp: &Experiment,
    params: &HighestExprsParams,
) -> Result<HighestExprsPlot, PlotError> {
    let assay = exp.assay(&params.exprs_values)?;
    let row_totals = assay.row_sums();

    let dropped = drop_rows(exp, &params.drop_features);
    let mut order: Vec<usize> = (0..exp.n_features())
        .filter(|row| !dropped.contains(row))
        .collect();
    order.sort_by(|a, b| {
        row_totals[*b]
            .partial_cmp(&row_totals[*a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(b))
    });
    order.truncate(params.n);
    if order.is_empty() {
        return Err(PlotError::NoFeatures);
    }

    let labels = feature_labels(exp, params, &order)?;
    let controls = control_flags(exp, params)?;

    let mut values = assay.dense_rows(&order);
    let grand_total: f64;
    if params.as_percentage {
        let cell_totals = kept_col_sums(assay, &dropped, exp.n_cells());
        grand_total = cell_totals.iter().sum();
        for row in values.iter_mut() {
            for (v, t) in row.iter_mut().zip(cell_totals.iter()) {
                *v = if *t > 0.0 { 100.0 * *v / *t } else { 0.0 };
            }
        }
    } else {
        grand_total = 0.0;
    }

    let n_cells = exp.n_cells();
    let features: Vec<SelectedFeature> = order
        .iter()
        .zip(labels)
        .map(|(row, label)| {
            let total = row_totals[*row];
            let summary = if params.as_percentage {
                if grand_total > 0.0 { 100.0 * total / grand_total } else { 0.0 }
            } else if n_cells > 0 {
                total / n_cells as f64
            } else {
                0.0
            };
            SelectedFeature {
                row: *row,
                label,
                total,
                summary,
                is_control: controls.as_ref().is_some_and(|c| c[*row]),
            }
        })
        .collect();

    let colour = match &params.colour_cells_by {
        Some(spec) => {
            let by = params
                .by_exprs_values
                .as_deref()
                .unwrap_or(params.exprs_values.as_str());
            Some(retrieve_cell_info(exp, spec, by)?)
        }
        None => None,
    };
    let (colour_scale, cell_colours) = match &colour {
        Some(resolved) => match &resolved.values {
            ColumnData::Numeric(v) => (
                Some(ColourScale::continuous(&resolved.name, v)),
                Some(v.iter().map(|x| ScaleValue::Value(*x)).collect::<Vec<_>>()),
            ),
            other => {
                let labels = other.labels().unwrap_or_default();
                (
                    Some(ColourScale::discrete(&resolved.name, &labels)),
                    Some(labels.into_iter().map(ScaleValue::Level).collect()),
                )
            }
        },
        None => (None, None),
    };

    let n_sel = features.len();
    let mut long = Vec::with_capacity(n_sel * n_cells);
    for cell in 0..n_cells {
        for (k, feature) in features.iter().enumerate() {
            long.push(LongRow {
                feature: feature.label.clone(),
                cell: exp.cell_names()[cell].clone(),
                value: values[k][cell],
                colour_by: cell_colours.as_ref().map(|c| c[cell].clone()),
            });
        }
    }

    // Highest feature gets the largest axis position so it is drawn on top.
    let y_of = |k: usize| (n_sel - 1 - k) as f64;
    let levels: Vec<String> = features.iter().rev().map(|f| f.label.clone()).collect();

    let values = &values;
    let ticks = Layer {
        shape: Shape::Tick,
        alpha: 0.6,
        size: 1,
        stroke: None,
        marks: (0..n_cells)
            .flat_map(|cell| {
                let colour = cell_colours.as_ref().map(|c| c[cell].clone());
                (0..n_sel).map(move |k| Mark {
                    x: values[k][cell],
                    y: y_of(k),
                    colour: colour.clone(),
                    fill: None,
                })
            })
            .collect(),
    };
    let summary = Layer {
        shape: Shape::Circle,
        alpha: 1.0,
        size: 4,
        stroke: Some(GRAY30),
        marks: features
            .iter()
            .enumerate()
            .map(|(k, f)| Mark {
                x: f.summary,
                y: y_of(k),
                colour: None,
                fill: Some(ScaleValue::Level(control_level(f.is_control).to_string())),
            })
            .collect(),
    };

    let mut theme = Theme::bw(8);
    theme.axis_text = GRAY35;

    let mut chart = Chart::new(
        Axis::Continuous { range: None },
        Axis::Discrete { levels },
    );
    chart.x_label = if params.as_percentage {
        PERCENT_LABEL.to_string()
    } else {
        params.exprs_values.clone()
    };
    chart.y_label = "Feature".to_string();
    chart.layers = vec![ticks, summary];
    chart.colour_scale = colour_scale;
    chart.fill_scale = Some(ColourScale::manual(
        "is_control",
        &[("FALSE", ALICEBLUE), ("TRUE", WHEAT)],
        false,
    ));
    chart.theme = theme;
    chart.legend = LegendPosition::BottomRight;

    Ok(HighestExprsPlot {
        chart,
        features,
        long,
    })
}

fn control_level(is_control: bool) -> &'static str {
    if is_control { "TRUE" } else { "FALSE" }
}

/// Per-cell totals over the features not in `dropped`.
fn kept_col_sums(assay: &Assay, dropped: &HashSet<usize>, n_cells: usize) -> Vec<f64> {
    if dropped.is_empty() {
        return assay.col_sums();
    }
    let mut totals = vec![0.0f64; n_cells];
    for (cell, total) in totals.iter_mut().enumerate() {
        assay.for_each_in_col(cell, |row, value| {
            if !dropped.contains(&(row as usize)) {
                *total += value;
            }
        });
    }
    totals
}

fn drop_rows(exp: &Experiment, drop: &[String]) -> HashSet<usize> {
    let wanted: HashSet<&str> = drop.iter().map(|s| s.as_str()).collect();
    let mut rows = HashSet::new();
    let mut matched: HashSet<&str> = HashSet::new();
    for row in 0..exp.n_features() {
        for key in [exp.feature_names()[row].as_str(), exp.feature_ids()[row].as_str()] {
            if let Some(hit) = wanted.get(key) {
                rows.insert(row);
                matched.insert(*hit);
            }
        }
    }
    for name in drop {
        if !matched.contains(name.as_str()) {
            warn!(feature = name.as_str(), "drop_features entry not found");
        }
    }
    rows
}

fn feature_labels(
    exp: &Experiment,
    params: &HighestExprsParams,
    rows: &[usize],
) -> Result<Vec<String>, PlotError> {
    let mut labels: Vec<String> = match &params.feature_names_to_plot {
        Some(column) => {
            let resolved = retrieve_feature_info(
                exp,
                &ValueSpec::Column(column.clone()),
                &params.exprs_values,
            )?;
            rows.iter().map(|r| resolved.values.display_at(*r)).collect()
        }
        None => rows.iter().map(|r| exp.feature_names()[*r].clone()).collect(),
    };

    // Repeated labels would share one axis position.
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in &labels {
        *counts.entry(label.clone()).or_insert(0) += 1;
    }
    for (label, row) in labels.iter_mut().zip(rows.iter()) {
        if counts.get(label.as_str()).copied().unwrap_or(0) > 1 {
            *label = format!("{} ({})", label, exp.feature_ids()[*row]);
        }
    }
    Ok(labels)
}

fn control_flags(
    exp: &Experiment,
    params: &HighestExprsParams,
) -> Result<Option<Vec<bool>>, PlotError> {
    let Some(column) = &params.controls else {
        return Ok(None);
    };
    let resolved = retrieve_feature_info(
        exp,
        &ValueSpec::Column(column.clone()),
        &params.exprs_values,
    )?;
    match resolved.values {
        ColumnData::Logical(flags) => Ok(Some(flags)),
        other => Err(PlotError::ColumnKind {
            name: column.clone(),
            kind: other.kind(),
            expected: "logical",
        }),
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/plot/highest_exprs.rs"]
mod tests;
