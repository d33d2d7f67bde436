use crate::plot::PlotError;
use crate::plot::chart::{Axis, Chart, Layer, Mark, Shape};
use crate::plot::scale::{ColourScale, ScaleValue};
use crate::sce::retrieve::{ResolvedValues, RetrieveError, ValueSpec, retrieve_cell_info, retrieve_feature_info};
use crate::sce::{ColumnData, Experiment};

const JITTER_WIDTH: f64 = 0.4;
const POINT_SIZE: u32 = 2;

#[derive(Debug, Clone)]
pub struct MetadataPlotParams {
    pub y: ValueSpec,
    pub x: Option<ValueSpec>,
    pub colour_by: Option<ValueSpec>,
    pub exprs_values: String,
}

impl MetadataPlotParams {
    pub fn new(y: impl Into<ValueSpec>) -> Self {
        Self {
            y: y.into(),
            x: None,
            colour_by: None,
            exprs_values: "counts".to_string(),
        }
    }

    pub fn with_x(mut self, x: impl Into<ValueSpec>) -> Self {
        self.x = Some(x.into());
        self
    }

    pub fn with_colour(mut self, colour_by: impl Into<ValueSpec>) -> Self {
        self.colour_by = Some(colour_by.into());
        self
    }
}

/// Per-cell metadata plot, e.g. `detected` against `sum`.
pub fn plot_col_data(exp: &Experiment, params: &MetadataPlotParams) -> Result<Chart, PlotError> {
    metadata_chart(params, |spec| retrieve_cell_info(exp, spec, &params.exprs_values))
}

/// Per-feature metadata plot, e.g. `mean` against `detected`.
pub fn plot_row_data(exp: &Experiment, params: &MetadataPlotParams) -> Result<Chart, PlotError> {
    metadata_chart(params, |spec| retrieve_feature_info(exp, spec, &params.exprs_values))
}

fn metadata_chart<F>(params: &MetadataPlotParams, resolve: F) -> Result<Chart, PlotError>
where
    F: Fn(&ValueSpec) -> Result<ResolvedValues, RetrieveError>,
{
    let y = resolve(&params.y)?;
    let y_values = match &y.values {
        ColumnData::Numeric(v) => v.clone(),
        other => {
            return Err(PlotError::ColumnKind {
                name: y.name.clone(),
                kind: other.kind(),
                expected: "numeric",
            });
        }
    };

    let (x_axis, x_label, x_values) = match &params.x {
        None => (
            Axis::Discrete {
                levels: vec![String::new()],
            },
            String::new(),
            (0..y_values.len()).map(|i| jitter(0.0, i)).collect::<Vec<_>>(),
        ),
        Some(spec) => {
            let x = resolve(spec)?;
            match &x.values {
                ColumnData::Numeric(v) => (Axis::Continuous { range: None }, x.name.clone(), v.clone()),
                other => {
                    let labels = other.labels().unwrap_or_default();
                    let levels = sorted_levels(&labels);
                    let positions = labels
                        .iter()
                        .enumerate()
                        .map(|(i, l)| {
                            let pos = levels.iter().position(|v| v == l).unwrap_or(0);
                            jitter(pos as f64, i)
                        })
                        .collect();
                    (Axis::Discrete { levels }, x.name.clone(), positions)
                }
            }
        }
    };

    let (colour_scale, colours) = match &params.colour_by {
        Some(spec) => {
            let c = resolve(spec)?;
            match &c.values {
                ColumnData::Numeric(v) => (
                    Some(ColourScale::continuous(&c.name, v)),
                    Some(v.iter().map(|x| ScaleValue::Value(*x)).collect::<Vec<_>>()),
                ),
                other => {
                    let labels = other.labels().unwrap_or_default();
                    (
                        Some(ColourScale::discrete(&c.name, &labels)),
                        Some(labels.into_iter().map(ScaleValue::Level).collect()),
                    )
                }
            }
        }
        None => (None, None),
    };

    let marks = x_values
        .iter()
        .zip(y_values.iter())
        .enumerate()
        .filter(|(_, (x, y))| x.is_finite() && y.is_finite())
        .map(|(i, (x, y))| Mark {
            x: *x,
            y: *y,
            colour: colours.as_ref().map(|c| c[i].clone()),
            fill: None,
        })
        .collect();

    let mut chart = Chart::new(x_axis, Axis::Continuous { range: None });
    chart.x_label = x_label;
    chart.y_label = y.name.clone();
    chart.layers = vec![Layer {
        shape: Shape::Circle,
        alpha: 0.6,
        size: POINT_SIZE,
        stroke: None,
        marks,
    }];
    chart.colour_scale = colour_scale;
    Ok(chart)
}

fn sorted_levels(labels: &[String]) -> Vec<String> {
    let mut levels = labels.to_vec();
    levels.sort();
    levels.dedup();
    levels
}

/// Offset in `[-JITTER_WIDTH / 2, JITTER_WIDTH / 2)` derived from the index.
pub(crate) fn jitter(centre: f64, index: usize) -> f64 {
    let mut z = (index as u64).wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    let unit = (z >> 11) as f64 / (1u64 << 53) as f64;
    centre + (unit - 0.5) * JITTER_WIDTH
}

#[cfg(test)]
#[path = "../../tests/src_inline/plot/metadata.rs"]
mod tests;
