//! Declarative chart description.
//!
//! Plot functions build a [`Chart`] from experiment data; nothing here
//! touches a drawing backend. See [`crate::plot::render`] for SVG output.

use crate::plot::scale::{BLACK, ColourScale, GRAY20, GRAY92, Rgb, ScaleValue, WHITE};

#[derive(Debug, Clone, PartialEq)]
pub enum Axis {
    /// Numeric axis; `None` derives the range from the data.
    Continuous { range: Option<(f64, f64)> },
    /// One position per level, level `i` drawn at coordinate `i`.
    Discrete { levels: Vec<String> },
}

impl Axis {
    pub fn is_discrete(&self) -> bool {
        matches!(self, Axis::Discrete { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Vertical bar, the `|` glyph.
    Tick,
    Circle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub x: f64,
    pub y: f64,
    pub colour: Option<ScaleValue>,
    pub fill: Option<ScaleValue>,
}

impl Mark {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            colour: None,
            fill: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub shape: Shape,
    pub alpha: f64,
    pub size: u32,
    /// Fixed outline colour; unset means the colour scale (or black).
    pub stroke: Option<Rgb>,
    pub marks: Vec<Mark>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    None,
    BottomRight,
    TopRight,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub base_size: u32,
    pub background: Rgb,
    pub panel_border: Rgb,
    pub grid: Rgb,
    pub axis_text: Rgb,
    pub axis_title: Rgb,
}

impl Theme {
    /// White panel, thin dark border, light grid.
    pub fn bw(base_size: u32) -> Self {
        Self {
            base_size,
            background: WHITE,
            panel_border: GRAY20,
            grid: GRAY92,
            axis_text: GRAY20,
            axis_title: BLACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: Option<String>,
    pub x_label: String,
    pub y_label: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub layers: Vec<Layer>,
    pub colour_scale: Option<ColourScale>,
    pub fill_scale: Option<ColourScale>,
    pub theme: Theme,
    pub legend: LegendPosition,
}

impl Chart {
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            title: None,
            x_label: String::new(),
            y_label: String::new(),
            x_axis,
            y_axis,
            layers: Vec::new(),
            colour_scale: None,
            fill_scale: None,
            theme: Theme::bw(11),
            legend: LegendPosition::BottomRight,
        }
    }

    pub fn n_marks(&self) -> usize {
        self.layers.iter().map(|l| l.marks.len()).sum()
    }

    pub fn x_range(&self) -> (f64, f64) {
        axis_range(&self.x_axis, self.layers.iter().flat_map(|l| l.marks.iter().map(|m| m.x)))
    }

    pub fn y_range(&self) -> (f64, f64) {
        axis_range(&self.y_axis, self.layers.iter().flat_map(|l| l.marks.iter().map(|m| m.y)))
    }

    pub fn mark_colour(&self, layer: &Layer, mark: &Mark) -> Rgb {
        if let Some(stroke) = layer.stroke {
            return stroke;
        }
        match (&self.colour_scale, &mark.colour) {
            (Some(scale), Some(value)) => scale.colour(value),
            _ => BLACK,
        }
    }

    pub fn mark_fill(&self, mark: &Mark) -> Option<Rgb> {
        match (&self.fill_scale, &mark.fill) {
            (Some(scale), Some(value)) => Some(scale.colour(value)),
            _ => None,
        }
    }
}

/// Data range with 5% expansion on each side; discrete axes pad by 0.6.
fn axis_range(axis: &Axis, values: impl Iterator<Item = f64>) -> (f64, f64) {
    match axis {
        Axis::Discrete { levels } => (-0.6, levels.len().max(1) as f64 - 0.4),
        Axis::Continuous { range: Some(r) } => *r,
        Axis::Continuous { range: None } => {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for v in values.filter(|v| v.is_finite()) {
                min = min.min(v);
                max = max.max(v);
            }
            if !min.is_finite() {
                return (0.0, 1.0);
            }
            let span = max - min;
            if span < 1e-9 {
                return (min - 0.5, max + 0.5);
            }
            (min - 0.05 * span, max + 0.05 * span)
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/plot/chart.rs"]
mod tests;
