use std::path::Path;

use plotters::backend::SVGBackend;
use plotters::chart::ChartBuilder;
use plotters::coord::Shift;
use plotters::drawing::{DrawingArea, IntoDrawingArea};
use plotters::element::{Circle, PathElement, Rectangle, Text};
use plotters::style::{Color, IntoFont, RGBColor, ShapeStyle};

use crate::plot::PlotError;
use crate::plot::chart::{Axis, Chart, LegendPosition, Shape};
use crate::plot::scale::{ColourScale, GRAY50, Rgb};

pub const DEFAULT_SIZE: (u32, u32) = (900, 1000);

const FONT_FAMILY: &str = "sans-serif";
const CHAR_WIDTH_RATIO: f64 = 0.6;
const TICK_HALF_HEIGHT: f64 = 0.35;

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

fn render_err<E: std::fmt::Display>(e: E) -> PlotError {
    PlotError::Render(e.to_string())
}

/// Points to pixels, as ggplot sizes text in points.
fn px(points: u32) -> i32 {
    (points as f64 * 4.0 / 3.0).round() as i32
}

pub fn render_svg(chart: &Chart, path: &Path, size: (u32, u32)) -> Result<(), PlotError> {
    let svg = render_svg_string(chart, size)?;
    std::fs::write(path, svg)?;
    Ok(())
}

pub fn render_svg_string(chart: &Chart, size: (u32, u32)) -> Result<String, PlotError> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw_chart(&root, chart)?;
        root.present().map_err(render_err)?;
    }
    Ok(svg)
}

fn axis_label(axis: &Axis, v: f64) -> String {
    match axis {
        Axis::Discrete { levels } => {
            let idx = v.round();
            if (v - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            levels.get(idx as usize).cloned().unwrap_or_default()
        }
        Axis::Continuous { .. } => {
            if v.abs() >= 1_000_000.0 {
                format!("{:.1}M", v / 1_000_000.0)
            } else if v.abs() >= 10_000.0 {
                format!("{:.0}k", v / 1000.0)
            } else if v.fract().abs() < 1e-9 {
                format!("{:.0}", v)
            } else {
                let s = format!("{:.2}", v);
                s.trim_end_matches('0').trim_end_matches('.').to_string()
            }
        }
    }
}

fn label_count(axis: &Axis) -> usize {
    match axis {
        Axis::Discrete { levels } => levels.len().max(1),
        Axis::Continuous { .. } => 8,
    }
}

fn label_area_width(axis: &Axis, font_px: i32) -> i32 {
    match axis {
        Axis::Discrete { levels } => {
            let longest = levels.iter().map(|l| l.chars().count()).max().unwrap_or(1);
            (longest as f64 * font_px as f64 * CHAR_WIDTH_RATIO) as i32 + 2 * font_px + 10
        }
        Axis::Continuous { .. } => 6 * font_px,
    }
}

fn draw_chart(root: &DrawingArea<SVGBackend<'_>, Shift>, chart: &Chart) -> Result<(), PlotError> {
    let theme = &chart.theme;
    root.fill(&rgb(theme.background)).map_err(render_err)?;

    let text_px = px(theme.base_size);
    let title_px = px(theme.base_size + 3);
    let (x0, x1) = chart.x_range();
    let (y0, y1) = chart.y_range();

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(12)
        .x_label_area_size(3 * text_px + 10)
        .y_label_area_size(label_area_width(&chart.y_axis, text_px));
    if let Some(title) = &chart.title {
        builder.caption(title, (FONT_FAMILY, title_px).into_font().color(&rgb(theme.axis_title)));
    }
    let mut cc = builder
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(render_err)?;

    let x_fmt = |v: &f64| axis_label(&chart.x_axis, *v);
    let y_fmt = |v: &f64| axis_label(&chart.y_axis, *v);
    cc.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(label_count(&chart.x_axis))
        .y_labels(label_count(&chart.y_axis))
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style((FONT_FAMILY, text_px).into_font().color(&rgb(theme.axis_text)))
        .axis_desc_style((FONT_FAMILY, text_px + 1).into_font().color(&rgb(theme.axis_title)))
        .light_line_style(rgb(theme.background))
        .bold_line_style(rgb(theme.grid))
        .axis_style(ShapeStyle::from(rgb(theme.panel_border)).stroke_width(1))
        .draw()
        .map_err(render_err)?;

    for layer in &chart.layers {
        match layer.shape {
            Shape::Tick => {
                let half = if chart.y_axis.is_discrete() {
                    TICK_HALF_HEIGHT
                } else {
                    (y1 - y0) * 0.01
                };
                cc.draw_series(layer.marks.iter().map(|m| {
                    let colour = rgb(chart.mark_colour(layer, m)).mix(layer.alpha);
                    PathElement::new(
                        vec![(m.x, m.y - half), (m.x, m.y + half)],
                        colour.stroke_width(layer.size.max(1)),
                    )
                }))
                .map_err(render_err)?;
            }
            Shape::Circle => {
                let filled: Vec<_> = layer
                    .marks
                    .iter()
                    .filter_map(|m| chart.mark_fill(m).map(|f| (m, f)))
                    .collect();
                cc.draw_series(filled.iter().map(|(m, fill)| {
                    Circle::new((m.x, m.y), layer.size, rgb(*fill).mix(layer.alpha).filled())
                }))
                .map_err(render_err)?;
                cc.draw_series(layer.marks.iter().map(|m| {
                    let colour = rgb(chart.mark_colour(layer, m)).mix(layer.alpha);
                    if chart.mark_fill(m).is_some() {
                        Circle::new((m.x, m.y), layer.size, colour.stroke_width(1))
                    } else {
                        Circle::new((m.x, m.y), layer.size, colour.filled())
                    }
                }))
                .map_err(render_err)?;
            }
        }
    }

    if chart.legend != LegendPosition::None
        && let Some(scale) = chart.colour_scale.as_ref().filter(|s| s.show_legend())
    {
        let (px_x, px_y) = cc.plotting_area().get_pixel_range();
        draw_legend(root, scale, chart, (px_x.start, px_x.end), (px_y.start, px_y.end), text_px)?;
    }

    Ok(())
}

fn draw_legend(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    scale: &ColourScale,
    chart: &Chart,
    x_px: (i32, i32),
    y_px: (i32, i32),
    text_px: i32,
) -> Result<(), PlotError> {
    let entries = scale.legend_entries();
    let row_h = text_px + 6;
    let longest = entries
        .iter()
        .map(|(l, _)| l.chars().count())
        .chain(std::iter::once(scale.title().chars().count()))
        .max()
        .unwrap_or(1);
    let width = (longest as f64 * text_px as f64 * CHAR_WIDTH_RATIO) as i32 + 3 * text_px;
    let height = row_h * (entries.len() as i32 + 1) + 8;
    let pad = 6;

    let (left, top) = match chart.legend {
        LegendPosition::TopRight => (x_px.1 - width - pad, y_px.0 + pad),
        _ => (x_px.1 - width - pad, y_px.1 - height - pad),
    };

    root.draw(&Rectangle::new(
        [(left, top), (left + width, top + height)],
        rgb(chart.theme.background).mix(0.85).filled(),
    ))
    .map_err(render_err)?;
    root.draw(&Rectangle::new(
        [(left, top), (left + width, top + height)],
        rgb(GRAY50).stroke_width(1),
    ))
    .map_err(render_err)?;

    let style = (FONT_FAMILY, text_px).into_font().color(&rgb(chart.theme.axis_title));
    root.draw(&Text::new(scale.title().to_string(), (left + 6, top + 4), style.clone()))
        .map_err(render_err)?;
    for (i, (label, colour)) in entries.iter().enumerate() {
        let cy = top + 4 + row_h * (i as i32 + 1) + row_h / 2;
        root.draw(&Circle::new((left + 12, cy), 4, rgb(*colour).filled()))
            .map_err(render_err)?;
        root.draw(&Text::new(label.clone(), (left + 24, cy - text_px / 2), style.clone()))
            .map_err(render_err)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/src_inline/plot/render.rs"]
mod tests;
