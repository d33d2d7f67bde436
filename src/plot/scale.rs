use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const BLACK: Rgb = Rgb(0, 0, 0);
pub const WHITE: Rgb = Rgb(255, 255, 255);
pub const GRAY20: Rgb = Rgb(51, 51, 51);
pub const GRAY30: Rgb = Rgb(77, 77, 77);
pub const GRAY35: Rgb = Rgb(89, 89, 89);
pub const GRAY50: Rgb = Rgb(127, 127, 127);
pub const GRAY92: Rgb = Rgb(235, 235, 235);
pub const ALICEBLUE: Rgb = Rgb(240, 248, 255);
pub const WHEAT: Rgb = Rgb(245, 222, 179);

/// Value mapped through a colour or fill scale.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleValue {
    Level(String),
    Value(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColourScale {
    Discrete {
        title: String,
        levels: Vec<String>,
        colours: Vec<Rgb>,
        show_legend: bool,
    },
    Continuous {
        title: String,
        min: f64,
        max: f64,
        show_legend: bool,
    },
}

const CONTINUOUS_BREAKS: usize = 5;

impl ColourScale {
    /// Sorted distinct levels coloured from the Tableau 10 palette.
    pub fn discrete(title: &str, values: &[String]) -> Self {
        let levels: Vec<String> = values
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let colours = (0..levels.len()).map(palette_colour).collect();
        ColourScale::Discrete {
            title: title.to_string(),
            levels,
            colours,
            show_legend: true,
        }
    }

    pub fn manual(title: &str, pairs: &[(&str, Rgb)], show_legend: bool) -> Self {
        ColourScale::Discrete {
            title: title.to_string(),
            levels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
            colours: pairs.iter().map(|(_, c)| *c).collect(),
            show_legend,
        }
    }

    /// Viridis over the finite range of `values`.
    pub fn continuous(title: &str, values: &[f64]) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.iter().filter(|v| v.is_finite()) {
            min = min.min(*v);
            max = max.max(*v);
        }
        if !min.is_finite() {
            min = 0.0;
            max = 0.0;
        }
        ColourScale::Continuous {
            title: title.to_string(),
            min,
            max,
            show_legend: true,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ColourScale::Discrete { title, .. } | ColourScale::Continuous { title, .. } => title,
        }
    }

    pub fn show_legend(&self) -> bool {
        match self {
            ColourScale::Discrete { show_legend, .. }
            | ColourScale::Continuous { show_legend, .. } => *show_legend,
        }
    }

    pub fn colour(&self, value: &ScaleValue) -> Rgb {
        match (self, value) {
            (ColourScale::Discrete { levels, colours, .. }, ScaleValue::Level(l)) => levels
                .iter()
                .position(|x| x == l)
                .map(|i| colours[i])
                .unwrap_or(GRAY50),
            (ColourScale::Continuous { min, max, .. }, ScaleValue::Value(v)) => {
                viridis(*v, *min, *max)
            }
            _ => GRAY50,
        }
    }

    pub fn legend_entries(&self) -> Vec<(String, Rgb)> {
        match self {
            ColourScale::Discrete {
                levels, colours, ..
            } => levels.iter().cloned().zip(colours.iter().copied()).collect(),
            ColourScale::Continuous { min, max, .. } => {
                if max <= min {
                    return vec![(format_break(*min), viridis(*min, *min, *max))];
                }
                (0..CONTINUOUS_BREAKS)
                    .rev()
                    .map(|i| {
                        let v = min + (max - min) * i as f64 / (CONTINUOUS_BREAKS - 1) as f64;
                        (format_break(v), viridis(v, *min, *max))
                    })
                    .collect()
            }
        }
    }
}

pub fn palette_colour(i: usize) -> Rgb {
    let c = colorous::TABLEAU10[i % colorous::TABLEAU10.len()];
    Rgb(c.r, c.g, c.b)
}

fn viridis(v: f64, min: f64, max: f64) -> Rgb {
    if !v.is_finite() {
        return GRAY50;
    }
    let span = (max - min).abs().max(1e-12);
    let t = ((v - min) / span).clamp(0.0, 1.0);
    let c = colorous::VIRIDIS.eval_continuous(t);
    Rgb(c.r, c.g, c.b)
}

fn format_break(v: f64) -> String {
    if v.abs() >= 1000.0 || v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/plot/scale.rs"]
mod tests;
