use crate::sce::SceError;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Logical(Vec<bool>),
    Categorical(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Logical(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ColumnData::Numeric(_) => "numeric",
            ColumnData::Logical(_) => "logical",
            ColumnData::Categorical(_) => "categorical",
        }
    }

    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_logical(&self) -> Option<&[bool]> {
        match self {
            ColumnData::Logical(v) => Some(v),
            _ => None,
        }
    }

    /// Text form of one entry, as written to TSV reports.
    pub fn display_at(&self, i: usize) -> String {
        match self {
            ColumnData::Numeric(v) => fmt_num(v[i]),
            ColumnData::Logical(v) => {
                if v[i] {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
            ColumnData::Categorical(v) => v[i].clone(),
        }
    }

    /// Level labels for discrete use; numeric columns are not discrete.
    pub fn labels(&self) -> Option<Vec<String>> {
        match self {
            ColumnData::Numeric(_) => None,
            ColumnData::Logical(v) => Some(
                v.iter()
                    .map(|b| if *b { "TRUE" } else { "FALSE" }.to_string())
                    .collect(),
            ),
            ColumnData::Categorical(v) => Some(v.clone()),
        }
    }

    /// Parses raw text values: numeric when every non-empty value is a
    /// number, otherwise categorical. Empty numeric entries become NaN.
    pub fn infer(raw: Vec<String>) -> Self {
        let mut parsed = Vec::with_capacity(raw.len());
        for value in &raw {
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed == "NA" {
                parsed.push(f64::NAN);
                continue;
            }
            match trimmed.parse::<f64>() {
                Ok(v) => parsed.push(v),
                Err(_) => return ColumnData::Categorical(raw),
            }
        }
        if parsed.iter().all(|v| v.is_nan()) {
            return ColumnData::Categorical(raw);
        }
        ColumnData::Numeric(parsed)
    }
}

pub fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return "NA".to_string();
    }
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{:.6}", v)
    }
}

/// Ordered, equal-length named columns (per-cell or per-feature metadata).
#[derive(Debug, Clone, PartialEq)]
pub struct Annotations {
    n: usize,
    columns: Vec<(String, ColumnData)>,
}

impl Annotations {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Inserts a column, replacing one of the same name in place.
    pub fn insert(&mut self, name: &str, data: ColumnData) -> Result<(), SceError> {
        if data.len() != self.n {
            return Err(SceError::ColumnLength {
                name: name.to_string(),
                expected: self.n,
                found: data.len(),
            });
        }
        if let Some(slot) = self.columns.iter_mut().find(|(n, _)| n == name) {
            slot.1 = data;
        } else {
            self.columns.push((name.to_string(), data));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnData)> {
        self.columns.iter().map(|(n, d)| (n.as_str(), d))
    }
}
