use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use polars::frame::DataFrame;

/// A single dataset cell as the crosstab engine sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Missing,
}

impl Scalar {
    /// Numeric coercion: numbers pass through, text is parsed, anything else is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            Scalar::Text(s) => parse_number(s),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::Number(n) => Some(format_number(*n)),
            Scalar::Text(s) => Some(s.clone()),
            Scalar::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Missing)
    }
}

/// A category code: the stored value a category label is attached to.
#[derive(Debug, Clone)]
pub enum Code {
    Number(f64),
    Text(String),
}

impl Code {
    /// Numeric codes stay numeric; text codes that parse as numbers become numeric.
    pub fn parse(raw: &str) -> Code {
        match parse_number(raw) {
            Some(n) => Code::Number(n),
            None => Code::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Code::Number(n) => Some(*n),
            Code::Text(s) => parse_number(s),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Code::Number(_))
    }

    /// Text form of the code, used when an axis mixes numbers and text.
    pub fn to_text(&self) -> Code {
        match self {
            Code::Number(n) => Code::Text(format_number(*n)),
            Code::Text(s) => Code::Text(s.clone()),
        }
    }

    fn canonical_bits(n: f64) -> u64 {
        if n == 0.0 {
            0.0f64.to_bits()
        } else {
            n.to_bits()
        }
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Code {}

impl PartialOrd for Code {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Code {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Code::Number(a), Code::Number(b)) => {
                f64::from_bits(Code::canonical_bits(*a)).total_cmp(&f64::from_bits(Code::canonical_bits(*b)))
            }
            (Code::Number(_), Code::Text(_)) => Ordering::Less,
            (Code::Text(_), Code::Number(_)) => Ordering::Greater,
            (Code::Text(a), Code::Text(b)) => a.cmp(b),
        }
    }
}

impl Hash for Code {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Code::Number(n) => {
                0u8.hash(state);
                Code::canonical_bits(*n).hash(state);
            }
            Code::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Number(n) => f.write_str(&format_number(*n)),
            Code::Text(s) => f.write_str(s),
        }
    }
}

/// Inclusive user-missing range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissingRange {
    pub low: f64,
    pub high: f64,
}

impl MissingRange {
    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableMetadata {
    pub label: Option<String>,
    pub missing_values: Vec<Code>,
    pub missing_ranges: Vec<MissingRange>,
    /// Value labels in declared order.
    pub value_labels: Vec<(Code, String)>,
}

impl VariableMetadata {
    pub fn has_user_missing(&self) -> bool {
        !self.missing_values.is_empty() || !self.missing_ranges.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetMetadata {
    pub variables: HashMap<String, VariableMetadata>,
}

impl DatasetMetadata {
    pub fn variable(&self, name: &str) -> Option<&VariableMetadata> {
        self.variables.get(name)
    }

    /// Display label of a variable, falling back to its name.
    pub fn label_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.variables
            .get(name)
            .and_then(|meta| meta.label.as_deref())
            .unwrap_or(name)
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub frame: DataFrame,
    pub metadata: DatasetMetadata,
}

impl Dataset {
    pub fn new(frame: DataFrame, metadata: DatasetMetadata) -> Self {
        Self { frame, metadata }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.get_column_names().iter().any(|c| *c == name)
    }

    pub fn row_count(&self) -> usize {
        self.frame.height()
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Integral values print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
