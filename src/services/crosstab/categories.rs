use std::collections::{HashMap, HashSet};

use crate::models::{Code, Scalar, VariableMetadata};

/// Ordered categories of one table axis.
#[derive(Debug, Clone, Default)]
pub struct CategoryAxis {
    codes: Vec<Code>,
    labels: HashMap<Code, String>,
    positions: HashMap<Code, usize>,
    numeric: bool,
}

impl CategoryAxis {
    fn new(codes: Vec<Code>, labels: HashMap<Code, String>, numeric: bool) -> Self {
        let positions = codes
            .iter()
            .enumerate()
            .map(|(idx, code)| (code.clone(), idx))
            .collect();
        Self {
            codes,
            labels,
            positions,
            numeric,
        }
    }

    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Every code is a number and cells are matched after numeric coercion.
    pub fn is_numeric(&self) -> bool {
        self.numeric
    }

    /// Position of a cell value on this axis; `None` for missing or undeclared values.
    pub fn position(&self, value: &Scalar) -> Option<usize> {
        let code = if self.numeric {
            Code::Number(value.as_number()?)
        } else {
            Code::Text(value.as_text()?)
        };
        self.positions.get(&code).copied()
    }

    pub fn label(&self, idx: usize) -> String {
        let code = &self.codes[idx];
        self.labels
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }
}

/// Builds the category axis of a variable from its value labels when it has
/// any, otherwise from the distinct observed values.
pub fn resolve_categories(values: &[Scalar], metadata: Option<&VariableMetadata>) -> CategoryAxis {
    match metadata.filter(|m| !m.value_labels.is_empty()) {
        Some(meta) => labeled_axis(&meta.value_labels),
        None => observed_axis(values),
    }
}

fn labeled_axis(value_labels: &[(Code, String)]) -> CategoryAxis {
    let numbers: Option<Vec<f64>> = value_labels.iter().map(|(code, _)| code.as_number()).collect();

    let (codes, labels): (Vec<Code>, Vec<String>) = match numbers {
        Some(numbers) => {
            let mut pairs: Vec<(f64, &String)> = numbers
                .into_iter()
                .zip(value_labels.iter().map(|(_, label)| label))
                .collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            pairs
                .into_iter()
                .map(|(n, label)| (Code::Number(n), label.clone()))
                .unzip()
        }
        // Declared order when any code is not a number.
        None => value_labels
            .iter()
            .map(|(code, label)| (code.to_text(), label.clone()))
            .unzip(),
    };

    let numeric = codes.iter().all(Code::is_numeric);
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(codes.len());
    let mut label_map = HashMap::new();
    for (code, label) in codes.into_iter().zip(labels) {
        if seen.insert(code.clone()) {
            label_map.insert(code.clone(), label);
            unique.push(code);
        }
    }

    CategoryAxis::new(unique, label_map, numeric)
}

fn observed_axis(values: &[Scalar]) -> CategoryAxis {
    let mut seen = HashSet::new();
    let mut distinct: Vec<Code> = Vec::new();
    for value in values {
        let code = match value {
            Scalar::Number(n) if n.is_finite() => Code::Number(*n),
            Scalar::Text(s) => Code::Text(s.clone()),
            _ => continue,
        };
        if seen.insert(code.clone()) {
            distinct.push(code);
        }
    }

    let numeric = distinct.iter().all(Code::is_numeric);
    if !numeric {
        // A single text representation for every code.
        let mut text_seen = HashSet::new();
        distinct = distinct
            .into_iter()
            .map(|code| code.to_text())
            .filter(|code| text_seen.insert(code.clone()))
            .collect();
    }

    let numbers: Option<Vec<f64>> = distinct.iter().map(Code::as_number).collect();
    match numbers {
        Some(numbers) => {
            let mut keyed: Vec<(f64, Code)> = numbers.into_iter().zip(distinct).collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            distinct = keyed.into_iter().map(|(_, code)| code).collect();
        }
        None => distinct.sort_by_key(|code| code.to_string()),
    }

    CategoryAxis::new(distinct, HashMap::new(), numeric)
}
