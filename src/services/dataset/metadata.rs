//! Conversion from reader-shaped metadata (the layout SPSS readers such as
//! pyreadstat emit) into typed per-variable records.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::models::{parse_number, Code, DatasetMetadata, MissingRange, VariableMetadata};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMetadata {
    #[serde(default)]
    pub column_names_to_labels: HashMap<String, Option<String>>,
    #[serde(default)]
    pub missing_user_values: HashMap<String, Vec<Value>>,
    #[serde(default)]
    pub missing_ranges: HashMap<String, Vec<RawRange>>,
    /// Variable name to labelset name.
    #[serde(default)]
    pub variable_to_label: HashMap<String, String>,
    /// Labelset name to `{code: label}`, in declared order.
    #[serde(default)]
    pub value_labels: HashMap<String, serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRange {
    pub lo: Value,
    pub hi: Value,
}

impl RawMetadata {
    pub fn into_metadata(self) -> DatasetMetadata {
        let mut variables: HashMap<String, VariableMetadata> = HashMap::new();

        for (name, label) in self.column_names_to_labels {
            if let Some(label) = label.filter(|l| !l.trim().is_empty()) {
                variables.entry(name).or_default().label = Some(label);
            }
        }

        for (name, values) in self.missing_user_values {
            let codes: Vec<Code> = values.iter().filter_map(json_code).collect();
            if !codes.is_empty() {
                variables.entry(name).or_default().missing_values = codes;
            }
        }

        for (name, ranges) in self.missing_ranges {
            let parsed: Vec<MissingRange> = ranges
                .iter()
                .filter_map(|range| {
                    match (json_number(&range.lo), json_number(&range.hi)) {
                        (Some(low), Some(high)) => Some(MissingRange { low, high }),
                        _ => {
                            tracing::warn!(
                                "Ignoring non-numeric missing range {:?}..{:?} for {}",
                                range.lo,
                                range.hi,
                                name
                            );
                            None
                        }
                    }
                })
                .collect();
            if !parsed.is_empty() {
                variables.entry(name).or_default().missing_ranges = parsed;
            }
        }

        for (name, labelset) in self.variable_to_label {
            let Some(labels) = self.value_labels.get(&labelset) else {
                tracing::debug!("Variable {} points at unknown labelset {}", name, labelset);
                continue;
            };
            let value_labels: Vec<(Code, String)> = labels
                .iter()
                .map(|(code, label)| (Code::parse(code), json_label(label)))
                .collect();
            if !value_labels.is_empty() {
                variables.entry(name).or_default().value_labels = value_labels;
            }
        }

        DatasetMetadata { variables }
    }
}

fn json_code(value: &Value) -> Option<Code> {
    match value {
        Value::Number(n) => n.as_f64().map(Code::Number),
        Value::String(s) => Some(Code::Text(s.clone())),
        Value::Bool(b) => Some(Code::Number(if *b { 1.0 } else { 0.0 })),
        _ => None,
    }
}

fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn json_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
