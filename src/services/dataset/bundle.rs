use std::collections::HashSet;

use bytes::Bytes;
use polars::prelude::*;
use serde::Deserialize;
use serde_json::Value;

use super::metadata::RawMetadata;
use super::reader::DatasetReader;
use crate::error::AppError;
use crate::models::{format_number, Dataset};

/// A dataset exported by an SPSS reader: columns in file order plus the
/// reader's metadata.
#[derive(Debug, Deserialize)]
pub struct DatasetBundle {
    pub columns: Vec<BundleColumn>,
    #[serde(default)]
    pub metadata: RawMetadata,
}

#[derive(Debug, Deserialize)]
pub struct BundleColumn {
    pub name: String,
    pub values: Vec<Value>,
}

pub struct BundleReader;

impl DatasetReader for BundleReader {
    fn read(&self, bytes: Bytes) -> Result<Dataset, AppError> {
        let bundle: DatasetBundle = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::FileProcessingError(format!("Failed to read dataset bundle: {}", e)))?;
        bundle.into_dataset()
    }
}

impl DatasetBundle {
    pub fn into_dataset(self) -> Result<Dataset, AppError> {
        if self.columns.is_empty() {
            return Err(AppError::FileProcessingError("Dataset has no columns".to_string()));
        }

        let height = self.columns[0].values.len();
        let mut seen = HashSet::new();
        let mut series = Vec::with_capacity(self.columns.len());

        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(AppError::FileProcessingError(format!(
                    "Duplicate column name: {}",
                    column.name
                )));
            }
            if column.values.len() != height {
                return Err(AppError::FileProcessingError(format!(
                    "Column {} has {} values, expected {}",
                    column.name,
                    column.values.len(),
                    height
                )));
            }
            series.push(column_series(&column.name, &column.values));
        }

        let frame = DataFrame::new(series)?;
        tracing::info!(
            "Dataset bundle parsed: {} rows x {} columns",
            frame.height(),
            frame.width()
        );

        Ok(Dataset::new(frame, self.metadata.into_metadata()))
    }
}

fn column_series(name: &str, values: &[Value]) -> Series {
    let all_numeric = values
        .iter()
        .all(|v| matches!(v, Value::Number(_) | Value::Null | Value::Bool(_)));

    if all_numeric {
        let numbers: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                _ => None,
            })
            .collect();
        Series::new(name, numbers)
    } else {
        let strings: Vec<Option<String>> = values
            .iter()
            .map(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => n.as_f64().map(format_number),
                other => Some(other.to_string()),
            })
            .collect();
        Series::new(name, strings)
    }
}
