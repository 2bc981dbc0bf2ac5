use std::collections::HashSet;
use std::io::Cursor;

use bytes::Bytes;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use polars::prelude::*;

use super::reader::DatasetReader;
use crate::error::AppError;
use crate::models::{Dataset, DatasetMetadata};

/// Reads the first worksheet of an `.xlsx` upload. The header row names the
/// columns; worksheets carry no value labels or user-missing declarations.
pub struct WorkbookReader;

impl DatasetReader for WorkbookReader {
    fn read(&self, bytes: Bytes) -> Result<Dataset, AppError> {
        let start = std::time::Instant::now();
        let cursor = Cursor::new(bytes);

        let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor).map_err(|e| {
            tracing::error!("Failed to open Excel file: {}", e);
            AppError::FileProcessingError(format!("Failed to open Excel file: {}", e))
        })?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| AppError::FileProcessingError("No sheets found in workbook".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| AppError::FileProcessingError(format!("Failed to read worksheet {}: {}", sheet_name, e)))?;
        let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();

        if rows.is_empty() {
            return Err(AppError::FileProcessingError(format!("Sheet {} is empty", sheet_name)));
        }

        let mut existing_names = HashSet::new();
        let headers: Vec<String> = rows[0]
            .iter()
            .map(|cell| clean_column_name(&cell.to_string(), &mut existing_names))
            .collect();

        let frame = create_dataframe(&rows, &headers)?;
        tracing::info!(
            "Worksheet {} read: {} rows x {} columns in {:?}",
            sheet_name,
            frame.height(),
            frame.width(),
            start.elapsed()
        );

        Ok(Dataset::new(frame, DatasetMetadata::default()))
    }
}

fn create_dataframe(rows: &[Vec<Data>], headers: &[String]) -> Result<DataFrame, AppError> {
    if headers.is_empty() {
        return Err(AppError::FileProcessingError("Header row is empty".to_string()));
    }

    let mut columns = Vec::with_capacity(headers.len());

    for (col_idx, header) in headers.iter().enumerate() {
        let values: Vec<Data> = rows
            .iter()
            .skip(1) // Skip header row
            .map(|row| row.get(col_idx).cloned().unwrap_or(Data::Empty))
            .collect();

        let series = if is_numeric_column(&values) {
            let nums: Vec<Option<f64>> = values
                .iter()
                .map(|v| match v {
                    Data::Float(f) => Some(*f),
                    Data::Int(i) => Some(*i as f64),
                    Data::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                    _ => None,
                })
                .collect();
            Series::new(header, nums)
        } else {
            let strings: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    Data::Empty | Data::Error(_) => None,
                    other => Some(other.to_string()),
                })
                .collect();
            Series::new(header, strings)
        };

        columns.push(series);
    }

    Ok(DataFrame::new(columns)?)
}

/// A column is numeric when every non-empty cell holds a number.
fn is_numeric_column(values: &[Data]) -> bool {
    values
        .iter()
        .filter(|v| !matches!(v, Data::Empty | Data::Error(_)))
        .all(|v| matches!(v, Data::Float(_) | Data::Int(_) | Data::Bool(_)))
}

pub fn clean_column_name(name: &str, existing_names: &mut HashSet<String>) -> String {
    let base_name = name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_lowercase();

    let mut cleaned = if base_name.chars().next().map_or(true, |c| !c.is_alphabetic()) {
        format!("col_{}", base_name)
    } else {
        base_name
    };

    // If the name already exists, add a numeric suffix
    let mut counter = 1;
    let original_name = cleaned.clone();
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}_{}", original_name, counter);
        counter += 1;
    }

    cleaned
}
