use std::collections::HashSet;

use polars::prelude::*;
use rayon::prelude::*;

use super::aggregate::aggregate;
use super::categories::resolve_categories;
use super::format::{render_cells, DEFAULT_SIGNIFICANCE_THRESHOLD};
use super::missing::user_missing_mask;
use super::stats::compute_metrics;
use super::types::{CrosstabTable, StatisticSet, TableSet, WeightRounding};
use crate::error::AppError;
use crate::models::{Dataset, DatasetMetadata, Scalar};
use crate::services::dataset::columns::{column_numbers, column_scalars};

pub const TOTAL_LABEL: &str = "Total";

#[derive(Debug, Clone)]
pub struct CrosstabRequest {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    pub weight: String,
    pub statistics: StatisticSet,
    pub rounding: WeightRounding,
    pub significance_threshold: f64,
}

impl CrosstabRequest {
    pub fn new(rows: Vec<String>, cols: Vec<String>, weight: impl Into<String>) -> Self {
        Self {
            rows,
            cols,
            weight: weight.into(),
            statistics: StatisticSet::new(),
            rounding: WeightRounding::None,
            significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
        }
    }
}

/// Case data shared by every pair of a request: the needed columns, minus
/// cases without a numeric weight, and the aligned weights.
struct WorkingFrame {
    frame: DataFrame,
    weights: Vec<f64>,
}

/// Builds one table per (row variable, column variable) pair, in request order.
/// Any failing pair fails the whole request.
pub fn build_tables(dataset: &Dataset, request: &CrosstabRequest) -> Result<TableSet, AppError> {
    let start = std::time::Instant::now();

    let rows = dedup(&request.rows);
    let cols = dedup(&request.cols);
    if rows.is_empty() || cols.is_empty() {
        return Err(AppError::InvalidInput(
            "Select at least one row variable and one column variable".to_string(),
        ));
    }
    for name in rows.iter().chain(cols.iter()).chain(std::iter::once(&request.weight.as_str())) {
        if !dataset.has_column(name) {
            return Err(AppError::InvalidInput(format!("Unknown variable: {}", name)));
        }
    }

    let working = working_frame(dataset, &rows, &cols, &request.weight)?;
    tracing::info!(
        "Building {} table(s) over {} weighted cases (of {})",
        rows.len() * cols.len(),
        working.frame.height(),
        dataset.row_count()
    );

    let pairs: Vec<(&str, &str)> = rows
        .iter()
        .flat_map(|r| cols.iter().map(move |c| (*r, *c)))
        .collect();

    let built: Vec<(String, CrosstabTable)> = pairs
        .par_iter()
        .map(|(row_var, col_var)| {
            let title = pair_title(&dataset.metadata, row_var, col_var);
            build_table(&working, &dataset.metadata, row_var, col_var, request, title.clone())
                .map(|table| (format!("[{}]", title), table))
                .map_err(|e| AppError::computation(format!("{} × {}", row_var, col_var), e))
        })
        .collect::<Result<_, _>>()?;

    let tables = unique_keys(built, &pairs);
    tracing::info!("Built {} table(s) in {:?}", tables.len(), start.elapsed());
    Ok(TableSet::new(tables))
}

fn working_frame(
    dataset: &Dataset,
    rows: &[&str],
    cols: &[&str],
    weight: &str,
) -> Result<WorkingFrame, AppError> {
    let needed = dedup_strs(rows.iter().chain(cols.iter()).copied().chain(std::iter::once(weight)));
    let selected = dataset
        .frame
        .clone()
        .lazy()
        .select(needed.iter().map(|name| col(name)).collect::<Vec<_>>())
        .collect()?;

    // Non-numeric or missing weights drop the case.
    let raw_weights = column_numbers(&selected, weight)?;
    let present: Vec<bool> = raw_weights.iter().map(Option::is_some).collect();
    let dropped = present.iter().filter(|p| !**p).count();
    if dropped > 0 {
        tracing::debug!("Dropping {} case(s) without a numeric weight in {}", dropped, weight);
    }

    let mask = BooleanChunked::from_slice("weight_present", &present);
    let frame = selected.filter(&mask)?;
    let weights = raw_weights.into_iter().flatten().collect();

    Ok(WorkingFrame { frame, weights })
}

fn build_table(
    working: &WorkingFrame,
    metadata: &DatasetMetadata,
    row_var: &str,
    col_var: &str,
    request: &CrosstabRequest,
    title: String,
) -> Result<CrosstabTable, AppError> {
    let row_values = column_scalars(&working.frame, row_var)?;
    let col_values = column_scalars(&working.frame, col_var)?;
    if row_values.len() != working.weights.len() || col_values.len() != working.weights.len() {
        return Err(AppError::Internal(format!(
            "column lengths {}/{} do not match {} weights",
            row_values.len(),
            col_values.len(),
            working.weights.len()
        )));
    }

    let keep = user_missing_mask(
        metadata,
        working.weights.len(),
        &[(row_var, &row_values[..]), (col_var, &col_values[..])],
    );

    // Axes are resolved from the cases that survive the user-missing filter.
    let row_axis = resolve_categories(&kept(&row_values, &keep), metadata.variable(row_var));
    let col_axis = resolve_categories(&kept(&col_values, &keep), metadata.variable(col_var));

    let observed = aggregate(
        &row_axis,
        &col_axis,
        &row_values,
        &col_values,
        &working.weights,
        &keep,
        request.rounding,
    );
    let metrics = compute_metrics(&observed, &request.statistics);
    let rendered = render_cells(
        &metrics,
        observed.n_rows(),
        observed.n_cols(),
        request.rounding,
        request.significance_threshold,
    );

    let row_labels = observed
        .rows
        .iter()
        .map(|idx| row_axis.label(*idx))
        .chain(std::iter::once(TOTAL_LABEL.to_string()))
        .collect();
    let column_labels = observed
        .cols
        .iter()
        .map(|idx| col_axis.label(*idx))
        .chain(std::iter::once(TOTAL_LABEL.to_string()))
        .collect();

    tracing::debug!(
        "{}: {}x{} categories, grand total {}",
        title,
        observed.n_rows(),
        observed.n_cols(),
        observed.grand_total
    );

    Ok(CrosstabTable {
        title,
        row_labels,
        column_labels,
        data: rendered.data,
        flags: rendered.flags,
    })
}

fn kept(values: &[Scalar], keep: &[bool]) -> Vec<Scalar> {
    values
        .iter()
        .zip(keep)
        .filter(|(_, keep)| **keep)
        .map(|(value, _)| value.clone())
        .collect()
}

pub fn pair_title(metadata: &DatasetMetadata, row_var: &str, col_var: &str) -> String {
    format!("{} × {}", metadata.label_for(row_var), metadata.label_for(col_var))
}

fn dedup(names: &[String]) -> Vec<&str> {
    dedup_strs(names.iter().map(String::as_str))
}

fn dedup_strs<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    names.filter(|name| seen.insert(*name)).collect()
}

/// Two variables can share a display label; such keys get the variable names appended.
fn unique_keys(
    built: Vec<(String, CrosstabTable)>,
    pairs: &[(&str, &str)],
) -> Vec<(String, CrosstabTable)> {
    let mut seen = HashSet::new();
    built
        .into_iter()
        .zip(pairs)
        .map(|((key, table), (row_var, col_var))| {
            let key = if seen.contains(&key) {
                format!("{} ({} × {})", key, row_var, col_var)
            } else {
                key
            };
            seen.insert(key.clone());
            (key, table)
        })
        .collect()
}
