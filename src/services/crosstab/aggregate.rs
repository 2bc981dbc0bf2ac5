use super::categories::CategoryAxis;
use super::types::WeightRounding;
use crate::models::Scalar;

/// Weighted observed counts over the categories that occur in the data.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedCounts {
    /// Row-axis positions present in the table, in axis order.
    pub rows: Vec<usize>,
    /// Column-axis positions present in the table, in axis order.
    pub cols: Vec<usize>,
    pub cells: Vec<Vec<f64>>,
    pub row_totals: Vec<f64>,
    pub col_totals: Vec<f64>,
    pub grand_total: f64,
}

impl ObservedCounts {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    /// Row sums of the cells (differs from `row_totals` only under per-cell rounding).
    pub fn core_row_sums(&self) -> Vec<f64> {
        self.cells.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn core_col_sums(&self) -> Vec<f64> {
        (0..self.n_cols())
            .map(|c| self.cells.iter().map(|row| row[c]).sum())
            .collect()
    }

    pub fn core_total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }
}

/// Sums case weights per (row category, column category). Rows outside
/// `keep`, and rows whose value falls on neither axis, contribute nothing.
pub fn aggregate(
    row_axis: &CategoryAxis,
    col_axis: &CategoryAxis,
    row_values: &[Scalar],
    col_values: &[Scalar],
    weights: &[f64],
    keep: &[bool],
    rounding: WeightRounding,
) -> ObservedCounts {
    let mut sums = vec![vec![0.0f64; col_axis.len()]; row_axis.len()];
    let mut row_seen = vec![false; row_axis.len()];
    let mut col_seen = vec![false; col_axis.len()];

    let cases = row_values
        .iter()
        .zip(col_values)
        .zip(weights)
        .zip(keep);
    for (((row_value, col_value), weight), keep) in cases {
        if !*keep {
            continue;
        }
        let (Some(r), Some(c)) = (row_axis.position(row_value), col_axis.position(col_value)) else {
            continue;
        };
        sums[r][c] += rounding.case_weight(*weight);
        row_seen[r] = true;
        col_seen[c] = true;
    }

    let rows: Vec<usize> = (0..row_axis.len()).filter(|r| row_seen[*r]).collect();
    let cols: Vec<usize> = (0..col_axis.len()).filter(|c| col_seen[*c]).collect();

    let raw: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| cols.iter().map(|c| sums[*r][*c]).collect())
        .collect();
    let raw_row_totals: Vec<f64> = raw.iter().map(|row| row.iter().sum()).collect();
    let raw_col_totals: Vec<f64> = (0..cols.len())
        .map(|c| raw.iter().map(|row| row[c]).sum())
        .collect();
    let raw_grand: f64 = raw_row_totals.iter().sum();

    // Per-cell rounding applies to every aggregated sum, margins included.
    let cells = raw
        .into_iter()
        .map(|row| row.into_iter().map(|v| rounding.cell_value(v)).collect())
        .collect();

    ObservedCounts {
        rows,
        cols,
        cells,
        row_totals: raw_row_totals.into_iter().map(|v| rounding.cell_value(v)).collect(),
        col_totals: raw_col_totals.into_iter().map(|v| rounding.cell_value(v)).collect(),
        grand_total: rounding.cell_value(raw_grand),
    }
}
