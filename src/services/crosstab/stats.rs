use std::collections::BTreeMap;

use super::aggregate::ObservedCounts;
use super::types::{Statistic, StatisticSet};

/// One metric over a whole table: the category cells plus explicit margins.
/// `None` is a blank (undefined) value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricGrid {
    pub cells: Vec<Vec<Option<f64>>>,
    /// Values shown in the Total column, one per row.
    pub row_margin: Vec<Option<f64>>,
    /// Values shown in the Total row, one per column.
    pub col_margin: Vec<Option<f64>>,
    pub corner: Option<f64>,
}

impl MetricGrid {
    fn with_observed_margins(cells: Vec<Vec<Option<f64>>>, observed: &ObservedCounts) -> Self {
        Self {
            cells,
            row_margin: observed.row_totals.iter().copied().map(Some).collect(),
            col_margin: observed.col_totals.iter().copied().map(Some).collect(),
            corner: Some(observed.grand_total),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.row_margin.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_margin.len()
    }

    /// Value at (`row`, `col`) where `row == n_rows()` is the Total row and
    /// `col == n_cols()` is the Total column.
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        let total_row = row == self.n_rows();
        let total_col = col == self.n_cols();
        match (total_row, total_col) {
            (true, true) => self.corner,
            (true, false) => self.col_margin.get(col).copied().flatten(),
            (false, true) => self.row_margin.get(row).copied().flatten(),
            (false, false) => self
                .cells
                .get(row)
                .and_then(|cells| cells.get(col))
                .copied()
                .flatten(),
        }
    }
}

/// Computes every requested metric. Margins of the derived metrics repeat the
/// observed totals, except `% Total` which divides them by the grand total.
pub fn compute_metrics(
    observed: &ObservedCounts,
    requested: &StatisticSet,
) -> BTreeMap<Statistic, MetricGrid> {
    let mut metrics = BTreeMap::new();

    let core = &observed.cells;
    let row_tot = observed.core_row_sums();
    let col_tot = observed.core_col_sums();
    let grand_total = observed.core_total();

    if requested.contains(&Statistic::Observed) {
        let cells = map_cells(core, |_, _, v| Some(v));
        metrics.insert(Statistic::Observed, MetricGrid::with_observed_margins(cells, observed));
    }

    if requested.contains(&Statistic::RowPct) {
        let cells = map_cells(core, |r, _, v| ratio(v, row_tot[r]).map(|p| p * 100.0));
        metrics.insert(Statistic::RowPct, MetricGrid::with_observed_margins(cells, observed));
    }

    if requested.contains(&Statistic::ColPct) {
        let cells = map_cells(core, |_, c, v| ratio(v, col_tot[c]).map(|p| p * 100.0));
        metrics.insert(Statistic::ColPct, MetricGrid::with_observed_margins(cells, observed));
    }

    if requested.contains(&Statistic::TotalPct) {
        let pct = |v: f64| {
            if grand_total > 0.0 {
                Some(v / grand_total * 100.0)
            } else {
                Some(0.0)
            }
        };
        metrics.insert(
            Statistic::TotalPct,
            MetricGrid {
                cells: map_cells(core, |_, _, v| pct(v)),
                row_margin: observed.row_totals.iter().map(|v| pct(*v)).collect(),
                col_margin: observed.col_totals.iter().map(|v| pct(*v)).collect(),
                corner: pct(observed.grand_total),
            },
        );
    }

    if requested.iter().any(|s| s.needs_expected()) {
        let expected: Vec<Vec<f64>> = row_tot
            .iter()
            .map(|rt| {
                col_tot
                    .iter()
                    .map(|ct| if grand_total > 0.0 { rt * ct / grand_total } else { 0.0 })
                    .collect()
            })
            .collect();
        let resid = |r: usize, c: usize, v: f64| v - expected[r][c];

        if requested.contains(&Statistic::Expected) {
            let cells = map_cells(core, |r, c, _| Some(expected[r][c]));
            metrics.insert(Statistic::Expected, MetricGrid::with_observed_margins(cells, observed));
        }

        if requested.contains(&Statistic::Resid) {
            let cells = map_cells(core, |r, c, v| Some(resid(r, c, v)));
            metrics.insert(Statistic::Resid, MetricGrid::with_observed_margins(cells, observed));
        }

        if requested.contains(&Statistic::StdResid) {
            let cells = map_cells(core, |r, c, v| ratio(resid(r, c, v), expected[r][c].sqrt()));
            metrics.insert(Statistic::StdResid, MetricGrid::with_observed_margins(cells, observed));
        }

        if requested.contains(&Statistic::AdjStdResid) {
            let cells = if grand_total > 0.0 {
                map_cells(core, |r, c, v| {
                    let p_row = row_tot[r] / grand_total;
                    let p_col = col_tot[c] / grand_total;
                    let denom = (expected[r][c] * (1.0 - p_row) * (1.0 - p_col)).sqrt();
                    ratio(resid(r, c, v), denom)
                })
            } else {
                map_cells(core, |_, _, _| Some(0.0))
            };
            metrics.insert(Statistic::AdjStdResid, MetricGrid::with_observed_margins(cells, observed));
        }
    }

    metrics
}

fn map_cells(
    core: &[Vec<f64>],
    f: impl Fn(usize, usize, f64) -> Option<f64>,
) -> Vec<Vec<Option<f64>>> {
    core.iter()
        .enumerate()
        .map(|(r, row)| row.iter().enumerate().map(|(c, v)| f(r, c, *v)).collect())
        .collect()
}

/// `num / den`, blank when the denominator is zero or not a number.
fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 || den.is_nan() {
        None
    } else {
        Some(num / den).filter(|v| v.is_finite())
    }
}
