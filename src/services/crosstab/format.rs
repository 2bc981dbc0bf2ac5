use std::collections::BTreeMap;

use super::stats::MetricGrid;
use super::types::{Statistic, WeightRounding};

/// Cells whose adjusted standardized residual exceeds this in absolute value are flagged.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 1.9;

pub fn format_value(statistic: Statistic, value: Option<f64>, rounding: WeightRounding) -> String {
    let Some(v) = value else {
        return String::new();
    };
    if statistic.is_percentage() {
        format!("{:.1}%", v)
    } else if statistic.is_count() {
        if rounding.is_per_cell() {
            format!("{:.0}", v)
        } else {
            format!("{:.2}", v)
        }
    } else {
        format!("{:.1}", v)
    }
}

/// Display lines and significance flags for every cell, Total row and
/// column included.
pub struct RenderedCells {
    pub data: Vec<Vec<Vec<String>>>,
    pub flags: Vec<Vec<bool>>,
}

/// `n_rows` and `n_cols` count category rows and columns; the Total row and
/// column are appended.
pub fn render_cells(
    metrics: &BTreeMap<Statistic, MetricGrid>,
    n_rows: usize,
    n_cols: usize,
    rounding: WeightRounding,
    threshold: f64,
) -> RenderedCells {
    let adjusted = metrics.get(&Statistic::AdjStdResid);
    let mut data = Vec::with_capacity(n_rows + 1);
    let mut flags = Vec::with_capacity(n_rows + 1);

    for r in 0..=n_rows {
        let mut row_cells = Vec::with_capacity(n_cols + 1);
        let mut row_flags = Vec::with_capacity(n_cols + 1);
        for c in 0..=n_cols {
            // BTreeMap iteration follows the display order of `Statistic`.
            let lines: Vec<String> = metrics
                .iter()
                .map(|(statistic, grid)| {
                    format!(
                        "{}: {}",
                        statistic.display_name(),
                        format_value(*statistic, grid.value(r, c), rounding)
                    )
                })
                .collect();

            let marginal = r == n_rows || c == n_cols;
            let flagged = !marginal
                && adjusted
                    .and_then(|grid| grid.value(r, c))
                    .map_or(false, |v| v.abs() > threshold);

            row_cells.push(lines);
            row_flags.push(flagged);
        }
        data.push(row_cells);
        flags.push(row_flags);
    }

    RenderedCells { data, flags }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cells: Vec<Vec<Option<f64>>>) -> MetricGrid {
        let n_rows = cells.len();
        let n_cols = cells.first().map_or(0, Vec::len);
        MetricGrid {
            cells,
            row_margin: vec![Some(5.0); n_rows],
            col_margin: vec![Some(5.0); n_cols],
            corner: Some(5.0),
        }
    }

    #[test]
    fn value_formats() {
        assert_eq!(format_value(Statistic::RowPct, Some(50.0), WeightRounding::None), "50.0%");
        assert_eq!(format_value(Statistic::TotalPct, Some(33.333), WeightRounding::None), "33.3%");
        assert_eq!(format_value(Statistic::Observed, Some(2.0), WeightRounding::None), "2.00");
        assert_eq!(format_value(Statistic::Observed, Some(2.0), WeightRounding::RoundCell), "2");
        assert_eq!(format_value(Statistic::Expected, Some(1.2), WeightRounding::TruncCell), "1");
        assert_eq!(format_value(Statistic::Expected, Some(1.2), WeightRounding::RoundCase), "1.20");
        assert_eq!(format_value(Statistic::StdResid, Some(0.7303), WeightRounding::None), "0.7");
        assert_eq!(format_value(Statistic::Resid, None, WeightRounding::None), "");
    }

    #[test]
    fn lines_follow_display_order_and_keep_blanks() {
        let mut metrics = BTreeMap::new();
        metrics.insert(Statistic::StdResid, grid(vec![vec![None]]));
        metrics.insert(Statistic::Observed, grid(vec![vec![Some(3.0)]]));
        let rendered = render_cells(&metrics, 1, 1, WeightRounding::None, DEFAULT_SIGNIFICANCE_THRESHOLD);
        assert_eq!(
            rendered.data[0][0],
            vec!["Observed: 3.00".to_string(), "Standardized Residual: ".to_string()]
        );
        assert_eq!(rendered.data.len(), 2);
        assert_eq!(rendered.data[1].len(), 2);
    }

    #[test]
    fn flags_only_core_cells_above_threshold() {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            Statistic::AdjStdResid,
            grid(vec![vec![Some(1.9), Some(-2.5)], vec![Some(1.91), None]]),
        );
        let rendered = render_cells(&metrics, 2, 2, WeightRounding::None, DEFAULT_SIGNIFICANCE_THRESHOLD);
        assert_eq!(
            rendered.flags,
            vec![
                vec![false, true, false],
                vec![true, false, false],
                // Margins hold 5.0 but are never flagged.
                vec![false, false, false],
            ]
        );
    }

    #[test]
    fn no_flags_without_adjusted_residuals() {
        let mut metrics = BTreeMap::new();
        metrics.insert(Statistic::StdResid, grid(vec![vec![Some(9.0)]]));
        let rendered = render_cells(&metrics, 1, 1, WeightRounding::None, DEFAULT_SIGNIFICANCE_THRESHOLD);
        assert!(rendered.flags.iter().flatten().all(|f| !f));
    }
}
