//! Tests for the crosstab engine.

use polars::prelude::*;
use proptest::prelude::*;

use crosstab_services::models::{Code, Dataset, DatasetMetadata, Scalar, VariableMetadata};
use crosstab_services::services::crosstab::aggregate::aggregate;
use crosstab_services::services::crosstab::categories::resolve_categories;
use crosstab_services::services::crosstab::format::render_cells;
use crosstab_services::services::crosstab::stats::compute_metrics;
use crosstab_services::services::crosstab::{
    build_tables, CrosstabRequest, Statistic, StatisticSet, WeightRounding,
    DEFAULT_SIGNIFICANCE_THRESHOLD,
};

const PAIRS: [(f64, f64); 10] = [
    (1.0, 1.0),
    (1.0, 1.0),
    (1.0, 2.0),
    (1.0, 3.0),
    (2.0, 1.0),
    (2.0, 2.0),
    (2.0, 2.0),
    (2.0, 3.0),
    (2.0, 3.0),
    (2.0, 3.0),
];

fn survey(pairs: &[(f64, f64)], support_missing: Vec<Code>) -> Dataset {
    let gender: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let support: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let frame = DataFrame::new(vec![
        Series::new("gender", gender),
        Series::new("support", support),
        Series::new("peso", vec![1.0; pairs.len()]),
    ])
    .unwrap();

    let mut metadata = DatasetMetadata::default();
    metadata.variables.insert(
        "gender".into(),
        VariableMetadata {
            label: Some("Gender".into()),
            value_labels: vec![
                (Code::Number(1.0), "Male".into()),
                (Code::Number(2.0), "Female".into()),
            ],
            ..Default::default()
        },
    );
    metadata.variables.insert(
        "support".into(),
        VariableMetadata {
            label: Some("Support".into()),
            missing_values: support_missing,
            ..Default::default()
        },
    );
    Dataset::new(frame, metadata)
}

fn request(statistics: &[Statistic], rounding: WeightRounding) -> CrosstabRequest {
    let mut request = CrosstabRequest::new(vec!["gender".into()], vec!["support".into()], "peso");
    request.statistics = statistics.iter().copied().collect();
    request.rounding = rounding;
    request
}

fn observed_rows(dataset: &Dataset, rounding: WeightRounding) -> Vec<Vec<String>> {
    let tables = build_tables(dataset, &request(&[Statistic::Observed], rounding)).unwrap();
    let table = tables.get("[Gender × Support]").unwrap();
    (0..table.row_labels.len())
        .map(|r| {
            (0..table.column_labels.len())
                .map(|c| table.metric(r, c, Statistic::Observed).unwrap().to_string())
                .collect()
        })
        .collect()
}

#[test]
fn test_gender_by_support_observed() {
    let dataset = survey(&PAIRS, vec![]);
    let tables = build_tables(&dataset, &request(&[Statistic::Observed, Statistic::RowPct], WeightRounding::None)).unwrap();

    assert_eq!(tables.len(), 1);
    let table = tables.get("[Gender × Support]").unwrap();
    assert_eq!(table.title, "Gender × Support");
    assert_eq!(table.row_labels, vec!["Male", "Female", "Total"]);
    assert_eq!(table.column_labels, vec!["1", "2", "3", "Total"]);

    assert_eq!(
        observed_rows(&dataset, WeightRounding::None),
        vec![
            vec!["2.00", "1.00", "1.00", "4.00"],
            vec!["1.00", "2.00", "3.00", "6.00"],
            vec!["3.00", "3.00", "4.00", "10.00"],
        ]
    );

    let male_row_pct: Vec<&str> = (0..3)
        .map(|c| table.metric(0, c, Statistic::RowPct).unwrap())
        .collect();
    assert_eq!(male_row_pct, vec!["50.0%", "25.0%", "25.0%"]);

    // Observed is listed before % Row in every cell.
    assert_eq!(table.cell(0, 0).unwrap(), ["Observed: 2.00", "% Row: 50.0%"]);
}

#[test]
fn test_round_cell_keeps_integer_counts() {
    let dataset = survey(&PAIRS, vec![]);
    let rounded = observed_rows(&dataset, WeightRounding::RoundCell);
    assert_eq!(
        rounded,
        vec![
            vec!["2", "1", "1", "4"],
            vec!["1", "2", "3", "6"],
            vec!["3", "3", "4", "10"],
        ]
    );
    // Same counts as the unrounded table, only fewer decimals.
    for (a, b) in rounded.iter().flatten().zip(observed_rows(&dataset, WeightRounding::None).iter().flatten()) {
        assert_eq!(a.parse::<f64>().unwrap(), b.parse::<f64>().unwrap());
    }
}

#[test]
fn test_user_missing_code_removes_cases() {
    let mut pairs = PAIRS;
    pairs[8].1 = 9.0;
    pairs[9].1 = 9.0;
    let dataset = survey(&pairs, vec![Code::Number(9.0)]);

    let tables = build_tables(&dataset, &request(&[Statistic::Observed], WeightRounding::None)).unwrap();
    let table = tables.get("[Gender × Support]").unwrap();
    assert_eq!(table.column_labels, vec!["1", "2", "3", "Total"]);
    assert_eq!(table.metric(2, 3, Statistic::Observed), Some("8.00"));
    assert_eq!(table.metric(1, 2, Statistic::Observed), Some("1.00"));
}

#[test]
fn test_non_numeric_weights_give_empty_table() {
    let frame = DataFrame::new(vec![
        Series::new("gender", vec![1.0, 2.0, 1.0]),
        Series::new("support", vec![1.0, 1.0, 2.0]),
        Series::new("peso", vec![Some("n/a"), None, Some("x")]),
    ])
    .unwrap();
    let dataset = Dataset::new(frame, DatasetMetadata::default());
    let statistics: Vec<Statistic> = Statistic::ALL.to_vec();

    let tables = build_tables(&dataset, &request(&statistics, WeightRounding::None)).unwrap();
    let table = tables.iter().next().unwrap().1;
    assert_eq!(table.row_labels, vec!["Total"]);
    assert_eq!(table.column_labels, vec!["Total"]);
    assert_eq!(table.metric(0, 0, Statistic::Observed), Some("0.00"));
    assert_eq!(table.metric(0, 0, Statistic::TotalPct), Some("0.0%"));
    assert!(table.flags.iter().flatten().all(|f| !f));
}

#[test]
fn test_unknown_column_fails_whole_request() {
    let dataset = survey(&PAIRS, vec![]);
    let request = CrosstabRequest::new(
        vec!["gender".into()],
        vec!["support".into(), "missing_column".into()],
        "peso",
    );
    assert!(build_tables(&dataset, &request).is_err());
}

fn all_statistics() -> StatisticSet {
    Statistic::ALL.into_iter().collect()
}

fn cases() -> impl Strategy<Value = Vec<(u8, u8, f64)>> {
    prop::collection::vec((0u8..4, 0u8..3, 0.0f64..5.0), 1..60)
}

fn scalars(values: impl Iterator<Item = u8>) -> Vec<Scalar> {
    values.map(|v| Scalar::Number(f64::from(v))).collect()
}

proptest! {
    #[test]
    fn row_percentages_sum_to_one_hundred(cases in cases()) {
        let rows = scalars(cases.iter().map(|c| c.0));
        let cols = scalars(cases.iter().map(|c| c.1));
        let weights: Vec<f64> = cases.iter().map(|c| c.2).collect();
        let keep = vec![true; cases.len()];
        let row_axis = resolve_categories(&rows, None);
        let col_axis = resolve_categories(&cols, None);

        let observed = aggregate(&row_axis, &col_axis, &rows, &cols, &weights, &keep, WeightRounding::None);
        let metrics = compute_metrics(&observed, &all_statistics());
        let row_pct = &metrics[&Statistic::RowPct];

        for (r, total) in observed.core_row_sums().iter().enumerate() {
            let values: Vec<Option<f64>> = (0..observed.n_cols()).map(|c| row_pct.value(r, c)).collect();
            if *total > 0.0 {
                let sum: f64 = values.iter().flatten().sum();
                prop_assert!((sum - 100.0).abs() < 1e-6, "row {} sums to {}", r, sum);
            } else {
                prop_assert!(values.iter().all(Option::is_none));
            }
        }
    }

    #[test]
    fn expected_counts_sum_to_grand_total(cases in cases()) {
        let rows = scalars(cases.iter().map(|c| c.0));
        let cols = scalars(cases.iter().map(|c| c.1));
        let weights: Vec<f64> = cases.iter().map(|c| c.2).collect();
        let keep = vec![true; cases.len()];
        let row_axis = resolve_categories(&rows, None);
        let col_axis = resolve_categories(&cols, None);

        let observed = aggregate(&row_axis, &col_axis, &rows, &cols, &weights, &keep, WeightRounding::None);
        let metrics = compute_metrics(&observed, &all_statistics());
        let expected = &metrics[&Statistic::Expected];
        let grand_total = observed.core_total();

        let sum: f64 = expected.cells.iter().flatten().flatten().sum();
        if grand_total > 0.0 {
            prop_assert!((sum - grand_total).abs() < 1e-6 * grand_total.max(1.0));
        } else {
            prop_assert_eq!(sum, 0.0);
        }
    }

    #[test]
    fn observed_matches_manual_grouping(cases in cases(), missing in 0u8..4) {
        let rows = scalars(cases.iter().map(|c| c.0));
        let cols = scalars(cases.iter().map(|c| c.1));
        let weights: Vec<f64> = cases.iter().map(|c| c.2).collect();
        let keep: Vec<bool> = cases.iter().map(|c| c.0 != missing).collect();
        let row_axis = resolve_categories(&rows, None);
        let col_axis = resolve_categories(&cols, None);

        let observed = aggregate(&row_axis, &col_axis, &rows, &cols, &weights, &keep, WeightRounding::None);

        for (i, r_idx) in observed.rows.iter().enumerate() {
            for (j, c_idx) in observed.cols.iter().enumerate() {
                let r_code = row_axis.codes()[*r_idx].as_number().unwrap();
                let c_code = col_axis.codes()[*c_idx].as_number().unwrap();
                let manual: f64 = cases
                    .iter()
                    .filter(|c| c.0 != missing)
                    .filter(|c| f64::from(c.0) == r_code && f64::from(c.1) == c_code)
                    .map(|c| c.2)
                    .sum();
                prop_assert!((observed.cells[i][j] - manual).abs() < 1e-9);
            }
        }
        prop_assert!(observed.rows.iter().all(|r| row_axis.codes()[*r].as_number() != Some(f64::from(missing))));
    }

    #[test]
    fn flags_match_adjusted_residual_threshold(cases in cases(), with_adjusted in any::<bool>()) {
        let rows = scalars(cases.iter().map(|c| c.0));
        let cols = scalars(cases.iter().map(|c| c.1));
        let weights: Vec<f64> = cases.iter().map(|c| c.2).collect();
        let keep = vec![true; cases.len()];
        let row_axis = resolve_categories(&rows, None);
        let col_axis = resolve_categories(&cols, None);
        let mut requested = StatisticSet::new();
        requested.insert(Statistic::Observed);
        if with_adjusted {
            requested.insert(Statistic::AdjStdResid);
        }

        let observed = aggregate(&row_axis, &col_axis, &rows, &cols, &weights, &keep, WeightRounding::None);
        let metrics = compute_metrics(&observed, &requested);
        let rendered = render_cells(
            &metrics,
            observed.n_rows(),
            observed.n_cols(),
            WeightRounding::None,
            DEFAULT_SIGNIFICANCE_THRESHOLD,
        );

        for r in 0..=observed.n_rows() {
            for c in 0..=observed.n_cols() {
                let marginal = r == observed.n_rows() || c == observed.n_cols();
                let exceeds = metrics
                    .get(&Statistic::AdjStdResid)
                    .and_then(|grid| grid.value(r, c))
                    .map_or(false, |v| v.abs() > DEFAULT_SIGNIFICANCE_THRESHOLD);
                prop_assert_eq!(rendered.flags[r][c], with_adjusted && !marginal && exceeds);
            }
        }
    }
}
