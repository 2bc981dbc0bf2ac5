use std::collections::BTreeSet;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A requested cell statistic. Variant order is the display order inside a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Observed,
    Expected,
    RowPct,
    ColPct,
    TotalPct,
    Resid,
    StdResid,
    AdjStdResid,
}

impl Statistic {
    pub const ALL: [Statistic; 8] = [
        Statistic::Observed,
        Statistic::Expected,
        Statistic::RowPct,
        Statistic::ColPct,
        Statistic::TotalPct,
        Statistic::Resid,
        Statistic::StdResid,
        Statistic::AdjStdResid,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Statistic::Observed => "Observed",
            Statistic::Expected => "Expected",
            Statistic::RowPct => "% Row",
            Statistic::ColPct => "% Column",
            Statistic::TotalPct => "% Total",
            Statistic::Resid => "Residual",
            Statistic::StdResid => "Standardized Residual",
            Statistic::AdjStdResid => "Adjusted Standardized Residual",
        }
    }

    pub fn is_percentage(self) -> bool {
        matches!(self, Statistic::RowPct | Statistic::ColPct | Statistic::TotalPct)
    }

    pub fn is_count(self) -> bool {
        matches!(self, Statistic::Observed | Statistic::Expected)
    }

    /// Statistics that need the expected-count matrix.
    pub fn needs_expected(self) -> bool {
        matches!(
            self,
            Statistic::Expected | Statistic::Resid | Statistic::StdResid | Statistic::AdjStdResid
        )
    }
}

/// Requested statistics; ordered and free of duplicates.
pub type StatisticSet = BTreeSet<Statistic>;

/// Non-integer weight handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightRounding {
    #[default]
    None,
    RoundCase,
    TruncCase,
    RoundCell,
    TruncCell,
}

impl WeightRounding {
    pub fn is_per_cell(self) -> bool {
        matches!(self, WeightRounding::RoundCell | WeightRounding::TruncCell)
    }

    /// Applied to each case weight before aggregation.
    pub fn case_weight(self, weight: f64) -> f64 {
        match self {
            WeightRounding::RoundCase => weight.round_ties_even(),
            WeightRounding::TruncCase => weight.floor(),
            _ => weight,
        }
    }

    /// Applied to each aggregated sum.
    pub fn cell_value(self, value: f64) -> f64 {
        match self {
            WeightRounding::RoundCell => value.round_ties_even(),
            WeightRounding::TruncCell => value.floor(),
            _ => value,
        }
    }
}

/// One rendered crosstab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosstabTable {
    pub title: String,
    /// Row labels, `Total` last.
    #[serde(rename = "index")]
    pub row_labels: Vec<String>,
    /// Column labels, `Total` last.
    #[serde(rename = "columns")]
    pub column_labels: Vec<String>,
    /// Display lines per cell.
    pub data: Vec<Vec<Vec<String>>>,
    #[serde(rename = "flagMask")]
    pub flags: Vec<Vec<bool>>,
}

impl CrosstabTable {
    /// Display lines of the cell at (`row`, `col`), `None` outside the table.
    pub fn cell(&self, row: usize, col: usize) -> Option<&[String]> {
        self.data.get(row)?.get(col).map(Vec::as_slice)
    }

    /// Looks up a display line by metric in the cell at (`row`, `col`) and
    /// returns the formatted value.
    pub fn metric(&self, row: usize, col: usize, statistic: Statistic) -> Option<&str> {
        let prefix = statistic.display_name();
        self.cell(row, col)?.iter().find_map(|line| {
            line.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(": "))
        })
    }
}

/// Tables keyed by `"[RowLabel × ColLabel]"`, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: Vec<(String, CrosstabTable)>,
}

impl TableSet {
    pub fn new(tables: Vec<(String, CrosstabTable)>) -> Self {
        Self { tables }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&CrosstabTable> {
        self.tables
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, table)| table)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CrosstabTable)> {
        self.tables.iter().map(|(k, t)| (k.as_str(), t))
    }
}

impl Serialize for TableSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for (key, table) in &self.tables {
            map.serialize_entry(key, table)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_parse_from_option_identifiers() {
        let parsed: Vec<Statistic> =
            serde_json::from_str(r#"["adj_std_resid","observed","row_pct","observed"]"#).unwrap();
        let set: StatisticSet = parsed.into_iter().collect();
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec![Statistic::Observed, Statistic::RowPct, Statistic::AdjStdResid]
        );
    }

    #[test]
    fn unknown_statistic_is_rejected() {
        assert!(serde_json::from_str::<Statistic>(r#""chi_square""#).is_err());
    }

    #[test]
    fn rounding_modes() {
        assert_eq!(WeightRounding::RoundCase.case_weight(2.5), 2.0);
        assert_eq!(WeightRounding::RoundCase.case_weight(3.5), 4.0);
        assert_eq!(WeightRounding::TruncCase.case_weight(1.9), 1.0);
        assert_eq!(WeightRounding::RoundCell.case_weight(1.9), 1.9);
        assert_eq!(WeightRounding::RoundCell.cell_value(1.6), 2.0);
        assert_eq!(WeightRounding::TruncCell.cell_value(1.6), 1.0);
        assert_eq!(WeightRounding::None.cell_value(1.6), 1.6);
        assert!(WeightRounding::TruncCell.is_per_cell());
        assert!(!WeightRounding::RoundCase.is_per_cell());
        let mode: WeightRounding = serde_json::from_str(r#""round_cell""#).unwrap();
        assert_eq!(mode, WeightRounding::RoundCell);
    }

    #[test]
    fn table_set_serializes_as_ordered_object() {
        let table = CrosstabTable {
            title: "A × B".into(),
            row_labels: vec!["Total".into()],
            column_labels: vec!["Total".into()],
            data: vec![vec![vec!["Observed: 0.00".into()]]],
            flags: vec![vec![false]],
        };
        let set = TableSet::new(vec![
            ("[Z × B]".into(), table.clone()),
            ("[A × B]".into(), table),
        ]);
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.find("[Z × B]").unwrap() < json.find("[A × B]").unwrap());
        assert!(json.contains("\"flagMask\":[[false]]"));
        assert!(json.contains("\"index\":[\"Total\"]"));
    }

    #[test]
    fn cell_lookups_outside_the_table_are_none() {
        let table = CrosstabTable {
            title: "A × B".into(),
            row_labels: vec!["Total".into()],
            column_labels: vec!["Total".into()],
            data: vec![vec![vec!["Observed: 4.00".into(), "% Row: 4.0%".into()]]],
            flags: vec![vec![false]],
        };
        assert_eq!(table.metric(0, 0, Statistic::RowPct), Some("4.0%"));
        assert_eq!(table.metric(0, 0, Statistic::Expected), None);
        assert!(table.cell(1, 0).is_none());
        assert!(table.cell(0, 1).is_none());
        assert_eq!(table.metric(3, 3, Statistic::Observed), None);
    }
}
