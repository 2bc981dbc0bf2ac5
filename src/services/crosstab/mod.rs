//! Weighted two-way crosstabulation with cell statistics.
//!
//! A table is built per (row variable, column variable) pair by filtering
//! user-missing cases, resolving both category axes, summing case weights,
//! deriving the requested statistics and rendering each cell.

pub mod aggregate;
pub mod assembler;
pub mod categories;
pub mod format;
pub mod missing;
pub mod stats;
pub mod types;

pub use assembler::{build_tables, CrosstabRequest, TOTAL_LABEL};
pub use format::DEFAULT_SIGNIFICANCE_THRESHOLD;
pub use types::{CrosstabTable, Statistic, StatisticSet, TableSet, WeightRounding};
