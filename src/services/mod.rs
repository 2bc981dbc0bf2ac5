pub mod crosstab;
pub mod dataset;
pub mod export;
pub mod session;
