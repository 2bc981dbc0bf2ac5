use polars::prelude::*;

use crate::error::AppError;
use crate::models::Scalar;

/// Reads a column as engine scalars. Numeric and boolean columns become numbers,
/// everything else is read through its string form. Nulls and NaN are missing.
pub fn column_scalars(frame: &DataFrame, name: &str) -> Result<Vec<Scalar>, AppError> {
    let series = frame.column(name)?;
    let dtype = series.dtype();

    if dtype.is_numeric() || matches!(dtype, DataType::Boolean) {
        let numbers = series.cast(&DataType::Float64)?;
        let values = numbers
            .f64()?
            .into_iter()
            .map(|value| match value {
                Some(n) if !n.is_nan() => Scalar::Number(n),
                _ => Scalar::Missing,
            })
            .collect();
        return Ok(values);
    }

    let strings = match dtype {
        DataType::String => series.clone(),
        _ => series.cast(&DataType::String)?,
    };
    let values = strings
        .str()?
        .into_iter()
        .map(|value| match value {
            Some(s) => Scalar::Text(s.to_string()),
            None => Scalar::Missing,
        })
        .collect();
    Ok(values)
}

/// Numeric view of a column. Entries that cannot be coerced come back as `None`.
pub fn column_numbers(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, AppError> {
    let series = frame.column(name)?;
    let numbers = match series.dtype() {
        DataType::String => {
            // Non-strict casts turn unparseable strings into nulls, but reject
            // surrounding whitespace, so parse by hand.
            return Ok(series
                .str()?
                .into_iter()
                .map(|value| value.and_then(crate::models::parse_number))
                .collect());
        }
        _ => series.cast(&DataType::Float64)?,
    };
    Ok(numbers
        .f64()?
        .into_iter()
        .map(|value| value.filter(|n| n.is_finite()))
        .collect())
}

/// Short dtype name reported to clients after an upload.
pub fn dtype_name(dtype: &DataType) -> String {
    match dtype {
        DataType::Float64 | DataType::Float32 => "float64".to_string(),
        DataType::String => "object".to_string(),
        other if other.is_integer() => "int64".to_string(),
        other => other.to_string().to_lowercase(),
    }
}
