//! Column access helpers shared by the reshaping code.
//!
//! Values are read out through a cast so callers get plain `Option<T>`
//! vectors regardless of how a column is stored.

use super::schema::{utc_millis, TIMESTAMP};
use polars::prelude::*;

/// Build a UTC millisecond timestamp column.
pub fn datetime_column(name: &str, millis: Vec<i64>) -> PolarsResult<Column> {
    Column::new(name.into(), millis).cast(&utc_millis())
}

/// Timestamps of a table as epoch milliseconds.
pub fn timestamps(df: &DataFrame) -> PolarsResult<Vec<Option<i64>>> {
    i64_values(df, TIMESTAMP)
}

pub fn i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

pub fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

pub fn str_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Names of the Float64 columns, excluding the time axis.
pub fn float_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.name().as_str() != TIMESTAMP && c.dtype() == &DataType::Float64)
        .map(|c| c.name().to_string())
        .collect()
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
