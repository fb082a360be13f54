//! Table schemas: the contract between the adapters and everything downstream.
//!
//! Every adapter output has exactly one of these schemas, including the empty
//! table substituted on failure.

use polars::prelude::*;

/// Name of the time axis column in every time-indexed table.
pub const TIMESTAMP: &str = "timestamp";

/// Timestamps are UTC instants at millisecond resolution.
pub fn utc_millis() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, Some("UTC".into()))
}

/// Declared schemas for the fetch adapters.
pub struct TableSchema;

impl TableSchema {
    /// `fetch_exchange_rates`: one row per currency known to the source.
    pub fn exchange_rates() -> Schema {
        Schema::from_iter(vec![
            Field::new("id".into(), DataType::String),
            Field::new("symbol".into(), DataType::String),
            Field::new("currencySymbol".into(), DataType::String),
            Field::new("type".into(), DataType::String),
            Field::new("rateUsd".into(), DataType::Float64),
        ])
    }

    /// `fetch_top_assets`: one row per asset.
    pub fn assets() -> Schema {
        Schema::from_iter(vec![
            Field::new("id".into(), DataType::String),
            Field::new("rank".into(), DataType::Int64),
            Field::new("symbol".into(), DataType::String),
            Field::new("name".into(), DataType::String),
            Field::new("supply".into(), DataType::Float64),
            Field::new("maxSupply".into(), DataType::Float64),
            Field::new("marketCapUsd".into(), DataType::Float64),
            Field::new("volumeUsd24Hr".into(), DataType::Float64),
            Field::new("priceUsd".into(), DataType::Float64),
            Field::new("changePercent24Hr".into(), DataType::Float64),
            Field::new("vwap24Hr".into(), DataType::Float64),
            Field::new("explorer".into(), DataType::String),
        ])
    }

    /// `fetch_asset_history`: price samples for one asset.
    pub fn asset_history() -> Schema {
        Schema::from_iter(vec![
            Field::new(TIMESTAMP.into(), utc_millis()),
            Field::new("priceUsd".into(), DataType::Float64),
        ])
    }

    /// `fetch_fear_greed`: daily sentiment readings.
    pub fn fear_greed() -> Schema {
        Schema::from_iter(vec![
            Field::new(TIMESTAMP.into(), utc_millis()),
            Field::new("value".into(), DataType::Int64),
            Field::new("value_classification".into(), DataType::String),
        ])
    }

    /// `fetch_rsi` and `fetch_moving_average`.
    pub fn indicator() -> Schema {
        Schema::from_iter(vec![
            Field::new(TIMESTAMP.into(), utc_millis()),
            Field::new("value".into(), DataType::Float64),
        ])
    }

    /// Zero-row table with the given schema.
    pub fn empty(schema: &Schema) -> DataFrame {
        DataFrame::empty_with_schema(schema)
    }

    /// Check that a table has exactly the declared columns, in order, with the declared types.
    pub fn validate(df: &DataFrame, expected: &Schema) -> Result<(), SchemaError> {
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaError::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        for name in actual.iter_names() {
            if !expected.contains(name.as_str()) {
                return Err(SchemaError::UnexpectedColumn(name.to_string()));
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Unexpected column: {0}")]
    UnexpectedColumn(String),

    #[error("Type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}
