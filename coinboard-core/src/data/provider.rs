//! Transport trait and structured fetch errors.
//!
//! Every adapter talks to its source through a `JsonTransport` so the HTTP
//! client can be swapped for canned responses in tests and offline runs.
//! Adapters never surface a `FetchError` to their callers; they collapse it
//! into an empty, schema-correct table at their public boundary.

use super::schema::TableSchema;
use polars::prelude::{DataFrame, Schema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Why a fetch did not produce a table.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network, DNS or timeout failure before a response arrived.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The source answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The payload was not JSON, or missing expected keys, or had the wrong shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The payload parsed but could not be turned into a table.
    #[error("table construction failed: {0}")]
    Table(#[from] polars::prelude::PolarsError),
}

impl FetchError {
    /// Short category name, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport(_) | FetchError::HttpStatus { .. } => "transport",
            FetchError::Malformed(_) | FetchError::Table(_) => "malformed",
        }
    }
}

/// Where a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    CoinCap,
    AlternativeMe,
    Polygon,
}

impl DataSource {
    pub fn name(&self) -> &'static str {
        match self {
            DataSource::CoinCap => "coincap",
            DataSource::AlternativeMe => "alternative.me",
            DataSource::Polygon => "polygon",
        }
    }
}

/// Blocking JSON-over-HTTP transport.
///
/// Implementations perform exactly one request per call: no retries, no
/// caching. The adapters above decide what a failure means.
pub trait JsonTransport: Send + Sync {
    /// Human-readable name of this transport.
    fn name(&self) -> &str;

    /// GET `url` and parse the body as JSON.
    fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;
}

/// Deserialize a typed payload out of a JSON value, mapping serde errors to
/// `FetchError::Malformed`.
pub(crate) fn decode<T: DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::Malformed(format!("{what}: {e}")))
}

/// A numeric field that sources publish either as a JSON number or as a
/// decimal string (`"priceUsd": "43125.77"`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(v) => Some(*v),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }

    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
            Numeric::Number(v)
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64 =>
            {
                Some(*v as i64)
            }
            Numeric::Number(_) => None,
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Required field: unparseable text is a malformed response.
    pub(crate) fn require_f64(&self, field: &str) -> Result<f64, FetchError> {
        self.as_f64()
            .ok_or_else(|| FetchError::Malformed(format!("{field}: not a number: {self:?}")))
    }

    pub(crate) fn require_i64(&self, field: &str) -> Result<i64, FetchError> {
        self.as_i64()
            .ok_or_else(|| FetchError::Malformed(format!("{field}: not an integer: {self:?}")))
    }
}

/// Check a freshly built table against its declared schema.
pub(crate) fn conform(df: DataFrame, schema: &Schema) -> Result<DataFrame, FetchError> {
    TableSchema::validate(&df, schema).map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(df)
}

/// Adapter boundary: a failed fetch becomes an empty table with the declared
/// schema, and the reason goes to the log instead of the caller.
pub(crate) fn or_empty(
    result: Result<DataFrame, FetchError>,
    source: DataSource,
    transport: &dyn JsonTransport,
    table: &str,
    schema: Schema,
) -> DataFrame {
    match result {
        Ok(df) => df,
        Err(e) => {
            tracing::warn!(
                source = source.name(),
                transport = transport.name(),
                table,
                kind = e.kind(),
                error = %e,
                "fetch failed, substituting empty table"
            );
            TableSchema::empty(&schema)
        }
    }
}

/// Replace the value of the `apiKey` query parameter so URLs can be logged.
pub fn redact_api_key(url: &str) -> String {
    let Some(start) = url.find("apiKey=") else {
        return url.to_string();
    };
    let value_start = start + "apiKey=".len();
    let value_end = url[value_start..]
        .find('&')
        .map(|i| value_start + i)
        .unwrap_or(url.len());
    format!("{}***{}", &url[..value_start], &url[value_end..])
}
