//! alternative.me Fear & Greed index adapter.
//!
//! The source publishes one reading per day. Timestamps come as epoch seconds
//! by default, or as `MM-DD-YYYY` when US date formatting is requested; both
//! are accepted and normalised to UTC midnight instants.

use super::frame::datetime_column;
use super::provider::{conform, decode, or_empty, DataSource, FetchError, JsonTransport, Numeric};
use super::schema::{TableSchema, TIMESTAMP};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct FngResponse {
    data: Vec<FngRow>,
}

#[derive(Debug, Deserialize)]
struct FngRow {
    value: Numeric,
    value_classification: String,
    timestamp: Numeric,
}

/// Parse a Fear & Greed timestamp into epoch milliseconds.
fn parse_timestamp(raw: &Numeric) -> Result<i64, FetchError> {
    if let Some(seconds) = raw.as_i64() {
        return seconds.checked_mul(1000).ok_or_else(|| {
            FetchError::Malformed(format!("timestamp: {seconds} seconds is out of range"))
        });
    }
    if let Numeric::Text(text) = raw {
        for format in ["%m-%d-%Y", "%Y-%m-%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(text.trim(), format) {
                if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                    return Ok(midnight.and_utc().timestamp_millis());
                }
            }
        }
    }
    Err(FetchError::Malformed(format!(
        "timestamp: unrecognised value {raw:?}"
    )))
}

/// alternative.me client.
pub struct FearGreedClient {
    transport: Arc<dyn JsonTransport>,
    url: String,
}

impl FearGreedClient {
    pub fn new(transport: Arc<dyn JsonTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }

    /// Up to `limit` most recent readings, newest first.
    ///
    /// Columns `{timestamp, value, value_classification}`; empty on failure.
    pub fn fetch_fear_greed(&self, limit: usize) -> DataFrame {
        or_empty(
            self.try_fetch_fear_greed(limit),
            DataSource::AlternativeMe,
            self.transport.as_ref(),
            "fear_greed",
            TableSchema::fear_greed(),
        )
    }

    pub fn try_fetch_fear_greed(&self, limit: usize) -> Result<DataFrame, FetchError> {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        let url = format!("{}{separator}limit={limit}", self.url);
        let body = self.transport.get_json(&url)?;
        let rows = decode::<FngResponse>(body, "fear_greed")?.data;

        let mut parsed = Vec::with_capacity(rows.len());
        for row in rows {
            let ts = parse_timestamp(&row.timestamp)?;
            let value = row.value.require_i64("value")?;
            parsed.push((ts, value, row.value_classification));
        }
        parsed.sort_by(|a, b| b.0.cmp(&a.0));
        parsed.truncate(limit);

        let df = DataFrame::new(vec![
            datetime_column(TIMESTAMP, parsed.iter().map(|p| p.0).collect())?,
            Column::new("value".into(), parsed.iter().map(|p| p.1).collect::<Vec<_>>()),
            Column::new(
                "value_classification".into(),
                parsed.iter().map(|p| p.2.as_str()).collect::<Vec<_>>(),
            ),
        ])?;
        conform(df, &TableSchema::fear_greed())
    }
}
