//! Polygon technical-indicator adapters: RSI, SMA, EMA.
//!
//! All indicators are requested for one ticker at a fixed timespan and come
//! back newest-first, as delivered by the source.

use super::frame::datetime_column;
use super::provider::{conform, decode, or_empty, DataSource, FetchError, JsonTransport, Numeric};
use super::schema::{TableSchema, TIMESTAMP};
use crate::config::IndicatorConfig;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct IndicatorResponse {
    results: IndicatorResults,
}

#[derive(Debug, Deserialize)]
struct IndicatorResults {
    #[serde(default)]
    values: Vec<IndicatorRow>,
}

#[derive(Debug, Deserialize)]
struct IndicatorRow {
    timestamp: i64,
    value: Numeric,
}

/// Moving-average flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaType {
    Sma,
    Ema,
}

impl MaType {
    /// Path segment of the Polygon endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            MaType::Sma => "sma",
            MaType::Ema => "ema",
        }
    }

    /// Column name in composed moving-average tables.
    pub fn column(&self) -> &'static str {
        match self {
            MaType::Sma => "SMA",
            MaType::Ema => "EMA",
        }
    }

    pub fn parse(s: &str) -> Option<MaType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sma" => Some(MaType::Sma),
            "ema" => Some(MaType::Ema),
            _ => None,
        }
    }
}

impl fmt::Display for MaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Polygon indicators client for a single ticker.
pub struct PolygonClient {
    transport: Arc<dyn JsonTransport>,
    base_url: String,
    api_key: Option<String>,
    params: IndicatorConfig,
}

impl PolygonClient {
    pub fn new(
        transport: Arc<dyn JsonTransport>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        params: IndicatorConfig,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            params,
        }
    }

    pub fn params(&self) -> &IndicatorConfig {
        &self.params
    }

    fn indicator_url(&self, indicator: &str, window: u32, extra: &str) -> String {
        let p = &self.params;
        let mut url = format!(
            "{}/{indicator}/{}?timespan={}&window={window}&series_type={}{extra}&order={}&limit={}",
            self.base_url, p.ticker, p.timespan, p.series_type, p.order, p.limit
        );
        if let Some(key) = &self.api_key {
            url.push_str("&apiKey=");
            url.push_str(key);
        }
        url
    }

    /// Relative Strength Index series, newest first.
    ///
    /// Columns `{timestamp, value}`; empty on failure.
    pub fn fetch_rsi(&self) -> DataFrame {
        or_empty(
            self.try_fetch_rsi(),
            DataSource::Polygon,
            self.transport.as_ref(),
            "rsi",
            TableSchema::indicator(),
        )
    }

    pub fn try_fetch_rsi(&self) -> Result<DataFrame, FetchError> {
        let url = self.indicator_url("rsi", self.params.rsi_window, "&expand_underlying=false");
        self.fetch_series(&url)
    }

    /// Moving-average series for one window, newest first.
    ///
    /// Columns `{timestamp, value}`; empty on failure.
    pub fn fetch_moving_average(&self, window: u32, ma_type: MaType) -> DataFrame {
        or_empty(
            self.try_fetch_moving_average(window, ma_type),
            DataSource::Polygon,
            self.transport.as_ref(),
            ma_type.endpoint(),
            TableSchema::indicator(),
        )
    }

    pub fn try_fetch_moving_average(
        &self,
        window: u32,
        ma_type: MaType,
    ) -> Result<DataFrame, FetchError> {
        let url = self.indicator_url(ma_type.endpoint(), window, "");
        self.fetch_series(&url)
    }

    fn fetch_series(&self, url: &str) -> Result<DataFrame, FetchError> {
        let body = self.transport.get_json(url)?;
        let rows = decode::<IndicatorResponse>(body, "indicator")?.results.values;

        let mut times = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            times.push(row.timestamp);
            values.push(row.value.require_f64("value")?);
        }

        let df = DataFrame::new(vec![
            datetime_column(TIMESTAMP, times)?,
            Column::new("value".into(), values),
        ])?;
        conform(df, &TableSchema::indicator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::{f64_values, timestamps};
    use crate::data::stub::StubTransport;
    use serde_json::json;

    fn client(stub: Arc<StubTransport>, key: Option<&str>) -> PolygonClient {
        PolygonClient::new(
            stub,
            "https://polygon.test/v1/indicators/",
            key.map(String::from),
            IndicatorConfig::default(),
        )
    }

    #[test]
    fn rsi_query_matches_source_contract() {
        let stub = Arc::new(StubTransport::new().with_json(
            "/rsi/",
            json!({"results": {"underlying": {}, "values": [
                {"timestamp": 1704070800000i64, "value": 61.5},
                {"timestamp": 1704067200000i64, "value": 58.25}
            ]}, "status": "OK"}),
        ));
        let df = client(stub.clone(), Some("k3y")).fetch_rsi();

        assert_eq!(
            stub.requests(),
            vec!["https://polygon.test/v1/indicators/rsi/X:BTCUSD?timespan=hour&window=14&series_type=close&expand_underlying=false&order=desc&limit=700&apiKey=k3y".to_string()]
        );
        assert_eq!(
            timestamps(&df).unwrap(),
            vec![Some(1_704_070_800_000), Some(1_704_067_200_000)]
        );
        assert_eq!(f64_values(&df, "value").unwrap(), vec![Some(61.5), Some(58.25)]);
    }

    #[test]
    fn moving_average_uses_type_in_path() {
        let stub = Arc::new(StubTransport::new().with_json(
            "/ema/",
            json!({"results": {"values": [{"timestamp": 1704067200000i64, "value": "42000.5"}]}}),
        ));
        let df = client(stub.clone(), None).fetch_moving_average(50, MaType::Ema);

        assert_eq!(df.height(), 1);
        let url = &stub.requests()[0];
        assert!(url.contains("/ema/X:BTCUSD?timespan=hour&window=50&series_type=close&order=desc&limit=700"));
        assert!(!url.contains("apiKey"));
    }

    #[test]
    fn results_without_values_are_empty_not_errors() {
        let stub = Arc::new(StubTransport::new().with_json("/sma/", json!({"results": {}})));
        let result = client(stub, None).try_fetch_moving_average(180, MaType::Sma);
        assert_eq!(result.unwrap().height(), 0);
    }

    #[test]
    fn error_payload_degrades_to_empty() {
        let stub = Arc::new(StubTransport::new().with_json(
            "/rsi/",
            json!({"status": "ERROR", "error": "Unknown API Key"}),
        ));
        let df = client(stub, Some("bad")).fetch_rsi();
        assert_eq!(df.height(), 0);
        assert!(TableSchema::validate(&df, &TableSchema::indicator()).is_ok());
    }

    #[test]
    fn ma_type_names() {
        assert_eq!(MaType::parse("SMA"), Some(MaType::Sma));
        assert_eq!(MaType::parse("wma"), None);
        assert_eq!(MaType::Ema.column(), "EMA");
        assert_eq!(MaType::Sma.to_string(), "SMA");
    }
}
