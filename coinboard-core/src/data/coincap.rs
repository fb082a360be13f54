//! CoinCap v2 adapters: exchange rates, top assets, asset price history.
//!
//! CoinCap publishes every numeric field as a decimal string and may publish
//! `null` for values it does not know (e.g. `maxSupply` of uncapped coins).
//! History timestamps (`time`) are epoch milliseconds.

use super::frame::datetime_column;
use super::provider::{conform, decode, or_empty, DataSource, FetchError, JsonTransport, Numeric};
use super::schema::{TableSchema, TIMESTAMP};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateRow {
    id: String,
    symbol: String,
    currency_symbol: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    rate_usd: Numeric,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetRow {
    id: String,
    rank: Numeric,
    symbol: String,
    name: String,
    supply: Option<Numeric>,
    max_supply: Option<Numeric>,
    market_cap_usd: Option<Numeric>,
    #[serde(rename = "volumeUsd24Hr")]
    volume_usd_24hr: Option<Numeric>,
    price_usd: Option<Numeric>,
    #[serde(rename = "changePercent24Hr")]
    change_percent_24hr: Option<Numeric>,
    #[serde(rename = "vwap24Hr")]
    vwap_24hr: Option<Numeric>,
    explorer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRow {
    price_usd: Numeric,
    time: i64,
}

/// Sampling granularity of the history endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    M1,
    M5,
    M15,
    M30,
    H1,
    H2,
    H6,
    H12,
    #[default]
    D1,
}

impl Interval {
    /// Query-string code understood by CoinCap.
    pub fn code(&self) -> &'static str {
        match self {
            Interval::M1 => "m1",
            Interval::M5 => "m5",
            Interval::M15 => "m15",
            Interval::M30 => "m30",
            Interval::H1 => "h1",
            Interval::H2 => "h2",
            Interval::H6 => "h6",
            Interval::H12 => "h12",
            Interval::D1 => "d1",
        }
    }
}

fn optional_f64(
    rows: &[AssetRow],
    pick: impl Fn(&AssetRow) -> Option<&Numeric>,
) -> Vec<Option<f64>> {
    rows.iter()
        .map(|r| pick(r).and_then(Numeric::as_f64))
        .collect()
}

/// CoinCap REST client.
pub struct CoinCapClient {
    transport: Arc<dyn JsonTransport>,
    base_url: String,
}

impl CoinCapClient {
    pub fn new(transport: Arc<dyn JsonTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn rates_url(&self) -> String {
        format!("{}/rates", self.base_url)
    }

    fn assets_url(&self, limit: usize) -> String {
        format!("{}/assets?limit={limit}", self.base_url)
    }

    fn history_url(
        &self,
        asset_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> String {
        format!(
            "{}/assets/{asset_id}/history?interval={}&start={}&end={}",
            self.base_url,
            interval.code(),
            start.timestamp_millis(),
            end.timestamp_millis()
        )
    }

    /// All conversion rates the source knows (crypto and fiat), each against USD.
    ///
    /// Columns `{id, symbol, currencySymbol, type, rateUsd}`; empty on failure.
    pub fn fetch_exchange_rates(&self) -> DataFrame {
        or_empty(
            self.try_fetch_exchange_rates(),
            DataSource::CoinCap,
            self.transport.as_ref(),
            "exchange_rates",
            TableSchema::exchange_rates(),
        )
    }

    pub fn try_fetch_exchange_rates(&self) -> Result<DataFrame, FetchError> {
        let body = self.transport.get_json(&self.rates_url())?;
        let rows = decode::<Envelope<RateRow>>(body, "rates")?.data;

        let mut rate_usd = Vec::with_capacity(rows.len());
        for row in &rows {
            rate_usd.push(row.rate_usd.require_f64("rateUsd")?);
        }

        let df = DataFrame::new(vec![
            Column::new("id".into(), rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>()),
            Column::new(
                "symbol".into(),
                rows.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                "currencySymbol".into(),
                rows.iter()
                    .map(|r| r.currency_symbol.as_deref())
                    .collect::<Vec<_>>(),
            ),
            Column::new("type".into(), rows.iter().map(|r| r.kind.as_str()).collect::<Vec<_>>()),
            Column::new("rateUsd".into(), rate_usd),
        ])?;
        conform(df, &TableSchema::exchange_rates())
    }

    /// Top `limit` assets by rank.
    ///
    /// Columns as in [`TableSchema::assets`]; empty on failure.
    pub fn fetch_top_assets(&self, limit: usize) -> DataFrame {
        or_empty(
            self.try_fetch_top_assets(limit),
            DataSource::CoinCap,
            self.transport.as_ref(),
            "assets",
            TableSchema::assets(),
        )
    }

    pub fn try_fetch_top_assets(&self, limit: usize) -> Result<DataFrame, FetchError> {
        let body = self.transport.get_json(&self.assets_url(limit))?;
        let rows = decode::<Envelope<AssetRow>>(body, "assets")?.data;

        let mut ranks = Vec::with_capacity(rows.len());
        for row in &rows {
            ranks.push(row.rank.require_i64("rank")?);
        }

        let df = DataFrame::new(vec![
            Column::new("id".into(), rows.iter().map(|r| r.id.as_str()).collect::<Vec<_>>()),
            Column::new("rank".into(), ranks),
            Column::new(
                "symbol".into(),
                rows.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>(),
            ),
            Column::new("name".into(), rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>()),
            Column::new("supply".into(), optional_f64(&rows, |r| r.supply.as_ref())),
            Column::new("maxSupply".into(), optional_f64(&rows, |r| r.max_supply.as_ref())),
            Column::new("marketCapUsd".into(), optional_f64(&rows, |r| r.market_cap_usd.as_ref())),
            Column::new("volumeUsd24Hr".into(), optional_f64(&rows, |r| r.volume_usd_24hr.as_ref())),
            Column::new("priceUsd".into(), optional_f64(&rows, |r| r.price_usd.as_ref())),
            Column::new("changePercent24Hr".into(), optional_f64(&rows, |r| r.change_percent_24hr.as_ref())),
            Column::new("vwap24Hr".into(), optional_f64(&rows, |r| r.vwap_24hr.as_ref())),
            Column::new(
                "explorer".into(),
                rows.iter().map(|r| r.explorer.as_deref()).collect::<Vec<_>>(),
            ),
        ])?;
        conform(df, &TableSchema::assets())
    }

    /// Price samples for one asset between two instants.
    ///
    /// Columns `{timestamp, priceUsd}` in source order; empty on failure.
    pub fn fetch_asset_history(
        &self,
        asset_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> DataFrame {
        or_empty(
            self.try_fetch_asset_history(asset_id, start, end, interval),
            DataSource::CoinCap,
            self.transport.as_ref(),
            "asset_history",
            TableSchema::asset_history(),
        )
    }

    pub fn try_fetch_asset_history(
        &self,
        asset_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<DataFrame, FetchError> {
        let url = self.history_url(asset_id, start, end, interval);
        let body = self.transport.get_json(&url)?;
        let rows = decode::<Envelope<HistoryRow>>(body, "history")?.data;

        let mut times = Vec::with_capacity(rows.len());
        let mut prices = Vec::with_capacity(rows.len());
        for row in &rows {
            times.push(row.time);
            prices.push(row.price_usd.require_f64("priceUsd")?);
        }

        let df = DataFrame::new(vec![
            datetime_column(TIMESTAMP, times)?,
            Column::new("priceUsd".into(), prices),
        ])?;
        conform(df, &TableSchema::asset_history())
    }
}
