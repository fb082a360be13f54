//! Application context: everything fetched once at startup, shared read-only
//! by every query.

use crate::config::DashboardConfig;
use crate::data::align::{align_prices, clean_price_data};
use crate::data::coincap::CoinCapClient;
use crate::data::fear_greed::FearGreedClient;
use crate::data::frame::str_values;
use crate::data::http::HttpTransport;
use crate::data::polygon::{MaType, PolygonClient};
use crate::data::provider::{FetchError, JsonTransport};
use crate::data::rate_store::RateStore;
use crate::indicators::{compose_ma, MaTable};
use crate::ranking::ranking_table;
use crate::rates::{rate_for, rebase_rates, resolve_rates};
use crate::window::{
    resample_snapshot, scale_columns, select_columns, slice_date_range, window_slice_by,
    window_slice_latest, Period, Resolution,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The three upstream clients, sharing one transport.
pub struct Sources {
    pub coincap: CoinCapClient,
    pub fear_greed: FearGreedClient,
    pub polygon: PolygonClient,
}

impl Sources {
    pub fn new(config: &DashboardConfig, transport: Arc<dyn JsonTransport>) -> Self {
        let urls = &config.sources;
        Self {
            coincap: CoinCapClient::new(transport.clone(), urls.coincap_url.clone()),
            fear_greed: FearGreedClient::new(transport.clone(), urls.fear_greed_url.clone()),
            polygon: PolygonClient::new(
                transport,
                urls.polygon_url.clone(),
                config.polygon_api_key(),
                config.indicators.clone(),
            ),
        }
    }

    /// Clients over a live HTTP transport.
    pub fn http(config: &DashboardConfig) -> Result<Self, FetchError> {
        let transport = HttpTransport::new(&config.http)?;
        Ok(Self::new(config, Arc::new(transport)))
    }
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Fetch bounds covering whole days: midnight UTC of `start` up to midnight
/// UTC after `end`, so samples taken on `end` are included.
pub fn day_span(start: NaiveDate, end: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let to = end.checked_add_days(Days::new(1)).and_then(midnight)?;
    Some((midnight(start)?, to))
}

/// Chosen asset columns of an aligned USD price table between two dates
/// (inclusive), scaled by `rate`.
///
/// A missing rate gives the selected columns with no rows.
pub fn price_table_view<S: AsRef<str>>(
    prices: &DataFrame,
    assets: &[S],
    start: NaiveDate,
    end: NaiveDate,
    rate: Option<f64>,
) -> PolarsResult<DataFrame> {
    let selected = select_columns(prices, assets)?;
    let Some(rate) = rate else {
        return Ok(selected.head(Some(0)));
    };
    scale_columns(&slice_date_range(&selected, start, end)?, rate)
}

/// Latest rows of a composed moving-average table for a period, keeping the
/// requested types and the price overlay column.
pub fn ma_table_view(
    ma: &MaTable,
    types: &[MaType],
    price_label: &str,
    period: Period,
) -> PolarsResult<DataFrame> {
    let mut columns: Vec<&str> = types.iter().map(MaType::column).collect();
    columns.push(price_label);
    let selected = select_columns(&ma.table, &columns)?;
    Ok(window_slice_latest(&selected, period, Resolution::Hourly))
}

/// Loaded dashboard data.
pub struct Dashboard {
    config: DashboardConfig,
    today: NaiveDate,
    assets: DataFrame,
    rates: BTreeMap<String, f64>,
    prices: DataFrame,
    fear_greed: DataFrame,
    rsi: DataFrame,
    moving_averages: Vec<MaTable>,
}

impl Dashboard {
    /// Fetch and shape everything the views need.
    ///
    /// Upstream failures leave the affected tables empty; only table
    /// reshaping errors are returned.
    pub fn load(
        config: DashboardConfig,
        sources: &Sources,
        store: &dyn RateStore,
        today: NaiveDate,
    ) -> PolarsResult<Self> {
        let assets = sources.coincap.fetch_top_assets(config.assets.limit);
        let rates = resolve_rates(&sources.coincap, store, today, &config.rates.currencies);

        let asset_ids: Vec<String> = str_values(&assets, "id")?
            .into_iter()
            .flatten()
            .collect();
        let prices = match day_span(config.assets.history_start, today) {
            Some((start, end)) => clean_price_data(&sources.coincap, start, end, &asset_ids)?,
            None => align_prices(&[])?,
        };

        let fear_greed = sources
            .fear_greed
            .fetch_fear_greed(config.indicators.fear_greed_limit);
        let rsi = sources.polygon.fetch_rsi();
        let moving_averages = compose_ma(
            &sources.polygon,
            &sources.coincap,
            &config.indicators.ma_windows,
            &config.indicators.ma_types,
        )?;

        tracing::info!(
            assets = assets.height(),
            currencies = rates.len(),
            price_rows = prices.height(),
            fear_greed_rows = fear_greed.height(),
            rsi_rows = rsi.height(),
            "dashboard loaded"
        );

        Ok(Self {
            config,
            today,
            assets,
            rates,
            prices,
            fear_greed,
            rsi,
            moving_averages,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn assets(&self) -> &DataFrame {
        &self.assets
    }

    pub fn rates(&self) -> &BTreeMap<String, f64> {
        &self.rates
    }

    /// Aligned USD prices of every loaded asset, oldest first.
    pub fn prices(&self) -> &DataFrame {
        &self.prices
    }

    pub fn moving_averages(&self) -> &[MaTable] {
        &self.moving_averages
    }

    /// Units of `currency` per USD. USD itself always converts at 1.
    pub fn rate(&self, currency: &str) -> Option<f64> {
        rate_for(&self.rates, currency)
    }

    /// Prices of the chosen assets between two dates (inclusive), in `currency`.
    ///
    /// Empty when the currency has no rate.
    pub fn price_view<S: AsRef<str>>(
        &self,
        assets: &[S],
        start: NaiveDate,
        end: NaiveDate,
        currency: &str,
    ) -> PolarsResult<DataFrame> {
        price_table_view(&self.prices, assets, start, end, self.rate(currency))
    }

    /// Every resolved rate expressed against `base`.
    pub fn rate_board(&self, base: &str) -> BTreeMap<String, f64> {
        rebase_rates(&self.rates, base)
    }

    /// Top assets priced in `currency`; empty when the currency has no rate.
    pub fn ranking(&self, currency: &str) -> PolarsResult<DataFrame> {
        match self.rate(currency) {
            Some(rate) => ranking_table(&self.assets, currency, rate),
            None => ranking_table(&self.assets.head(Some(0)), currency, 1.0),
        }
    }

    /// Latest daily Fear & Greed readings for a period, newest first.
    pub fn fear_greed_view(&self, period: Period) -> DataFrame {
        window_slice_by(&self.fear_greed, period, Resolution::Daily)
    }

    pub fn fear_greed_snapshot(&self) -> PolarsResult<DataFrame> {
        resample_snapshot(&self.fear_greed)
    }

    /// Latest hourly RSI readings for a period, newest first.
    pub fn rsi_view(&self, period: Period) -> DataFrame {
        window_slice_by(&self.rsi, period, Resolution::Hourly)
    }

    /// Moving averages of one window restricted to the chosen types, plus the
    /// price overlay, oldest first. `None` for a window that was not loaded.
    pub fn ma_view(
        &self,
        window: u32,
        period: Period,
        types: &[MaType],
    ) -> PolarsResult<Option<DataFrame>> {
        let Some(ma) = self.moving_averages.iter().find(|m| m.window == window) else {
            tracing::warn!(window, "moving-average window not loaded");
            return Ok(None);
        };

        let view = ma_table_view(ma, types, &self.config.indicators.price_label, period)?;
        Ok(Some(view))
    }
}
