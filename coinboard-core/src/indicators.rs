//! Indicator composer: per-window moving-average tables with the underlying
//! price attached.

use crate::data::align::{join_ma, left_join_on_timestamp, timestamp_span, PRICE_COLUMN};
use crate::data::coincap::{CoinCapClient, Interval};
use crate::data::polygon::PolygonClient;
use chrono::{DateTime, Utc};
use polars::prelude::*;

pub use crate::data::polygon::MaType;

/// Moving averages for one window.
#[derive(Debug, Clone)]
pub struct MaTable {
    pub window: u32,
    pub table: DataFrame,
}

/// Fetch every requested moving-average type for every window and join them.
///
/// Output order follows `windows`. Each table is ascending by time with one
/// column per type plus the underlying price column. The price history is
/// fetched once, over the span of the first window's reference series; when
/// that series is empty the price join is skipped.
pub fn compose_ma(
    polygon: &PolygonClient,
    coincap: &CoinCapClient,
    windows: &[u32],
    types: &[MaType],
) -> PolarsResult<Vec<MaTable>> {
    let mut tables = Vec::with_capacity(windows.len());
    for &window in windows {
        let series: Vec<(MaType, DataFrame)> = types
            .iter()
            .map(|&ma_type| (ma_type, polygon.fetch_moving_average(window, ma_type)))
            .collect();
        tables.push(MaTable {
            window,
            table: join_ma(&series)?,
        });
    }

    let Some(first) = tables.first() else {
        return Ok(tables);
    };
    let Some((start, end)) = timestamp_span(&first.table)? else {
        tracing::warn!(window = first.window, "empty moving-average series, price join skipped");
        return Ok(tables);
    };
    let (Some(start), Some(end)) = (
        DateTime::<Utc>::from_timestamp_millis(start),
        DateTime::<Utc>::from_timestamp_millis(end),
    ) else {
        return Ok(tables);
    };

    let params = polygon.params();
    let prices = coincap.fetch_asset_history(&params.asset_id, start, end, Interval::H1);
    tracing::debug!(asset = %params.asset_id, rows = prices.height(), "fetched price for moving averages");

    tables
        .into_iter()
        .map(|ma| {
            let table = left_join_on_timestamp(&ma.table, &prices, PRICE_COLUMN, &params.price_label)?;
            Ok(MaTable { window: ma.window, table })
        })
        .collect()
}
