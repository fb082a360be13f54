//! Time alignment of independently sampled series.
//!
//! Price series are outer-joined onto the union of their timestamps with
//! missing observations filled with 0.0, so downstream arithmetic never sees a
//! null. Moving-average series are left-joined onto a reference series: only
//! reference timestamps survive and unmatched cells stay null.

use super::coincap::{CoinCapClient, Interval};
use super::frame::{datetime_column, f64_values, timestamps};
use super::polygon::MaType;
use super::schema::TIMESTAMP;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Value column of an asset history table.
pub const PRICE_COLUMN: &str = "priceUsd";

/// Value column of an indicator table.
pub const VALUE_COLUMN: &str = "value";

/// `timestamp -> value` for one series. Rows with a null timestamp are
/// dropped; for duplicate timestamps the last row wins.
fn series_lookup(df: &DataFrame, value_column: &str) -> PolarsResult<HashMap<i64, f64>> {
    let ts = timestamps(df)?;
    let values = f64_values(df, value_column)?;
    Ok(ts
        .into_iter()
        .zip(values)
        .filter_map(|(t, v)| Some((t?, v?)))
        .collect())
}

/// Earliest and latest timestamp of a table, `None` when it has no rows.
pub fn timestamp_span(df: &DataFrame) -> PolarsResult<Option<(i64, i64)>> {
    let ts: Vec<i64> = timestamps(df)?.into_iter().flatten().collect();
    Ok(ts.iter().min().copied().zip(ts.iter().max().copied()))
}

/// Merge per-asset `{timestamp, priceUsd}` tables into one wide table.
///
/// The result has one row per timestamp in the union of all inputs, sorted
/// ascending, and one column per asset named after it. Cells an asset did not
/// report are 0.0; an asset with no rows at all becomes an all-zero column.
pub fn align_prices(series: &[(String, DataFrame)]) -> PolarsResult<DataFrame> {
    let mut per_asset: Vec<(&str, BTreeMap<i64, f64>)> = Vec::with_capacity(series.len());
    let mut all_timestamps = BTreeSet::new();

    for (name, df) in series {
        let ts = timestamps(df)?;
        let prices = f64_values(df, PRICE_COLUMN)?;
        let mut points = BTreeMap::new();
        for (t, p) in ts.into_iter().zip(prices) {
            if let Some(t) = t {
                points.insert(t, p.unwrap_or(0.0));
                all_timestamps.insert(t);
            }
        }
        per_asset.push((name.as_str(), points));
    }

    let axis: Vec<i64> = all_timestamps.into_iter().collect();
    let mut columns = Vec::with_capacity(per_asset.len() + 1);
    columns.push(datetime_column(TIMESTAMP, axis.clone())?);
    for (name, points) in per_asset {
        let values: Vec<f64> = axis
            .iter()
            .map(|t| points.get(t).copied().unwrap_or(0.0))
            .collect();
        columns.push(Column::new(name.into(), values));
    }

    DataFrame::new(columns)
}

/// Attach `other[value_column]` to `reference` as `as_name`, matching on
/// timestamp. Reference rows and their order are kept as they are.
pub fn left_join_on_timestamp(
    reference: &DataFrame,
    other: &DataFrame,
    value_column: &str,
    as_name: &str,
) -> PolarsResult<DataFrame> {
    let lookup = series_lookup(other, value_column)?;
    let joined: Vec<Option<f64>> = timestamps(reference)?
        .into_iter()
        .map(|t| t.and_then(|t| lookup.get(&t).copied()))
        .collect();

    let mut out = reference.clone();
    out.with_column(Column::new(as_name.into(), joined))?;
    Ok(out)
}

/// Join the moving-average series of one window into `{timestamp, SMA, EMA}`.
///
/// SMA is the reference series when present, otherwise the first series
/// given. The result is sorted ascending and columns follow the input order.
pub fn join_ma(series: &[(MaType, DataFrame)]) -> PolarsResult<DataFrame> {
    let reference_idx = series
        .iter()
        .position(|(t, _)| *t == MaType::Sma)
        .or_else(|| (!series.is_empty()).then_some(0));
    let Some(reference_idx) = reference_idx else {
        return DataFrame::new(vec![datetime_column(TIMESTAMP, Vec::new())?]);
    };

    let reference = &series[reference_idx].1;
    let mut rows: Vec<(i64, Option<f64>)> = timestamps(reference)?
        .into_iter()
        .zip(f64_values(reference, VALUE_COLUMN)?)
        .filter_map(|(t, v)| t.map(|t| (t, v)))
        .collect();
    rows.sort_by_key(|(t, _)| *t);
    let axis: Vec<i64> = rows.iter().map(|(t, _)| *t).collect();

    let mut columns = Vec::with_capacity(series.len() + 1);
    columns.push(datetime_column(TIMESTAMP, axis.clone())?);
    for (idx, (ma_type, df)) in series.iter().enumerate() {
        let values: Vec<Option<f64>> = if idx == reference_idx {
            rows.iter().map(|(_, v)| *v).collect()
        } else {
            let lookup = series_lookup(df, VALUE_COLUMN)?;
            axis.iter().map(|t| lookup.get(t).copied()).collect()
        };
        columns.push(Column::new(ma_type.column().into(), values));
    }

    DataFrame::new(columns)
}

/// Fetch daily history for every asset and align it into one price table,
/// one column per asset id.
pub fn clean_price_data(
    client: &CoinCapClient,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    asset_ids: &[String],
) -> PolarsResult<DataFrame> {
    let series: Vec<(String, DataFrame)> = asset_ids
        .iter()
        .map(|id| {
            let history = client.fetch_asset_history(id, start, end, Interval::D1);
            tracing::debug!(asset = %id, rows = history.height(), "fetched price history");
            (id.clone(), history)
        })
        .collect();
    align_prices(&series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::TableSchema;

    const HOUR: i64 = 3_600_000;

    fn history(points: &[(i64, f64)]) -> DataFrame {
        DataFrame::new(vec![
            datetime_column(TIMESTAMP, points.iter().map(|p| p.0).collect()).unwrap(),
            Column::new(PRICE_COLUMN.into(), points.iter().map(|p| p.1).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    fn indicator(points: &[(i64, f64)]) -> DataFrame {
        DataFrame::new(vec![
            datetime_column(TIMESTAMP, points.iter().map(|p| p.0).collect()).unwrap(),
            Column::new(VALUE_COLUMN.into(), points.iter().map(|p| p.1).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    #[test]
    fn outer_join_fills_missing_with_zero() {
        let (t1, t2, t3) = (1_000, 2_000, 3_000);
        let aligned = align_prices(&[
            ("A".to_string(), history(&[(t1, 10.0), (t2, 11.0)])),
            ("B".to_string(), history(&[(t2, 20.0), (t3, 21.0)])),
        ])
        .unwrap();

        assert_eq!(
            timestamps(&aligned).unwrap(),
            vec![Some(t1), Some(t2), Some(t3)]
        );
        assert_eq!(
            f64_values(&aligned, "A").unwrap(),
            vec![Some(10.0), Some(11.0), Some(0.0)]
        );
        assert_eq!(
            f64_values(&aligned, "B").unwrap(),
            vec![Some(0.0), Some(20.0), Some(21.0)]
        );
    }

    #[test]
    fn unsorted_input_comes_out_ascending() {
        let aligned = align_prices(&[(
            "A".to_string(),
            history(&[(3 * HOUR, 3.0), (HOUR, 1.0), (2 * HOUR, 2.0)]),
        )])
        .unwrap();
        assert_eq!(
            f64_values(&aligned, "A").unwrap(),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn empty_input_only_zeroes_its_own_column() {
        let empty = TableSchema::empty(&TableSchema::asset_history());
        let aligned = align_prices(&[
            ("A".to_string(), history(&[(HOUR, 1.0), (2 * HOUR, 2.0)])),
            ("B".to_string(), empty),
        ])
        .unwrap();

        assert_eq!(aligned.height(), 2);
        assert_eq!(f64_values(&aligned, "B").unwrap(), vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn no_inputs_gives_empty_timestamp_table() {
        let aligned = align_prices(&[]).unwrap();
        assert_eq!(aligned.height(), 0);
        assert_eq!(aligned.width(), 1);
    }

    #[test]
    fn ma_join_keeps_only_sma_timestamps() {
        let sma = indicator(&[(3 * HOUR, 30.0), (2 * HOUR, 20.0), (HOUR, 10.0)]);
        let ema = indicator(&[(4 * HOUR, 41.0), (2 * HOUR, 21.0)]);
        let joined = join_ma(&[(MaType::Sma, sma), (MaType::Ema, ema)]).unwrap();

        assert_eq!(
            timestamps(&joined).unwrap(),
            vec![Some(HOUR), Some(2 * HOUR), Some(3 * HOUR)]
        );
        assert_eq!(
            f64_values(&joined, "SMA").unwrap(),
            vec![Some(10.0), Some(20.0), Some(30.0)]
        );
        assert_eq!(
            f64_values(&joined, "EMA").unwrap(),
            vec![None, Some(21.0), None]
        );
    }

    #[test]
    fn ma_join_without_sma_uses_first_series() {
        let ema = indicator(&[(HOUR, 1.5)]);
        let joined = join_ma(&[(MaType::Ema, ema)]).unwrap();
        let names: Vec<&str> = joined.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["timestamp", "EMA"]);
        assert_eq!(joined.height(), 1);
    }

    #[test]
    fn left_join_attaches_price_column() {
        let base = join_ma(&[(MaType::Sma, indicator(&[(HOUR, 1.0), (2 * HOUR, 2.0)]))]).unwrap();
        let prices = history(&[(2 * HOUR, 42_000.0), (5 * HOUR, 43_000.0)]);
        let joined = left_join_on_timestamp(&base, &prices, PRICE_COLUMN, "BTC price").unwrap();

        assert_eq!(joined.height(), 2);
        assert_eq!(
            f64_values(&joined, "BTC price").unwrap(),
            vec![None, Some(42_000.0)]
        );
    }

    #[test]
    fn span_of_empty_table_is_none() {
        let empty = TableSchema::empty(&TableSchema::indicator());
        assert_eq!(timestamp_span(&empty).unwrap(), None);
        let df = indicator(&[(5, 1.0), (2, 1.0), (9, 1.0)]);
        assert_eq!(timestamp_span(&df).unwrap(), Some((2, 9)));
    }
}
