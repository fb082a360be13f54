//! Windowing and resampling of time-indexed tables for presentation.

use crate::data::frame::{f64_values, float_columns, timestamps};
use crate::data::schema::TIMESTAMP;
use chrono::{DateTime, NaiveDate};
use polars::prelude::*;

const DAY_MS: i64 = 86_400_000;

/// Snapshot rows: label and distance from the latest timestamp in days.
pub const SNAPSHOT_OFFSETS: [(&str, i64); 5] = [
    ("Now", 0),
    ("Yesterday", 1),
    ("Week ago", 6),
    ("Month ago", 29),
    ("Year ago", 364),
];

/// Name of the label column added by [`resample_snapshot`].
pub const SNAPSHOT_LABEL: &str = "Time";

/// A named look-back window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    LastDay,
    LastWeek,
    LastTwoWeeks,
    LastMonth,
    LastSixMonths,
    All,
}

impl Period {
    /// Parse a period label. Unrecognised labels mean the whole table.
    pub fn from_label(label: &str) -> Period {
        match label.trim() {
            "Last Day" => Period::LastDay,
            "Last Week" => Period::LastWeek,
            "Last Two Weeks" => Period::LastTwoWeeks,
            "Last Month" => Period::LastMonth,
            "Last Six Month" | "Last Six Months" => Period::LastSixMonths,
            _ => Period::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::LastDay => "Last Day",
            Period::LastWeek => "Last Week",
            Period::LastTwoWeeks => "Last Two Weeks",
            Period::LastMonth => "Last Month",
            Period::LastSixMonths => "Last Six Month",
            Period::All => "All",
        }
    }
}

/// Sampling frequency of the table being windowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Hourly,
    Daily,
}

impl Resolution {
    /// Rows covering `period`, or `None` for the full table.
    ///
    /// Hourly counts include the anchor point (24 hours back needs 25 rows).
    pub fn row_count(&self, period: Period) -> Option<usize> {
        match (self, period) {
            (Resolution::Hourly, Period::LastDay) => Some(25),
            (Resolution::Hourly, Period::LastWeek) => Some(169),
            (Resolution::Hourly, Period::LastTwoWeeks) => Some(337),
            (Resolution::Daily, Period::LastWeek) => Some(6),
            (Resolution::Daily, Period::LastMonth) => Some(29),
            (Resolution::Daily, Period::LastSixMonths) => Some(179),
            _ => None,
        }
    }
}

/// Leading rows of an hourly newest-first table for a period label.
pub fn window_slice(df: &DataFrame, period_label: &str) -> DataFrame {
    window_slice_by(df, Period::from_label(period_label), Resolution::Hourly)
}

/// Leading rows of a newest-first table.
pub fn window_slice_by(df: &DataFrame, period: Period, resolution: Resolution) -> DataFrame {
    match resolution.row_count(period) {
        Some(n) => df.head(Some(n)),
        None => df.clone(),
    }
}

/// Trailing rows of an oldest-first table.
pub fn window_slice_latest(df: &DataFrame, period: Period, resolution: Resolution) -> DataFrame {
    match resolution.row_count(period) {
        Some(n) => df.tail(Some(n)),
        None => df.clone(),
    }
}

fn take_rows(df: &DataFrame, rows: Vec<IdxSize>) -> PolarsResult<DataFrame> {
    df.take(&IdxCa::from_vec("rows".into(), rows))
}

/// Point-in-time comparison rows: latest, one day, one week, one month and
/// one year back.
///
/// Only exact timestamp matches are kept; offsets with no row are absent.
/// The raw timestamp is replaced by a leading `Time` label column.
pub fn resample_snapshot(df: &DataFrame) -> PolarsResult<DataFrame> {
    let ts = timestamps(df)?;
    let latest = ts.iter().flatten().max().copied();

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    if let Some(latest) = latest {
        for (label, days) in SNAPSHOT_OFFSETS {
            let target = latest - days * DAY_MS;
            if let Some(idx) = ts.iter().position(|t| *t == Some(target)) {
                rows.push(idx as IdxSize);
                labels.push(label);
            }
        }
    }

    let mut out = take_rows(df, rows)?.drop(TIMESTAMP)?;
    out.insert_column(0, Column::new(SNAPSHOT_LABEL.into(), labels))?;
    Ok(out)
}

/// Rows whose UTC calendar date lies in `[start, end]`, order preserved.
pub fn slice_date_range(df: &DataFrame, start: NaiveDate, end: NaiveDate) -> PolarsResult<DataFrame> {
    let rows: Vec<IdxSize> = timestamps(df)?
        .into_iter()
        .enumerate()
        .filter_map(|(idx, t)| {
            let day = DateTime::from_timestamp_millis(t?)?.date_naive();
            (start <= day && day <= end).then_some(idx as IdxSize)
        })
        .collect();
    take_rows(df, rows)
}

/// Multiply every Float64 column except the time axis by `factor`.
pub fn scale_columns(df: &DataFrame, factor: f64) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    for name in float_columns(df) {
        let scaled: Vec<Option<f64>> = f64_values(df, &name)?
            .into_iter()
            .map(|v| v.map(|v| v * factor))
            .collect();
        out.with_column(Column::new(name.as_str().into(), scaled))?;
    }
    Ok(out)
}

/// Keep the time axis plus the named columns that exist, in the given order.
pub fn select_columns<S: AsRef<str>>(df: &DataFrame, names: &[S]) -> PolarsResult<DataFrame> {
    let mut keep = vec![TIMESTAMP.to_string()];
    for name in names {
        let name = name.as_ref();
        if name != TIMESTAMP && df.column(name).is_ok() && !keep.iter().any(|k| k == name) {
            keep.push(name.to_string());
        }
    }
    df.select(keep)
}
