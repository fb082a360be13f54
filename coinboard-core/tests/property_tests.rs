//! Property tests for alignment and windowing invariants.
//!
//! Uses proptest to verify:
//! 1. Aligned axis: union of input timestamps, strictly ascending
//! 2. Zero fill: every aligned cell is either the reported price or 0.0
//! 3. Window prefix: a sliced table is a prefix of its input
//! 4. Snapshot order: labels always appear in offset order

use coinboard_core::data::align::{align_prices, PRICE_COLUMN};
use coinboard_core::data::frame::{datetime_column, f64_values, str_values, timestamps};
use coinboard_core::data::schema::TIMESTAMP;
use coinboard_core::window::{
    resample_snapshot, window_slice, SNAPSHOT_LABEL, SNAPSHOT_OFFSETS,
};
use polars::prelude::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const HOUR: i64 = 3_600_000;
const DAY: i64 = 86_400_000;
const T0: i64 = 1_704_067_200_000;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_series() -> impl Strategy<Value = BTreeMap<i64, f64>> {
    prop::collection::btree_map(0..500i64, 1.0..100_000.0_f64, 0..40)
        .prop_map(|points| points.into_iter().map(|(h, p)| (T0 + h * HOUR, p)).collect())
}

fn history(points: &BTreeMap<i64, f64>) -> DataFrame {
    // Reverse so the alignment has to sort.
    let rows: Vec<(i64, f64)> = points.iter().rev().map(|(t, p)| (*t, *p)).collect();
    DataFrame::new(vec![
        datetime_column(TIMESTAMP, rows.iter().map(|r| r.0).collect()).unwrap(),
        Column::new(PRICE_COLUMN.into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
    ])
    .unwrap()
}

fn daily(days: &[i64]) -> DataFrame {
    DataFrame::new(vec![
        datetime_column(TIMESTAMP, days.iter().map(|d| T0 + d * DAY).collect()).unwrap(),
        Column::new("value".into(), days.iter().map(|d| *d as f64).collect::<Vec<_>>()),
    ])
    .unwrap()
}

// ── 1 & 2. Alignment ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn aligned_axis_is_sorted_union(a in arb_series(), b in arb_series()) {
        let aligned = align_prices(&[
            ("A".to_string(), history(&a)),
            ("B".to_string(), history(&b)),
        ]).unwrap();

        let expected: Vec<Option<i64>> = a.keys().chain(b.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(Some)
            .collect();
        prop_assert_eq!(timestamps(&aligned).unwrap(), expected);
    }

    #[test]
    fn aligned_cells_are_price_or_zero(a in arb_series(), b in arb_series()) {
        let aligned = align_prices(&[
            ("A".to_string(), history(&a)),
            ("B".to_string(), history(&b)),
        ]).unwrap();

        let ts = timestamps(&aligned).unwrap();
        for (name, series) in [("A", &a), ("B", &b)] {
            let values = f64_values(&aligned, name).unwrap();
            for (t, v) in ts.iter().zip(values) {
                let t = t.unwrap();
                let expected = series.get(&t).copied().unwrap_or(0.0);
                prop_assert_eq!(v, Some(expected));
            }
        }
    }
}

// ── 3 & 4. Windowing ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn window_is_prefix_of_input(len in 0usize..500) {
        let days: Vec<i64> = (0..len as i64).rev().collect();
        let df = daily(&days);
        let sliced = window_slice(&df, "Last Week");

        prop_assert_eq!(sliced.height(), len.min(169));
        prop_assert!(sliced.equals(&df.head(Some(sliced.height()))));
    }

    #[test]
    fn snapshot_labels_follow_offset_order(
        days in prop::collection::btree_set(0..500i64, 1..60)
    ) {
        let days: Vec<i64> = days.into_iter().collect();
        let snapshot = resample_snapshot(&daily(&days)).unwrap();
        let labels: Vec<String> = str_values(&snapshot, SNAPSHOT_LABEL)
            .unwrap()
            .into_iter()
            .flatten()
            .collect();

        let latest = *days.iter().max().unwrap();
        let expected: Vec<String> = SNAPSHOT_OFFSETS
            .iter()
            .filter(|(_, back)| days.contains(&(latest - back)))
            .map(|(label, _)| label.to_string())
            .collect();
        prop_assert_eq!(labels, expected);
        prop_assert!(snapshot.column(TIMESTAMP).is_err());
    }
}
