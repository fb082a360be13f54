//! Top-assets ranking table in a display currency.

use crate::data::frame::{f64_values, i64_values, round_to, str_values};
use crate::rates::{convert_from_usd, currency_symbol};
use polars::prelude::*;

/// Logo image for an asset on cryptologos.cc.
pub fn logo_url(id: &str, symbol: &str) -> String {
    format!(
        "https://cryptologos.cc/logos/{id}-{}-logo.svg?v=023",
        symbol.to_lowercase()
    )
}

fn rounded(values: Vec<Option<f64>>, decimals: i32, factor: f64) -> Vec<Option<f64>> {
    values
        .into_iter()
        .map(|v| v.map(|v| round_to(convert_from_usd(v, factor), decimals)))
        .collect()
}

/// Reshape a [`TableSchema::assets`](crate::data::TableSchema::assets) table
/// for display in `currency`, converting USD amounts with `rate`.
///
/// Columns: `Pos, Logo, Crypto Name, Symbol, Price[<sym>], Supply,
/// MarketCap[<sym>], Change24h[%]`.
pub fn ranking_table(assets: &DataFrame, currency: &str, rate: f64) -> PolarsResult<DataFrame> {
    let symbol = currency_symbol(currency);
    let ids = str_values(assets, "id")?;
    let tickers = str_values(assets, "symbol")?;

    let logos: Vec<Option<String>> = ids
        .iter()
        .zip(&tickers)
        .map(|(id, ticker)| Some(logo_url(id.as_deref()?, ticker.as_deref()?)))
        .collect();

    DataFrame::new(vec![
        Column::new("Pos".into(), i64_values(assets, "rank")?),
        Column::new("Logo".into(), logos),
        Column::new("Crypto Name".into(), str_values(assets, "name")?),
        Column::new("Symbol".into(), tickers),
        Column::new(
            format!("Price[{symbol}]").into(),
            rounded(f64_values(assets, "priceUsd")?, 4, rate),
        ),
        Column::new("Supply".into(), rounded(f64_values(assets, "supply")?, 2, 1.0)),
        Column::new(
            format!("MarketCap[{symbol}]").into(),
            rounded(f64_values(assets, "marketCapUsd")?, 2, rate),
        ),
        Column::new(
            "Change24h[%]".into(),
            rounded(f64_values(assets, "changePercent24Hr")?, 2, 1.0),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::coincap::CoinCapClient;
    use crate::data::schema::TableSchema;
    use crate::data::stub::StubTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn assets() -> DataFrame {
        let stub = StubTransport::new().with_json(
            "/assets",
            json!({"data": [{
                "id": "bitcoin", "rank": "1", "symbol": "BTC", "name": "Bitcoin",
                "supply": "19600000.123", "maxSupply": "21000000", "marketCapUsd": "823200000000.456",
                "volumeUsd24Hr": "1", "priceUsd": "42000.123456", "changePercent24Hr": "-1.23456",
                "vwap24Hr": "1", "explorer": null
            }]}),
        );
        CoinCapClient::new(Arc::new(stub), "https://coincap.test/v2").fetch_top_assets(10)
    }

    #[test]
    fn columns_follow_display_layout() {
        let table = ranking_table(&assets(), "EUR", 0.5).unwrap();
        let names: Vec<&str> = table.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["Pos", "Logo", "Crypto Name", "Symbol", "Price[€]", "Supply", "MarketCap[€]", "Change24h[%]"]
        );
        assert_eq!(f64_values(&table, "Price[€]").unwrap(), vec![Some(21000.0617)]);
        assert_eq!(f64_values(&table, "Supply").unwrap(), vec![Some(19600000.12)]);
        assert_eq!(f64_values(&table, "Change24h[%]").unwrap(), vec![Some(-1.23)]);
        assert_eq!(
            str_values(&table, "Logo").unwrap()[0].as_deref(),
            Some("https://cryptologos.cc/logos/bitcoin-btc-logo.svg?v=023")
        );
    }

    #[test]
    fn empty_assets_give_empty_ranking() {
        let empty = TableSchema::empty(&TableSchema::assets());
        let table = ranking_table(&empty, "USD", 1.0).unwrap();
        assert_eq!(table.height(), 0);
        assert_eq!(table.width(), 8);
    }
}
