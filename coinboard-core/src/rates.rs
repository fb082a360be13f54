//! Currency conversion resolver.
//!
//! Resolves fiat rates (units of currency per USD) for a calendar date,
//! serving from the rate store when it has a record for that date and
//! otherwise fetching live rates and persisting them once.

use crate::data::coincap::CoinCapClient;
use crate::data::frame::{f64_values, round_to, str_values};
use crate::data::rate_store::{ExchangeRateRecord, RateStore};
use chrono::NaiveDate;
use polars::prelude::{DataFrame, PolarsResult};
use std::collections::BTreeMap;

/// Decimal places kept for a resolved rate.
pub const RATE_DECIMALS: i32 = 4;

/// Decimal places kept on the rebased rate board.
pub const BOARD_DECIMALS: i32 = 2;

/// Key the store uses for `date`.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Resolve rates for the requested currency codes on `date`.
///
/// The result may be partial or empty; callers decide how to degrade.
pub fn resolve_rates<S: AsRef<str>>(
    client: &CoinCapClient,
    store: &dyn RateStore,
    date: NaiveDate,
    codes: &[S],
) -> BTreeMap<String, f64> {
    let key = date_key(date);

    match store.load_rates_for_date(&key) {
        Ok(Some(record)) => {
            tracing::debug!(date = %key, "exchange rate cache hit");
            return record.rates_for(codes);
        }
        Ok(None) => tracing::debug!(date = %key, "exchange rate cache miss"),
        Err(e) => tracing::warn!(date = %key, error = %e, "rate store read failed, fetching live"),
    }

    let table = client.fetch_exchange_rates();
    let rates = match fiat_rates(&table, codes) {
        Ok(rates) => rates,
        Err(e) => {
            tracing::warn!(date = %key, error = %e, "unreadable exchange rate table");
            BTreeMap::new()
        }
    };

    if rates.is_empty() {
        tracing::warn!(date = %key, "no fiat rates available, nothing cached");
        return rates;
    }

    let record = ExchangeRateRecord::from_rates(&key, &rates);
    match store.save_rates(&record) {
        Ok(()) => tracing::info!(date = %key, currencies = rates.len(), "cached exchange rates"),
        Err(e) => tracing::warn!(date = %key, error = %e, "rate store write failed"),
    }
    rates
}

/// Requested fiat rows of an exchange-rate table, inverted to units per USD.
fn fiat_rates<S: AsRef<str>>(table: &DataFrame, codes: &[S]) -> PolarsResult<BTreeMap<String, f64>> {
    let symbols = str_values(table, "symbol")?;
    let kinds = str_values(table, "type")?;
    let rate_usd = f64_values(table, "rateUsd")?;

    let mut rates = BTreeMap::new();
    for ((symbol, kind), usd) in symbols.into_iter().zip(kinds).zip(rate_usd) {
        let (Some(symbol), Some(kind), Some(usd)) = (symbol, kind, usd) else {
            continue;
        };
        if kind != "fiat" || !codes.iter().any(|c| c.as_ref() == symbol) {
            continue;
        }
        if !usd.is_finite() || usd <= 0.0 {
            tracing::warn!(currency = %symbol, rate_usd = usd, "skipping unusable rate");
            continue;
        }
        rates.insert(symbol, round_to(1.0 / usd, RATE_DECIMALS));
    }
    Ok(rates)
}

/// Express a USD amount in a currency quoted as units per USD.
pub fn convert_from_usd(value: f64, rate: f64) -> f64 {
    value * rate
}

/// Units of `currency` per USD from a resolved mapping. USD converts at 1
/// even when the mapping lacks it; any other missing currency is `None`.
pub fn rate_for(rates: &BTreeMap<String, f64>, currency: &str) -> Option<f64> {
    match rates.get(currency) {
        Some(rate) => Some(*rate),
        None if currency == "USD" => Some(1.0),
        None => {
            tracing::warn!(currency = %currency, "no exchange rate for currency");
            None
        }
    }
}

/// Rates relative to `base`: each rate divided by the base rate.
///
/// Empty when `base` is not among `rates`.
pub fn rebase_rates(rates: &BTreeMap<String, f64>, base: &str) -> BTreeMap<String, f64> {
    let Some(base_rate) = rates.get(base).copied().filter(|r| *r != 0.0) else {
        tracing::warn!(currency = %base, "base currency has no rate");
        return BTreeMap::new();
    };
    rates
        .iter()
        .map(|(code, rate)| (code.clone(), round_to(rate / base_rate, BOARD_DECIMALS)))
        .collect()
}

/// Display symbol for a currency code; unknown codes display as themselves.
pub fn currency_symbol(code: &str) -> &str {
    match code {
        "USD" => "$",
        "PLN" => "zł",
        "EUR" => "€",
        "GBP" => "£",
        "CHF" => "₣",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::rate_store::{MemoryRateStore, StoreError};
    use crate::data::stub::StubTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn rates_body() -> serde_json::Value {
        json!({"data": [
            {"id": "euro", "symbol": "EUR", "currencySymbol": "€", "type": "fiat", "rateUsd": "0.85"},
            {"id": "united-states-dollar", "symbol": "USD", "currencySymbol": "$", "type": "fiat", "rateUsd": "1.0000000000000000"},
            {"id": "british-pound-sterling", "symbol": "GBP", "currencySymbol": "£", "type": "fiat", "rateUsd": "1.2500000000000000"},
            {"id": "bitcoin", "symbol": "BTC", "currencySymbol": "₿", "type": "crypto", "rateUsd": "42000.00"}
        ], "timestamp": 1704067200000i64})
    }

    fn setup(stub: StubTransport) -> (Arc<StubTransport>, CoinCapClient) {
        let stub = Arc::new(stub);
        let client = CoinCapClient::new(stub.clone(), "https://coincap.test/v2");
        (stub, client)
    }

    fn new_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn second_resolution_is_served_from_store() {
        let (stub, client) = setup(StubTransport::new().with_json("/rates", rates_body()));
        let store = MemoryRateStore::new();

        let first = resolve_rates(&client, &store, new_year(), &["USD", "EUR"]);
        let second = resolve_rates(&client, &store, new_year(), &["USD", "EUR"]);

        assert_eq!(stub.calls_matching("/rates"), 1);
        assert_eq!(first, second);
        assert_eq!(first["EUR"], 1.1765);
        assert_eq!(first["USD"], 1.0);
        assert!(!first.contains_key("BTC"));
    }

    #[test]
    fn cached_record_is_never_rewritten() {
        let (_, client) = setup(StubTransport::new().with_json("/rates", rates_body()));
        let store = MemoryRateStore::new();

        resolve_rates(&client, &store, new_year(), &["EUR", "GBP"]);
        let before = store.records();
        resolve_rates(&client, &store, new_year(), &["EUR", "GBP"]);
        resolve_rates(&client, &store, new_year(), &["USD"]);

        assert_eq!(store.records(), before);
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].gbp, Some(0.8));
        assert_eq!(before[0].usd, None);
    }

    #[test]
    fn failed_fetch_returns_empty_and_persists_nothing() {
        let (_, client) = setup(StubTransport::new().with_failure("/rates", "dns"));
        let store = MemoryRateStore::new();

        let rates = resolve_rates(&client, &store, new_year(), &["EUR"]);
        assert!(rates.is_empty());
        assert!(store.records().is_empty());
    }

    #[test]
    fn unrequested_currencies_are_not_persisted() {
        let (_, client) = setup(StubTransport::new().with_json("/rates", rates_body()));
        let store = MemoryRateStore::new();

        let rates = resolve_rates(&client, &store, new_year(), &["JPY"]);
        assert!(rates.is_empty());
        assert!(store.records().is_empty());
    }

    struct BrokenStore;

    impl RateStore for BrokenStore {
        fn load_rates_for_date(&self, _: &str) -> Result<Option<ExchangeRateRecord>, StoreError> {
            Err(StoreError::Poisoned)
        }

        fn save_rates(&self, _: &ExchangeRateRecord) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn store_failures_fall_back_to_live_rates() {
        let (stub, client) = setup(StubTransport::new().with_json("/rates", rates_body()));
        let rates = resolve_rates(&client, &BrokenStore, new_year(), &["EUR"]);
        assert_eq!(rates["EUR"], 1.1765);
        assert_eq!(stub.calls_matching("/rates"), 1);
    }

    #[test]
    fn rebase_divides_by_base_and_rounds() {
        let mut rates = BTreeMap::new();
        rates.insert("USD".to_string(), 1.0);
        rates.insert("EUR".to_string(), 0.9217);
        rates.insert("PLN".to_string(), 3.9821);

        let board = rebase_rates(&rates, "EUR");
        assert_eq!(board["EUR"], 1.0);
        assert_eq!(board["USD"], 1.08);
        assert_eq!(board["PLN"], 4.32);
        assert!(rebase_rates(&rates, "GBP").is_empty());
    }

    #[test]
    fn conversion_and_symbols() {
        assert_eq!(convert_from_usd(100.0, 0.5), 50.0);
        assert_eq!(currency_symbol("PLN"), "zł");
        assert_eq!(currency_symbol("JPY"), "JPY");
    }

    #[test]
    fn usd_falls_back_to_unit_rate() {
        let rates: BTreeMap<String, f64> = [("EUR".to_string(), 0.5)].into_iter().collect();
        assert_eq!(rate_for(&rates, "EUR"), Some(0.5));
        assert_eq!(rate_for(&rates, "USD"), Some(1.0));
        assert_eq!(rate_for(&rates, "JPY"), None);

        let quoted: BTreeMap<String, f64> = [("USD".to_string(), 1.01)].into_iter().collect();
        assert_eq!(rate_for(&quoted, "USD"), Some(1.01));
    }
}
