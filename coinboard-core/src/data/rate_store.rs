//! Date-keyed exchange rate cache.
//!
//! Append-only: records are inserted, never updated or deleted. Dates are not
//! unique; a lookup returns the most recently inserted record for the date.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Fiat currencies a record has a slot for.
pub const SUPPORTED_CURRENCIES: [&str; 5] = ["USD", "PLN", "EUR", "GBP", "CHF"];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rate store I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("rate store CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("rate store lock poisoned")]
    Poisoned,
}

/// One day's fiat rates, each expressed as units of that currency per USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateRecord {
    pub date: String,
    #[serde(rename = "USD")]
    pub usd: Option<f64>,
    #[serde(rename = "PLN")]
    pub pln: Option<f64>,
    #[serde(rename = "EUR")]
    pub eur: Option<f64>,
    #[serde(rename = "GBP")]
    pub gbp: Option<f64>,
    #[serde(rename = "CHF")]
    pub chf: Option<f64>,
}

impl ExchangeRateRecord {
    /// Build a record from resolved rates; currencies without a slot are ignored.
    pub fn from_rates(date: &str, rates: &BTreeMap<String, f64>) -> Self {
        Self {
            date: date.to_string(),
            usd: rates.get("USD").copied(),
            pln: rates.get("PLN").copied(),
            eur: rates.get("EUR").copied(),
            gbp: rates.get("GBP").copied(),
            chf: rates.get("CHF").copied(),
        }
    }

    /// Rate for a currency code, if the record has one.
    pub fn get(&self, code: &str) -> Option<f64> {
        match code {
            "USD" => self.usd,
            "PLN" => self.pln,
            "EUR" => self.eur,
            "GBP" => self.gbp,
            "CHF" => self.chf,
            _ => None,
        }
    }

    /// The requested currencies that this record has a rate for.
    pub fn rates_for<S: AsRef<str>>(&self, codes: &[S]) -> BTreeMap<String, f64> {
        codes
            .iter()
            .filter_map(|code| {
                let code = code.as_ref();
                self.get(code).map(|rate| (code.to_string(), rate))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        SUPPORTED_CURRENCIES.iter().all(|code| self.get(code).is_none())
    }
}

/// Persistence behind the currency conversion resolver.
pub trait RateStore: Send + Sync {
    /// Most recently inserted record for `date`, if any.
    fn load_rates_for_date(&self, date: &str) -> Result<Option<ExchangeRateRecord>, StoreError>;

    /// Append a record.
    fn save_rates(&self, record: &ExchangeRateRecord) -> Result<(), StoreError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    records: Mutex<Vec<ExchangeRateRecord>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record in insertion order.
    pub fn records(&self) -> Vec<ExchangeRateRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl RateStore for MemoryRateStore {
    fn load_rates_for_date(&self, date: &str) -> Result<Option<ExchangeRateRecord>, StoreError> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(records.iter().rev().find(|r| r.date == date).cloned())
    }

    fn save_rates(&self, record: &ExchangeRateRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}

/// Append-only CSV file with header `date,USD,PLN,EUR,GBP,CHF`.
#[derive(Debug, Clone)]
pub struct CsvRateStore {
    path: PathBuf,
}

impl CsvRateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RateStore for CsvRateStore {
    fn load_rates_for_date(&self, date: &str) -> Result<Option<ExchangeRateRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut latest = None;
        for row in reader.deserialize::<ExchangeRateRecord>() {
            let record = row?;
            if record.date == date {
                latest = Some(record);
            }
        }
        Ok(latest)
    }

    fn save_rates(&self, record: &ExchangeRateRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let needs_header = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}
