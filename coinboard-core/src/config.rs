//! Dashboard configuration.
//!
//! Stored as TOML; every section and field is optional and falls back to the
//! defaults below, so an empty file is a valid configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::indicators::MaType;

/// Environment variable consulted when no Polygon key is configured.
pub const POLYGON_API_KEY_ENV: &str = "POLYGON_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Complete dashboard configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub sources: SourcesConfig,
    pub http: HttpConfig,
    pub assets: AssetsConfig,
    pub rates: RatesConfig,
    pub indicators: IndicatorConfig,
}

impl DashboardConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Polygon API key from the config, else from `POLYGON_API_KEY`.
    pub fn polygon_api_key(&self) -> Option<String> {
        self.sources
            .polygon_api_key
            .clone()
            .or_else(|| std::env::var(POLYGON_API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Base URLs of the external sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub coincap_url: String,
    pub fear_greed_url: String,
    pub polygon_url: String,
    pub polygon_api_key: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            coincap_url: "https://api.coincap.io/v2".into(),
            fear_greed_url: "https://api.alternative.me/fng/".into(),
            polygon_url: "https://api.polygon.io/v1/indicators".into(),
            polygon_api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout. Unset keeps the HTTP client's default.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: concat!("coinboard/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// How many top-ranked assets to track.
    pub limit: usize,
    /// First day of the base price table.
    pub history_start: NaiveDate,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            history_start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// Fiat currencies resolved at startup.
    pub currencies: Vec<String>,
    /// Append-only CSV file backing the rate cache.
    pub cache_path: PathBuf,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            currencies: ["USD", "EUR", "GBP", "PLN", "CHF"]
                .into_iter()
                .map(String::from)
                .collect(),
            cache_path: PathBuf::from("exchange_rates_cache.csv"),
        }
    }
}

/// Technical indicator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Polygon ticker the indicators are computed on.
    pub ticker: String,
    /// CoinCap asset id of the same instrument, for the price overlay.
    pub asset_id: String,
    /// Column name of the price overlay in moving-average tables.
    pub price_label: String,
    pub timespan: String,
    pub series_type: String,
    pub order: String,
    pub limit: usize,
    pub rsi_window: u32,
    pub ma_windows: Vec<u32>,
    pub ma_types: Vec<MaType>,
    pub fear_greed_limit: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ticker: "X:BTCUSD".into(),
            asset_id: "bitcoin".into(),
            price_label: "BTC price".into(),
            timespan: "hour".into(),
            series_type: "close".into(),
            order: "desc".into(),
            limit: 700,
            rsi_window: 14,
            ma_windows: vec![50, 180],
            ma_types: vec![MaType::Sma, MaType::Ema],
            fear_greed_limit: 365,
        }
    }
}
