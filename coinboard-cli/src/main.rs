//! Coinboard CLI: query the dashboard data core from a terminal.
//!
//! Commands:
//! - `rates`: today's fiat rates, optionally rebased onto one currency
//! - `assets`: top assets ranked and priced in a display currency
//! - `prices`: aligned price history for chosen assets over a date range
//! - `fng`: Fear & Greed readings for a period
//! - `rsi`: hourly RSI readings for a period
//! - `ma`: moving averages of one window with the price overlay
//! - `snapshot`: load the whole dashboard and print its summary views

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use coinboard_core::context::{day_span, ma_table_view, price_table_view};
use coinboard_core::data::{clean_price_data, CsvRateStore, MaType};
use coinboard_core::indicators::compose_ma;
use coinboard_core::ranking::ranking_table;
use coinboard_core::rates::{rate_for, rebase_rates, resolve_rates};
use coinboard_core::window::{window_slice_by, Period, Resolution};
use coinboard_core::{Dashboard, DashboardConfig, Sources};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "coinboard",
    about = "Coinboard CLI: crypto market dashboard data"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve today's fiat rates (cached per day).
    Rates {
        /// Express every rate against this currency.
        #[arg(long)]
        base: Option<String>,
    },
    /// Rank the top assets in a display currency.
    Assets {
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// Aligned daily prices for chosen assets.
    Prices {
        /// Asset ids (e.g., bitcoin ethereum).
        #[arg(required = true)]
        assets: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to the configured history start.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// Fear & Greed index readings.
    Fng {
        /// Last Week, Last Month, Last Six Month, or anything else for all.
        #[arg(long, default_value = "Last Week")]
        period: String,
    },
    /// Hourly RSI readings.
    Rsi {
        /// Last Day, Last Week, Last Two Weeks, or anything else for all.
        #[arg(long, default_value = "Last Day")]
        period: String,
    },
    /// Moving averages for one window.
    Ma {
        #[arg(long, default_value_t = 50)]
        window: u32,

        #[arg(long, default_value = "Last Week")]
        period: String,

        /// Moving-average types to show: sma, ema.
        #[arg(long, value_delimiter = ',', default_value = "sma,ema")]
        types: Vec<String>,
    },
    /// Load everything once and print the summary views.
    Snapshot {
        #[arg(long, default_value = "USD")]
        currency: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    let sources = Sources::http(&config)?;
    let today = Utc::now().date_naive();
    tracing::debug!(
        config = ?cli.config,
        coincap = %config.sources.coincap_url,
        today = %today,
        "configuration loaded"
    );

    match cli.command {
        Commands::Rates { base } => run_rates(&config, &sources, today, base.as_deref()),
        Commands::Assets { currency } => run_assets(&config, &sources, today, &currency),
        Commands::Prices {
            assets,
            start,
            end,
            currency,
        } => run_prices(&config, &sources, today, &assets, start, end, &currency),
        Commands::Fng { period } => {
            let df = sources
                .fear_greed
                .fetch_fear_greed(config.indicators.fear_greed_limit);
            println!(
                "{}",
                window_slice_by(&df, Period::from_label(&period), Resolution::Daily)
            );
            Ok(())
        }
        Commands::Rsi { period } => {
            let df = sources.polygon.fetch_rsi();
            println!(
                "{}",
                window_slice_by(&df, Period::from_label(&period), Resolution::Hourly)
            );
            Ok(())
        }
        Commands::Ma {
            window,
            period,
            types,
        } => run_ma(&config, &sources, window, &period, &types),
        Commands::Snapshot { currency } => run_snapshot(config, &sources, today, &currency),
    }
}

fn parse_date(value: Option<String>, default: NaiveDate) -> Result<NaiveDate> {
    Ok(value
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .unwrap_or(default))
}

fn require_rate(rates: &BTreeMap<String, f64>, currency: &str) -> Result<f64> {
    rate_for(rates, currency).with_context(|| format!("no exchange rate available for {currency}"))
}

fn run_rates(
    config: &DashboardConfig,
    sources: &Sources,
    today: NaiveDate,
    base: Option<&str>,
) -> Result<()> {
    let store = CsvRateStore::new(&config.rates.cache_path);
    let rates = resolve_rates(&sources.coincap, &store, today, &config.rates.currencies);
    if rates.is_empty() {
        bail!("no exchange rates available for {today}");
    }

    let board = match base {
        Some(base) => rebase_rates(&rates, base),
        None => rates,
    };
    println!("{}", serde_json::to_string_pretty(&board)?);
    Ok(())
}

fn run_assets(
    config: &DashboardConfig,
    sources: &Sources,
    today: NaiveDate,
    currency: &str,
) -> Result<()> {
    let store = CsvRateStore::new(&config.rates.cache_path);
    let rates = resolve_rates(&sources.coincap, &store, today, &config.rates.currencies);
    let rate = require_rate(&rates, currency)?;

    let assets = sources.coincap.fetch_top_assets(config.assets.limit);
    println!("{}", ranking_table(&assets, currency, rate)?);
    Ok(())
}

fn run_prices(
    config: &DashboardConfig,
    sources: &Sources,
    today: NaiveDate,
    assets: &[String],
    start: Option<String>,
    end: Option<String>,
    currency: &str,
) -> Result<()> {
    let start = parse_date(start, config.assets.history_start)?;
    let end = parse_date(end, today)?;
    if start > end {
        bail!("start {start} is after end {end}");
    }

    let store = CsvRateStore::new(&config.rates.cache_path);
    let rates = resolve_rates(&sources.coincap, &store, today, &config.rates.currencies);
    let rate = require_rate(&rates, currency)?;

    let Some((from, to)) = day_span(start, end) else {
        bail!("date range {start}..{end} out of bounds");
    };
    let aligned = clean_price_data(&sources.coincap, from, to, assets)?;
    let view = price_table_view(&aligned, assets, start, end, Some(rate))?;
    println!("{view}");
    Ok(())
}

fn parse_types(types: &[String]) -> Result<Vec<MaType>> {
    types
        .iter()
        .map(|t| MaType::parse(t).with_context(|| format!("unknown moving-average type {t:?}")))
        .collect()
}

fn run_ma(
    config: &DashboardConfig,
    sources: &Sources,
    window: u32,
    period: &str,
    types: &[String],
) -> Result<()> {
    let types = parse_types(types)?;
    let mut tables = compose_ma(&sources.polygon, &sources.coincap, &[window], &types)?;
    let Some(ma) = tables.pop() else {
        bail!("no moving averages for window {window}");
    };

    let view = ma_table_view(
        &ma,
        &types,
        &config.indicators.price_label,
        Period::from_label(period),
    )?;
    println!("{view}");
    Ok(())
}

fn run_snapshot(
    config: DashboardConfig,
    sources: &Sources,
    today: NaiveDate,
    currency: &str,
) -> Result<()> {
    let store = CsvRateStore::new(&config.rates.cache_path);
    let dashboard = Dashboard::load(config, sources, &store, today)?;

    println!("Rates against {currency}:");
    println!("{}", serde_json::to_string_pretty(&dashboard.rate_board(currency))?);
    println!("{}", dashboard.ranking(currency)?);
    println!("{}", dashboard.fear_greed_snapshot()?);
    println!("{}", dashboard.rsi_view(Period::LastDay));
    for ma in dashboard.moving_averages() {
        if let Some(view) = dashboard.ma_view(ma.window, Period::LastWeek, &[MaType::Sma, MaType::Ema])? {
            println!("MA {}:\n{view}", ma.window);
        }
    }
    Ok(())
}
