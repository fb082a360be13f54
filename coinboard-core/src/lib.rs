//! Coinboard Core: data acquisition and shaping for a crypto market dashboard.
//!
//! This crate holds everything below the presentation layer:
//! - Fetch adapters for CoinCap, alternative.me and Polygon, degrading to
//!   empty tables on failure
//! - Time alignment of independently sampled price and indicator series
//! - Fiat rate resolution backed by an append-only rate cache
//! - Moving-average composition with the underlying price attached
//! - Period windowing and point-in-time snapshots
//! - The application context that loads it all once at startup

pub mod config;
pub mod context;
pub mod data;
pub mod indicators;
pub mod ranking;
pub mod rates;
pub mod window;

pub use config::DashboardConfig;
pub use context::{Dashboard, Sources};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the context and everything it owns can be shared
    /// across threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Dashboard>();
        require_sync::<Dashboard>();
        require_send::<Sources>();
        require_sync::<Sources>();
        require_send::<config::DashboardConfig>();
        require_sync::<config::DashboardConfig>();
        require_send::<indicators::MaTable>();
        require_sync::<indicators::MaTable>();

        require_send::<data::HttpTransport>();
        require_sync::<data::HttpTransport>();
        require_send::<data::StubTransport>();
        require_sync::<data::StubTransport>();
        require_send::<data::MemoryRateStore>();
        require_sync::<data::MemoryRateStore>();
        require_send::<data::CsvRateStore>();
        require_sync::<data::CsvRateStore>();
        require_send::<data::FetchError>();
        require_sync::<data::FetchError>();
    }

    /// Adapters hold their transport behind a trait object; any transport
    /// must be shareable.
    #[test]
    fn transport_trait_object_is_shareable() {
        fn require_send_sync<T: Send + Sync + ?Sized>() {}
        require_send_sync::<dyn data::JsonTransport>();
        require_send_sync::<dyn data::RateStore>();
    }
}
