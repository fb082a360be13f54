//! Data acquisition, shaping and caching

pub mod align;
pub mod coincap;
pub mod fear_greed;
pub mod frame;
pub mod http;
pub mod polygon;
pub mod provider;
pub mod rate_store;
pub mod schema;
pub mod stub;

pub use align::{align_prices, clean_price_data, join_ma, left_join_on_timestamp};
pub use coincap::{CoinCapClient, Interval};
pub use fear_greed::FearGreedClient;
pub use http::HttpTransport;
pub use polygon::{MaType, PolygonClient};
pub use provider::{DataSource, FetchError, JsonTransport};
pub use rate_store::{CsvRateStore, ExchangeRateRecord, MemoryRateStore, RateStore, StoreError};
pub use schema::{SchemaError, TableSchema};
pub use stub::{StubReply, StubTransport};
