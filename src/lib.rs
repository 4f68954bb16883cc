/// Cryptocharts TUI - Shared Library
///
/// Merges two asynchronous market data sources into one live view per
/// tracked product:
/// - polled candle snapshots from the exchange REST API (rate limited)
/// - a streamed trade-match feed over WebSocket (auto-resubscribing)
///
/// Derived statistics (high/low/average, 5-horizon percent change, running
/// trade totals) are recomputed on every successful snapshot and read by the
/// renderer on its own tick.
pub mod error;
pub mod market;

// Re-export commonly used types for convenience
pub use error::{ChartError, FetchError};

pub use market::config::{Config, SymbolConfig};
pub use market::fetch::SnapshotFetcher;
pub use market::limiter::RateLimiter;
pub use market::state::{
    Aggregator, DerivedMetrics, SharedAggregator, SymbolState, TradeAccumulator,
};
pub use market::types::{Candle, Granularity, MakerSide, TakerSide, ValueField};
