//! Market data feed for the TradrX bridge.
//!
//! Two sources produce normalized price updates: a Binance combined
//! ticker stream with reconnect/backoff, and a CoinGecko polling loop
//! that keeps data flowing whenever the stream is down. Both write the
//! same shared price table and fan out through one broadcast channel.

pub mod feed;
pub mod reconnect;
pub mod stream;
pub mod symbols;

pub use feed::{FeedConfig, MarketDataFeed};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use stream::{BinanceStreamConnector, StreamConnector, StreamHandle};
