//! Rate-limited REST access to the upstream market data providers.
//!
//! Every outbound call passes through the per-provider rate limiter,
//! then the timing/sanitizing REST wrapper. The [`MarketApi`] trait is
//! the seam the feed and coordinator program against; tests substitute
//! call-counting mocks for it.

pub mod providers;
pub mod rate_limit;
pub mod rest;

pub use providers::{
    AccountInfo, Balance, MarketApi, MarketEntry, OrderAck, OrderBook, OrderRequest,
    ProviderUrls, RestMarketApi, SimplePrice, Ticker24h,
};
pub use rate_limit::RateLimiter;
pub use rest::{sanitize_url, RestClient};
