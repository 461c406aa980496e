use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tradrx_core::{BridgeError, Exchange, OrderType, Provider, Side};

use crate::rate_limit::RateLimiter;
use crate::rest::RestClient;

/// Base URLs for the upstream providers. Overridable for tests and
/// regional mirrors.
#[derive(Debug, Clone)]
pub struct ProviderUrls {
    pub coingecko: String,
    pub binance: String,
}

impl Default for ProviderUrls {
    fn default() -> Self {
        Self {
            coingecko: "https://api.coingecko.com/api/v3".to_string(),
            binance: "https://api.binance.com/api/v3".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One entry of the CoinGecko simple-price response. CoinGecko emits
/// raw JSON numbers here, so these stay f64 until normalization.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimplePrice {
    #[serde(default)]
    pub usd: f64,
    #[serde(default)]
    pub usd_24h_change: f64,
}

/// One entry of the CoinGecko markets listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
}

/// Binance 24-hour ticker statistics. Prices arrive as strings on the
/// wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,
    pub last_price: Decimal,
    pub price_change_percent: Decimal,
}

/// Binance order book snapshot; levels are `(price, quantity)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBook {
    pub last_update_id: u64,
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

/// An order in provider wire format, produced by the coordinator after
/// symbol mapping and credential checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub exchange: Exchange,
    /// Provider-specific symbol, e.g. "BTCUSDT".
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
}

/// Acknowledgment returned by order placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub balances: Vec<Balance>,
}

// ---------------------------------------------------------------------------
// API surface
// ---------------------------------------------------------------------------

/// Upstream provider operations used by the feed and the coordinator.
/// Tests substitute call-counting mocks.
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// CoinGecko simple price for a set of coin ids, in USD with
    /// 24-hour change.
    async fn simple_price(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, SimplePrice>, BridgeError>;

    /// CoinGecko market listing page, ordered by market cap.
    async fn markets(&self, page: u32, per_page: u32) -> Result<Vec<MarketEntry>, BridgeError>;

    /// Binance 24h ticker; all symbols when `symbol` is `None`.
    async fn ticker_24h(&self, symbol: Option<&str>) -> Result<Vec<Ticker24h>, BridgeError>;

    /// Binance order book snapshot.
    async fn order_book(&self, symbol: &str, limit: u32) -> Result<OrderBook, BridgeError>;

    /// Exchange liveness probe.
    async fn ping(&self) -> Result<(), BridgeError>;

    /// Order placement. Real request signing is unimplemented; the live
    /// client returns a synthetic acknowledgment.
    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, BridgeError>;

    /// Account balances. Like order placement, this path is a demo stub
    /// until signed requests land.
    async fn account(&self) -> Result<AccountInfo, BridgeError>;
}

/// Live REST implementation over CoinGecko and Binance.
pub struct RestMarketApi {
    rest: RestClient,
    limiter: RateLimiter,
    urls: ProviderUrls,
}

impl RestMarketApi {
    pub fn new(urls: ProviderUrls) -> Result<Self, BridgeError> {
        Ok(Self {
            rest: RestClient::new()?,
            limiter: RateLimiter::new(),
            urls,
        })
    }
}

#[async_trait]
impl MarketApi for RestMarketApi {
    async fn simple_price(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, SimplePrice>, BridgeError> {
        self.limiter.acquire(Provider::CoinGecko, "prices").await;
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd&include_24hr_change=true",
            self.urls.coingecko,
            ids.join(",")
        );
        self.rest.get_json(&url).await
    }

    async fn markets(&self, page: u32, per_page: u32) -> Result<Vec<MarketEntry>, BridgeError> {
        self.limiter.acquire(Provider::CoinGecko, "markets").await;
        let url = format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={per_page}&page={page}",
            self.urls.coingecko
        );
        self.rest.get_json(&url).await
    }

    async fn ticker_24h(&self, symbol: Option<&str>) -> Result<Vec<Ticker24h>, BridgeError> {
        self.limiter.acquire(Provider::Binance, "ticker").await;
        match symbol {
            Some(symbol) => {
                let url = format!("{}/ticker/24hr?symbol={symbol}", self.urls.binance);
                let one: Ticker24h = self.rest.get_json(&url).await?;
                Ok(vec![one])
            }
            None => {
                let url = format!("{}/ticker/24hr", self.urls.binance);
                self.rest.get_json(&url).await
            }
        }
    }

    async fn order_book(&self, symbol: &str, limit: u32) -> Result<OrderBook, BridgeError> {
        self.limiter.acquire(Provider::Binance, "depth").await;
        let url = format!(
            "{}/depth?symbol={symbol}&limit={limit}",
            self.urls.binance
        );
        self.rest.get_json(&url).await
    }

    async fn ping(&self) -> Result<(), BridgeError> {
        self.limiter.acquire(Provider::Binance, "ping").await;
        let url = format!("{}/ping", self.urls.binance);
        let _: serde_json::Value = self.rest.get_json(&url).await?;
        Ok(())
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<OrderAck, BridgeError> {
        self.limiter.acquire(Provider::Binance, "order").await;

        // Signed endpoints are not implemented; acknowledge locally so
        // the caller-facing contract stays exercisable.
        warn!(
            symbol = %order.symbol,
            side = order.side.as_wire(),
            order_type = order.order_type.as_wire(),
            "Order placement requires request signing - returning demo acknowledgment"
        );

        let ack = OrderAck {
            order_id: Utc::now().timestamp_millis().to_string(),
            status: "DEMO_ORDER".to_string(),
        };
        info!(order_id = %ack.order_id, "Demo order acknowledged");
        Ok(ack)
    }

    async fn account(&self) -> Result<AccountInfo, BridgeError> {
        self.limiter.acquire(Provider::Binance, "account").await;

        // Demo response; the signed account endpoint needs the same
        // authentication work as order placement.
        Ok(AccountInfo {
            balances: vec![
                Balance {
                    asset: "BTC".to_string(),
                    free: Decimal::ZERO,
                    locked: Decimal::ZERO,
                },
                Balance {
                    asset: "USDT".to_string(),
                    free: Decimal::new(1000, 0),
                    locked: Decimal::ZERO,
                },
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ticker_parses_binance_payload() {
        let raw = r#"{"symbol":"BTCUSDT","lastPrice":"43000.50","priceChangePercent":"1.25","ignored":"x"}"#;
        let ticker: Ticker24h = serde_json::from_str(raw).unwrap();
        assert_eq!(ticker.symbol, "BTCUSDT");
        assert_eq!(ticker.last_price, dec!(43000.50));
        assert_eq!(ticker.price_change_percent, dec!(1.25));
    }

    #[test]
    fn order_book_parses_depth_payload() {
        let raw = r#"{"lastUpdateId":1027024,"bids":[["4.00000000","431.00000000"]],"asks":[["4.00000200","12.00000000"]]}"#;
        let book: OrderBook = serde_json::from_str(raw).unwrap();
        assert_eq!(book.last_update_id, 1027024);
        assert_eq!(book.bids[0].0, dec!(4));
        assert_eq!(book.asks[0].1, dec!(12));
    }

    #[test]
    fn simple_price_tolerates_missing_change() {
        let raw = r#"{"bitcoin":{"usd":43000.0}}"#;
        let parsed: HashMap<String, SimplePrice> = serde_json::from_str(raw).unwrap();
        let btc = parsed["bitcoin"];
        assert_eq!(btc.usd, 43000.0);
        assert_eq!(btc.usd_24h_change, 0.0);
    }
}
