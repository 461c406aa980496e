//! Integration coordinator for the TradrX bridge.
//!
//! Owns the market data feed, the credential store and the provider
//! API client. The UI layer drives everything through this crate:
//! lifecycle, trade submission, portfolio and status queries, and the
//! price-update subscription.

pub mod config;

pub use config::BridgeConfig;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use tradrx_client::{MarketApi, OrderRequest};
use tradrx_core::{
    BridgeError, BridgeEvent, BridgeStatus, CredentialField, Exchange, Portfolio,
    PortfolioPosition, ProbeResult, TradeRequest, TradeResult, TradingPair,
};
use tradrx_feed::{MarketDataFeed, StreamConnector};
use tradrx_keystore::backend::KeyValueStore;
use tradrx_keystore::KeyStore;

/// Orders currently route to a single venue; multi-exchange routing is
/// out of scope.
const TRADE_EXCHANGE: Exchange = Exchange::Binance;

/// The coordinator. Construct one per session; no process-wide state.
pub struct TradingBridge<S> {
    api: Arc<dyn MarketApi>,
    feed: MarketDataFeed,
    keys: KeyStore<S>,
}

impl<S: KeyValueStore> TradingBridge<S> {
    pub fn new(
        api: Arc<dyn MarketApi>,
        connector: Arc<dyn StreamConnector>,
        keys: KeyStore<S>,
        config: &BridgeConfig,
    ) -> Self {
        let feed = MarketDataFeed::new(Arc::clone(&api), connector, config.feed_config());
        Self { api, feed, keys }
    }

    /// Start the subsystem. The polling feed is primed before this
    /// returns; the stream connects in the background and its failure
    /// leaves the bridge in polling-only degraded mode rather than
    /// failing the start.
    pub async fn start(&self) {
        self.feed.start().await;

        match self.probe_exchange().await {
            ProbeResult::Online { latency_ms } => {
                info!(exchange = %TRADE_EXCHANGE, latency_ms, "Exchange reachable");
            }
            ProbeResult::Offline => {
                warn!(exchange = %TRADE_EXCHANGE, "Exchange unreachable at startup");
            }
        }
    }

    /// Shut everything down: polling, reconnect timers, the stream.
    /// Idempotent; no timer fires after this returns.
    pub async fn stop(&self) {
        self.feed.stop().await;
    }

    /// Submit a trade. Business-rule failures (unmapped pair, missing
    /// credentials, upstream refusal) come back as
    /// [`TradeResult::Rejected`]; the first two short-circuit before
    /// any network I/O.
    pub async fn submit_trade(&self, request: &TradeRequest) -> TradeResult {
        let Some(mapping) = tradrx_feed::symbols::by_pair(&request.pair) else {
            return TradeResult::Rejected {
                reason: format!("unsupported trading pair: {}", request.pair),
            };
        };

        if !self.keys.is_configured(TRADE_EXCHANGE) {
            return TradeResult::Rejected {
                reason: format!(
                    "trading API keys not configured for {TRADE_EXCHANGE}; configure credentials first"
                ),
            };
        }

        let order = OrderRequest {
            exchange: TRADE_EXCHANGE,
            symbol: mapping.binance_symbol.to_string(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            price: request.price,
        };

        match self.api.place_order(&order).await {
            Ok(ack) => {
                info!(
                    pair = %request.pair,
                    order_id = %ack.order_id,
                    status = %ack.status,
                    "Trade submitted"
                );
                TradeResult::Accepted {
                    order_id: ack.order_id,
                    status: ack.status,
                    exchange: TRADE_EXCHANGE,
                }
            }
            Err(e) => {
                warn!(pair = %request.pair, error = %e, "Trade submission failed");
                TradeResult::Rejected {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Account balances filtered to non-zero totals. Upstream errors
    /// surface once; no retry.
    pub async fn get_portfolio(&self) -> Result<Portfolio, BridgeError> {
        if !self.keys.is_configured(TRADE_EXCHANGE) {
            return Err(BridgeError::Configuration(format!(
                "{TRADE_EXCHANGE} API key not configured"
            )));
        }

        let account = self.api.account().await?;
        let positions: Vec<PortfolioPosition> = account
            .balances
            .into_iter()
            .filter_map(|balance| {
                let total = balance.free + balance.locked;
                (!total.is_zero()).then(|| PortfolioPosition {
                    asset: balance.asset,
                    free: balance.free,
                    locked: balance.locked,
                    total,
                })
            })
            .collect();

        Ok(Portfolio {
            positions,
            last_updated: Utc::now(),
        })
    }

    /// Validate, store and probe a batch of credentials. Nothing is
    /// persisted unless the whole batch validates. The probe outcome is
    /// informational; keys stay stored either way.
    pub async fn configure_credentials(
        &self,
        exchange: Exchange,
        fields: &[(CredentialField, String)],
    ) -> Result<ProbeResult, BridgeError> {
        for (field, value) in fields {
            if !value.trim().is_empty() {
                tradrx_keystore::validate(exchange, *field, value.trim())?;
            }
        }

        for (field, value) in fields {
            if !value.trim().is_empty() {
                self.keys.store(exchange, *field, value)?;
            }
        }

        let probe = self.probe_exchange().await;
        match &probe {
            ProbeResult::Online { .. } => {
                info!(exchange = %exchange, "Credentials configured, exchange reachable")
            }
            ProbeResult::Offline => {
                warn!(exchange = %exchange, "Credentials stored but exchange unreachable")
            }
        }
        Ok(probe)
    }

    /// Which data sources are active and which exchanges hold
    /// credentials.
    pub fn status(&self) -> BridgeStatus {
        BridgeStatus {
            poll_active: self.feed.is_running(),
            stream_state: self.feed.state(),
            credentials: Exchange::ALL
                .iter()
                .map(|&exchange| self.keys.status(exchange))
                .collect(),
        }
    }

    /// Erase all stored credentials.
    pub fn clear_credentials(&self) {
        self.keys.clear_all();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.feed.subscribe()
    }

    pub fn current_prices(&self) -> Vec<TradingPair> {
        self.feed.prices()
    }

    pub fn price(&self, pair: &str) -> Option<TradingPair> {
        self.feed.price(pair)
    }

    async fn probe_exchange(&self) -> ProbeResult {
        let started = tokio::time::Instant::now();
        match self.api.ping().await {
            Ok(()) => ProbeResult::Online {
                latency_ms: started.elapsed().as_millis() as u64,
            },
            Err(_) => ProbeResult::Offline,
        }
    }
}
