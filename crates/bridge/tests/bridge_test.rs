//! End-to-end coordinator tests against call-counting mocks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tradrx_bridge::{BridgeConfig, TradingBridge};
use tradrx_client::{
    AccountInfo, Balance, MarketApi, MarketEntry, OrderAck, OrderBook, OrderRequest, SimplePrice,
    Ticker24h,
};
use tradrx_core::{
    BridgeError, BridgeEvent, CredentialField, Exchange, FeedState, OrderType, Side, TradeRequest,
    TradeResult,
};
use tradrx_feed::{StreamConnector, StreamHandle};
use tradrx_keystore::backend::MemoryStore;
use tradrx_keystore::KeyStore;

const BINANCE_KEY: &str = "A1b2C3d4E5f6G7h8A1b2C3d4E5f6G7h8";
const BINANCE_SECRET: &str = "s3cr3tS3cr3ts3cr3tS3cr3ts3cr3t+/=ABC";

#[derive(Default)]
struct MockApi {
    simple_price_calls: AtomicU32,
    place_order_calls: AtomicU32,
    account_calls: AtomicU32,
    ping_calls: AtomicU32,
}

impl MockApi {
    fn network_calls(&self) -> u32 {
        self.simple_price_calls.load(Ordering::SeqCst)
            + self.place_order_calls.load(Ordering::SeqCst)
            + self.account_calls.load(Ordering::SeqCst)
            + self.ping_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketApi for MockApi {
    async fn simple_price(
        &self,
        _ids: &[String],
    ) -> Result<HashMap<String, SimplePrice>, BridgeError> {
        self.simple_price_calls.fetch_add(1, Ordering::SeqCst);
        let mut response = HashMap::new();
        response.insert(
            "bitcoin".to_string(),
            SimplePrice {
                usd: 43000.0,
                usd_24h_change: 1.5,
            },
        );
        Ok(response)
    }

    async fn markets(&self, _page: u32, _per_page: u32) -> Result<Vec<MarketEntry>, BridgeError> {
        Ok(Vec::new())
    }

    async fn ticker_24h(&self, _symbol: Option<&str>) -> Result<Vec<Ticker24h>, BridgeError> {
        Ok(Vec::new())
    }

    async fn order_book(&self, _symbol: &str, _limit: u32) -> Result<OrderBook, BridgeError> {
        Err(BridgeError::Network("not mocked".to_string()))
    }

    async fn ping(&self) -> Result<(), BridgeError> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn place_order(&self, _order: &OrderRequest) -> Result<OrderAck, BridgeError> {
        self.place_order_calls.fetch_add(1, Ordering::SeqCst);
        Ok(OrderAck {
            order_id: "1700000000000".to_string(),
            status: "DEMO_ORDER".to_string(),
        })
    }

    async fn account(&self) -> Result<AccountInfo, BridgeError> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(AccountInfo {
            balances: vec![
                Balance {
                    asset: "BTC".to_string(),
                    free: Decimal::ZERO,
                    locked: Decimal::ZERO,
                },
                Balance {
                    asset: "USDT".to_string(),
                    free: dec!(900),
                    locked: dec!(100),
                },
            ],
        })
    }
}

struct DeadConnector;

#[async_trait]
impl StreamConnector for DeadConnector {
    async fn connect(&self) -> Result<Box<dyn StreamHandle>, BridgeError> {
        Err(BridgeError::Network("connection refused".to_string()))
    }
}

fn bridge_with(api: Arc<MockApi>) -> TradingBridge<MemoryStore> {
    TradingBridge::new(
        api,
        Arc::new(DeadConnector),
        KeyStore::new(MemoryStore::new()),
        &BridgeConfig::default(),
    )
}

fn market_buy(pair: &str) -> TradeRequest {
    TradeRequest {
        pair: pair.to_string(),
        side: Side::Buy,
        order_type: OrderType::Market,
        quantity: dec!(0.5),
        price: None,
    }
}

#[tokio::test]
async fn submit_trade_unmapped_pair_rejected_without_network() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(Arc::clone(&api));

    let result = bridge.submit_trade(&market_buy("DOGE/USDT")).await;
    match result {
        TradeResult::Rejected { reason } => assert!(reason.contains("unsupported")),
        TradeResult::Accepted { .. } => panic!("expected rejection"),
    }
    assert_eq!(api.network_calls(), 0);
}

#[tokio::test]
async fn submit_trade_without_credentials_rejected_without_network() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(Arc::clone(&api));

    let result = bridge.submit_trade(&market_buy("BTC/USDT")).await;
    match result {
        TradeResult::Rejected { reason } => assert!(reason.contains("not configured")),
        TradeResult::Accepted { .. } => panic!("expected rejection"),
    }
    assert_eq!(api.network_calls(), 0);
}

#[tokio::test]
async fn submit_trade_with_credentials_reaches_order_placement() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(Arc::clone(&api));

    bridge
        .configure_credentials(
            Exchange::Binance,
            &[
                (CredentialField::ApiKey, BINANCE_KEY.to_string()),
                (CredentialField::SecretKey, BINANCE_SECRET.to_string()),
            ],
        )
        .await
        .unwrap();

    let result = bridge.submit_trade(&market_buy("BTC/USDT")).await;
    match result {
        TradeResult::Accepted {
            status, exchange, ..
        } => {
            assert_eq!(status, "DEMO_ORDER");
            assert_eq!(exchange, Exchange::Binance);
        }
        TradeResult::Rejected { reason } => panic!("expected acceptance, got: {reason}"),
    }
    assert_eq!(api.place_order_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn portfolio_requires_credentials() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(Arc::clone(&api));

    let err = bridge.get_portfolio().await.unwrap_err();
    assert!(matches!(err, BridgeError::Configuration(_)));
    assert_eq!(api.account_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn portfolio_filters_zero_balances() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(Arc::clone(&api));
    bridge
        .configure_credentials(
            Exchange::Binance,
            &[
                (CredentialField::ApiKey, BINANCE_KEY.to_string()),
                (CredentialField::SecretKey, BINANCE_SECRET.to_string()),
            ],
        )
        .await
        .unwrap();

    let portfolio = bridge.get_portfolio().await.unwrap();
    assert_eq!(portfolio.positions.len(), 1);
    let usdt = &portfolio.positions[0];
    assert_eq!(usdt.asset, "USDT");
    assert_eq!(usdt.free, dec!(900));
    assert_eq!(usdt.locked, dec!(100));
    assert_eq!(usdt.total, dec!(1000));
}

#[tokio::test]
async fn configure_rejects_whole_batch_on_one_bad_field() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(api);

    let err = bridge
        .configure_credentials(
            Exchange::Binance,
            &[
                (CredentialField::ApiKey, BINANCE_KEY.to_string()),
                (CredentialField::SecretKey, "too-short!".to_string()),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Validation(_)));

    // The valid half of the batch must not have been stored.
    let status = bridge.status();
    let binance = status
        .credentials
        .iter()
        .find(|c| c.exchange == Exchange::Binance)
        .unwrap();
    assert!(binance.fields.iter().all(|f| !f.configured));
}

#[tokio::test]
async fn start_populates_price_table_and_emits_one_update() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(Arc::clone(&api));

    let mut events = bridge.subscribe();
    bridge.start().await;

    let btc = bridge.price("BTC/USDT").expect("price loaded during start");
    assert_eq!(btc.price, dec!(43000));
    assert_eq!(btc.change_percent_24h, dec!(1.5));

    let mut price_events = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, BridgeEvent::Price(_)) {
            price_events += 1;
        }
    }
    assert_eq!(price_events, 1);

    bridge.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stop_produces_no_further_calls_or_transitions() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(Arc::clone(&api));

    bridge.start().await;
    bridge.stop().await;

    let calls_before = api.network_calls();
    let state_before = bridge.status().stream_state;
    assert_eq!(state_before, FeedState::Idle);

    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(api.network_calls(), calls_before);
    assert_eq!(bridge.status().stream_state, FeedState::Idle);
    assert!(!bridge.status().poll_active);

    // Second stop is a no-op.
    bridge.stop().await;
}

#[tokio::test]
async fn status_reports_sources_and_credentials() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(api);

    let status = bridge.status();
    assert!(!status.poll_active);
    assert_eq!(status.credentials.len(), 2);
    assert!(status.credentials.iter().all(|c| !c.configured));

    bridge.start().await;
    assert!(bridge.status().poll_active);
    bridge.stop().await;
}

#[tokio::test]
async fn clear_credentials_resets_configuration() {
    let api = Arc::new(MockApi::default());
    let bridge = bridge_with(api);
    bridge
        .configure_credentials(
            Exchange::Binance,
            &[
                (CredentialField::ApiKey, BINANCE_KEY.to_string()),
                (CredentialField::SecretKey, BINANCE_SECRET.to_string()),
            ],
        )
        .await
        .unwrap();

    bridge.clear_credentials();
    let result = bridge.submit_trade(&market_buy("BTC/USDT")).await;
    assert!(!result.is_success());
}
