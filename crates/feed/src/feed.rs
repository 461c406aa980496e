use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tradrx_client::MarketApi;
use tradrx_core::{BridgeError, BridgeEvent, FeedState, TradingPair};

use crate::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::stream::{self, StreamConnector, StreamHandle};
use crate::symbols;

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Cadence of the REST polling fallback.
    pub poll_interval: Duration,
    /// Stream handshake deadline; overruns count as failed attempts.
    pub connect_timeout: Duration,
    /// Keep-alive probe cadence while streaming.
    pub ping_interval: Duration,
    pub reconnect: ReconnectConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Maintains the shared symbol→price table from two sources: the
/// streaming ticker (with reconnect/backoff) and the polling fallback.
/// Whichever source last observed a symbol wins; subscribers receive
/// every processed update as a [`BridgeEvent::Price`].
pub struct MarketDataFeed {
    inner: Arc<FeedInner>,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct FeedInner {
    api: Arc<dyn MarketApi>,
    connector: Arc<dyn StreamConnector>,
    config: FeedConfig,
    prices: RwLock<HashMap<String, TradingPair>>,
    state: RwLock<FeedState>,
    events: broadcast::Sender<BridgeEvent>,
}

impl MarketDataFeed {
    pub fn new(
        api: Arc<dyn MarketApi>,
        connector: Arc<dyn StreamConnector>,
        config: FeedConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(FeedInner {
                api,
                connector,
                config,
                prices: RwLock::new(HashMap::new()),
                state: RwLock::new(FeedState::Idle),
                events,
            }),
            started: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start both feeds. The first poll refresh completes before this
    /// returns, so callers observe initial data immediately; stream
    /// establishment continues in the background and its failure is not
    /// a start failure.
    pub async fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Feed already started");
            return;
        }

        if let Err(e) = self.inner.refresh_once().await {
            warn!(error = %e, "Initial price refresh failed, polling will retry");
        }

        let mut tasks = self.tasks.lock().await;
        tasks.push(tokio::spawn(poll_loop(Arc::clone(&self.inner))));
        tasks.push(tokio::spawn(stream_loop(Arc::clone(&self.inner))));
        info!("Market data feed started");
    }

    /// Deliberate shutdown: cancels the polling timer, any pending
    /// reconnect delay and the stream itself. No timer fires after this
    /// returns. Idempotent.
    pub async fn stop(&self) {
        let was_started = self.started.swap(false, Ordering::SeqCst);

        let mut tasks = self.tasks.lock().await;
        for handle in tasks.drain(..) {
            handle.abort();
            // Await the aborted task so no work is left in flight.
            let _ = handle.await;
        }
        self.inner.set_state(FeedState::Idle);

        if was_started {
            info!("Market data feed stopped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> FeedState {
        self.inner.state()
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Latest quote for one pair.
    pub fn price(&self, pair: &str) -> Option<TradingPair> {
        self.inner
            .prices
            .read()
            .ok()
            .and_then(|prices| prices.get(pair).cloned())
    }

    /// Snapshot of the whole price table.
    pub fn prices(&self) -> Vec<TradingPair> {
        self.inner
            .prices
            .read()
            .map(|prices| prices.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl FeedInner {
    fn state(&self) -> FeedState {
        self.state.read().map(|s| *s).unwrap_or(FeedState::Idle)
    }

    fn set_state(&self, state: FeedState) {
        if let Ok(mut current) = self.state.write() {
            *current = state;
        }
    }

    fn apply_update(&self, update: TradingPair) {
        if let Ok(mut prices) = self.prices.write() {
            prices.insert(update.symbol.clone(), update.clone());
        }
        // No subscribers is fine; the table still updates.
        let _ = self.events.send(BridgeEvent::Price(update));
    }

    /// One polling pass: fetch all mapped ids and fold the result into
    /// the price table.
    async fn refresh_once(&self) -> Result<(), BridgeError> {
        let ids = symbols::coingecko_ids();
        let data = self.api.simple_price(&ids).await?;

        for (id, quote) in &data {
            let Some(mapping) = symbols::by_coingecko_id(id) else {
                continue;
            };
            let price = Decimal::try_from(quote.usd).unwrap_or_default();
            let change = Decimal::try_from(quote.usd_24h_change).unwrap_or_default();
            self.apply_update(TradingPair {
                symbol: mapping.pair.to_string(),
                price,
                change_percent_24h: change,
            });
        }
        Ok(())
    }

    /// Pump one established stream connection until it drops. Returns
    /// the disconnect reason.
    async fn run_stream(&self, mut handle: Box<dyn StreamHandle>) -> String {
        let start = tokio::time::Instant::now() + self.config.ping_interval;
        let mut ping = tokio::time::interval_at(start, self.config.ping_interval);

        loop {
            tokio::select! {
                _ = ping.tick() => {
                    if let Err(e) = handle.ping().await {
                        return format!("keep-alive failed: {e}");
                    }
                }
                message = handle.next_message() => match message {
                    None => return "connection closed by upstream".to_string(),
                    Some(Err(e)) => return e.to_string(),
                    Some(Ok(text)) => match stream::parse_ticker(&text) {
                        Ok(Some(update)) => self.apply_update(update),
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "Dropping malformed stream payload"),
                    },
                }
            }
        }
    }
}

async fn poll_loop(inner: Arc<FeedInner>) {
    loop {
        tokio::time::sleep(inner.config.poll_interval).await;
        if let Err(e) = inner.refresh_once().await {
            // The poll is the availability fallback; keep the cadence
            // going through transient upstream trouble.
            warn!(error = %e, "Price poll failed");
        }
    }
}

async fn stream_loop(inner: Arc<FeedInner>) {
    let mut policy = ReconnectPolicy::new(inner.config.reconnect.clone());

    loop {
        inner.set_state(FeedState::Connecting);
        let attempt =
            tokio::time::timeout(inner.config.connect_timeout, inner.connector.connect()).await;

        match attempt {
            Ok(Ok(handle)) => {
                policy.reset();
                inner.set_state(FeedState::Streaming);
                let _ = inner.events.send(BridgeEvent::StreamConnected);
                info!("Price stream connected");

                let reason = inner.run_stream(handle).await;
                inner.set_state(FeedState::Disconnected);
                warn!(reason = %reason, "Price stream disconnected");
                let _ = inner
                    .events
                    .send(BridgeEvent::StreamDisconnected { reason });
            }
            Ok(Err(e)) => warn!(error = %e, "Stream connect failed"),
            Err(_) => warn!(
                timeout_secs = inner.config.connect_timeout.as_secs(),
                "Stream connect timed out"
            ),
        }

        match policy.after_failure() {
            Some(delay) => {
                inner.set_state(FeedState::Reconnecting);
                debug!(
                    attempt = policy.failures(),
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling stream reconnect"
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                inner.set_state(FeedState::Failed);
                error!(
                    attempts = policy.failures(),
                    "Stream connection failed permanently"
                );
                let _ = inner.events.send(BridgeEvent::StreamFailed {
                    attempts: policy.failures(),
                });
                return;
            }
        }
    }
}
